//! Session service: the administrative control surface.
//!
//! One service is built per process and passed by reference. It owns the
//! session manager (and through it the backend and enablement state) plus
//! the immutable configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backends::{ServerInfo, SessionBackend};
use crate::config::Config;
use crate::core::{Enablement, SessionManager};
use crate::error::{ConnectFailure, FailOpen, Result};
use crate::storage::OptionStore;

/// Result of [`SessionService::bootstrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapOutcome {
    /// Whether the backend is connected after bootstrap.
    pub connected: bool,
    /// Whether sessions are routed through this store after bootstrap.
    pub installed: bool,
}

/// Result of a connection test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOutcome {
    pub success: bool,
    /// Failure classification when the test failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ConnectFailure>,
    /// Error message when the test failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Connection settings shown in the status report.
///
/// Carries whether a credential is set, never the credential itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub host: String,
    pub port: u16,
    pub database: i64,
    pub prefix: String,
    pub timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub auth_configured: bool,
    pub tls_active: bool,
    pub ttl_seconds: u64,
}

impl From<&Config> for ConfigSummary {
    fn from(config: &Config) -> Self {
        Self {
            host: config.redis.host.clone(),
            port: config.redis.port,
            database: config.redis.database,
            prefix: config.redis.prefix.clone(),
            timeout_secs: config.redis.timeout_secs,
            read_timeout_secs: config.redis.read_timeout_secs,
            auth_configured: config.redis.auth.is_some(),
            tls_active: config.redis.tls.is_active(),
            ttl_seconds: config.session.ttl_seconds,
        }
    }
}

/// Snapshot of the session store's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Backend name.
    pub backend: String,
    pub connected: bool,
    /// Persisted enablement flag.
    pub enabled: bool,
    /// Whether sessions are routed through this store in this process.
    pub installed: bool,
    /// Whether the active session carries the ownership sentinel.
    pub serving_active_session: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Number of session keys; O(n) on the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerInfo>,
    pub config: ConfigSummary,
}

impl StatusReport {
    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        let yes_no = |value: bool| if value { "yes" } else { "no" };

        let mut lines = vec!["Session store status:".to_string(), String::new()];
        lines.push(format!("  Backend:          {}", self.backend));
        lines.push(format!("  Connected:        {}", yes_no(self.connected)));
        lines.push(format!("  Enabled:          {}", yes_no(self.enabled)));
        lines.push(format!("  Handler active:   {}", yes_no(self.installed)));
        lines.push(format!(
            "  Serving session:  {}",
            yes_no(self.serving_active_session)
        ));
        if let Some(error) = &self.last_error {
            lines.push(format!("  Last error:       {}", error));
        }

        if self.connected {
            lines.push(String::new());
            if let Some(count) = self.session_count {
                lines.push(format!("  Sessions stored:  {}", count));
            }
            if let Some(server) = &self.server {
                if let Some(version) = &server.version {
                    lines.push(format!("  Redis version:    {}", version));
                }
                if let Some(mb) = server.used_memory_mb() {
                    lines.push(format!("  Memory used:      {:.2} MB", mb));
                }
                if let Some(clients) = server.connected_clients {
                    lines.push(format!("  Clients:          {}", clients));
                }
            }
        }

        let c = &self.config;
        lines.push(String::new());
        lines.push("Configuration:".to_string());
        lines.push(format!("  Host:             {}:{}", c.host, c.port));
        lines.push(format!("  Database:         {}", c.database));
        lines.push(format!("  Prefix:           {}", c.prefix));
        lines.push(format!(
            "  Timeouts:         connect {}s, read {}s",
            c.timeout_secs, c.read_timeout_secs
        ));
        lines.push(format!("  Auth:             {}", yes_no(c.auth_configured)));
        lines.push(format!("  TLS:              {}", yes_no(c.tls_active)));
        lines.push(format!("  Session TTL:      {}s", c.ttl_seconds));

        lines.join("\n")
    }
}

/// Generate a fresh session key.
pub fn generate_session_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// The session store service.
#[derive(Debug)]
pub struct SessionService<B: SessionBackend> {
    config: Config,
    manager: SessionManager<B>,
}

impl<B: SessionBackend> SessionService<B> {
    /// Build the service.
    ///
    /// Reads the persisted enablement flag once; nothing is dialed until
    /// [`bootstrap`](Self::bootstrap) or an explicit connection test.
    pub fn new(backend: B, options: Arc<dyn OptionStore>, config: Config) -> Self {
        let manager = SessionManager::new(backend, Enablement::load(options), &config);
        Self { config, manager }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &SessionManager<B> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut SessionManager<B> {
        &mut self.manager
    }

    pub fn backend(&self) -> &B {
        self.manager.backend()
    }

    /// Process-start resolution.
    ///
    /// Connects when sessions were left enabled or auto-connect is set, then
    /// installs the handler when sessions were left enabled or auto-enable
    /// is set. A previously enabled store therefore resumes on every start.
    pub fn bootstrap(&mut self) -> BootstrapOutcome {
        let enabled = self.manager.is_enabled();
        let session = &self.config.session;

        if (enabled || session.auto_connect) && !self.backend().is_connected() {
            self.backend()
                .connect()
                .fail_open_with("bootstrap connect", ());
        }

        if (enabled || session.auto_enable) && self.backend().is_connected() {
            self.manager.install();
        }

        let outcome = BootstrapOutcome {
            connected: self.backend().is_connected(),
            installed: self.manager.is_installed(),
        };
        tracing::debug!(
            "bootstrap: enabled={} connected={} installed={}",
            enabled,
            outcome.connected,
            outcome.installed
        );
        outcome
    }

    /// Attempt a connection and report the result.
    ///
    /// Does not change the enablement flag.
    pub fn test_connection(&mut self) -> ConnectionOutcome {
        match self.backend().connect() {
            Ok(()) => ConnectionOutcome {
                success: true,
                failure: None,
                error: None,
            },
            Err(err) => ConnectionOutcome {
                success: false,
                failure: Some(err.connect_failure().unwrap_or(ConnectFailure::Other)),
                error: Some(self.backend().last_error().unwrap_or_else(|| err.to_string())),
            },
        }
    }

    /// Connect if needed, then take over session handling.
    ///
    /// A key is generated when none is supplied. Returns `false` when the
    /// backend cannot be reached or a session is already active.
    pub fn enable_sessions(&mut self, session_key: Option<String>) -> bool {
        if !self.backend().is_connected() && self.backend().connect().is_err() {
            return false;
        }

        let key = session_key.unwrap_or_else(generate_session_key);
        self.manager
            .enable(&key)
            .fail_open_with("enabling sessions", false)
    }

    /// Make the session stored under `key` the active session, connecting
    /// first if needed.
    ///
    /// Lets a later process act on a session an earlier one started, so
    /// that [`disable_sessions`](Self::disable_sessions) destroys it.
    pub fn resume_session(&mut self, key: &str) -> Result<()> {
        if !self.backend().is_connected() {
            self.backend().connect()?;
        }
        self.manager.start(key)?;
        Ok(())
    }

    /// Stop handling sessions. Always succeeds.
    pub fn disable_sessions(&mut self) -> bool {
        self.manager
            .disable()
            .fail_open_with("disabling sessions", true)
    }

    /// Gather a status snapshot.
    ///
    /// Key count and server info are only queried while connected; a failed
    /// query leaves them empty.
    pub fn status(&self) -> StatusReport {
        let backend = self.backend();
        let connected = backend.is_connected();

        let (session_count, server) = if connected {
            let count = backend
                .keys("*")
                .map(|keys| Some(keys.len()))
                .fail_open_default("counting session keys");
            let server = backend
                .server_info()
                .fail_open_default("reading server info");
            (count, server)
        } else {
            (None, None)
        };

        StatusReport {
            backend: backend.name().to_string(),
            connected,
            enabled: self.manager.is_enabled(),
            installed: self.manager.is_installed(),
            serving_active_session: self.manager.is_serving_active_session(),
            last_error: backend.last_error(),
            session_count,
            server,
            config: ConfigSummary::from(&self.config),
        }
    }
}
