//! Redis session backend.
//!
//! Wraps one synchronous `redis::Connection`, created by `connect` and kept
//! for the life of the backend. AUTH and SELECT are issued by the client
//! during the handshake when a credential or non-zero database is
//! configured. The key prefix is applied here, not by the server.

use std::sync::Mutex;
use std::time::Duration;

use redis::{Commands, ConnectionAddr, ConnectionInfo, ErrorKind, RedisConnectionInfo, RedisError};

use crate::backends::traits::{ServerInfo, SessionBackend};
use crate::config::RedisConfig;
use crate::error::{ConnectFailure, Result, SessionError};

/// Session backend backed by a Redis server.
pub struct RedisBackend {
    config: RedisConfig,
    connection: Mutex<Option<redis::Connection>>,
    last_error: Mutex<Option<String>>,
}

impl RedisBackend {
    /// Create a backend for the given connection parameters.
    ///
    /// Nothing is dialed until [`connect`](SessionBackend::connect).
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    /// Connection parameters this backend was built with.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    /// `KEYS` pattern scoped to this store's prefix.
    fn key_pattern(&self, pattern: &str) -> String {
        format!("{}{}", escape_glob(&self.config.prefix), pattern)
    }

    fn unprefixed(&self, key: String) -> String {
        match key.strip_prefix(&self.config.prefix) {
            Some(stripped) => stripped.to_string(),
            None => key,
        }
    }

    fn connection_info(&self) -> ConnectionInfo {
        let host = self.config.host.clone();
        let port = self.config.port;

        let addr = if self.config.tls.is_active() {
            ConnectionAddr::TcpTls {
                host,
                port,
                insecure: self.config.tls.is_insecure(),
                tls_params: None,
            }
        } else {
            ConnectionAddr::Tcp(host, port)
        };

        ConnectionInfo {
            addr,
            redis: RedisConnectionInfo {
                db: self.config.database,
                password: self.config.auth.clone(),
                ..Default::default()
            },
        }
    }

    fn build_client(&self) -> Result<redis::Client> {
        let info = self.connection_info();
        if self.config.tls.is_active() {
            return self.build_tls_client(info);
        }
        redis::Client::open(info).map_err(|err| connect_error(&err))
    }

    #[cfg(feature = "tls")]
    fn build_tls_client(&self, info: ConnectionInfo) -> Result<redis::Client> {
        use crate::util::{read_bytes_with_limit, MAX_CA_FILE_SIZE};

        let root_cert = match &self.config.tls.ca_file {
            Some(path) => Some(read_bytes_with_limit(path, MAX_CA_FILE_SIZE).map_err(|err| {
                SessionError::connection(
                    ConnectFailure::InvalidConfig,
                    format!("cannot load CA file {}: {}", path.display(), err),
                )
            })?),
            None => None,
        };

        redis::Client::build_with_tls(
            info,
            redis::TlsCertificates {
                client_tls: None,
                root_cert,
            },
        )
        .map_err(|err| connect_error(&err))
    }

    #[cfg(not(feature = "tls"))]
    fn build_tls_client(&self, _info: ConnectionInfo) -> Result<redis::Client> {
        Err(SessionError::backend_unavailable(
            "TLS requested but redsess was built without the `tls` feature",
        ))
    }

    fn open_connection(&self) -> Result<redis::Connection> {
        let client = self.build_client()?;

        let connect_timeout = Duration::from_secs(self.config.timeout_secs.max(1));
        let con = client
            .get_connection_with_timeout(connect_timeout)
            .map_err(|err| connect_error(&err))?;

        let io_timeout = Some(Duration::from_secs(self.config.read_timeout_secs.max(1)));
        con.set_read_timeout(io_timeout)
            .and_then(|_| con.set_write_timeout(io_timeout))
            .map_err(|err| connect_error(&err))?;

        Ok(con)
    }

    fn record_error(&self, message: Option<String>) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = message;
        }
    }

    /// Run a command on the live connection.
    ///
    /// Transport failures drop the handle so the backend reports itself
    /// disconnected until the next `connect`.
    fn with_connection<T, F>(&self, command: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SessionError::invalid_state("redis connection lock poisoned"))?;
        let con = guard.as_mut().ok_or(SessionError::NotConnected)?;

        match f(con) {
            Ok(value) => Ok(value),
            Err(err) if is_transport_error(&err) => {
                tracing::warn!("redis {} failed, dropping connection: {}", command, err);
                *guard = None;
                self.record_error(Some(err.to_string()));
                Err(SessionError::NotConnected)
            }
            Err(err) => Err(SessionError::backend(format!("{} failed: {}", command, err))),
        }
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("database", &self.config.database)
            .field("prefix", &self.config.prefix)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl SessionBackend for RedisBackend {
    fn connect(&self) -> Result<()> {
        tracing::debug!(
            "connecting to redis at {}:{} (db {}, tls {})",
            self.config.host,
            self.config.port,
            self.config.database,
            self.config.tls.is_active()
        );

        let result = self.open_connection();

        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SessionError::invalid_state("redis connection lock poisoned"))?;

        match result {
            Ok(con) => {
                *guard = Some(con);
                self.record_error(None);
                tracing::info!("connected to redis at {}:{}", self.config.host, self.config.port);
                Ok(())
            }
            Err(err) => {
                *guard = None;
                self.record_error(Some(err.to_string()));
                tracing::warn!(
                    "redis connection to {}:{} failed: {}",
                    self.config.host,
                    self.config.port,
                    err
                );
                Err(err)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|last| last.clone())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = self.prefixed(key);
        self.with_connection("GET", |con| con.get::<_, Option<Vec<u8>>>(&key))
    }

    fn put(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<()> {
        let key = self.prefixed(key);
        self.with_connection("SETEX", |con| {
            con.set_ex::<_, _, ()>(&key, payload, ttl_seconds.max(1))
        })
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let key = self.prefixed(key);
        let removed = self.with_connection("DEL", |con| con.del::<_, usize>(&key))?;
        Ok(removed > 0)
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = self.key_pattern(pattern);
        let keys = self.with_connection("KEYS", |con| con.keys::<_, Vec<String>>(&pattern))?;
        Ok(keys.into_iter().map(|key| self.unprefixed(key)).collect())
    }

    fn server_info(&self) -> Result<Option<ServerInfo>> {
        let info = self.with_connection("INFO", |con| {
            redis::cmd("INFO").query::<redis::InfoDict>(con)
        })?;

        Ok(Some(ServerInfo {
            version: info.get("redis_version"),
            used_memory_bytes: info.get("used_memory"),
            connected_clients: info.get("connected_clients"),
        }))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Whether a command error means the connection itself is gone.
fn is_transport_error(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_timeout()
}

fn connect_error(err: &RedisError) -> SessionError {
    if is_missing_capability(err) {
        return SessionError::backend_unavailable(err.to_string());
    }
    SessionError::connection(classify_connect_error(err), err.to_string())
}

/// Whether the client was built without a feature the config needs.
fn is_missing_capability(err: &RedisError) -> bool {
    err.kind() == ErrorKind::InvalidClientConfig && err.to_string().contains("feature")
}

/// Escape Redis glob metacharacters so `text` matches only itself.
fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Map a client error raised while connecting to a failure kind.
pub(crate) fn classify_connect_error(err: &RedisError) -> ConnectFailure {
    let message = err.to_string().to_ascii_lowercase();

    if err.kind() == ErrorKind::InvalidClientConfig {
        return ConnectFailure::InvalidConfig;
    }
    if err.kind() == ErrorKind::AuthenticationFailed
        || message.contains("wrongpass")
        || message.contains("noauth")
        || message.contains("invalid password")
    {
        return ConnectFailure::AuthRejected;
    }
    if err.is_timeout() {
        return ConnectFailure::Timeout;
    }
    if message.contains("lookup address")
        || message.contains("name or service not known")
        || message.contains("nodename nor servname")
        || message.contains("no address found")
        || message.contains("no such host")
    {
        return ConnectFailure::Dns;
    }
    if err.is_connection_refusal() {
        return ConnectFailure::Refused;
    }
    if message.contains("tls") || message.contains("certificate") || message.contains("handshake") {
        return ConnectFailure::Tls;
    }
    if err.is_io_error() {
        return ConnectFailure::Io;
    }
    ConnectFailure::Other
}
