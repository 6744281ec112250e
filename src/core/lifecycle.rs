//! Session lifecycle manager for redsess.
//!
//! The host's session subsystem drives a [`SessionHandler`] through
//! open/read/write/close. [`SessionManager`] implements it over a
//! [`SessionBackend`] and adds the request-context operations used by the
//! admin surface: starting an active session, stamping the ownership
//! sentinel, and switching routing on and off.
//!
//! None of the handler calls fail. An unreachable backend reads as an empty
//! payload and makes writes report `false`.

use crate::backends::SessionBackend;
use crate::config::Config;
use crate::core::cookie::CookieParams;
use crate::core::state::{Enablement, SessionData, SessionPhase};
use crate::error::{Result, SessionError};

/// The fixed callback interface a host session subsystem invokes.
pub trait SessionHandler {
    /// Open the store. Returns whether the backend is connected.
    fn open(&mut self, save_path: &str, session_name: &str) -> bool;

    /// Close the store. Always succeeds.
    fn close(&mut self) -> bool;

    /// Read a payload; empty when absent or unavailable.
    fn read(&mut self, key: &str) -> Vec<u8>;

    /// Store a payload with the configured TTL.
    fn write(&mut self, key: &str, payload: &[u8]) -> bool;

    /// Delete a session. Returns whether a record was removed.
    fn destroy(&mut self, key: &str) -> bool;

    /// Reclaim expired sessions.
    fn gc(&mut self, max_lifetime: u64) -> bool;
}

#[derive(Debug)]
struct ActiveSession {
    key: String,
    data: SessionData,
}

/// Session handler plus request-context lifecycle control.
///
/// Holds at most one active session: the decoded payload the current
/// request is working on.
#[derive(Debug)]
pub struct SessionManager<B: SessionBackend> {
    backend: B,
    enablement: Enablement,
    ttl_seconds: u64,
    session_name: String,
    cookie: CookieParams,
    phase: SessionPhase,
    installed: bool,
    active: Option<ActiveSession>,
}

impl<B: SessionBackend> SessionManager<B> {
    pub fn new(backend: B, enablement: Enablement, config: &Config) -> Self {
        Self {
            backend,
            enablement,
            ttl_seconds: config.session.ttl_seconds,
            session_name: config.session.name.clone(),
            cookie: config.cookie.clone(),
            phase: SessionPhase::Closed,
            installed: false,
            active: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn enablement(&self) -> &Enablement {
        &self.enablement
    }

    pub fn is_enabled(&self) -> bool {
        self.enablement.is_enabled()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Cookie parameters to hand to the host's cookie setter.
    pub fn cookie_params(&self) -> &CookieParams {
        &self.cookie
    }

    /// Whether sessions are currently routed through this store.
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Route sessions through this store.
    ///
    /// Requires a connected backend.
    pub fn install(&mut self) -> bool {
        if !self.backend.is_connected() {
            tracing::warn!("not installing session handler: backend not connected");
            return false;
        }
        if !self.installed {
            tracing::info!("session handler installed ({} backend)", self.backend.name());
        }
        self.installed = true;
        true
    }

    /// Stop routing sessions through this store.
    pub fn uninstall(&mut self) {
        if self.installed {
            tracing::info!("session handler uninstalled");
        }
        self.installed = false;
    }

    /// Open the session stored under `key` as the active session.
    ///
    /// # Errors
    ///
    /// Fails if a session is already active or the backend is not connected.
    pub fn start(&mut self, key: &str) -> Result<&mut SessionData> {
        if let Some(active) = &self.active {
            return Err(SessionError::invalid_state(format!(
                "session {} is already active",
                active.key
            )));
        }

        let name = self.session_name.clone();
        if !self.open("", &name) {
            return Err(SessionError::NotConnected);
        }

        let payload = self.read(key);
        let active = self.active.insert(ActiveSession {
            key: key.to_string(),
            data: SessionData::from_payload(&payload),
        });
        Ok(&mut active.data)
    }

    pub fn active(&self) -> Option<&SessionData> {
        self.active.as_ref().map(|active| &active.data)
    }

    pub fn active_mut(&mut self) -> Option<&mut SessionData> {
        self.active.as_mut().map(|active| &mut active.data)
    }

    pub fn active_key(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.key.as_str())
    }

    /// Write the active session without closing it.
    ///
    /// Returns whether the backend accepted the write.
    pub fn flush(&mut self) -> Result<bool> {
        let (key, payload) = match &self.active {
            Some(active) => (active.key.clone(), active.data.to_payload()?),
            None => return Err(SessionError::invalid_state("no active session to flush")),
        };
        Ok(self.write(&key, &payload))
    }

    /// Write and close the active session.
    pub fn commit(&mut self) -> Result<bool> {
        let written = self.flush()?;
        self.active = None;
        self.close();
        Ok(written)
    }

    /// Take over session handling and start a session under `key`.
    ///
    /// Returns `Ok(false)` without side effects when a session is already
    /// active in this context or the backend is not connected. Otherwise the
    /// started session is stamped with the ownership sentinel and written;
    /// the enablement flag is persisted only once that write succeeds.
    pub fn enable(&mut self, key: &str) -> Result<bool> {
        if self.active.is_some() {
            tracing::debug!("enable skipped: a session is already active");
            return Ok(false);
        }
        if !self.install() {
            return Ok(false);
        }

        self.start(key)?.stamp_sentinel();
        if !self.flush()? {
            tracing::warn!("enable: initial write of session {} failed", key);
            self.active = None;
            self.close();
            self.uninstall();
            return Ok(false);
        }

        self.enablement.set(true)?;
        tracing::info!("redis sessions enabled");
        Ok(true)
    }

    /// Stop handling sessions.
    ///
    /// Destroys the active session, if any. Data in it is not migrated.
    pub fn disable(&mut self) -> Result<bool> {
        if let Some(active) = self.active.take() {
            self.destroy(&active.key);
            self.close();
        }
        self.uninstall();

        self.enablement.set(false)?;
        tracing::info!("redis sessions disabled");
        Ok(true)
    }

    /// Whether the active session was started by this store.
    pub fn is_serving_active_session(&self) -> bool {
        self.active().is_some_and(SessionData::has_sentinel)
    }

    fn enter(&mut self, next: SessionPhase, call: &str) {
        let expected = match next {
            SessionPhase::Open => !self.phase.is_open(),
            SessionPhase::Reading | SessionPhase::Writing | SessionPhase::Destroyed => {
                self.phase.accepts_io()
            }
            SessionPhase::Closed => true,
        };
        if !expected {
            tracing::debug!("{} called in {} phase", call, self.phase.as_str());
        }
        self.phase = next;
    }
}

impl<B: SessionBackend> SessionHandler for SessionManager<B> {
    fn open(&mut self, _save_path: &str, _session_name: &str) -> bool {
        if !self.backend.is_connected() {
            return false;
        }
        self.enter(SessionPhase::Open, "open");
        true
    }

    fn close(&mut self) -> bool {
        self.enter(SessionPhase::Closed, "close");
        true
    }

    fn read(&mut self, key: &str) -> Vec<u8> {
        self.enter(SessionPhase::Reading, "read");
        match self.backend.get(key) {
            Ok(payload) => payload.unwrap_or_default(),
            Err(err) => {
                if !err.is_unreachable() {
                    tracing::warn!("session read for {} failed: {}", key, err);
                }
                Vec::new()
            }
        }
    }

    fn write(&mut self, key: &str, payload: &[u8]) -> bool {
        self.enter(SessionPhase::Writing, "write");
        match self.backend.put(key, payload, self.ttl_seconds) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("session write for {} failed: {}", key, err);
                false
            }
        }
    }

    fn destroy(&mut self, key: &str) -> bool {
        self.enter(SessionPhase::Destroyed, "destroy");
        match self.backend.delete(key) {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!("session destroy for {} failed: {}", key, err);
                false
            }
        }
    }

    fn gc(&mut self, max_lifetime: u64) -> bool {
        self.backend.gc(max_lifetime)
    }
}
