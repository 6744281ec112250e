//! Session and enablement state types for redsess.
//!
//! These types represent the decoded active session, the handler phase
//! tracked for diagnostics, and the persisted switch that routes sessions
//! through this store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FailOpen, Result, SessionError};
use crate::storage::OptionStore;

/// Entry stamped into a session this store started.
pub const OWNERSHIP_SENTINEL: &str = "redsess_handler";

/// Option key holding the persisted enablement flag.
pub const ENABLED_OPTION: &str = "redsess_sessions_enabled";

/// Session handler phase.
///
/// `Closed -> Open -> {Reading, Writing}* -> Closed`, with `Destroyed`
/// reachable from any open phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Closed,
    Open,
    Reading,
    Writing,
    Destroyed,
}

impl SessionPhase {
    /// Whether the handler has been opened and not yet closed.
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionPhase::Closed)
    }

    /// Whether reads and writes are expected in this phase.
    pub fn accepts_io(&self) -> bool {
        matches!(
            self,
            SessionPhase::Open | SessionPhase::Reading | SessionPhase::Writing
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Closed => "closed",
            SessionPhase::Open => "open",
            SessionPhase::Reading => "reading",
            SessionPhase::Writing => "writing",
            SessionPhase::Destroyed => "destroyed",
        }
    }
}

/// Decoded session payload.
///
/// A JSON object. The backend only ever sees the encoded bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData {
    values: Map<String, Value>,
}

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored payload.
    ///
    /// An empty payload is an empty session. A payload that is not a JSON
    /// object is logged and treated as empty.
    pub fn from_payload(payload: &[u8]) -> Self {
        if payload.is_empty() {
            return Self::default();
        }
        serde_json::from_slice::<Self>(payload)
            .map_err(SessionError::from)
            .fail_open_default("Failed to decode session payload")
    }

    /// Encode for storage.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether this session was started by this store.
    pub fn has_sentinel(&self) -> bool {
        self.values.get(OWNERSHIP_SENTINEL) == Some(&Value::Bool(true))
    }

    /// Mark this session as started by this store.
    pub fn stamp_sentinel(&mut self) {
        self.values
            .insert(OWNERSHIP_SENTINEL.to_string(), Value::Bool(true));
    }
}

/// Persisted enablement flag with an in-memory mirror.
///
/// The option store is the source of truth. The mirror only changes after
/// a write to the store succeeds.
pub struct Enablement {
    store: Arc<dyn OptionStore>,
    enabled: bool,
}

impl Enablement {
    /// Read the persisted flag once.
    ///
    /// An unreadable store reads as disabled.
    pub fn load(store: Arc<dyn OptionStore>) -> Self {
        let enabled = store
            .get_flag(ENABLED_OPTION)
            .fail_open_default("Failed to read enablement state");
        Self { store, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Persist a new value, then update the mirror.
    pub fn set(&mut self, enabled: bool) -> Result<()> {
        self.store.set_flag(ENABLED_OPTION, enabled)?;
        self.enabled = enabled;
        tracing::debug!("session enablement set to {}", enabled);
        Ok(())
    }

    /// Re-read the persisted flag into the mirror.
    pub fn reload(&mut self) -> Result<bool> {
        self.enabled = self.store.get_flag(ENABLED_OPTION)?;
        Ok(self.enabled)
    }
}

impl std::fmt::Debug for Enablement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enablement")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
