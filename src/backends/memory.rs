//! In-memory session backend.
//!
//! Expiry is computed against an injectable [`Clock`], so tests can move
//! time forward without sleeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::backends::traits::{glob_match, SessionBackend};
use crate::error::{ConnectFailure, Result, SessionError};

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    /// Move the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    expires_at: DateTime<Utc>,
}

/// In-memory backend for tests and single-process use.
///
/// Starts disconnected; [`connect`](SessionBackend::connect) succeeds unless
/// the backend was built with [`MemoryBackend::unreachable`].
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    connected: AtomicBool,
    unreachable: Option<String>,
    last_error: Mutex<Option<String>>,
}

impl MemoryBackend {
    /// Create a backend on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a backend that computes expiry against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            connected: AtomicBool::new(false),
            unreachable: None,
            last_error: Mutex::new(None),
        }
    }

    /// Create a backend whose every connection attempt is refused.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            unreachable: Some(message.into()),
            ..Self::new()
        }
    }

    /// Drop the connection, as if the server went away.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Number of unexpired records.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .map(|entries| entries.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }

    /// Whether no unexpired records are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn record_error(&self, message: Option<String>) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = message;
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .field("unreachable", &self.unreachable)
            .finish_non_exhaustive()
    }
}

impl SessionBackend for MemoryBackend {
    fn connect(&self) -> Result<()> {
        if let Some(message) = &self.unreachable {
            self.connected.store(false, Ordering::SeqCst);
            self.record_error(Some(message.clone()));
            return Err(SessionError::connection(ConnectFailure::Refused, message.clone()));
        }

        self.connected.store(true, Ordering::SeqCst);
        self.record_error(None);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|last| last.clone())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_connected()?;
        let now = self.clock.now();
        let entries = self
            .entries
            .read()
            .map_err(|_| SessionError::invalid_state("memory backend lock poisoned"))?;

        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.payload.clone()))
    }

    fn put(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<()> {
        self.ensure_connected()?;
        let now = self.clock.now();
        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut entries = self
            .entries
            .write()
            .map_err(|_| SessionError::invalid_state("memory backend lock poisoned"))?;
        entries.insert(
            key.to_string(),
            Entry {
                payload: payload.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_connected()?;
        let now = self.clock.now();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SessionError::invalid_state("memory backend lock poisoned"))?;

        Ok(entries
            .remove(key)
            .is_some_and(|entry| entry.expires_at > now))
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.ensure_connected()?;
        let now = self.clock.now();
        let entries = self
            .entries
            .read()
            .map_err(|_| SessionError::invalid_state("memory backend lock poisoned"))?;

        Ok(entries
            .iter()
            .filter(|(key, entry)| entry.expires_at > now && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn gc(&self, _max_lifetime: u64) -> bool {
        let now = self.clock.now();
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| entry.expires_at > now);
        }
        true
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::traits::tests::test_backend_contract;

    fn connected_backend() -> (MemoryBackend, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let backend = MemoryBackend::with_clock(clock.clone());
        backend.connect().unwrap();
        (backend, clock)
    }

    #[test]
    fn test_memory_backend_contract() {
        let (backend, _clock) = connected_backend();
        test_backend_contract(&backend);
    }

    #[test]
    fn test_starts_disconnected() {
        let backend = MemoryBackend::new();
        assert!(!backend.is_connected());
        assert!(matches!(backend.get("k"), Err(SessionError::NotConnected)));
        assert!(matches!(backend.put("k", b"v", 10), Err(SessionError::NotConnected)));
        assert!(matches!(backend.delete("k"), Err(SessionError::NotConnected)));
        assert!(matches!(backend.keys("*"), Err(SessionError::NotConnected)));
    }

    #[test]
    fn test_unreachable_records_error() {
        let backend = MemoryBackend::unreachable("Connection refused");
        let err = backend.connect().unwrap_err();

        assert_eq!(err.connect_failure(), Some(ConnectFailure::Refused));
        assert!(!backend.is_connected());
        assert_eq!(backend.last_error().as_deref(), Some("Connection refused"));
    }

    #[test]
    fn test_successful_connect_clears_error() {
        let backend = MemoryBackend::new();
        backend.record_error(Some("old".to_string()));
        backend.connect().unwrap();
        assert!(backend.last_error().is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let (backend, clock) = connected_backend();
        backend.put("abc123", b"userid=7", 86_400).unwrap();

        clock.advance_secs(86_399);
        assert_eq!(backend.get("abc123").unwrap().as_deref(), Some(&b"userid=7"[..]));

        clock.advance_secs(1);
        assert!(backend.get("abc123").unwrap().is_none());
        assert!(backend.keys("*").unwrap().is_empty());
        assert!(!backend.delete("abc123").unwrap());
    }

    #[test]
    fn test_rewrite_extends_expiry() {
        let (backend, clock) = connected_backend();
        backend.put("k", b"v1", 10).unwrap();
        clock.advance_secs(8);
        backend.put("k", b"v2", 10).unwrap();
        clock.advance_secs(8);

        assert_eq!(backend.get("k").unwrap().as_deref(), Some(&b"v2"[..]));
    }

    #[test]
    fn test_gc_drops_expired_records() {
        let (backend, clock) = connected_backend();
        backend.put("short", b"a", 5).unwrap();
        backend.put("long", b"b", 500).unwrap();
        clock.advance_secs(10);

        assert!(backend.gc(1440));
        assert_eq!(backend.len(), 1);
        assert_eq!(backend.entries.read().unwrap().len(), 1);
    }

    #[test]
    fn test_disconnect() {
        let (backend, _clock) = connected_backend();
        backend.put("k", b"v", 10).unwrap();
        backend.disconnect();

        assert!(!backend.is_connected());
        assert!(matches!(backend.get("k"), Err(SessionError::NotConnected)));

        backend.connect().unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some(&b"v"[..]));
    }
}
