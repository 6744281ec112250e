//! Session backend trait for redsess.
//!
//! A backend is an expiring key-value store. Payloads are opaque bytes; the
//! backend owns every session record and its expiry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Server metadata reported by backends that can provide it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server version string.
    pub version: Option<String>,
    /// Memory in use, in bytes.
    pub used_memory_bytes: Option<u64>,
    /// Number of connected clients.
    pub connected_clients: Option<u64>,
}

impl ServerInfo {
    /// Used memory in megabytes, rounded to two decimals.
    pub fn used_memory_mb(&self) -> Option<f64> {
        self.used_memory_bytes
            .map(|bytes| (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0)
    }
}

/// Trait for expiring key-value session backends.
///
/// All operations are synchronous. Absence of a key is a normal return
/// value, never an error. Operations on a backend without a live connection
/// return `SessionError::NotConnected`.
pub trait SessionBackend: Send + Sync {
    /// Establish the connection.
    ///
    /// Records the connected flag and, on failure, the error message
    /// returned by [`last_error`](Self::last_error).
    fn connect(&self) -> Result<()>;

    /// Whether a live connection is held.
    fn is_connected(&self) -> bool;

    /// Message from the most recent failed connection attempt.
    fn last_error(&self) -> Option<String>;

    /// Fetch a payload.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a payload that expires after `ttl_seconds`.
    ///
    /// Overwrites any existing value.
    fn put(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<()>;

    /// Delete a key.
    ///
    /// Returns `true` only when a record existed and was removed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// List keys matching a glob pattern.
    ///
    /// O(n) over the keyspace; diagnostics only.
    fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Reclaim expired sessions.
    ///
    /// Backends with native expiry have nothing to do.
    fn gc(&self, _max_lifetime: u64) -> bool {
        true
    }

    /// Server metadata, when the backend exposes any.
    fn server_info(&self) -> Result<Option<ServerInfo>> {
        Ok(None)
    }

    /// Backend name for logging and status output.
    fn name(&self) -> &'static str;
}

/// Blanket implementation for Arc-wrapped backends.
///
/// Lets a test keep a handle on the backend it hands to the service.
impl<T: SessionBackend + ?Sized> SessionBackend for Arc<T> {
    fn connect(&self) -> Result<()> {
        (**self).connect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn last_error(&self) -> Option<String> {
        (**self).last_error()
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<()> {
        (**self).put(key, payload, ttl_seconds)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        (**self).keys(pattern)
    }

    fn gc(&self, max_lifetime: u64) -> bool {
        (**self).gc(max_lifetime)
    }

    fn server_info(&self) -> Result<Option<ServerInfo>> {
        (**self).server_info()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Blanket implementation for boxed trait objects.
impl SessionBackend for Box<dyn SessionBackend> {
    fn connect(&self) -> Result<()> {
        (**self).connect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn last_error(&self) -> Option<String> {
        (**self).last_error()
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<()> {
        (**self).put(key, payload, ttl_seconds)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        (**self).keys(pattern)
    }

    fn gc(&self, max_lifetime: u64) -> bool {
        (**self).gc(max_lifetime)
    }

    fn server_info(&self) -> Result<Option<ServerInfo>> {
        (**self).server_info()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Glob matching for `keys` patterns: `*`, `?`, and `\` escapes.
///
/// Character classes are not supported.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some('\\') if p + 1 < pattern.len() && pattern[p + 1] == text[t] => {
                p += 2;
                t += 1;
            }
            Some(&c) if c != '\\' && c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    while pattern.get(p) == Some(&'*') {
        p += 1;
    }
    p == pattern.len()
}

/// Test utilities for SessionBackend implementations.
#[cfg(test)]
pub mod tests {
    use super::*;

    /// Exercise the backend contract against a connected backend.
    pub fn test_backend_contract<B: SessionBackend>(backend: &B) {
        assert!(backend.is_connected());

        // Absent keys are not errors
        assert!(backend.get("missing").unwrap().is_none());
        assert!(!backend.delete("missing").unwrap());

        backend.put("abc123", b"userid=7", 86_400).unwrap();
        assert_eq!(backend.get("abc123").unwrap().as_deref(), Some(&b"userid=7"[..]));

        // Last writer wins
        backend.put("abc123", b"userid=8", 86_400).unwrap();
        assert_eq!(backend.get("abc123").unwrap().as_deref(), Some(&b"userid=8"[..]));

        backend.put("other", b"", 60).unwrap();
        let mut keys = backend.keys("*").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["abc123".to_string(), "other".to_string()]);
        assert_eq!(backend.keys("abc*").unwrap(), vec!["abc123".to_string()]);

        assert!(backend.delete("abc123").unwrap());
        assert!(backend.get("abc123").unwrap().is_none());
        assert!(!backend.delete("abc123").unwrap());

        assert!(backend.gc(1440));
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", ""));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("abc*", "abc123"));
        assert!(!glob_match("abc*", "xabc"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("*123", "abc123"));
        assert!(glob_match("a*b*c", "a-x-b-y-c"));
        assert!(!glob_match("a*b*c", "a-x-c"));
        assert!(glob_match("a\\*", "a*"));
        assert!(!glob_match("a\\*", "ab"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
    }

    #[test]
    fn test_used_memory_mb() {
        let info = ServerInfo {
            used_memory_bytes: Some(1_572_864),
            ..Default::default()
        };
        assert_eq!(info.used_memory_mb(), Some(1.5));
        assert_eq!(ServerInfo::default().used_memory_mb(), None);
    }
}
