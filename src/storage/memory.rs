//! In-memory option storage for testing.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, SessionError};
use crate::storage::OptionStore;

/// In-memory option store.
///
/// Thread-safe implementation using `RwLock<HashMap>`. Options are lost when
/// the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    options: RwLock<HashMap<String, String>>,
}

impl MemoryOptionStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            options: RwLock::new(HashMap::new()),
        }
    }

    /// Number of options in the store.
    pub fn len(&self) -> usize {
        self.options.read().map(|o| o.len()).unwrap_or(0)
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OptionStore for MemoryOptionStore {
    fn get_option(&self, key: &str) -> Result<Option<String>> {
        let options = self
            .options
            .read()
            .map_err(|_| SessionError::invalid_state("option store lock poisoned"))?;
        Ok(options.get(key).cloned())
    }

    fn set_option(&self, key: &str, value: &str) -> Result<()> {
        let mut options = self
            .options
            .write()
            .map_err(|_| SessionError::invalid_state("option store lock poisoned"))?;
        options.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_option(&self, key: &str) -> Result<()> {
        let mut options = self
            .options
            .write()
            .map_err(|_| SessionError::invalid_state("option store lock poisoned"))?;
        options.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_option_store_crud;

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryOptionStore::new();
        test_option_store_crud(&store);
    }

    #[test]
    fn test_len_and_is_empty() {
        let store = MemoryOptionStore::default();
        assert!(store.is_empty());

        store.set_option("a", "1").unwrap();
        store.set_option("b", "2").unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_flag_reads_unknown_values_as_false() {
        let store = MemoryOptionStore::new();
        store.set_option("flag", "enabled-ish").unwrap();
        assert!(!store.get_flag("flag").unwrap());

        store.set_option("flag", "true").unwrap();
        assert!(store.get_flag("flag").unwrap());
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryOptionStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.set_option(&format!("opt{}", i), "x").unwrap();
                    store.get_option(&format!("opt{}", i)).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8);
    }
}
