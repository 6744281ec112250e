//! File-based option storage for redsess.
//!
//! Options are stored as a single JSON object in `~/.redsess/options.json`.
//! Every write rewrites the file atomically via temp file + rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::options_path;
use crate::error::{SessionError, Result};
use crate::storage::OptionStore;
use crate::util::{atomic_write, read_bytes_with_limit, MAX_OPTIONS_FILE_SIZE};

/// File-based option store.
#[derive(Debug)]
pub struct FileOptionStore {
    /// Path to the JSON options file.
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileOptionStore {
    /// Create a store at the default location.
    ///
    /// Uses `~/.redsess/options.json` or `$REDSESS_HOME/options.json`.
    pub fn new() -> Result<Self> {
        let path = options_path().ok_or_else(|| {
            SessionError::config("Could not determine options path (no home directory)")
        })?;
        Ok(Self::with_path(path))
    }

    /// Create a store backed by a specific file.
    ///
    /// The file and its directory are created on first write.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let bytes = read_bytes_with_limit(&self.path, MAX_OPTIONS_FILE_SIZE)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_all(&self, options: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(options)?;
        atomic_write(&self.path, &json)
    }
}

impl OptionStore for FileOptionStore {
    fn get_option(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_option(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SessionError::invalid_state("option store lock poisoned"))?;

        let mut options = self.read_all()?;
        options.insert(key.to_string(), value.to_string());
        self.write_all(&options)
    }

    fn delete_option(&self, key: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SessionError::invalid_state("option store lock poisoned"))?;

        let mut options = self.read_all()?;
        if options.remove(key).is_some() {
            self.write_all(&options)?;
        }
        Ok(())
    }
}
