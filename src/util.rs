//! File helpers shared by the option store, config, and TLS setup.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{SessionError, Result};

/// Maximum size of a CA bundle we are willing to load (1 MB).
pub const MAX_CA_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum size of the persisted options file (1 MB).
pub const MAX_OPTIONS_FILE_SIZE: u64 = 1024 * 1024;

/// Read a file into memory, refusing anything larger than `max_size` bytes.
///
/// # Errors
///
/// Returns a storage error if the file cannot be read, or a config error if
/// it exceeds `max_size`.
pub fn read_bytes_with_limit(path: &Path, max_size: u64) -> Result<Vec<u8>> {
    let metadata = fs::metadata(path).map_err(|e| SessionError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(SessionError::config(format!(
            "File {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            max_size
        )));
    }

    fs::read(path).map_err(|e| SessionError::storage(path, e))
}

/// Write `contents` to `path` atomically via a sibling temp file + rename.
///
/// Creates the parent directory if needed.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| SessionError::config(format!("{} has no parent", path.display())))?;
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| SessionError::storage(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.tmp", file_name));

    {
        let mut file =
            fs::File::create(&temp_path).map_err(|e| SessionError::storage(&temp_path, e))?;
        file.write_all(contents)
            .map_err(|e| SessionError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| SessionError::storage(&temp_path, e))?;
    }

    // Rename is atomic on POSIX
    fs::rename(&temp_path, path).map_err(|e| SessionError::storage(path, e))?;

    Ok(())
}
