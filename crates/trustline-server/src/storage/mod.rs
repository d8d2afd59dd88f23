//! Filesystem storage.
//!
//! - [`FsStore`]: per-peer directories holding the secret, counter and
//!   trust-line artifacts, with a write-ahead journal making each commit
//!   atomic
//! - [`ChainFile`]: flat file of fixed-size transaction records

mod chain_file;
mod peer_dir;

use std::{
    fs::{self, File},
    io::{self, Write},
    path::Path,
};

pub use chain_file::ChainFile;
pub use peer_dir::FsStore;
use trustline_core::StorageError;

/// Read a whole file, mapping "not found" to `None`.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Replace `path` with `bytes` so that readers see either the old or the new
/// content, never a mix: write a sibling temp file, flush it to disk, then
/// rename it over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = temp_path(path);

    let mut file = File::create(&tmp).map_err(|e| StorageError::io(&tmp, e))?;
    file.write_all(bytes).map_err(|e| StorageError::io(&tmp, e))?;
    file.sync_all().map_err(|e| StorageError::io(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

fn temp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Flush directory entries (renames, unlinks) to disk.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), StorageError> {
    File::open(dir).and_then(|d| d.sync_all()).map_err(|e| StorageError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), StorageError> {
    Ok(())
}
