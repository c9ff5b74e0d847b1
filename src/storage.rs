//! File helpers shared by the configuration and ticket stores.

use std::fs;
use std::io::Write;
use std::path::Path;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AppError, Result};

/// Creates `dir` (and missing parents) readable by the owner only.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .map_err(|err| AppError::io("create directory", dir, err))
}

/// Writes `contents` to a sibling temp file and renames it over `path`, so a
/// reader sees either the previous file or the complete new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_private_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let written = write_private_file(&temp_path, contents)
        .and_then(|()| fs::rename(&temp_path, path).map_err(|err| AppError::io("rename", path, err)));
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

fn write_private_file(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .map_err(|err| AppError::io("open", path, err))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|err| AppError::io("write", path, err))
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &content)
}

/// Reads a JSON document. A missing file, unreadable file or malformed
/// content yields `None`; the latter two are logged.
pub fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Option<T> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("No {} at {}; using defaults", what, path.display());
            return None;
        }
        Err(err) => {
            warn!("Failed to read {} from {}: {}", what, path.display(), err);
            return None;
        }
    };

    match serde_json::from_slice(&content) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Ignoring malformed {} at {}: {}", what, path.display(), err);
            None
        }
    }
}
