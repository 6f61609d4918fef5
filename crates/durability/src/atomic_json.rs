//! Atomic whole-document JSON rewrite: temp file, fsync, rename.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure writing or reading a durable log document.
#[derive(Debug, Error)]
pub enum DurabilityError {
    /// The document failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rewrite `path` to hold `value` as its sole JSON contents, via a temp
/// file in the same directory, an `fsync`, then an atomic rename. Any stale
/// temp file left behind by a prior failed attempt is removed first. On
/// failure at any step the temp file is cleaned up and the original `path`
/// is left untouched.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), DurabilityError> {
    let temp_path = path.with_extension("tmp");

    if temp_path.exists() {
        warn!(path = %temp_path.display(), "removing stale temp file");
        let _ = std::fs::remove_file(&temp_path);
    }

    debug!(final_path = %path.display(), temp_path = %temp_path.display(), "writing durable log");

    let result = (|| -> Result<(), DurabilityError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(&temp_path)?;
        let bytes = serde_json::to_vec(value)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    })();

    match result {
        Ok(()) => match std::fs::rename(&temp_path, path) {
            Ok(()) => {
                debug!(path = %path.display(), "durable log rewrite complete");
                Ok(())
            }
            Err(e) => {
                warn!(temp_path = %temp_path.display(), error = %e, "rename failed, cleaning up temp file");
                let _ = std::fs::remove_file(&temp_path);
                Err(DurabilityError::Io(e))
            }
        },
        Err(e) => {
            warn!(temp_path = %temp_path.display(), "write failed, cleaning up temp file");
            let _ = std::fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

/// Read and parse `path` as JSON, returning `None` if it does not exist yet
/// (a fresh RM/TM with no prior durable state).
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DurabilityError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}
