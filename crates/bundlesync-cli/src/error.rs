//! Error conversion utilities for CLI.
//!
//! Converts bundlesync-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use bundlesync_core::SyncError;
use std::path::Path;

/// Converts `SyncError` to a user-friendly anyhow error. `input` is the
/// container or artifact directory the command was run on.
pub fn convert_sync_error(err: SyncError, input: &Path) -> anyhow::Error {
    match err {
        SyncError::ContainerLoad { path, reason } => {
            anyhow!(
                "Cannot load container '{}': {}\n\
                 HINT: Only bundlesync snapshot containers can be read by this build.",
                path.display(),
                reason
            )
        }
        SyncError::ManifestNotFound { path } => {
            anyhow!(
                "No manifest found at '{}'\n\
                 HINT: Run `bundlesync extract <CONTAINER> {}` first.",
                path.display(),
                input.display()
            )
        }
        SyncError::Manifest { path, reason } => {
            anyhow!(
                "Invalid manifest '{}': {}\n\
                 HINT: Re-run extraction to regenerate the manifest, or use --keep-manifest \
                 only when the directory should not be overwritten.",
                path.display(),
                reason
            )
        }
        SyncError::SourceMissing { path } => {
            anyhow!(
                "Original container '{}' recorded in the manifest no longer exists\n\
                 HINT: Restore the container at that path or re-extract from its new location.",
                path.display()
            )
        }
        SyncError::Io(io_err) => {
            anyhow!("I/O error while processing '{}': {}", input.display(), io_err)
        }
        _ => anyhow::Error::from(err).context(format!("Error processing '{}'", input.display())),
    }
}

/// Adds context to a core result.
pub fn add_sync_context<T>(result: Result<T, SyncError>, input: &Path) -> anyhow::Result<T> {
    result.map_err(|e| convert_sync_error(e, input))
}
