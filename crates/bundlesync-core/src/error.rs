//! Error types for bundle extraction and repack operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while extracting or repacking a container.
///
/// Container- and manifest-level errors abort a run (see
/// [`SyncError::is_fatal`]). Everything else is scoped to a single object or
/// manifest entry and is caught by the engines, which turn it into a warning,
/// a failure-sentinel row or a skipped entry.
#[derive(Error, Debug)]
pub enum SyncError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The container could not be opened (format mismatch or corruption).
    #[error("failed to load container {path}: {reason}")]
    ContainerLoad {
        /// Path of the container that failed to load.
        path: PathBuf,
        /// Backend-provided failure description.
        reason: String,
    },

    /// No manifest exists in the artifact directory.
    #[error("manifest not found: {path}")]
    ManifestNotFound {
        /// Expected manifest location.
        path: PathBuf,
    },

    /// The manifest exists but cannot be parsed.
    #[error("invalid manifest {path}: {reason}")]
    Manifest {
        /// Manifest location.
        path: PathBuf,
        /// Parse failure description.
        reason: String,
    },

    /// The original container recorded in the manifest no longer resolves.
    #[error("original container not found: {path}")]
    SourceMissing {
        /// Container path recorded in the manifest.
        path: PathBuf,
    },

    /// A manifest entry refers to an object absent from the container.
    #[error("object {path_id} not present in container")]
    StaleReference {
        /// Identity that failed to resolve.
        path_id: i64,
    },

    /// An object's payload could not be decoded or encoded.
    #[error("payload decode failed for {path_id}: {reason}")]
    PayloadDecode {
        /// Identity of the affected object.
        path_id: i64,
        /// Failure description.
        reason: String,
    },

    /// No compatible raw-byte field exists on the object.
    #[error("object {path_id} has no writable field '{field}'")]
    FieldAbsent {
        /// Identity of the affected object.
        path_id: i64,
        /// Name of the missing field.
        field: String,
    },

    /// A field tree does not match the object's schema.
    #[error("field tree does not match schema of object {path_id}: {reason}")]
    SchemaMismatch {
        /// Identity of the affected object.
        path_id: i64,
        /// Mismatch description.
        reason: String,
    },

    /// Image bytes could not be encoded or decoded.
    #[error("image codec error: {0}")]
    ImageCodec(String),

    /// An artifact path from the manifest escapes the artifact root.
    #[error("unsafe artifact path: {path}")]
    UnsafeArtifactPath {
        /// The rejected path.
        path: PathBuf,
    },

    /// An artifact exceeds the configured size limit.
    #[error("artifact {path} is {size} bytes, limit is {max}")]
    ArtifactTooLarge {
        /// Artifact location.
        path: PathBuf,
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        max: u64,
    },
}

impl SyncError {
    /// Returns `true` if this error aborts the whole run.
    ///
    /// # Examples
    ///
    /// ```
    /// use bundlesync_core::SyncError;
    /// use std::path::PathBuf;
    ///
    /// let err = SyncError::ManifestNotFound {
    ///     path: PathBuf::from("out/manifest.json"),
    /// };
    /// assert!(err.is_fatal());
    ///
    /// let err = SyncError::StaleReference { path_id: 7 };
    /// assert!(!err.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ContainerLoad { .. }
                | Self::ManifestNotFound { .. }
                | Self::Manifest { .. }
                | Self::SourceMissing { .. }
        )
    }

    /// Returns `true` if this error is scoped to a single object or entry.
    ///
    /// Recoverable errors are logged and the run continues with the next
    /// object.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::StaleReference { .. }
                | Self::PayloadDecode { .. }
                | Self::FieldAbsent { .. }
                | Self::SchemaMismatch { .. }
                | Self::ImageCodec(_)
                | Self::UnsafeArtifactPath { .. }
                | Self::ArtifactTooLarge { .. }
        )
    }

    /// Returns the object identity this error refers to, if any.
    #[must_use]
    pub const fn path_id(&self) -> Option<i64> {
        match self {
            Self::StaleReference { path_id }
            | Self::PayloadDecode { path_id, .. }
            | Self::FieldAbsent { path_id, .. }
            | Self::SchemaMismatch { path_id, .. } => Some(*path_id),
            _ => None,
        }
    }

    pub(crate) fn decode(path_id: i64, reason: impl Into<String>) -> Self {
        Self::PayloadDecode {
            path_id,
            reason: reason.into(),
        }
    }
}
