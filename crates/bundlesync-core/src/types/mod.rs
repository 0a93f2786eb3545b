//! Validated wrapper types.
//!
//! Values read from hand-editable files are validated upon construction and
//! cannot be created from raw types without going through validation.

pub mod artifact_path;

pub use artifact_path::ArtifactPath;
