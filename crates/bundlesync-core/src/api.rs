//! High-level public API for extraction and repack.
//!
//! These functions use the built-in [`SnapshotBackend`] and [`PngCodec`].
//! Embedders with their own container parser use
//! [`Extractor`](crate::extraction::Extractor) and
//! [`Repacker`](crate::repack::Repacker) directly.

use std::path::Path;

use crate::ExtractionReport;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::RepackReport;
use crate::Result;
use crate::SyncConfig;
use crate::container::SnapshotBackend;
use crate::extraction::Extractor;
use crate::image::PngCodec;
use crate::manifest::Manifest;
use crate::repack::Repacker;

/// Extracts a container into an artifact tree with a manifest.
///
/// # Arguments
///
/// * `container_path` - Path to the container file
/// * `output_dir` - Artifact root; created if missing
/// * `config` - Run configuration
///
/// # Errors
///
/// Returns an error if:
/// - The container cannot be opened
/// - The artifact tree or manifest cannot be written
///
/// Per-object failures are recorded in the manifest instead.
///
/// # Examples
///
/// ```no_run
/// use bundlesync_core::SyncConfig;
/// use bundlesync_core::extract_bundle;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = extract_bundle("level.bundle", "/tmp/level", &SyncConfig::default())?;
/// println!("Extracted {} artifacts", report.artifacts_written());
/// # Ok(())
/// # }
/// ```
pub fn extract_bundle<P: AsRef<Path>, Q: AsRef<Path>>(
    container_path: P,
    output_dir: Q,
    config: &SyncConfig,
) -> Result<ExtractionReport> {
    let mut progress = NoopProgress;
    extract_bundle_with_progress(container_path, output_dir, config, &mut progress)
}

/// Extracts a container with progress reporting.
///
/// # Errors
///
/// Same as [`extract_bundle`].
pub fn extract_bundle_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
    container_path: P,
    output_dir: Q,
    config: &SyncConfig,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    let backend = SnapshotBackend;
    let codec = PngCodec::default();
    Extractor::new(&backend, &codec, config.clone()).extract(
        container_path.as_ref(),
        output_dir.as_ref(),
        progress,
    )
}

/// Repacks an edited artifact tree into a new container.
///
/// # Arguments
///
/// * `artifact_root` - Directory holding `manifest.json`
/// * `destination` - Path of the container to write
/// * `config` - Run configuration
///
/// # Errors
///
/// Returns an error if:
/// - The manifest is missing or corrupt
/// - The container recorded in the manifest is gone or unreadable
/// - The destination cannot be written
///
/// # Examples
///
/// ```no_run
/// use bundlesync_core::SyncConfig;
/// use bundlesync_core::repack_bundle;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = repack_bundle("/tmp/level", "level_modded.bundle", &SyncConfig::default())?;
/// println!("Modified {} objects", report.modified);
/// # Ok(())
/// # }
/// ```
pub fn repack_bundle<P: AsRef<Path>, Q: AsRef<Path>>(
    artifact_root: P,
    destination: Q,
    config: &SyncConfig,
) -> Result<RepackReport> {
    let mut progress = NoopProgress;
    repack_bundle_with_progress(artifact_root, destination, config, &mut progress)
}

/// Repacks an artifact tree with progress reporting.
///
/// # Errors
///
/// Same as [`repack_bundle`].
pub fn repack_bundle_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
    artifact_root: P,
    destination: Q,
    config: &SyncConfig,
    progress: &mut dyn ProgressCallback,
) -> Result<RepackReport> {
    let backend = SnapshotBackend;
    let codec = PngCodec::default();
    Repacker::new(&backend, &codec, config.clone()).repack(
        artifact_root.as_ref(),
        destination.as_ref(),
        progress,
    )
}

/// Loads the manifest of an artifact tree without touching the container.
///
/// # Errors
///
/// Returns an error if the manifest is missing or corrupt.
pub fn read_manifest<P: AsRef<Path>>(artifact_root: P) -> Result<Manifest> {
    Manifest::load(artifact_root.as_ref())
}
