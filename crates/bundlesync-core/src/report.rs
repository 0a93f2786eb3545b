//! Extraction and repack reporting.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::classify::Strategy;
use crate::manifest::Manifest;

/// Report of an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// The manifest written to the artifact root.
    pub manifest: Manifest,

    /// Location of the written manifest.
    pub manifest_path: PathBuf,

    /// Number of objects enumerated in the container.
    pub objects_total: usize,

    /// Number of artifacts written, by strategy.
    pub artifacts_by_strategy: BTreeMap<String, usize>,

    /// Number of objects that produced the failure sentinel.
    pub objects_failed: usize,

    /// Number of objects skipped without a manifest row.
    pub objects_skipped: usize,

    /// Total artifact bytes written to disk.
    pub bytes_written: u64,

    /// Duration of the run.
    pub duration: Duration,

    /// Warnings generated during extraction.
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    /// Creates an empty report around a fresh manifest.
    #[must_use]
    pub fn new(manifest: Manifest, manifest_path: PathBuf) -> Self {
        Self {
            manifest,
            manifest_path,
            objects_total: 0,
            artifacts_by_strategy: BTreeMap::new(),
            objects_failed: 0,
            objects_skipped: 0,
            bytes_written: 0,
            duration: Duration::ZERO,
            warnings: Vec::new(),
        }
    }

    /// Records one written artifact.
    pub fn record_artifact(&mut self, strategy: Strategy, bytes: u64) {
        *self
            .artifacts_by_strategy
            .entry(strategy.to_string())
            .or_insert(0) += 1;
        self.bytes_written += bytes;
    }

    /// Total number of artifacts written.
    #[must_use]
    pub fn artifacts_written(&self) -> usize {
        self.artifacts_by_strategy.values().sum()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Report of a repack run.
#[derive(Debug, Clone, Default)]
pub struct RepackReport {
    /// Destination the container was written to.
    pub output_path: PathBuf,

    /// Number of manifest entries processed.
    pub entries_total: usize,

    /// Number of objects modified from artifacts.
    pub modified: usize,

    /// Number of entries skipped (failed extraction, missing artifact,
    /// stale reference, unsupported type, no compatible field).
    pub skipped: usize,

    /// Number of entries whose update raised an error.
    pub failed: usize,

    /// Size of the serialized container.
    pub bytes_written: u64,

    /// Duration of the run.
    pub duration: Duration,

    /// Warnings generated during repack.
    pub warnings: Vec<String>,
}

impl RepackReport {
    /// Creates a new empty repack report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Callback trait for progress reporting during extraction and repack.
///
/// # Examples
///
/// ```
/// use bundlesync_core::ProgressCallback;
///
/// struct SimpleProgress;
///
/// impl ProgressCallback for SimpleProgress {
///     fn on_object_start(&mut self, path_id: i64, total: usize, current: usize) {
///         println!("Processing {current}/{total}: {path_id}");
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_object_complete(&mut self, path_id: i64) {
///         println!("Completed: {path_id}");
///     }
///
///     fn on_complete(&mut self) {
///         println!("Operation complete");
///     }
/// }
/// ```
pub trait ProgressCallback {
    /// Called when starting to process an object or manifest entry.
    ///
    /// # Arguments
    ///
    /// * `path_id` - Identity of the object
    /// * `total` - Total number of objects or entries
    /// * `current` - Current position (1-indexed)
    fn on_object_start(&mut self, path_id: i64, total: usize, current: usize);

    /// Called when artifact or container bytes are written.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called when an object or entry has been processed, whatever the
    /// outcome.
    fn on_object_complete(&mut self, path_id: i64);

    /// Called when the entire operation is complete.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_object_start(&mut self, _path_id: i64, _total: usize, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_object_complete(&mut self, _path_id: i64) {}

    fn on_complete(&mut self) {}
}
