//! Run configuration for extraction and repack.

/// Configuration shared by the extractor and the repacker.
///
/// # Examples
///
/// ```
/// use bundlesync_core::SyncConfig;
///
/// let config = SyncConfig {
///     max_artifact_size: 64 * 1024 * 1024, // 64 MB
///     ..Default::default()
/// };
/// assert_eq!(config.json_indent, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Indentation width for the manifest and field-tree JSON artifacts.
    pub json_indent: usize,

    /// Maximum size of a single artifact read back during repack, in bytes.
    pub max_artifact_size: u64,

    /// Create the parent directory of the repack destination if missing.
    pub create_parent_dirs: bool,

    /// Replace an existing manifest in the artifact root on extraction.
    pub overwrite_manifest: bool,
}

impl Default for SyncConfig {
    /// Default values:
    /// - `json_indent`: 4
    /// - `max_artifact_size`: 512 MB
    /// - `create_parent_dirs`: true
    /// - `overwrite_manifest`: true
    fn default() -> Self {
        Self {
            json_indent: 4,
            max_artifact_size: 512 * 1024 * 1024, // 512 MB
            create_parent_dirs: true,
            overwrite_manifest: true,
        }
    }
}

impl SyncConfig {
    /// Returns `true` if an artifact of `size` bytes may be read back.
    #[must_use]
    pub const fn is_size_allowed(&self, size: u64) -> bool {
        size <= self.max_artifact_size
    }
}
