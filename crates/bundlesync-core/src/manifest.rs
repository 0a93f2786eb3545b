//! The manifest correlating container objects with artifacts.
//!
//! Written once per extraction run to `<root>/manifest.json` and read once
//! per repack run. The on-disk shape is:
//!
//! ```json
//! {
//!     "original_bundle_path": "/abs/path/to/container",
//!     "assets": [
//!         {
//!             "path_id": 42,
//!             "type": "Texture2D",
//!             "name": "hero",
//!             "extracted_filename": "Textures/hero_42.png",
//!             "strategy": "image"
//!         }
//!     ]
//! }
//! ```
//!
//! `extracted_filename` is a relative path, `""` when nothing was produced,
//! or `"ERROR_EXTRACTING"` when extraction of the object failed. `strategy`
//! and `raw_source` are optional so that manifests without them still load.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Result;
use crate::SyncError;
use crate::classify::RawSource;
use crate::classify::Strategy;

/// File name of the manifest inside the artifact root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Sentinel stored in `extracted_filename` for objects that failed.
pub const FAILURE_SENTINEL: &str = "ERROR_EXTRACTING";

/// Artifact reference of a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactRef {
    /// Relative path of the produced artifact.
    Path(String),
    /// Extraction of the object failed.
    Failed,
    /// No artifact was produced.
    None,
}

impl ArtifactRef {
    /// Returns the relative path, if one was recorded.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Returns `true` for the failure sentinel.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl From<String> for ArtifactRef {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" => Self::None,
            FAILURE_SENTINEL => Self::Failed,
            _ => Self::Path(value),
        }
    }
}

impl From<ArtifactRef> for String {
    fn from(value: ArtifactRef) -> Self {
        match value {
            ArtifactRef::Path(path) => path,
            ArtifactRef::Failed => FAILURE_SENTINEL.to_string(),
            ArtifactRef::None => Self::new(),
        }
    }
}

/// Observable state of a manifest row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// An artifact was written.
    Extracted,
    /// Extraction was attempted and failed.
    Failed,
    /// Recorded without an artifact.
    Empty,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracted => write!(f, "extracted"),
            Self::Failed => write!(f, "failed"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Object identity.
    pub path_id: i64,

    /// Declared type, possibly carrying a raw-fallback marker.
    #[serde(rename = "type")]
    pub declared_type: String,

    /// Sanitized display name.
    pub name: String,

    /// Artifact path, failure sentinel or empty.
    #[serde(rename = "extracted_filename")]
    pub artifact: ArtifactRef,

    /// Extraction outcome that repack dispatches on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,

    /// Source of the bytes for raw strategies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_source: Option<RawSource>,
}

impl ManifestEntry {
    /// Creates a row for an extracted artifact.
    #[must_use]
    pub fn extracted(
        path_id: i64,
        declared_type: &str,
        name: String,
        relative_path: String,
        strategy: Strategy,
        raw_source: Option<RawSource>,
    ) -> Self {
        Self {
            path_id,
            declared_type: strategy.recorded_type(declared_type),
            name,
            artifact: ArtifactRef::Path(relative_path),
            strategy: Some(strategy),
            raw_source,
        }
    }

    /// Creates a failure-sentinel row.
    #[must_use]
    pub fn failed(path_id: i64, declared_type: &str, name: String) -> Self {
        Self {
            path_id,
            declared_type: declared_type.to_string(),
            name,
            artifact: ArtifactRef::Failed,
            strategy: None,
            raw_source: None,
        }
    }

    /// Strategy to repack this row with: the persisted tag, or one inferred
    /// from the recorded declared type.
    #[must_use]
    pub fn effective_strategy(&self) -> Option<Strategy> {
        self.strategy.or_else(|| Strategy::infer(&self.declared_type))
    }

    /// Observable state of this row.
    #[must_use]
    pub const fn status(&self) -> EntryStatus {
        match self.artifact {
            ArtifactRef::Path(_) => EntryStatus::Extracted,
            ArtifactRef::Failed => EntryStatus::Failed,
            ArtifactRef::None => EntryStatus::Empty,
        }
    }
}

/// The durable index of one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Absolute path of the container that was extracted.
    #[serde(rename = "original_bundle_path")]
    pub source_container: PathBuf,

    /// Rows in container enumeration order.
    #[serde(rename = "assets")]
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Creates an empty manifest for a container.
    #[must_use]
    pub fn new(source_container: PathBuf) -> Self {
        Self {
            source_container,
            entries: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    /// Looks up a row by identity.
    #[must_use]
    pub fn entry(&self, path_id: i64) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path_id == path_id)
    }

    /// Number of rows in the given state.
    #[must_use]
    pub fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status() == status).count()
    }

    /// Checks that identities are unique.
    ///
    /// # Errors
    ///
    /// Returns the first duplicated identity.
    pub fn check_unique(&self) -> std::result::Result<(), i64> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !seen.insert(entry.path_id) {
                return Err(entry.path_id);
            }
        }
        Ok(())
    }

    /// Location of the manifest inside an artifact root.
    #[must_use]
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(MANIFEST_FILE)
    }

    /// Serializes the manifest with the given indentation.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, indent: usize) -> Result<Vec<u8>> {
        let indent = vec![b' '; indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        Ok(out)
    }

    /// Writes `manifest.json` into `root`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, root: &Path, indent: usize) -> Result<PathBuf> {
        let path = Self::path_in(root);
        let json = self.to_json(indent)?;
        let mut file = fs::File::create(&path)?;
        file.write_all(&json)?;
        file.flush()?;
        Ok(path)
    }

    /// Loads `manifest.json` from `root`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ManifestNotFound` if the file does not exist and
    /// `SyncError::Manifest` if it cannot be parsed or repeats an identity.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path_in(root);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::ManifestNotFound { path });
            }
            Err(e) => return Err(e.into()),
        };

        let manifest: Self = serde_json::from_slice(&bytes).map_err(|e| SyncError::Manifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if let Err(path_id) = manifest.check_unique() {
            return Err(SyncError::Manifest {
                path,
                reason: format!("duplicate path_id {path_id}"),
            });
        }
        Ok(manifest)
    }
}
