//! Validated relative artifact path.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::SyncError;

/// A manifest-relative artifact path that cannot escape the artifact root.
///
/// Manifests are hand-editable, so every `extracted_filename` is validated
/// before repack touches the filesystem. Only plain components are accepted:
/// no `..`, no root, no drive prefix, no null bytes.
///
/// # Examples
///
/// ```
/// use bundlesync_core::types::ArtifactPath;
/// use std::path::Path;
///
/// let ok = ArtifactPath::validate("Textures/hero_1.png").unwrap();
/// assert_eq!(ok.resolve(Path::new("/out")), Path::new("/out/Textures/hero_1.png"));
///
/// assert!(ArtifactPath::validate("../secrets.txt").is_err());
/// assert!(ArtifactPath::validate("/etc/passwd").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPath(PathBuf);

impl ArtifactPath {
    /// Validates a manifest path.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::UnsafeArtifactPath` for empty, absolute or
    /// traversing paths.
    pub fn validate(raw: &str) -> Result<Self> {
        let unsafe_path = || SyncError::UnsafeArtifactPath {
            path: PathBuf::from(raw),
        };

        if raw.is_empty() || raw.contains('\0') {
            return Err(unsafe_path());
        }

        // Manifests written on Windows may carry backslashes.
        let normalized = raw.replace('\\', "/");
        let mut path = PathBuf::new();
        for component in Path::new(&normalized).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(unsafe_path());
                }
            }
        }

        if path.as_os_str().is_empty() {
            return Err(unsafe_path());
        }
        Ok(Self(path))
    }

    /// Joins the path onto an artifact root.
    #[must_use]
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }

    /// Returns the validated relative path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}
