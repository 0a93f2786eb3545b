//! Artifact tree writer.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::classify::ALL_SUBDIRS;

/// A file written under the artifact root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    /// Path relative to the artifact root, always `/`-separated.
    pub relative_path: String,
    /// Number of bytes on disk.
    pub bytes: u64,
}

/// Writes artifact files into the kind subdirectories of one root.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    /// Prepares `root` and every kind subdirectory, used or not.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn create(root: &Path) -> Result<Self> {
        for subdir in ALL_SUBDIRS {
            let dir = root.join(subdir);
            if !dir.is_dir() {
                fs::create_dir_all(&dir)?;
                tracing::debug!(dir = %dir.display(), "created directory");
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Artifact root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute directory of a kind subdirectory.
    #[must_use]
    pub fn subdir_path(&self, subdir: &str) -> PathBuf {
        self.root.join(subdir)
    }

    /// Writes `bytes` to `<root>/<subdir>/<file_name>`, replacing any
    /// existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, subdir: &str, file_name: &str, bytes: &[u8]) -> Result<WrittenArtifact> {
        let path = self.subdir_path(subdir).join(file_name);
        let mut file = fs::File::create(&path)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(WrittenArtifact {
            relative_path: Self::relative(subdir, file_name),
            bytes: bytes.len() as u64,
        })
    }

    /// Moves a file produced elsewhere into `<root>/<subdir>/`, keeping its
    /// file name.
    ///
    /// Falls back to copy-and-remove when a rename crosses filesystems.
    ///
    /// # Errors
    ///
    /// Returns an error if the file has no name or cannot be moved.
    pub fn adopt(&self, subdir: &str, source: &Path) -> Result<WrittenArtifact> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("exported file has no usable name: {}", source.display()),
                )
            })?
            .to_string();

        let target = self.subdir_path(subdir).join(&file_name);
        if source != target.as_path() && fs::rename(source, &target).is_err() {
            fs::copy(source, &target)?;
            fs::remove_file(source)?;
        }
        let bytes = fs::metadata(&target)?.len();
        Ok(WrittenArtifact {
            relative_path: Self::relative(subdir, &file_name),
            bytes,
        })
    }

    fn relative(subdir: &str, file_name: &str) -> String {
        format!("{subdir}/{file_name}")
    }
}
