//! Test utilities: an in-memory container backend with scriptable failures.
//!
//! [`MemoryBackend`] hands out a fresh copy of its objects on every
//! [`ContainerBackend::open`], which mirrors reloading a container from disk.
//! Each [`MemoryObject`] wraps a [`SnapshotObject`] for its data and adds
//! knobs for read failures, commit failures, and audio export behavior.
//! Saved containers use the snapshot encoding so tests can inspect them with
//! [`SnapshotContainer::from_slice`].
//!
//! # Panics
//!
//! Helpers in this module may panic on I/O errors since they are designed
//! for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;

use crate::Result;
use crate::SyncError;
use crate::container::AssetObject;
use crate::container::AudioExport;
use crate::container::Container;
use crate::container::ContainerBackend;
use crate::container::Payload;
use crate::container::snapshot::SnapshotContainer;
use crate::container::snapshot::SnapshotObject;
use crate::image::RasterImage;
use crate::report::ProgressCallback;

/// How a [`MemoryObject`] answers `export_audio`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportBehavior {
    /// Reports that no export is possible.
    #[default]
    Unavailable,
    /// Writes the raw audio to `<dir>/<stem>.<extension>`, or into
    /// `elsewhere` when set.
    WriteFile {
        /// Extension of the written file.
        extension: String,
        /// Directory to write into instead of the suggested one.
        elsewhere: Option<PathBuf>,
    },
    /// Returns these encoded bytes.
    Bytes(Vec<u8>),
    /// Reports a file that was never written.
    MissingFile,
    /// Fails with this message.
    Fail(String),
}

/// Object with scriptable behavior around snapshot data.
#[derive(Debug, Clone)]
pub struct MemoryObject {
    /// Underlying data.
    pub data: SnapshotObject,
    /// When set, `read` fails with this reason.
    pub read_error: Option<String>,
    /// When set, `commit` fails with this reason.
    pub commit_error: Option<String>,
    /// When set, `read_type_tree` fails with this reason.
    pub type_tree_error: Option<String>,
    /// Audio export behavior.
    pub export: ExportBehavior,
}

impl MemoryObject {
    /// Wraps snapshot data with default behavior.
    #[must_use]
    pub fn new(data: SnapshotObject) -> Self {
        Self {
            data,
            read_error: None,
            commit_error: None,
            type_tree_error: None,
            export: ExportBehavior::Unavailable,
        }
    }

    /// Makes `read` fail.
    #[must_use]
    pub fn failing_read(mut self, reason: &str) -> Self {
        self.read_error = Some(reason.to_string());
        self
    }

    /// Makes `commit` fail.
    #[must_use]
    pub fn failing_commit(mut self, reason: &str) -> Self {
        self.commit_error = Some(reason.to_string());
        self
    }

    /// Reports a field tree but fails to read it.
    #[must_use]
    pub fn failing_type_tree(mut self, reason: &str) -> Self {
        if self.data.type_tree.is_none() {
            self.data.type_tree = Some(Value::Null);
        }
        self.type_tree_error = Some(reason.to_string());
        self
    }

    /// Sets the audio export behavior.
    #[must_use]
    pub fn with_export(mut self, export: ExportBehavior) -> Self {
        self.export = export;
        self
    }
}

impl From<SnapshotObject> for MemoryObject {
    fn from(data: SnapshotObject) -> Self {
        Self::new(data)
    }
}

impl AssetObject for MemoryObject {
    fn path_id(&self) -> i64 {
        self.data.path_id
    }

    fn type_name(&self) -> &str {
        &self.data.type_name
    }

    fn read(&self) -> Result<Payload> {
        match &self.read_error {
            Some(reason) => Err(SyncError::decode(self.data.path_id, reason.clone())),
            None => self.data.read(),
        }
    }

    fn commit(&mut self, payload: Payload) -> Result<()> {
        match &self.commit_error {
            Some(reason) => Err(SyncError::decode(self.data.path_id, reason.clone())),
            None => self.data.commit(payload),
        }
    }

    fn has_type_tree(&self) -> bool {
        self.data.has_type_tree()
    }

    fn read_type_tree(&self) -> Result<Value> {
        match &self.type_tree_error {
            Some(reason) => Err(SyncError::decode(self.data.path_id, reason.clone())),
            None => self.data.read_type_tree(),
        }
    }

    fn write_type_tree(&mut self, tree: &Value) -> Result<()> {
        self.data.write_type_tree(tree)
    }

    fn raw_data(&self) -> Option<Vec<u8>> {
        self.data.raw_data()
    }

    fn set_raw_data(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.data.set_raw_data(bytes)
    }

    fn export_audio(&self, payload: &Payload, stem: &str, dir: &Path) -> Result<AudioExport> {
        match &self.export {
            ExportBehavior::Unavailable => Ok(AudioExport::Unavailable),
            ExportBehavior::WriteFile {
                extension,
                elsewhere,
            } => {
                let dir = elsewhere.as_deref().unwrap_or(dir);
                let path = dir.join(format!("{stem}.{extension}"));
                fs::write(&path, payload.audio_data.as_deref().unwrap_or_default())?;
                Ok(AudioExport::File(path))
            }
            ExportBehavior::Bytes(bytes) => Ok(AudioExport::Bytes(bytes.clone())),
            ExportBehavior::MissingFile => Ok(AudioExport::File(dir.join(format!("{stem}.gone")))),
            ExportBehavior::Fail(reason) => {
                Err(SyncError::decode(self.data.path_id, reason.clone()))
            }
        }
    }
}

/// Container holding [`MemoryObject`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    objects: Vec<MemoryObject>,
}

impl Container for MemoryContainer {
    fn objects(&self) -> Vec<&dyn AssetObject> {
        self.objects.iter().map(|o| o as &dyn AssetObject).collect()
    }

    fn object(&self, path_id: i64) -> Option<&dyn AssetObject> {
        self.objects
            .iter()
            .find(|o| o.data.path_id == path_id)
            .map(|o| o as &dyn AssetObject)
    }

    fn object_mut(&mut self, path_id: i64) -> Option<&mut dyn AssetObject> {
        self.objects
            .iter_mut()
            .find(|o| o.data.path_id == path_id)
            .map(|o| o as &mut dyn AssetObject)
    }

    fn save(&self) -> Result<Vec<u8>> {
        SnapshotContainer::new(self.objects.iter().map(|o| o.data.clone()).collect())?.to_bytes()
    }
}

/// Backend that opens every path to the same in-memory objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    objects: Vec<MemoryObject>,
    fail_open: bool,
}

impl MemoryBackend {
    /// Creates a backend serving these objects.
    #[must_use]
    pub fn new(objects: Vec<MemoryObject>) -> Self {
        Self {
            objects,
            fail_open: false,
        }
    }

    /// Creates a backend whose `open` always fails.
    #[must_use]
    pub fn unreadable() -> Self {
        Self {
            objects: Vec::new(),
            fail_open: true,
        }
    }
}

impl ContainerBackend for MemoryBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>> {
        if self.fail_open {
            return Err(SyncError::ContainerLoad {
                path: path.to_path_buf(),
                reason: "unreadable test container".to_string(),
            });
        }
        Ok(Box::new(MemoryContainer {
            objects: self.objects.clone(),
        }))
    }
}

/// Progress callback that records every event.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    /// `(path_id, total, current)` of every started object.
    pub started: Vec<(i64, usize, usize)>,
    /// Identities of every completed object.
    pub completed: Vec<i64>,
    /// Sum of reported bytes.
    pub bytes: u64,
    /// Number of `on_complete` calls.
    pub finished: usize,
}

impl ProgressCallback for RecordingProgress {
    fn on_object_start(&mut self, path_id: i64, total: usize, current: usize) {
        self.started.push((path_id, total, current));
    }

    fn on_bytes_written(&mut self, bytes: u64) {
        self.bytes += bytes;
    }

    fn on_object_complete(&mut self, path_id: i64) {
        self.completed.push(path_id);
    }

    fn on_complete(&mut self) {
        self.finished += 1;
    }
}

/// Builds a `width x height` image whose pixels encode their coordinates.
#[must_use]
pub fn gradient_image(width: u32, height: u32) -> RasterImage {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            rgba.extend_from_slice(&[(x * 40) as u8, (y * 40) as u8, 128, 255]);
        }
    }
    RasterImage::new(width, height, rgba).unwrap()
}

/// Writes a snapshot container holding `objects` to `path`.
pub fn write_snapshot(path: &Path, objects: Vec<SnapshotObject>) {
    let bytes = SnapshotContainer::new(objects).unwrap().to_bytes().unwrap();
    fs::write(path, bytes).unwrap();
}

/// Reads back a snapshot container written to `path`.
#[must_use]
pub fn read_snapshot(path: &Path) -> SnapshotContainer {
    SnapshotContainer::from_slice(&fs::read(path).unwrap()).unwrap()
}
