//! Container collaborator interfaces.
//!
//! The engines never parse a container themselves. A [`ContainerBackend`]
//! opens a file into a [`Container`], which exposes its objects in
//! enumeration order as [`AssetObject`]s. Reading an object materializes a
//! typed [`Payload`]; committing a payload writes it back into the
//! in-memory container, and [`Container::save`] serializes the result.

pub mod snapshot;

pub use snapshot::SnapshotBackend;

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::SyncError;
use crate::image::RasterImage;

/// Opens containers from disk.
pub trait ContainerBackend {
    /// Opens the container at `path`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ContainerLoad` if the file is not a readable
    /// container.
    fn open(&self, path: &Path) -> Result<Box<dyn Container>>;
}

/// An open container holding an ordered sequence of objects.
pub trait Container {
    /// Objects in enumeration order.
    fn objects(&self) -> Vec<&dyn AssetObject>;

    /// Looks up an object by identity.
    fn object(&self, path_id: i64) -> Option<&dyn AssetObject>;

    /// Looks up an object by identity for modification.
    fn object_mut(&mut self, path_id: i64) -> Option<&mut dyn AssetObject>;

    /// Serializes the whole container.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn save(&self) -> Result<Vec<u8>>;
}

/// One object inside a container.
pub trait AssetObject {
    /// Identity, unique within the container.
    fn path_id(&self) -> i64;

    /// Declared type tag, e.g. `Texture2D`.
    fn type_name(&self) -> &str;

    /// Materializes the typed payload.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::PayloadDecode` if the object cannot be read.
    fn read(&self) -> Result<Payload>;

    /// Writes a modified payload back into the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be re-encoded.
    fn commit(&mut self, payload: Payload) -> Result<()>;

    /// Whether a schema is available for field-tree access.
    fn has_type_tree(&self) -> bool {
        false
    }

    /// Reads the schema-described field tree.
    ///
    /// # Errors
    ///
    /// Returns an error if no schema is available or decoding fails.
    fn read_type_tree(&self) -> Result<Value> {
        Err(SyncError::FieldAbsent {
            path_id: self.path_id(),
            field: "type_tree".to_string(),
        })
    }

    /// Writes a field tree back through the schema-aware setter.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::SchemaMismatch` if the tree does not fit the
    /// schema.
    fn write_type_tree(&mut self, tree: &Value) -> Result<()> {
        let _ = tree;
        Err(SyncError::FieldAbsent {
            path_id: self.path_id(),
            field: "type_tree".to_string(),
        })
    }

    /// Object-level raw bytes, if the backend exposes them.
    fn raw_data(&self) -> Option<Vec<u8>> {
        None
    }

    /// Replaces the object-level raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::FieldAbsent` if the object has no raw accessor.
    fn set_raw_data(&mut self, bytes: Vec<u8>) -> Result<()> {
        let _ = bytes;
        Err(SyncError::FieldAbsent {
            path_id: self.path_id(),
            field: "raw_data".to_string(),
        })
    }

    /// Exports an audio payload into a playable form.
    ///
    /// `stem` is the preferred file stem and `dir` the preferred directory
    /// for backends that write files.
    ///
    /// # Errors
    ///
    /// Returns an error if the export was attempted and failed.
    fn export_audio(&self, payload: &Payload, stem: &str, dir: &Path) -> Result<AudioExport> {
        let _ = (payload, stem, dir);
        Ok(AudioExport::Unavailable)
    }
}

/// Result of an audio export attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioExport {
    /// The backend wrote a file at this path.
    File(PathBuf),
    /// The backend returned encoded bytes (written as `.wav`).
    Bytes(Vec<u8>),
    /// The backend cannot export this clip.
    Unavailable,
}

/// Script content of a text object.
///
/// Serialized untagged: a JSON string is text, an array of numbers is bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Script {
    /// Script held as text.
    Text(String),
    /// Script held as raw bytes.
    Bytes(Vec<u8>),
}

impl Script {
    /// Returns the script content as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Returns `true` if the script field is text-typed.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// Typed view of an object's payload.
///
/// Every slot is optional; which ones are populated depends on the object's
/// declared type and on what the backend can decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    /// Value of the object's name field.
    pub name: Option<String>,
    /// Decoded image slot (textures and sprites).
    pub image: Option<RasterImage>,
    /// Script field (text assets).
    pub script: Option<Script>,
    /// Raw audio field (audio clips).
    pub audio_data: Option<Vec<u8>>,
    /// Size field kept in sync with `audio_data`, when present.
    pub audio_size: Option<u64>,
    /// Raw bytes exposed by the decoded payload itself.
    pub raw_data: Option<Vec<u8>>,
    /// Named byte fields such as `m_Script`.
    pub byte_fields: BTreeMap<String, Vec<u8>>,
}

impl Payload {
    /// Returns a named byte field.
    #[must_use]
    pub fn byte_field(&self, name: &str) -> Option<&[u8]> {
        self.byte_fields.get(name).map(Vec::as_slice)
    }
}
