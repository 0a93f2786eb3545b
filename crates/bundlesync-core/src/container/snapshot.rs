//! JSON snapshot container backend.
//!
//! A snapshot is a container whose objects have already been decoded by an
//! external dumper: pixels as RGBA, scripts as text or bytes, field trees as
//! JSON. It is the backend the CLI drives and the one tests use to exercise
//! the engines end to end.
//!
//! ```json
//! {
//!   "format": "bundlesync-snapshot",
//!   "version": 1,
//!   "objects": [
//!     { "path_id": 1, "type": "TextAsset", "name": "intro", "script": "hello" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::AssetObject;
use super::Container;
use super::ContainerBackend;
use super::Payload;
use super::Script;
use crate::Result;
use crate::SyncError;
use crate::image::RasterImage;

/// Format tag every snapshot must carry.
pub const SNAPSHOT_FORMAT: &str = "bundlesync-snapshot";

/// Highest snapshot version understood by this backend.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Opens JSON snapshot containers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotBackend;

impl ContainerBackend for SnapshotBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>> {
        let load_error = |reason: String| SyncError::ContainerLoad {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = fs::read(path).map_err(|e| load_error(e.to_string()))?;
        let container =
            SnapshotContainer::from_slice(&bytes).map_err(|e| load_error(e.to_string()))?;
        tracing::debug!(
            path = %path.display(),
            objects = container.objects.len(),
            "loaded snapshot container"
        );
        Ok(Box::new(container))
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    format: String,
    version: u32,
    objects: Vec<SnapshotObject>,
}

/// An in-memory snapshot container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotContainer {
    objects: Vec<SnapshotObject>,
}

impl SnapshotContainer {
    /// Creates a container from objects in enumeration order.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ContainerLoad` if two objects share an identity.
    pub fn new(objects: Vec<SnapshotObject>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(objects.len());
        for object in &objects {
            if !seen.insert(object.path_id) {
                return Err(SyncError::ContainerLoad {
                    path: PathBuf::new(),
                    reason: format!("duplicate path_id {}", object.path_id),
                });
            }
        }
        Ok(Self { objects })
    }

    /// Parses a serialized snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a snapshot of a supported
    /// version.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_slice(bytes)?;
        if file.format != SNAPSHOT_FORMAT {
            return Err(SyncError::ContainerLoad {
                path: PathBuf::new(),
                reason: format!("unknown format tag '{}'", file.format),
            });
        }
        if file.version == 0 || file.version > SNAPSHOT_VERSION {
            return Err(SyncError::ContainerLoad {
                path: PathBuf::new(),
                reason: format!("unsupported snapshot version {}", file.version),
            });
        }
        Self::new(file.objects)
    }

    /// Serializes the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let file = SnapshotFile {
            format: SNAPSHOT_FORMAT.to_string(),
            version: SNAPSHOT_VERSION,
            objects: self.objects.clone(),
        };
        Ok(serde_json::to_vec_pretty(&file)?)
    }

    /// Typed access to an object, for inspection.
    #[must_use]
    pub fn get(&self, path_id: i64) -> Option<&SnapshotObject> {
        self.objects.iter().find(|o| o.path_id == path_id)
    }
}

impl Container for SnapshotContainer {
    fn objects(&self) -> Vec<&dyn AssetObject> {
        self.objects
            .iter()
            .map(|o| o as &dyn AssetObject)
            .collect()
    }

    fn object(&self, path_id: i64) -> Option<&dyn AssetObject> {
        self.get(path_id).map(|o| o as &dyn AssetObject)
    }

    fn object_mut(&mut self, path_id: i64) -> Option<&mut dyn AssetObject> {
        self.objects
            .iter_mut()
            .find(|o| o.path_id == path_id)
            .map(|o| o as &mut dyn AssetObject)
    }

    fn save(&self) -> Result<Vec<u8>> {
        self.to_bytes()
    }
}

/// One object of a snapshot.
///
/// `raw_data` is the object-level raw accessor; `payload_raw_data` is raw
/// data exposed by the decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotObject {
    /// Object identity.
    pub path_id: i64,

    /// Declared type tag.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Name field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Decoded image slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<RasterImage>,

    /// Script field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,

    /// Raw audio field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<Vec<u8>>,

    /// Audio size field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_size: Option<u64>,

    /// Object-level raw bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Vec<u8>>,

    /// Payload-level raw bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_raw_data: Option<Vec<u8>>,

    /// Named byte fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub byte_fields: BTreeMap<String, Vec<u8>>,

    /// Schema-described field tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_tree: Option<Value>,
}

impl SnapshotObject {
    /// Creates an object with no populated fields.
    #[must_use]
    pub fn new(path_id: i64, type_name: impl Into<String>) -> Self {
        Self {
            path_id,
            type_name: type_name.into(),
            name: None,
            image: None,
            script: None,
            audio_data: None,
            audio_size: None,
            raw_data: None,
            payload_raw_data: None,
            byte_fields: BTreeMap::new(),
            type_tree: None,
        }
    }

    /// Sets the name field.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the image slot.
    #[must_use]
    pub fn with_image(mut self, image: RasterImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Sets the script field.
    #[must_use]
    pub fn with_script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }

    /// Sets the audio field and its size.
    #[must_use]
    pub fn with_audio(mut self, data: Vec<u8>) -> Self {
        self.audio_size = Some(data.len() as u64);
        self.audio_data = Some(data);
        self
    }

    /// Sets the object-level raw bytes.
    #[must_use]
    pub fn with_raw_data(mut self, bytes: Vec<u8>) -> Self {
        self.raw_data = Some(bytes);
        self
    }

    /// Sets the field tree.
    #[must_use]
    pub fn with_type_tree(mut self, tree: Value) -> Self {
        self.type_tree = Some(tree);
        self
    }
}

/// JSON kind used for shallow schema comparison.
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl AssetObject for SnapshotObject {
    fn path_id(&self) -> i64 {
        self.path_id
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn read(&self) -> Result<Payload> {
        if let Some(image) = &self.image {
            image
                .validate()
                .map_err(|e| SyncError::decode(self.path_id, e.to_string()))?;
        }
        Ok(Payload {
            name: self.name.clone(),
            image: self.image.clone(),
            script: self.script.clone(),
            audio_data: self.audio_data.clone(),
            audio_size: self.audio_size,
            raw_data: self.payload_raw_data.clone(),
            byte_fields: self.byte_fields.clone(),
        })
    }

    fn commit(&mut self, payload: Payload) -> Result<()> {
        if let Some(image) = &payload.image {
            image
                .validate()
                .map_err(|e| SyncError::decode(self.path_id, e.to_string()))?;
        }
        self.name = payload.name;
        self.image = payload.image;
        self.script = payload.script;
        self.audio_data = payload.audio_data;
        self.audio_size = payload.audio_size;
        self.payload_raw_data = payload.raw_data;
        self.byte_fields = payload.byte_fields;
        Ok(())
    }

    fn has_type_tree(&self) -> bool {
        self.type_tree.is_some()
    }

    fn read_type_tree(&self) -> Result<Value> {
        self.type_tree.clone().ok_or_else(|| SyncError::FieldAbsent {
            path_id: self.path_id,
            field: "type_tree".to_string(),
        })
    }

    fn write_type_tree(&mut self, tree: &Value) -> Result<()> {
        let mismatch = |reason: String| SyncError::SchemaMismatch {
            path_id: self.path_id,
            reason,
        };

        let Some(current) = &self.type_tree else {
            return Err(SyncError::FieldAbsent {
                path_id: self.path_id,
                field: "type_tree".to_string(),
            });
        };

        if let (Value::Object(old), Value::Object(new)) = (current, tree) {
            for (key, old_value) in old {
                let Some(new_value) = new.get(key) else {
                    return Err(mismatch(format!("missing field '{key}'")));
                };
                if kind_of(old_value) != kind_of(new_value) {
                    return Err(mismatch(format!(
                        "field '{key}' changed from {} to {}",
                        kind_of(old_value),
                        kind_of(new_value)
                    )));
                }
            }
            if let Some(extra) = new.keys().find(|k| !old.contains_key(*k)) {
                return Err(mismatch(format!("unknown field '{extra}'")));
            }
        } else if kind_of(current) != kind_of(tree) {
            return Err(mismatch(format!(
                "root changed from {} to {}",
                kind_of(current),
                kind_of(tree)
            )));
        }

        self.type_tree = Some(tree.clone());
        Ok(())
    }

    fn raw_data(&self) -> Option<Vec<u8>> {
        self.raw_data.clone()
    }

    fn set_raw_data(&mut self, bytes: Vec<u8>) -> Result<()> {
        match &mut self.raw_data {
            Some(raw) => {
                *raw = bytes;
                Ok(())
            }
            None => Err(SyncError::FieldAbsent {
                path_id: self.path_id,
                field: "raw_data".to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> SnapshotContainer {
        SnapshotContainer::new(vec![
            SnapshotObject::new(1, "TextAsset")
                .with_name("intro")
                .with_script(Script::Text("hello".into())),
            SnapshotObject::new(2, "MonoBehaviour")
                .with_type_tree(json!({"speed": 1.5, "label": "fast", "tags": []})),
            SnapshotObject::new(3, "Mesh").with_raw_data(vec![1, 2, 3]),
        ])
        .unwrap()
    }

    #[test]
    fn test_save_and_reload() {
        let container = sample();
        let bytes = container.save().unwrap();
        let reloaded = SnapshotContainer::from_slice(&bytes).unwrap();
        assert_eq!(reloaded, container);
    }

    #[test]
    fn test_objects_keep_order() {
        let container = sample();
        let ids: Vec<i64> = container.objects().iter().map(|o| o.path_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_open_rejects_non_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.bundle");
        fs::write(&path, b"UnityFS\0\x07binary").unwrap();
        let err = SnapshotBackend.open(&path).err().unwrap();
        assert!(matches!(err, SyncError::ContainerLoad { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_open_rejects_wrong_format_tag() {
        let bytes = br#"{"format":"other","version":1,"objects":[]}"#;
        assert!(SnapshotContainer::from_slice(bytes).is_err());
        let bytes = br#"{"format":"bundlesync-snapshot","version":9,"objects":[]}"#;
        assert!(SnapshotContainer::from_slice(bytes).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = SnapshotContainer::new(vec![
            SnapshotObject::new(1, "Mesh"),
            SnapshotObject::new(1, "Mesh"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_rejects_bad_pixels() {
        let mut object = SnapshotObject::new(4, "Texture2D");
        object.image = Some(serde_json::from_value(json!({"width": 2, "height": 2, "rgba": [0]})).unwrap());
        assert!(matches!(object.read(), Err(SyncError::PayloadDecode { path_id: 4, .. })));
    }

    #[test]
    fn test_commit_updates_fields() {
        let mut container = sample();
        let object = container.object_mut(1).unwrap();
        let mut payload = object.read().unwrap();
        payload.script = Some(Script::Bytes(vec![0xFF]));
        object.commit(payload).unwrap();
        assert_eq!(container.get(1).unwrap().script, Some(Script::Bytes(vec![0xFF])));
    }

    #[test]
    fn test_write_type_tree_accepts_same_shape() {
        let mut container = sample();
        let object = container.object_mut(2).unwrap();
        object
            .write_type_tree(&json!({"speed": 9.0, "label": "slow", "tags": ["a"]}))
            .unwrap();
        assert_eq!(container.get(2).unwrap().type_tree.as_ref().unwrap()["speed"], 9.0);
    }

    #[test]
    fn test_write_type_tree_rejects_schema_changes() {
        let mut container = sample();
        let object = container.object_mut(2).unwrap();
        for bad in [
            json!({"speed": "fast", "label": "x", "tags": []}),
            json!({"speed": 1.0, "tags": []}),
            json!({"speed": 1.0, "label": "x", "tags": [], "extra": 1}),
            json!([1, 2, 3]),
        ] {
            let err = object.write_type_tree(&bad).unwrap_err();
            assert!(matches!(err, SyncError::SchemaMismatch { .. }), "{bad}");
        }
    }

    #[test]
    fn test_raw_data_accessors() {
        let mut container = sample();
        assert_eq!(container.object(3).unwrap().raw_data(), Some(vec![1, 2, 3]));
        container.object_mut(3).unwrap().set_raw_data(vec![9]).unwrap();
        assert_eq!(container.get(3).unwrap().raw_data, Some(vec![9]));

        let err = container.object_mut(1).unwrap().set_raw_data(vec![9]).unwrap_err();
        assert!(matches!(err, SyncError::FieldAbsent { .. }));
    }
}
