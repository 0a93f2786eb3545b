//! Repack engine: manifest plus edited artifacts back into a container.

use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::Result;
use crate::SyncConfig;
use crate::SyncError;
use crate::classify::RawSource;
use crate::classify::SCRIPT_FIELD;
use crate::classify::Strategy;
use crate::container::AssetObject;
use crate::container::Container;
use crate::container::ContainerBackend;
use crate::container::Script;
use crate::image::ImageCodec;
use crate::manifest::ArtifactRef;
use crate::manifest::Manifest;
use crate::manifest::ManifestEntry;
use crate::report::ProgressCallback;
use crate::report::RepackReport;
use crate::types::ArtifactPath;

/// Outcome of replaying one manifest entry.
#[derive(Debug)]
enum EntryOutcome {
    Modified,
    /// Expected skip, logged at info.
    Skipped(String),
    /// Skip that indicates a mismatch worth a warning.
    Warned(String),
}

/// Reapplies edited artifacts to a fresh copy of the original container.
pub struct Repacker<'a> {
    backend: &'a dyn ContainerBackend,
    codec: &'a dyn ImageCodec,
    config: SyncConfig,
}

impl<'a> Repacker<'a> {
    /// Creates a repacker over the given collaborators.
    #[must_use]
    pub fn new(
        backend: &'a dyn ContainerBackend,
        codec: &'a dyn ImageCodec,
        config: SyncConfig,
    ) -> Self {
        Self {
            backend,
            codec,
            config,
        }
    }

    /// Replays the manifest in `artifact_root` and writes the container to
    /// `destination`.
    ///
    /// The container recorded in the manifest is always reloaded from disk.
    /// The serialized container is written even when no entry was modified.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ManifestNotFound` or `SyncError::Manifest` if the
    /// manifest cannot be loaded, `SyncError::SourceMissing` if the recorded
    /// container no longer exists, `SyncError::ContainerLoad` if it cannot be
    /// opened, or an I/O error if the destination cannot be written. Nothing
    /// is written to `destination` in any of these cases.
    pub fn repack(
        &self,
        artifact_root: &Path,
        destination: &Path,
        progress: &mut dyn ProgressCallback,
    ) -> Result<RepackReport> {
        let start = Instant::now();
        let manifest = Manifest::load(artifact_root)?;
        let source = &manifest.source_container;
        if !source.is_file() {
            return Err(SyncError::SourceMissing {
                path: source.clone(),
            });
        }

        tracing::info!(
            source = %source.display(),
            entries = manifest.entries.len(),
            "repacking container"
        );
        let mut container = self.backend.open(source)?;

        let mut report = RepackReport::new();
        report.entries_total = manifest.entries.len();

        for (index, entry) in manifest.entries.iter().enumerate() {
            let path_id = entry.path_id;
            progress.on_object_start(path_id, report.entries_total, index + 1);

            match self.apply_entry(container.as_mut(), entry, artifact_root) {
                Ok(EntryOutcome::Modified) => {
                    tracing::info!(path_id, name = %entry.name, "updated object");
                    report.modified += 1;
                }
                Ok(EntryOutcome::Skipped(reason)) => {
                    tracing::info!(path_id, name = %entry.name, "skipped: {reason}");
                    report.skipped += 1;
                }
                Ok(EntryOutcome::Warned(reason)) => {
                    tracing::warn!(path_id, name = %entry.name, "skipped: {reason}");
                    report.skipped += 1;
                    report.add_warning(format!("'{}' ({path_id}): {reason}", entry.name));
                }
                Err(e @ SyncError::FieldAbsent { .. }) => {
                    tracing::warn!(path_id, name = %entry.name, error = %e, "no compatible field");
                    report.skipped += 1;
                    report.add_warning(e.to_string());
                }
                Err(e) => {
                    tracing::error!(
                        path_id,
                        name = %entry.name,
                        error = %e,
                        "failed to update object"
                    );
                    report.failed += 1;
                    report.add_warning(format!("failed to update '{}': {e}", entry.name));
                }
            }

            progress.on_object_complete(path_id);
        }

        let bytes = container.save()?;
        if self.config.create_parent_dirs
            && let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(destination, &bytes)?;

        report.output_path = destination.to_path_buf();
        report.bytes_written = bytes.len() as u64;
        report.duration = start.elapsed();
        progress.on_bytes_written(report.bytes_written);
        progress.on_complete();

        tracing::info!(
            output = %destination.display(),
            modified = report.modified,
            skipped = report.skipped,
            failed = report.failed,
            "repack complete"
        );
        Ok(report)
    }

    fn apply_entry(
        &self,
        container: &mut dyn Container,
        entry: &ManifestEntry,
        root: &Path,
    ) -> Result<EntryOutcome> {
        let relative = match &entry.artifact {
            ArtifactRef::Path(relative) => relative,
            ArtifactRef::Failed => {
                return Ok(EntryOutcome::Skipped("extraction had failed".to_string()));
            }
            ArtifactRef::None => {
                return Ok(EntryOutcome::Skipped("no artifact recorded".to_string()));
            }
        };

        let artifact = match ArtifactPath::validate(relative) {
            Ok(path) => path.resolve(root),
            Err(e) => return Ok(EntryOutcome::Warned(e.to_string())),
        };
        let Ok(metadata) = fs::metadata(&artifact) else {
            return Ok(EntryOutcome::Skipped(format!(
                "artifact {relative} no longer exists"
            )));
        };

        let Some(object) = container.object_mut(entry.path_id) else {
            let stale = SyncError::StaleReference {
                path_id: entry.path_id,
            };
            return Ok(EntryOutcome::Warned(stale.to_string()));
        };

        let Some(strategy) = entry.effective_strategy() else {
            return Ok(EntryOutcome::Skipped(format!(
                "type {} is not supported for repack",
                entry.declared_type
            )));
        };

        if !self.config.is_size_allowed(metadata.len()) {
            let too_large = SyncError::ArtifactTooLarge {
                path: artifact,
                size: metadata.len(),
                max: self.config.max_artifact_size,
            };
            return Ok(EntryOutcome::Warned(too_large.to_string()));
        }

        let bytes = fs::read(&artifact)?;
        tracing::debug!(path_id = entry.path_id, %strategy, artifact = %relative, "applying artifact");
        match strategy {
            Strategy::Image => self.apply_image(object, &bytes)?,
            Strategy::Text => apply_text(object, bytes)?,
            Strategy::StructuredJson => apply_tree(object, &bytes)?,
            Strategy::StructuredRaw | Strategy::GenericRaw => {
                let source = entry.raw_source.clone().or_else(|| {
                    (strategy == Strategy::GenericRaw).then_some(RawSource::Object)
                });
                apply_raw(object, source, bytes)?;
            }
            Strategy::Audio => apply_audio(object, bytes)?,
        }
        Ok(EntryOutcome::Modified)
    }

    fn apply_image(&self, object: &mut dyn AssetObject, bytes: &[u8]) -> Result<()> {
        let image = self.codec.decode(bytes)?;
        let mut payload = object.read()?;
        payload.image = Some(image);
        object.commit(payload)
    }
}

fn apply_text(object: &mut dyn AssetObject, bytes: Vec<u8>) -> Result<()> {
    let mut payload = object.read()?;
    let was_text = payload.script.as_ref().is_some_and(Script::is_text);
    payload.script = Some(if was_text {
        match String::from_utf8(bytes) {
            Ok(text) => Script::Text(text),
            Err(e) => Script::Bytes(e.into_bytes()),
        }
    } else {
        Script::Bytes(bytes)
    });
    object.commit(payload)
}

fn apply_tree(object: &mut dyn AssetObject, bytes: &[u8]) -> Result<()> {
    let tree: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
        SyncError::SchemaMismatch {
            path_id: object.path_id(),
            reason: format!("artifact is not valid JSON: {e}"),
        }
    })?;
    object.write_type_tree(&tree)
}

fn apply_audio(object: &mut dyn AssetObject, bytes: Vec<u8>) -> Result<()> {
    let mut payload = object.read()?;
    if payload.audio_data.is_none() {
        return Err(SyncError::FieldAbsent {
            path_id: object.path_id(),
            field: "audio_data".to_string(),
        });
    }
    if payload.audio_size.is_some() {
        payload.audio_size = Some(bytes.len() as u64);
    }
    payload.audio_data = Some(bytes);
    object.commit(payload)
}

/// Writes raw bytes to the recorded source, or to the first candidate that
/// exists when none was recorded.
fn apply_raw(
    object: &mut dyn AssetObject,
    source: Option<RawSource>,
    bytes: Vec<u8>,
) -> Result<()> {
    let path_id = object.path_id();
    let source = match source {
        Some(source) => source,
        None => probe_raw_source(object)?,
    };

    match source {
        RawSource::Object => object.set_raw_data(bytes),
        RawSource::Payload => {
            let mut payload = object.read()?;
            if payload.raw_data.is_none() {
                return Err(SyncError::FieldAbsent {
                    path_id,
                    field: "raw_data".to_string(),
                });
            }
            payload.raw_data = Some(bytes);
            object.commit(payload)
        }
        RawSource::Field(name) => {
            let mut payload = object.read()?;
            let Some(field) = payload.byte_fields.get_mut(&name) else {
                return Err(SyncError::FieldAbsent {
                    path_id,
                    field: name,
                });
            };
            *field = bytes;
            object.commit(payload)
        }
    }
}

fn probe_raw_source(object: &dyn AssetObject) -> Result<RawSource> {
    if object.raw_data().is_some() {
        return Ok(RawSource::Object);
    }
    let payload = object.read()?;
    if payload.raw_data.is_some() {
        Ok(RawSource::Payload)
    } else if payload.byte_fields.contains_key(SCRIPT_FIELD) {
        Ok(RawSource::Field(SCRIPT_FIELD.to_string()))
    } else {
        Err(SyncError::FieldAbsent {
            path_id: object.path_id(),
            field: "raw data".to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::container::snapshot::SnapshotObject;
    use crate::extraction::Extractor;
    use crate::image::PngCodec;
    use crate::manifest::FAILURE_SENTINEL;
    use crate::report::NoopProgress;
    use crate::test_utils::MemoryBackend;
    use crate::test_utils::MemoryObject;
    use crate::test_utils::gradient_image;
    use crate::test_utils::read_snapshot;

    struct Fixture {
        temp: TempDir,
        backend: MemoryBackend,
        root: PathBuf,
    }

    impl Fixture {
        fn new(objects: Vec<MemoryObject>) -> Self {
            let temp = TempDir::new().unwrap();
            let source = temp.path().join("level.bundle");
            fs::write(&source, b"container").unwrap();
            let root = temp.path().join("out");
            let backend = MemoryBackend::new(objects);
            let codec = PngCodec::default();
            Extractor::new(&backend, &codec, SyncConfig::default())
                .extract(&source, &root, &mut NoopProgress)
                .unwrap();
            Self {
                temp,
                backend,
                root,
            }
        }

        fn repack_with(&self, config: SyncConfig) -> (RepackReport, PathBuf) {
            let dest = self.temp.path().join("new.bundle");
            let codec = PngCodec::default();
            let report = Repacker::new(&self.backend, &codec, config)
                .repack(&self.root, &dest, &mut NoopProgress)
                .unwrap();
            (report, dest)
        }

        fn repack(&self) -> (RepackReport, PathBuf) {
            self.repack_with(SyncConfig::default())
        }

        fn edit_manifest(&self, edit: impl FnOnce(&mut Manifest)) {
            let mut manifest = Manifest::load(&self.root).unwrap();
            edit(&mut manifest);
            manifest.save(&self.root, 4).unwrap();
        }
    }

    fn originals() -> Vec<SnapshotObject> {
        let mut cfg = SnapshotObject::new(5, "MonoBehaviour").with_name("cfg");
        cfg.byte_fields.insert(SCRIPT_FIELD.into(), vec![1, 2, 3]);
        vec![
            SnapshotObject::new(1, "Texture2D")
                .with_name("hero")
                .with_image(gradient_image(3, 2)),
            SnapshotObject::new(2, "TextAsset")
                .with_name("dialog")
                .with_script(Script::Text("hello".into())),
            SnapshotObject::new(3, "TextAsset")
                .with_name("blob")
                .with_script(Script::Bytes(vec![0xFF, 0x00])),
            SnapshotObject::new(4, "MonoBehaviour")
                .with_name("stats")
                .with_type_tree(json!({"hp": 10, "name": "orc"})),
            cfg,
            SnapshotObject::new(6, "AudioClip")
                .with_name("theme")
                .with_audio(b"FSB5".to_vec()),
            SnapshotObject::new(7, "Mesh")
                .with_name("rock")
                .with_raw_data(vec![4, 5, 6]),
        ]
    }

    fn fixture() -> Fixture {
        Fixture::new(originals().into_iter().map(MemoryObject::from).collect())
    }

    #[test]
    fn test_unmodified_round_trip_is_identity() {
        let fixture = fixture();
        let (report, dest) = fixture.repack();
        assert_eq!(report.entries_total, 7);
        assert_eq!(report.modified, 7);
        assert_eq!(report.failed, 0);

        let repacked = read_snapshot(&dest);
        for original in originals() {
            assert_eq!(repacked.get(original.path_id), Some(&original));
        }
    }

    #[test]
    fn test_edit_applies_only_to_its_object() {
        let fixture = fixture();
        fs::write(fixture.root.join("TextAssets/blob_3.bytes"), [0xAB, 0xCD, 0xEF]).unwrap();
        fs::write(
            fixture.root.join("MonoBehaviours_JSON/stats_4.json"),
            br#"{"hp": 99, "name": "orc"}"#,
        )
        .unwrap();
        fs::write(fixture.root.join("AudioClips/theme_6.audioclipraw"), b"LONGER").unwrap();
        fs::write(fixture.root.join("MonoBehaviours_DAT/cfg_5.dat"), [9]).unwrap();
        fs::write(fixture.root.join("OtherAssets/rock_7.genericdat"), [0]).unwrap();

        let (_, dest) = fixture.repack();
        let repacked = read_snapshot(&dest);
        let originals = originals();

        assert_eq!(repacked.get(1), Some(&originals[0]));
        assert_eq!(
            repacked.get(3).unwrap().script,
            Some(Script::Bytes(vec![0xAB, 0xCD, 0xEF]))
        );
        assert_eq!(
            repacked.get(4).unwrap().type_tree,
            Some(json!({"hp": 99, "name": "orc"}))
        );
        assert_eq!(repacked.get(5).unwrap().byte_fields[SCRIPT_FIELD], vec![9]);
        let audio = repacked.get(6).unwrap();
        assert_eq!(audio.audio_data.as_deref(), Some(&b"LONGER"[..]));
        assert_eq!(audio.audio_size, Some(6));
        assert_eq!(repacked.get(7).unwrap().raw_data, Some(vec![0]));
    }

    #[test]
    fn test_text_field_stays_text_when_valid_utf8() {
        let fixture = fixture();
        fs::write(fixture.root.join("TextAssets/dialog_2.txt"), "héllo").unwrap();
        let (_, dest) = fixture.repack();
        assert_eq!(
            read_snapshot(&dest).get(2).unwrap().script,
            Some(Script::Text("héllo".into()))
        );
    }

    #[test]
    fn test_text_field_falls_back_to_bytes_on_invalid_utf8() {
        let fixture = fixture();
        fs::write(fixture.root.join("TextAssets/dialog_2.txt"), [0xC3, 0x28]).unwrap();
        let (report, dest) = fixture.repack();
        assert_eq!(report.failed, 0);
        assert_eq!(
            read_snapshot(&dest).get(2).unwrap().script,
            Some(Script::Bytes(vec![0xC3, 0x28]))
        );
    }

    #[test]
    fn test_schema_mismatch_leaves_object_unmodified() {
        let fixture = fixture();
        fs::write(
            fixture.root.join("MonoBehaviours_JSON/stats_4.json"),
            br#"{"hp": "lots", "name": "orc"}"#,
        )
        .unwrap();
        let (report, dest) = fixture.repack();
        assert_eq!(report.failed, 1);
        assert_eq!(report.modified, 6);
        assert_eq!(read_snapshot(&dest).get(4), Some(&originals()[3]));
    }

    #[test]
    fn test_oversized_png_header_fails_only_its_entry() {
        let fixture = fixture();
        let path = fixture.root.join("Textures/hero_1.png");
        let mut png = fs::read(&path).unwrap();
        // Rewrite IHDR to declare 1048576 x 1048576 and fix up its CRC.
        png[16..20].copy_from_slice(&0x10_0000_u32.to_be_bytes());
        png[20..24].copy_from_slice(&0x10_0000_u32.to_be_bytes());
        let mut crc = flate2::Crc::new();
        crc.update(&png[12..29]);
        png[29..33].copy_from_slice(&crc.sum().to_be_bytes());
        fs::write(&path, &png).unwrap();

        let (report, dest) = fixture.repack();
        assert_eq!(report.failed, 1);
        assert_eq!(report.modified, 6);
        assert_eq!(read_snapshot(&dest).get(1), Some(&originals()[0]));
    }

    #[test]
    fn test_invalid_json_is_not_fatal() {
        let fixture = fixture();
        fs::write(fixture.root.join("MonoBehaviours_JSON/stats_4.json"), b"{ nope").unwrap();
        let (report, _) = fixture.repack();
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_missing_artifact_is_skipped() {
        let fixture = fixture();
        fs::remove_file(fixture.root.join("Textures/hero_1.png")).unwrap();
        let (report, dest) = fixture.repack();
        assert_eq!(report.skipped, 1);
        assert!(!report.has_warnings());
        assert_eq!(read_snapshot(&dest).get(1), Some(&originals()[0]));
    }

    #[test]
    fn test_stale_and_unsafe_entries_warn() {
        let fixture = fixture();
        fixture.edit_manifest(|manifest| {
            manifest.entries[0].path_id = 999;
            manifest.entries[1].artifact = ArtifactRef::Path("../../etc/passwd".into());
        });
        let (report, _) = fixture.repack();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("999"));
    }

    #[test]
    fn test_failed_and_empty_entries_are_skipped() {
        let fixture = fixture();
        fixture.edit_manifest(|manifest| {
            manifest.entries[0].artifact = ArtifactRef::from(FAILURE_SENTINEL.to_string());
            manifest.entries[1].artifact = ArtifactRef::None;
        });
        let (report, _) = fixture.repack();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.modified, 5);
    }

    #[test]
    fn test_unsupported_type_is_skipped() {
        let fixture = fixture();
        fixture.edit_manifest(|manifest| {
            let entry = &mut manifest.entries[6];
            entry.strategy = None;
            entry.declared_type = "Mesh".into();
        });
        let (report, _) = fixture.repack();
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_legacy_manifest_probes_raw_field() {
        let fixture = fixture();
        fixture.edit_manifest(|manifest| {
            let entry = &mut manifest.entries[4];
            entry.strategy = None;
            entry.raw_source = None;
            entry.declared_type = "MonoBehaviour_DAT".into();
        });
        fs::write(fixture.root.join("MonoBehaviours_DAT/cfg_5.dat"), [7, 7]).unwrap();
        let (report, dest) = fixture.repack();
        assert_eq!(report.failed, 0);
        assert_eq!(read_snapshot(&dest).get(5).unwrap().byte_fields[SCRIPT_FIELD], vec![7, 7]);
    }

    #[test]
    fn test_artifact_over_size_limit_is_skipped() {
        let fixture = fixture();
        let config = SyncConfig {
            max_artifact_size: 4,
            ..Default::default()
        };
        let (report, dest) = fixture.repack_with(config);
        assert!(report.skipped >= 1);
        assert!(report.warnings.iter().any(|w| w.contains("hero")));
        assert_eq!(read_snapshot(&dest).get(1), Some(&originals()[0]));
    }

    #[test]
    fn test_commit_failure_is_isolated() {
        let mut objects: Vec<MemoryObject> = originals().into_iter().map(MemoryObject::from).collect();
        objects[0] = objects[0].clone().failing_commit("encoder refused");
        let fixture = Fixture::new(objects);
        let (report, _) = fixture.repack();
        assert_eq!(report.failed, 1);
        assert_eq!(report.modified, 6);
    }

    #[test]
    fn test_zero_modifications_still_writes() {
        let fixture = fixture();
        fixture.edit_manifest(|manifest| manifest.entries.clear());
        let (report, dest) = fixture.repack();
        assert_eq!(report.modified, 0);
        assert!(dest.is_file());
        assert_eq!(report.bytes_written, fs::metadata(&dest).unwrap().len());
    }

    #[test]
    fn test_creates_destination_parent() {
        let fixture = fixture();
        let dest = fixture.temp.path().join("nested/dir/new.bundle");
        let codec = PngCodec::default();
        Repacker::new(&fixture.backend, &codec, SyncConfig::default())
            .repack(&fixture.root, &dest, &mut NoopProgress)
            .unwrap();
        assert!(dest.is_file());
    }

    #[test]
    fn test_missing_parent_fails_when_creation_disabled() {
        let fixture = fixture();
        let dest = fixture.temp.path().join("nested/new.bundle");
        let codec = PngCodec::default();
        let config = SyncConfig {
            create_parent_dirs: false,
            ..Default::default()
        };
        let err = Repacker::new(&fixture.backend, &codec, config)
            .repack(&fixture.root, &dest, &mut NoopProgress)
            .unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("new.bundle");
        let codec = PngCodec::default();
        let backend = MemoryBackend::new(Vec::new());
        let err = Repacker::new(&backend, &codec, SyncConfig::default())
            .repack(temp.path(), &dest, &mut NoopProgress)
            .unwrap_err();
        assert!(matches!(err, SyncError::ManifestNotFound { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let fixture = fixture();
        fs::remove_file(fixture.temp.path().join("level.bundle")).unwrap();
        let dest = fixture.temp.path().join("new.bundle");
        let codec = PngCodec::default();
        let err = Repacker::new(&fixture.backend, &codec, SyncConfig::default())
            .repack(&fixture.root, &dest, &mut NoopProgress)
            .unwrap_err();
        assert!(matches!(err, SyncError::SourceMissing { .. }));
        assert!(err.is_fatal());
        assert!(!dest.exists());
    }
}
