//! Extraction engine: container objects to artifacts plus manifest.

use std::path::Path;
use std::time::Instant;

use super::writer::ArtifactWriter;
use super::writer::WrittenArtifact;
use crate::Result;
use crate::SyncConfig;
use crate::SyncError;
use crate::classify::AssetKind;
use crate::classify::RawSource;
use crate::classify::SCRIPT_FIELD;
use crate::classify::Strategy;
use crate::classify::classify;
use crate::container::AssetObject;
use crate::container::AudioExport;
use crate::container::ContainerBackend;
use crate::container::Payload;
use crate::container::Script;
use crate::image::ImageCodec;
use crate::manifest::Manifest;
use crate::manifest::ManifestEntry;
use crate::naming;
use crate::report::ExtractionReport;
use crate::report::ProgressCallback;

/// Outcome of extracting one object.
#[derive(Debug)]
enum ObjectOutcome {
    /// An artifact was written.
    Written {
        artifact: WrittenArtifact,
        strategy: Strategy,
        raw_source: Option<RawSource>,
    },
    /// Nothing to write; the object gets no manifest row.
    Skipped(String),
}

impl ObjectOutcome {
    fn written(artifact: WrittenArtifact, strategy: Strategy) -> Self {
        Self::Written {
            artifact,
            strategy,
            raw_source: None,
        }
    }
}

/// Extracts every object of a container into an artifact tree.
pub struct Extractor<'a> {
    backend: &'a dyn ContainerBackend,
    codec: &'a dyn ImageCodec,
    config: SyncConfig,
}

impl<'a> Extractor<'a> {
    /// Creates an extractor over the given collaborators.
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

    /// Extracts `container_path` into `output_dir` and writes the manifest.
    ///
    /// The container is opened before anything is written, so a load
    /// failure leaves the output directory untouched. Per-object failures
    /// never abort the run.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ContainerLoad` if the container cannot be opened,
    /// `SyncError::Manifest` if a manifest exists and overwriting is
    /// disabled, or an I/O error if the artifact tree or manifest cannot be
    /// written.
    pub fn extract(
        &self,
        container_path: &Path,
        output_dir: &Path,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let start = Instant::now();
        tracing::info!(
            container = %container_path.display(),
            output = %output_dir.display(),
            "extracting container"
        );

        let container = self.backend.open(container_path)?;

        let manifest_path = Manifest::path_in(output_dir);
        if !self.config.overwrite_manifest && manifest_path.exists() {
            return Err(SyncError::Manifest {
                path: manifest_path,
                reason: "manifest already exists".to_string(),
            });
        }

        let source = std::path::absolute(container_path)?;
        let writer = ArtifactWriter::create(output_dir)?;
        let mut report = ExtractionReport::new(Manifest::new(source), manifest_path);

        let objects = container.objects();
        let total = objects.len();
        report.objects_total = total;

        for (index, object) in objects.into_iter().enumerate() {
            let path_id = object.path_id();
            let declared_type = object.type_name().to_string();
            progress.on_object_start(path_id, total, index + 1);

            let mut name = naming::fallback_name(&declared_type, path_id);
            let outcome = object.read().and_then(|payload| {
                name = naming::display_name(payload.name.as_deref(), &declared_type, path_id);
                self.extract_object(object, &payload, &name, &writer)
            });

            match outcome {
                Ok(ObjectOutcome::Written {
                    artifact,
                    strategy,
                    raw_source,
                }) => {
                    tracing::info!(
                        path_id,
                        r#type = %declared_type,
                        artifact = %artifact.relative_path,
                        %strategy,
                        "extracted object"
                    );
                    progress.on_bytes_written(artifact.bytes);
                    report.record_artifact(strategy, artifact.bytes);
                    report.manifest.push(ManifestEntry::extracted(
                        path_id,
                        &declared_type,
                        name,
                        artifact.relative_path,
                        strategy,
                        raw_source,
                    ));
                }
                Ok(ObjectOutcome::Skipped(reason)) => {
                    tracing::warn!(path_id, r#type = %declared_type, %name, "{reason}");
                    report.objects_skipped += 1;
                    report.add_warning(format!("{declared_type} '{name}' ({path_id}): {reason}"));
                }
                Err(e) => {
                    tracing::error!(
                        path_id,
                        r#type = %declared_type,
                        error = %e,
                        "failed to process object"
                    );
                    report.objects_failed += 1;
                    report.add_warning(format!(
                        "failed to process {declared_type} ({path_id}): {e}"
                    ));
                    report
                        .manifest
                        .push(ManifestEntry::failed(path_id, &declared_type, name));
                }
            }

            progress.on_object_complete(path_id);
        }

        report.manifest.save(output_dir, self.config.json_indent)?;
        report.duration = start.elapsed();
        progress.on_complete();

        tracing::info!(
            manifest = %report.manifest_path.display(),
            recorded = report.manifest.entries.len(),
            artifacts = report.artifacts_written(),
            failed = report.objects_failed,
            skipped = report.objects_skipped,
            "extraction complete"
        );
        Ok(report)
    }

    fn extract_object(
        &self,
        object: &dyn AssetObject,
        payload: &Payload,
        name: &str,
        writer: &ArtifactWriter,
    ) -> Result<ObjectOutcome> {
        let path_id = object.path_id();
        match classify(object.type_name()) {
            AssetKind::Image => self.extract_image(payload, name, path_id, writer),
            AssetKind::Text => extract_text(payload, name, path_id, writer),
            AssetKind::Structured => self.extract_structured(object, payload, name, writer),
            AssetKind::Audio => extract_audio(object, payload, name, writer),
            AssetKind::Opaque => extract_opaque(object, name, writer),
        }
    }

    fn extract_image(
        &self,
        payload: &Payload,
        name: &str,
        path_id: i64,
        writer: &ArtifactWriter,
    ) -> Result<ObjectOutcome> {
        let Some(image) = &payload.image else {
            return Ok(ObjectOutcome::Skipped("has no image data".to_string()));
        };
        let png = self.codec.encode_png(image)?;
        let file_name = naming::artifact_file_name(name, path_id, "png");
        let artifact = writer.write(Strategy::Image.subdir(), &file_name, &png)?;
        Ok(ObjectOutcome::written(artifact, Strategy::Image))
    }

    fn extract_structured(
        &self,
        object: &dyn AssetObject,
        payload: &Payload,
        name: &str,
        writer: &ArtifactWriter,
    ) -> Result<ObjectOutcome> {
        let path_id = object.path_id();

        if object.has_type_tree() {
            match object
                .read_type_tree()
                .and_then(|tree| self.serialize_tree(&tree))
            {
                Ok(json) => {
                    let file_name = naming::artifact_file_name(name, path_id, "json");
                    let artifact =
                        writer.write(Strategy::StructuredJson.subdir(), &file_name, &json)?;
                    return Ok(ObjectOutcome::written(artifact, Strategy::StructuredJson));
                }
                Err(e) => {
                    tracing::warn!(path_id, error = %e, "field tree unavailable, trying raw data");
                }
            }
        }

        let Some((source, bytes)) = find_raw_bytes(object, payload) else {
            return Ok(ObjectOutcome::Skipped(
                "has no field tree or raw data".to_string(),
            ));
        };
        let file_name = naming::artifact_file_name(name, path_id, "dat");
        let artifact = writer.write(Strategy::StructuredRaw.subdir(), &file_name, &bytes)?;
        Ok(ObjectOutcome::Written {
            artifact,
            strategy: Strategy::StructuredRaw,
            raw_source: Some(source),
        })
    }

    fn serialize_tree(&self, tree: &serde_json::Value) -> Result<Vec<u8>> {
        use serde::Serialize;

        let indent = vec![b' '; self.config.json_indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        tree.serialize(&mut serializer)?;
        Ok(out)
    }
}

fn extract_text(
    payload: &Payload,
    name: &str,
    path_id: i64,
    writer: &ArtifactWriter,
) -> Result<ObjectOutcome> {
    let subdir = Strategy::Text.subdir();
    let artifact = match &payload.script {
        Some(Script::Text(text)) => writer.write(
            subdir,
            &naming::artifact_file_name(name, path_id, "txt"),
            text.as_bytes(),
        )?,
        Some(Script::Bytes(bytes)) => {
            let extension = if std::str::from_utf8(bytes).is_ok() {
                "txt"
            } else {
                "bytes"
            };
            writer.write(
                subdir,
                &naming::artifact_file_name(name, path_id, extension),
                bytes,
            )?
        }
        None => return Ok(ObjectOutcome::Skipped("has no script data".to_string())),
    };
    Ok(ObjectOutcome::written(artifact, Strategy::Text))
}

fn extract_audio(
    object: &dyn AssetObject,
    payload: &Payload,
    name: &str,
    writer: &ArtifactWriter,
) -> Result<ObjectOutcome> {
    let path_id = object.path_id();
    let Some(audio) = payload.audio_data.as_deref().filter(|a| !a.is_empty()) else {
        return Ok(ObjectOutcome::Skipped("has no audio data".to_string()));
    };

    let subdir = Strategy::Audio.subdir();
    let stem = naming::artifact_stem(name, path_id);
    let export = object
        .export_audio(payload, &stem, &writer.subdir_path(subdir))
        .unwrap_or_else(|e| {
            tracing::warn!(path_id, error = %e, "audio export failed, keeping raw data");
            AudioExport::Unavailable
        });

    let artifact = match export {
        AudioExport::File(path) if path.is_file() => writer.adopt(subdir, &path)?,
        AudioExport::Bytes(bytes) => writer.write(subdir, &format!("{stem}.wav"), &bytes)?,
        AudioExport::File(_) | AudioExport::Unavailable => {
            writer.write(subdir, &format!("{stem}.audioclipraw"), audio)?
        }
    };
    Ok(ObjectOutcome::written(artifact, Strategy::Audio))
}

fn extract_opaque(
    object: &dyn AssetObject,
    name: &str,
    writer: &ArtifactWriter,
) -> Result<ObjectOutcome> {
    let path_id = object.path_id();
    let Some(bytes) = object.raw_data().filter(|b| !b.is_empty()) else {
        return Ok(ObjectOutcome::Skipped("has no extractable data".to_string()));
    };
    let file_name = naming::artifact_file_name(name, path_id, "genericdat");
    let artifact = writer.write(Strategy::GenericRaw.subdir(), &file_name, &bytes)?;
    Ok(ObjectOutcome::Written {
        artifact,
        strategy: Strategy::GenericRaw,
        raw_source: Some(RawSource::Object),
    })
}

/// Probes the raw-byte candidates of a structured object in priority order:
/// the object's own accessor, the payload's raw bytes, then the payload's
/// script field.
pub(crate) fn find_raw_bytes(
    object: &dyn AssetObject,
    payload: &Payload,
) -> Option<(RawSource, Vec<u8>)> {
    if let Some(bytes) = object.raw_data().filter(|b| !b.is_empty()) {
        return Some((RawSource::Object, bytes));
    }
    if let Some(bytes) = payload.raw_data.as_ref().filter(|b| !b.is_empty()) {
        return Some((RawSource::Payload, bytes.clone()));
    }
    payload
        .byte_field(SCRIPT_FIELD)
        .filter(|b| !b.is_empty())
        .map(|bytes| (RawSource::Field(SCRIPT_FIELD.to_string()), bytes.to_vec()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::container::snapshot::SnapshotObject;
    use crate::image::PngCodec;
    use crate::manifest::ArtifactRef;
    use crate::manifest::EntryStatus;
    use crate::manifest::FAILURE_SENTINEL;
    use crate::report::NoopProgress;
    use crate::test_utils::ExportBehavior;
    use crate::test_utils::MemoryBackend;
    use crate::test_utils::MemoryObject;
    use crate::test_utils::RecordingProgress;
    use crate::test_utils::gradient_image;

    fn run(backend: &MemoryBackend, out: &Path) -> ExtractionReport {
        let codec = PngCodec::default();
        Extractor::new(backend, &codec, SyncConfig::default())
            .extract(Path::new("level.bundle"), out, &mut NoopProgress)
            .unwrap()
    }

    fn artifact(report: &ExtractionReport, path_id: i64) -> String {
        report
            .manifest
            .entry(path_id)
            .unwrap()
            .artifact
            .path()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_extracts_every_kind() {
        let temp = TempDir::new().unwrap();
        let mut script_obj = SnapshotObject::new(5, "MonoBehaviour").with_name("cfg");
        script_obj
            .byte_fields
            .insert(SCRIPT_FIELD.to_string(), vec![9, 9, 9]);

        let backend = MemoryBackend::new(vec![
            SnapshotObject::new(1, "Texture2D")
                .with_name("hero")
                .with_image(gradient_image(2, 2))
                .into(),
            SnapshotObject::new(2, "TextAsset")
                .with_name("dialog")
                .with_script(Script::Text("hello".into()))
                .into(),
            SnapshotObject::new(3, "TextAsset")
                .with_name("blob")
                .with_script(Script::Bytes(vec![0xFF, 0xFE, 0x00]))
                .into(),
            SnapshotObject::new(4, "MonoBehaviour")
                .with_name("stats")
                .with_type_tree(json!({"hp": 10, "tags": ["a"]}))
                .into(),
            script_obj.into(),
            SnapshotObject::new(6, "AudioClip")
                .with_name("theme")
                .with_audio(b"FSB5data".to_vec())
                .into(),
            SnapshotObject::new(7, "Mesh")
                .with_name("rock")
                .with_raw_data(vec![1, 2, 3, 4])
                .into(),
        ]);
        let report = run(&backend, temp.path());

        assert_eq!(report.objects_total, 7);
        assert_eq!(report.artifacts_written(), 7);
        assert_eq!(report.objects_failed, 0);
        assert_eq!(artifact(&report, 1), "Textures/hero_1.png");
        assert_eq!(artifact(&report, 2), "TextAssets/dialog_2.txt");
        assert_eq!(artifact(&report, 3), "TextAssets/blob_3.bytes");
        assert_eq!(artifact(&report, 4), "MonoBehaviours_JSON/stats_4.json");
        assert_eq!(artifact(&report, 5), "MonoBehaviours_DAT/cfg_5.dat");
        assert_eq!(artifact(&report, 6), "AudioClips/theme_6.audioclipraw");
        assert_eq!(artifact(&report, 7), "OtherAssets/rock_7.genericdat");

        let raw = report.manifest.entry(5).unwrap();
        assert_eq!(raw.declared_type, "MonoBehaviour_Raw");
        assert_eq!(raw.raw_source, Some(RawSource::Field(SCRIPT_FIELD.into())));
        assert_eq!(report.manifest.entry(7).unwrap().declared_type, "Mesh_genericdat");

        let png = fs::read(temp.path().join("Textures/hero_1.png")).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        assert_eq!(
            fs::read(temp.path().join("TextAssets/blob_3.bytes")).unwrap(),
            [0xFF, 0xFE, 0x00]
        );
        let tree: serde_json::Value = serde_json::from_slice(
            &fs::read(temp.path().join("MonoBehaviours_JSON/stats_4.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(tree, json!({"hp": 10, "tags": ["a"]}));
        assert_eq!(
            fs::read(temp.path().join("AudioClips/theme_6.audioclipraw")).unwrap(),
            b"FSB5data"
        );
        assert!(temp.path().join("manifest.json").is_file());
    }

    #[test]
    fn test_read_failure_records_sentinel() {
        let temp = TempDir::new().unwrap();
        let backend = MemoryBackend::new(vec![
            MemoryObject::new(SnapshotObject::new(1, "Texture2D").with_name("bad"))
                .failing_read("corrupt texture"),
            SnapshotObject::new(2, "Mesh")
                .with_name("ok")
                .with_raw_data(vec![1])
                .into(),
        ]);
        let report = run(&backend, temp.path());

        let failed = report.manifest.entry(1).unwrap();
        assert_eq!(failed.artifact, ArtifactRef::Failed);
        assert_eq!(failed.name, "Texture2D_1");
        assert_eq!(failed.declared_type, "Texture2D");
        assert_eq!(report.objects_failed, 1);
        assert!(report.has_warnings());
        assert_eq!(report.manifest.entry(2).unwrap().status(), EntryStatus::Extracted);

        let on_disk = fs::read_to_string(temp.path().join("manifest.json")).unwrap();
        assert!(on_disk.contains(FAILURE_SENTINEL));
    }

    #[test]
    fn test_objects_without_data_get_no_row() {
        let temp = TempDir::new().unwrap();
        let backend = MemoryBackend::new(vec![
            SnapshotObject::new(1, "Shader").with_name("s").into(),
            SnapshotObject::new(2, "AudioClip").with_audio(Vec::new()).into(),
            SnapshotObject::new(3, "MonoBehaviour").into(),
            SnapshotObject::new(4, "Sprite").into(),
        ]);
        let report = run(&backend, temp.path());
        assert!(report.manifest.entries.is_empty());
        assert_eq!(report.objects_skipped, 4);
        assert_eq!(report.warnings.len(), 4);
    }

    #[test]
    fn test_unnamed_object_uses_fallback_name() {
        let temp = TempDir::new().unwrap();
        let backend = MemoryBackend::new(vec![
            SnapshotObject::new(9, "Mesh")
                .with_name("???")
                .with_raw_data(vec![1])
                .into(),
        ]);
        let report = run(&backend, temp.path());
        assert_eq!(report.manifest.entries[0].name, "Mesh_9");
        assert_eq!(artifact(&report, 9), "OtherAssets/Mesh_9_9.genericdat");
    }

    #[test]
    fn test_audio_export_variants() {
        let temp = TempDir::new().unwrap();
        let scratch = temp.path().join("scratch");
        fs::create_dir(&scratch).unwrap();
        let clip = |id: i64| SnapshotObject::new(id, "AudioClip").with_name("clip").with_audio(b"PCM".to_vec());

        let backend = MemoryBackend::new(vec![
            MemoryObject::new(clip(1)).with_export(ExportBehavior::WriteFile {
                extension: "ogg".into(),
                elsewhere: None,
            }),
            MemoryObject::new(clip(2)).with_export(ExportBehavior::WriteFile {
                extension: "ogg".into(),
                elsewhere: Some(scratch.clone()),
            }),
            MemoryObject::new(clip(3)).with_export(ExportBehavior::Bytes(b"RIFFwav".to_vec())),
            MemoryObject::new(clip(4)).with_export(ExportBehavior::Fail("no codec".into())),
            MemoryObject::new(clip(5)).with_export(ExportBehavior::MissingFile),
        ]);
        let out = temp.path().join("out");
        let report = run(&backend, &out);

        assert_eq!(artifact(&report, 1), "AudioClips/clip_1.ogg");
        assert_eq!(artifact(&report, 2), "AudioClips/clip_2.ogg");
        assert!(!scratch.join("clip_2.ogg").exists());
        assert_eq!(artifact(&report, 3), "AudioClips/clip_3.wav");
        assert_eq!(fs::read(out.join("AudioClips/clip_3.wav")).unwrap(), b"RIFFwav");
        assert_eq!(artifact(&report, 4), "AudioClips/clip_4.audioclipraw");
        assert_eq!(artifact(&report, 5), "AudioClips/clip_5.audioclipraw");
        assert_eq!(fs::read(out.join("AudioClips/clip_4.audioclipraw")).unwrap(), b"PCM");
        assert_eq!(report.objects_failed, 0);
    }

    #[test]
    fn test_load_failure_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let codec = PngCodec::default();
        let backend = MemoryBackend::unreadable();
        let err = Extractor::new(&backend, &codec, SyncConfig::default())
            .extract(Path::new("broken.bundle"), &out, &mut NoopProgress)
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(!out.exists());
    }

    #[test]
    fn test_existing_manifest_kept_when_overwrite_disabled() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("manifest.json"), b"{}").unwrap();
        let codec = PngCodec::default();
        let backend = MemoryBackend::new(Vec::new());
        let config = SyncConfig {
            overwrite_manifest: false,
            ..Default::default()
        };
        let err = Extractor::new(&backend, &codec, config)
            .extract(Path::new("a.bundle"), temp.path(), &mut NoopProgress)
            .unwrap_err();
        assert!(matches!(err, SyncError::Manifest { .. }));
        assert_eq!(fs::read(temp.path().join("manifest.json")).unwrap(), b"{}");
    }

    #[test]
    fn test_empty_container_writes_empty_manifest() {
        let temp = TempDir::new().unwrap();
        let report = run(&MemoryBackend::new(Vec::new()), temp.path());
        assert!(report.manifest.entries.is_empty());
        assert!(report.manifest.source_container.is_absolute());
        assert!(temp.path().join("OtherAssets").is_dir());
        let loaded = Manifest::load(temp.path()).unwrap();
        assert!(loaded.entries.is_empty());
    }

    #[test]
    fn test_progress_events() {
        let temp = TempDir::new().unwrap();
        let backend = MemoryBackend::new(vec![
            SnapshotObject::new(1, "Mesh").with_raw_data(vec![0; 10]).into(),
            MemoryObject::new(SnapshotObject::new(2, "Mesh")).failing_read("boom"),
        ]);
        let codec = PngCodec::default();
        let mut progress = RecordingProgress::default();
        Extractor::new(&backend, &codec, SyncConfig::default())
            .extract(Path::new("a.bundle"), temp.path(), &mut progress)
            .unwrap();
        assert_eq!(progress.started, vec![(1, 2, 1), (2, 2, 2)]);
        assert_eq!(progress.completed, vec![1, 2]);
        assert_eq!(progress.bytes, 10);
        assert_eq!(progress.finished, 1);
    }

    #[test]
    fn test_structured_prefers_object_raw_over_field() {
        let temp = TempDir::new().unwrap();
        let mut obj = SnapshotObject::new(3, "MonoBehaviour").with_raw_data(vec![7, 7]);
        obj.payload_raw_data = Some(vec![8]);
        obj.byte_fields.insert(SCRIPT_FIELD.into(), vec![9]);
        let report = run(&MemoryBackend::new(vec![obj.into()]), temp.path());
        assert_eq!(report.manifest.entries[0].raw_source, Some(RawSource::Object));
        assert_eq!(
            fs::read(temp.path().join("MonoBehaviours_DAT/MonoBehaviour_3_3.dat")).unwrap(),
            [7, 7]
        );
    }

    #[test]
    fn test_unreadable_field_tree_falls_back_to_raw() {
        let temp = TempDir::new().unwrap();
        let obj = MemoryObject::new(
            SnapshotObject::new(4, "MonoBehaviour")
                .with_name("stats")
                .with_type_tree(json!({ "hp": 10 }))
                .with_raw_data(vec![1, 2, 3]),
        )
        .failing_type_tree("schema mismatch");
        assert!(obj.has_type_tree());

        let report = run(&MemoryBackend::new(vec![obj]), temp.path());
        let entry = report.manifest.entry(4).unwrap();
        assert_eq!(entry.status(), EntryStatus::Extracted);
        assert_eq!(entry.declared_type, "MonoBehaviour_Raw");
        assert_eq!(entry.strategy, Some(Strategy::StructuredRaw));
        assert_eq!(entry.raw_source, Some(RawSource::Object));
        assert_eq!(artifact(&report, 4), "MonoBehaviours_DAT/stats_4.dat");
        assert_eq!(
            fs::read(temp.path().join("MonoBehaviours_DAT/stats_4.dat")).unwrap(),
            [1, 2, 3]
        );
        assert!(!temp.path().join("MonoBehaviours_JSON/stats_4.json").exists());
    }
}
