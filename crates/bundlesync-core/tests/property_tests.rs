//! Property-based tests for naming, paths and artifact round trips.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bundlesync_core::SyncConfig;
use bundlesync_core::container::snapshot::SnapshotObject;
use bundlesync_core::extract_bundle;
use bundlesync_core::image::ImageCodec;
use bundlesync_core::image::PngCodec;
use bundlesync_core::image::RasterImage;
use bundlesync_core::naming::display_name;
use bundlesync_core::naming::sanitize_name;
use bundlesync_core::read_manifest;
use bundlesync_core::repack_bundle;
use bundlesync_core::test_utils::read_snapshot;
use bundlesync_core::test_utils::write_snapshot;
use bundlesync_core::types::ArtifactPath;
use proptest::prelude::*;
use std::collections::HashSet;
use tempfile::TempDir;

proptest! {
    /// Sanitized names only hold the allowed characters and never carry
    /// surrounding whitespace.
    #[test]
    fn prop_sanitized_names_are_clean(name in ".{0,40}") {
        let clean = sanitize_name(&name);
        prop_assert!(clean
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-')));
        prop_assert_eq!(clean.trim(), clean.as_str());
        prop_assert!(!clean.contains('/'));
    }

    /// Sanitizing is idempotent.
    #[test]
    fn prop_sanitize_idempotent(name in ".{0,40}") {
        let once = sanitize_name(&name);
        prop_assert_eq!(sanitize_name(&once), once.clone());
    }

    /// Display names are never empty.
    #[test]
    fn prop_display_name_never_empty(name in proptest::option::of(".{0,20}"), id in any::<i64>()) {
        prop_assert!(!display_name(name.as_deref(), "Mesh", id).is_empty());
    }

    /// Any path with `..` is rejected.
    #[test]
    fn prop_parent_traversal_rejected(
        prefix in "([a-z]+/){0,5}",
        suffix in "([a-z]+/?){0,5}"
    ) {
        let raw = format!("{prefix}../{suffix}");
        prop_assert!(ArtifactPath::validate(&raw).is_err());
    }

    /// Plain relative paths are accepted.
    #[test]
    fn prop_plain_relative_paths_accepted(
        components in prop::collection::vec("[a-zA-Z0-9_-]{1,20}", 1..5)
    ) {
        prop_assert!(ArtifactPath::validate(&components.join("/")).is_ok());
    }

    /// PNG artifacts reproduce every pixel.
    #[test]
    fn prop_png_pixel_exact(
        (width, height, rgba) in (1u32..12, 1u32..12).prop_flat_map(|(w, h)| {
            (Just(w), Just(h), prop::collection::vec(any::<u8>(), (w * h * 4) as usize))
        })
    ) {
        let codec = PngCodec::default();
        let image = RasterImage::new(width, height, rgba).unwrap();
        let decoded = codec.decode(&codec.encode_png(&image).unwrap()).unwrap();
        prop_assert_eq!(decoded, image);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Objects with colliding names still get distinct artifact paths, and
    /// unmodified artifacts repack to identical raw bytes.
    #[test]
    fn prop_artifact_paths_unique_and_round_trip(
        objects in prop::collection::btree_map(
            0i64..10_000,
            ("[a-c?]{0,3}", prop::collection::vec(any::<u8>(), 1..32)),
            1..12,
        )
    ) {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("level.bundle");
        let originals: Vec<SnapshotObject> = objects
            .iter()
            .map(|(id, (name, bytes))| {
                SnapshotObject::new(*id, "Mesh").with_name(name.clone()).with_raw_data(bytes.clone())
            })
            .collect();
        write_snapshot(&source, originals.clone());

        let out = temp.path().join("out");
        extract_bundle(&source, &out, &SyncConfig::default()).unwrap();
        let manifest = read_manifest(&out).unwrap();
        prop_assert_eq!(manifest.entries.len(), objects.len());

        let paths: HashSet<_> = manifest
            .entries
            .iter()
            .map(|e| e.artifact.path().unwrap().to_string())
            .collect();
        prop_assert_eq!(paths.len(), objects.len());

        let dest = temp.path().join("new.bundle");
        repack_bundle(&out, &dest, &SyncConfig::default()).unwrap();
        let repacked = read_snapshot(&dest);
        for original in &originals {
            prop_assert_eq!(repacked.get(original.path_id), Some(original));
        }
    }
}
