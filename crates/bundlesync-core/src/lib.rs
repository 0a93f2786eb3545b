//! Round-trip synchronization between asset containers and editable files.
//!
//! `bundlesync-core` extracts every object of a Unity-style asset container
//! into a typed artifact on disk (PNG textures, text, JSON field trees, raw
//! byte dumps, audio) plus a `manifest.json`, and later replays edited
//! artifacts into a fresh copy of the original container.
//!
//! Container parsing and image decoding sit behind the
//! [`container::ContainerBackend`] and [`image::ImageCodec`] traits. The
//! crate ships a JSON snapshot backend and a PNG codec.
//!
//! # Examples
//!
//! ```no_run
//! use bundlesync_core::SyncConfig;
//! use bundlesync_core::extract_bundle;
//! use bundlesync_core::repack_bundle;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::default();
//! let report = extract_bundle("level.bundle", "/tmp/level", &config)?;
//! println!("Extracted {} artifacts", report.artifacts_written());
//!
//! // ... edit files under /tmp/level ...
//!
//! let report = repack_bundle("/tmp/level", "level_modded.bundle", &config)?;
//! println!("Modified {} objects", report.modified);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod classify;
pub mod config;
pub mod container;
pub mod error;
pub mod extraction;
pub mod image;
pub mod manifest;
pub mod naming;
pub mod repack;
pub mod report;
pub mod test_utils;
pub mod types;

// Re-export main API types
pub use api::extract_bundle;
pub use api::extract_bundle_with_progress;
pub use api::read_manifest;
pub use api::repack_bundle;
pub use api::repack_bundle_with_progress;
pub use classify::AssetKind;
pub use classify::Strategy;
pub use config::SyncConfig;
pub use error::Result;
pub use error::SyncError;
pub use manifest::Manifest;
pub use manifest::ManifestEntry;
pub use report::ExtractionReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use report::RepackReport;
