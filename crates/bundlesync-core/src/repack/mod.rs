//! Artifact-to-container repacking.

pub mod engine;

pub use engine::Repacker;
