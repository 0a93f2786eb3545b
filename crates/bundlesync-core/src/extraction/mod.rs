//! Container-to-artifact extraction.

pub mod engine;
pub mod writer;

pub use engine::Extractor;
pub use writer::ArtifactWriter;
pub use writer::WrittenArtifact;
