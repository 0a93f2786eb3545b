//! Output formatter trait for CLI results.

use anyhow::Result;
use bundlesync_core::ExtractionReport;
use bundlesync_core::Manifest;
use bundlesync_core::RepackReport;
use serde::Serialize;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format extraction result
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()>;

    /// Format repack result
    fn format_repack_result(&self, report: &RepackReport) -> Result<()>;

    /// Format manifest rows, one name per line
    fn format_manifest_short(&self, manifest: &Manifest) -> Result<()>;

    /// Format manifest rows with identity, type and status
    fn format_manifest_long(&self, manifest: &Manifest) -> Result<()>;
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
        }
    }
}
