//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use bundlesync_core::ExtractionReport;
use bundlesync_core::Manifest;
use bundlesync_core::RepackReport;
use bundlesync_core::manifest::EntryStatus;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ExtractionOutput {
    manifest_path: String,
    objects_total: usize,
    artifacts_written: usize,
    artifacts_by_strategy: BTreeMap<String, usize>,
    objects_failed: usize,
    objects_skipped: usize,
    bytes_written: u64,
    duration_ms: u128,
    warnings: Vec<String>,
}

impl From<&ExtractionReport> for ExtractionOutput {
    fn from(report: &ExtractionReport) -> Self {
        Self {
            manifest_path: report.manifest_path.display().to_string(),
            objects_total: report.objects_total,
            artifacts_written: report.artifacts_written(),
            artifacts_by_strategy: report.artifacts_by_strategy.clone(),
            objects_failed: report.objects_failed,
            objects_skipped: report.objects_skipped,
            bytes_written: report.bytes_written,
            duration_ms: report.duration.as_millis(),
            warnings: report.warnings.clone(),
        }
    }
}

#[derive(Serialize)]
struct RepackOutput {
    output_path: String,
    entries_total: usize,
    modified: usize,
    skipped: usize,
    failed: usize,
    bytes_written: u64,
    duration_ms: u128,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct ManifestRow<'a> {
    path_id: i64,
    #[serde(rename = "type")]
    declared_type: &'a str,
    name: &'a str,
    artifact: Option<&'a str>,
    status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<String>,
}

#[derive(Serialize)]
struct ManifestOutput<'a> {
    source_container: String,
    extracted: usize,
    failed: usize,
    entries: Vec<ManifestRow<'a>>,
}

impl<'a> From<&'a Manifest> for ManifestOutput<'a> {
    fn from(manifest: &'a Manifest) -> Self {
        Self {
            source_container: manifest.source_container.display().to_string(),
            extracted: manifest.count(EntryStatus::Extracted),
            failed: manifest.count(EntryStatus::Failed),
            entries: manifest
                .entries
                .iter()
                .map(|entry| ManifestRow {
                    path_id: entry.path_id,
                    declared_type: &entry.declared_type,
                    name: &entry.name,
                    artifact: entry.artifact.path(),
                    status: entry.status(),
                    strategy: entry.effective_strategy().map(|s| s.to_string()),
                })
                .collect(),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        Self::output(&JsonOutput::success("extract", ExtractionOutput::from(report)))
    }

    fn format_repack_result(&self, report: &RepackReport) -> Result<()> {
        let data = RepackOutput {
            output_path: report.output_path.display().to_string(),
            entries_total: report.entries_total,
            modified: report.modified,
            skipped: report.skipped,
            failed: report.failed,
            bytes_written: report.bytes_written,
            duration_ms: report.duration.as_millis(),
            warnings: report.warnings.clone(),
        };
        Self::output(&JsonOutput::success("repack", data))
    }

    fn format_manifest_short(&self, manifest: &Manifest) -> Result<()> {
        Self::output(&JsonOutput::success("list", ManifestOutput::from(manifest)))
    }

    fn format_manifest_long(&self, manifest: &Manifest) -> Result<()> {
        self.format_manifest_short(manifest)
    }
}
