//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use bundlesync_core::ExtractionReport;
use bundlesync_core::Manifest;
use bundlesync_core::RepackReport;
use bundlesync_core::manifest::ArtifactRef;
use bundlesync_core::manifest::EntryStatus;
use console::Term;
use console::style;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn write_header(&self, message: &str) {
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(message);
        }
    }

    fn write_warnings(&self, warnings: &[String]) {
        if warnings.is_empty() {
            return;
        }
        let _ = self.term.write_line("");
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{}", style("Warnings:").yellow().bold()));
        } else {
            let _ = self.term.write_line("Warnings:");
        }
        for warning in warnings {
            let _ = self.term.write_line(&format!("  - {warning}"));
        }
    }

    fn status_label(&self, status: EntryStatus) -> String {
        let label = format!("{:<9}", status.to_string());
        if !self.use_colors {
            return label;
        }
        match status {
            EntryStatus::Extracted => style(label).green().to_string(),
            EntryStatus::Failed => style(label).red().bold().to_string(),
            EntryStatus::Empty => style(label).dim().to_string(),
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.write_header("Extraction complete");
        let _ = self
            .term
            .write_line(&format!("  Objects:          {}", report.objects_total));
        let _ = self.term.write_line(&format!(
            "  Artifacts:        {}",
            report.artifacts_written()
        ));
        if report.objects_failed > 0 {
            let _ = self
                .term
                .write_line(&format!("  Failed:           {}", report.objects_failed));
        }
        if report.objects_skipped > 0 {
            let _ = self
                .term
                .write_line(&format!("  Skipped:          {}", report.objects_skipped));
        }
        let _ = self.term.write_line(&format!(
            "  Total size:       {}",
            Self::format_size(report.bytes_written)
        ));
        let _ = self.term.write_line(&format!(
            "  Manifest:         {}",
            report.manifest_path.display()
        ));

        if self.verbose {
            for (strategy, count) in &report.artifacts_by_strategy {
                let _ = self
                    .term
                    .write_line(&format!("    {strategy:<16}{count}"));
            }
            let _ = self
                .term
                .write_line(&format!("  Duration:         {:?}", report.duration));
            self.write_warnings(&report.warnings);
        }

        Ok(())
    }

    fn format_repack_result(&self, report: &RepackReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.write_header(&format!(
            "Container written: {}",
            report.output_path.display()
        ));
        let _ = self
            .term
            .write_line(&format!("  Entries:          {}", report.entries_total));
        let _ = self
            .term
            .write_line(&format!("  Modified:         {}", report.modified));
        if report.skipped > 0 {
            let _ = self
                .term
                .write_line(&format!("  Skipped:          {}", report.skipped));
        }
        if report.failed > 0 {
            let _ = self
                .term
                .write_line(&format!("  Failed:           {}", report.failed));
        }
        let _ = self.term.write_line(&format!(
            "  Container size:   {}",
            Self::format_size(report.bytes_written)
        ));

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration:         {:?}", report.duration));
            self.write_warnings(&report.warnings);
        }

        Ok(())
    }

    fn format_manifest_short(&self, manifest: &Manifest) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for entry in &manifest.entries {
            let line = match &entry.artifact {
                ArtifactRef::Path(path) => path.clone(),
                ArtifactRef::Failed | ArtifactRef::None => {
                    format!("({}) {}", entry.status(), entry.name)
                }
            };
            let _ = self.term.write_line(&line);
        }

        Ok(())
    }

    fn format_manifest_long(&self, manifest: &Manifest) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let _ = self.term.write_line(&format!(
            "Source: {}",
            manifest.source_container.display()
        ));
        for entry in &manifest.entries {
            let _ = self.term.write_line(&format!(
                "{:>20}  {}  {:<28} {}",
                entry.path_id,
                self.status_label(entry.status()),
                entry.declared_type,
                entry.artifact.path().unwrap_or(entry.name.as_str())
            ));
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Total: {} entries, {} extracted, {} failed",
            manifest.entries.len(),
            manifest.count(EntryStatus::Extracted),
            manifest.count(EntryStatus::Failed)
        ));

        Ok(())
    }
}
