//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::add_sync_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Result;
use anyhow::bail;
use bundlesync_core::NoopProgress;
use bundlesync_core::SyncConfig;
use bundlesync_core::extract_bundle_with_progress;

pub fn execute(
    args: &ExtractArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    if !args.container.is_file() {
        bail!("Container not found: {}", args.container.display());
    }

    let config = SyncConfig {
        json_indent: usize::from(args.json_indent),
        overwrite_manifest: !args.keep_manifest,
        ..Default::default()
    };

    let report = if show_progress && CliProgress::should_show() {
        let mut progress = CliProgress::new("Extracting");
        add_sync_context(
            extract_bundle_with_progress(&args.container, &args.output_dir, &config, &mut progress),
            &args.container,
        )?
    } else {
        let mut noop = NoopProgress;
        add_sync_context(
            extract_bundle_with_progress(&args.container, &args.output_dir, &config, &mut noop),
            &args.container,
        )?
    };

    formatter.format_extraction_result(&report)?;

    Ok(())
}
