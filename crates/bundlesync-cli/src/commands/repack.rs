//! Repack command implementation.

use crate::cli::RepackArgs;
use crate::error::add_sync_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Result;
use anyhow::bail;
use bundlesync_core::NoopProgress;
use bundlesync_core::SyncConfig;
use bundlesync_core::repack_bundle_with_progress;

pub fn execute(
    args: &RepackArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    if !args.input_dir.is_dir() {
        bail!("Artifact directory not found: {}", args.input_dir.display());
    }

    let defaults = SyncConfig::default();
    let config = SyncConfig {
        max_artifact_size: args
            .max_artifact_size
            .unwrap_or(defaults.max_artifact_size),
        create_parent_dirs: !args.no_create_dirs,
        ..defaults
    };

    let report = if show_progress && CliProgress::should_show() {
        let mut progress = CliProgress::new("Repacking");
        add_sync_context(
            repack_bundle_with_progress(&args.input_dir, &args.output, &config, &mut progress),
            &args.input_dir,
        )?
    } else {
        let mut noop = NoopProgress;
        add_sync_context(
            repack_bundle_with_progress(&args.input_dir, &args.output, &config, &mut noop),
            &args.input_dir,
        )?
    };

    formatter.format_repack_result(&report)?;

    Ok(())
}
