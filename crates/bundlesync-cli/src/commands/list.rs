//! List command implementation

use crate::cli::ListArgs;
use crate::error::add_sync_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use bundlesync_core::read_manifest;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let manifest = add_sync_context(read_manifest(&args.input_dir), &args.input_dir)?;

    if args.long {
        formatter.format_manifest_long(&manifest)?;
    } else {
        formatter.format_manifest_short(&manifest)?;
    }

    Ok(())
}
