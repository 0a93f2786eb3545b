//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bundlesync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract every object of a container into editable files
    Extract(ExtractArgs),
    /// Apply edited files to the original container and write a new one
    Repack(RepackArgs),
    /// List the manifest of an extracted directory
    List(ListArgs),
    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the container file
    #[arg(value_name = "CONTAINER")]
    pub container: PathBuf,

    /// Directory to write artifacts and manifest.json into
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Indentation width of JSON artifacts and the manifest
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(0..=16))]
    pub json_indent: u8,

    /// Keep an existing manifest.json instead of replacing it
    #[arg(long)]
    pub keep_manifest: bool,
}

#[derive(clap::Args)]
pub struct RepackArgs {
    /// Directory produced by `extract` (holds manifest.json)
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Path of the container to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Maximum size of a single artifact read back (e.g. 64M)
    #[arg(long, value_parser = parse_byte_size)]
    pub max_artifact_size: Option<u64>,

    /// Do not create the output's parent directory
    #[arg(long)]
    pub no_create_dirs: bool,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Directory produced by `extract` (holds manifest.json)
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Show identity, type and status of every row
    #[arg(short, long)]
    pub long: bool,
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}
