//! Rendering of extraction, repack and manifest results.
//!
//! `--json` selects machine-readable output on stdout. Otherwise results are
//! styled for a terminal and `--quiet` suppresses them.

mod formatter;
mod human;
mod json;

pub use formatter::OutputFormatter;

use human::HumanFormatter;
use json::JsonFormatter;

/// Picks the formatter for the global output flags.
pub fn create_formatter(json: bool, verbose: bool, quiet: bool) -> Box<dyn OutputFormatter> {
    if json {
        return Box::new(JsonFormatter);
    }
    Box::new(HumanFormatter::new(verbose, quiet))
}
