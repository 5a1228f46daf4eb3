pub mod check;
pub mod dump;
pub mod normalize;
pub mod render;

pub use check::{check, CheckArgs};
pub use dump::{dump, DumpArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use render::{render, RenderArgs};

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

/// Print `output`, or write it to `path` when one is given.
pub(crate) fn emit(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output)?;
            eprintln!("  {} {}", "✓".green(), path.display());
        }
        None => println!("{}", output),
    }
    Ok(())
}
