use super::emit;
use crate::config::{open, Config};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Input XML document
    pub input: PathBuf,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fail when the input needed repairs
    #[arg(long)]
    pub strict: bool,
}

pub fn normalize(args: NormalizeArgs, config: &Config) -> Result<bool> {
    let editor = open(config, &args.input)?;

    for recovery in editor.recoveries() {
        eprintln!(
            "  {} <{}> {:?}: {}",
            "repaired".yellow().bold(),
            recovery.element,
            recovery.action,
            recovery.detail
        );
    }

    emit(&editor.data_xml()?, args.output.as_deref())?;
    Ok(!(args.strict && !editor.recoveries().is_empty()))
}
