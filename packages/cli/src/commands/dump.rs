use super::emit;
use crate::config::{open, Config};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Input XML document
    pub input: PathBuf,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn dump(args: DumpArgs, config: &Config) -> Result<bool> {
    let editor = open(config, &args.input)?;
    let model = editor.model();
    let tree = model.to_fragment(model.root())?;
    emit(&serde_json::to_string_pretty(&tree)?, args.output.as_deref())?;
    Ok(true)
}
