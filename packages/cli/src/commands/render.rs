use super::emit;
use crate::config::{open, Config};
use anyhow::{anyhow, Result};
use clap::Args;
use richtext_editor::RenderOptions;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Input XML document
    pub input: PathBuf,

    /// Indent block structure
    #[arg(long)]
    pub pretty: bool,

    /// Keep model id bookkeeping attributes
    #[arg(long)]
    pub model_ids: bool,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn render(args: RenderArgs, config: &Config) -> Result<bool> {
    let html = render_file(&args, config)?;
    emit(&html, args.output.as_deref())?;
    Ok(true)
}

fn render_file(args: &RenderArgs, config: &Config) -> Result<String> {
    let editor = open(config, &args.input)?;
    let options = RenderOptions {
        pretty: args.pretty,
        model_ids: args.model_ids,
        ..RenderOptions::default()
    };
    editor
        .html(&options)
        .ok_or_else(|| anyhow!("nothing rendered for {}", args.input.display()))
}
