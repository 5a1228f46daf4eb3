mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, dump, normalize, render, CheckArgs, DumpArgs, NormalizeArgs, RenderArgs};
use config::{Config, GlobalArgs};
use std::process::ExitCode;

/// Richtext CLI - load, render and check rich-text documents
#[derive(Parser, Debug)]
#[command(name = "richtext")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the editing view as HTML
    Render(RenderArgs),

    /// Load and save a document (round trip)
    Normalize(NormalizeArgs),

    /// Report custom attributes and classes the policy does not allow
    Check(CheckArgs),

    /// Print the model as JSON
    Dump(DumpArgs),
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| Config::load(&cwd))
        .map(|config| config.with_overrides(&cli.global))
        .and_then(|config| match cli.command {
            Command::Render(args) => render(args, &config),
            Command::Normalize(args) => normalize(args, &config),
            Command::Check(args) => check(args, &config),
            Command::Dump(args) => dump(args, &config),
        });

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!();
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            eprintln!();
            ExitCode::FAILURE
        }
    }
}
