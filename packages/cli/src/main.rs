mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply_command, diff, init, listen, validate, ApplyArgs, DiffArgs, InitArgs, ListenArgs,
    ValidateArgs,
};
use tracing_subscriber::EnvFilter;

/// NodeDoc CLI - live sync and offline editing for NodeDoc documents
#[derive(Parser, Debug)]
#[command(name = "nodedoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a nodedoc.config.json
    Init(InitArgs),

    /// Check documents against the schema and citation rules
    Validate(ValidateArgs),

    /// Apply one edit proposal to a document file
    Apply(ApplyArgs),

    /// Show block-level changes between two documents
    Diff(DiffArgs),

    /// Connect to the event stream and apply incoming proposals
    Listen(ListenArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Validate(args) => validate(args),
            Command::Apply(args) => apply_command(args),
            Command::Diff(args) => diff(args),
            Command::Listen(args) => listen(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
