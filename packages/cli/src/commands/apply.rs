use super::diff::print_changes;
use super::validate::load_document;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use nodedoc_document::diff_blocks;
use nodedoc_editor::{apply, parse, EditProposal};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// NodeDoc JSON file to edit
    pub document: PathBuf,

    /// Proposal JSON: message metadata or a bare proposal object
    pub proposal: PathBuf,

    /// Write the edited document here
    #[arg(short, long, conflicts_with = "in_place")]
    pub output: Option<PathBuf>,

    /// Overwrite the input document
    #[arg(short, long)]
    pub in_place: bool,
}

/// Read a proposal file in either metadata or bare form
pub fn load_proposal(path: &Path) -> Result<EditProposal> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&source)
        .with_context(|| format!("{} is not JSON", path.display()))?;

    if let Some(proposal) = parse(&value) {
        return Ok(proposal);
    }
    serde_json::from_value(value)
        .with_context(|| format!("{} carries no usable edit proposal", path.display()))
}

pub fn apply_command(args: ApplyArgs) -> Result<()> {
    let doc = load_document(&args.document)?;
    let proposal = load_proposal(&args.proposal)?;

    println!(
        "{} {} {} on {}",
        "✏️".bright_blue(),
        proposal.action.as_str().bold(),
        proposal.block_type.as_str(),
        args.document.display()
    );

    let edited = apply(&proposal, &doc)
        .map_err(|e| anyhow!("[{}] {}", e.code(), e))
        .context("Proposal rejected")?;

    let changes = diff_blocks(&doc, &edited);
    print_changes(&changes);

    let destination = match (&args.output, args.in_place) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(args.document.clone()),
        (None, false) => None,
    };

    match destination {
        Some(path) => {
            fs::write(&path, edited.to_json_pretty())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("  {} Wrote {}", "✓".green(), path.display());
        }
        None => println!("{}", edited.to_json_pretty()),
    }

    Ok(())
}
