use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use nodedoc_document::{citations, BlockKind, NodeDoc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// NodeDoc JSON files to validate
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Print per-kind block counts
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Load a document from disk, validating schema and citations
pub fn load_document(path: &Path) -> Result<NodeDoc> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = NodeDoc::from_json(&source)
        .with_context(|| format!("{} is not a valid NodeDoc", path.display()))?;
    citations::check_document(&doc)
        .with_context(|| format!("{} has malformed citations", path.display()))?;
    Ok(doc)
}

fn kind_counts(doc: &NodeDoc) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for kind in BlockKind::ALL {
        let n = doc.blocks.iter().filter(|b| b.kind() == kind).count();
        if n > 0 {
            counts.insert(kind.as_str(), n);
        }
    }
    counts
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let json_output = args.format == "json";
    let mut failures = 0;
    let mut reports = Vec::new();

    for path in &args.files {
        match load_document(path) {
            Ok(doc) => {
                let citation_count: usize = doc.blocks.iter().map(|b| b.citations().len()).sum();
                if json_output {
                    reports.push(serde_json::json!({
                        "file": path.display().to_string(),
                        "valid": true,
                        "title": doc.title,
                        "blocks": doc.len(),
                        "citations": citation_count,
                        "kinds": kind_counts(&doc),
                    }));
                } else {
                    println!(
                        "  {} {} ({} blocks, {} citations)",
                        "✓".green(),
                        path.display(),
                        doc.len(),
                        citation_count
                    );
                    if args.verbose {
                        for (kind, n) in kind_counts(&doc) {
                            println!("      {:<12} {}", kind, n);
                        }
                    }
                }
            }
            Err(e) => {
                failures += 1;
                if json_output {
                    reports.push(serde_json::json!({
                        "file": path.display().to_string(),
                        "valid": false,
                        "error": format!("{:#}", e),
                    }));
                } else {
                    println!("  {} {}", "✗".red(), path.display());
                    println!("      {}", format!("{:#}", e).red());
                }
            }
        }
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!();
        println!("   Files checked: {}", args.files.len());
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} documents invalid", failures, args.files.len()));
    }
    Ok(())
}
