use super::validate::load_document;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use nodedoc_document::{diff_blocks, BlockChange};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Earlier revision
    pub old: PathBuf,

    /// Later revision
    pub new: PathBuf,

    /// Print the change list as JSON
    #[arg(long)]
    pub json: bool,
}

pub(crate) fn print_changes(changes: &[BlockChange]) {
    if changes.is_empty() {
        println!("  {}", "no block changes".dimmed());
        return;
    }

    for change in changes {
        match change {
            BlockChange::Inserted { id, index } => {
                println!("  {} {} @{}", "+".green(), id.as_str(), index)
            }
            BlockChange::Removed { id, index } => {
                println!("  {} {} @{}", "-".red(), id.as_str(), index)
            }
            BlockChange::Changed { id, index } => {
                println!("  {} {} @{}", "~".yellow(), id.as_str(), index)
            }
        }
    }
}

pub fn diff(args: DiffArgs) -> Result<()> {
    let old = load_document(&args.old)?;
    let new = load_document(&args.new)?;
    let changes = diff_blocks(&old, &new);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    } else {
        println!(
            "{} {} → {}",
            "🔍".bright_blue(),
            args.old.display(),
            args.new.display()
        );
        print_changes(&changes);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_diff_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.json");
        let new = dir.path().join("new.json");
        fs::write(
            &old,
            r#"{ "schemaVersion": 1, "title": "T",
                 "blocks": [{ "id": "a", "type": "paragraph", "text": "x" }] }"#,
        )
        .unwrap();
        fs::write(
            &new,
            r#"{ "schemaVersion": 1, "title": "T",
                 "blocks": [{ "id": "b", "type": "paragraph", "text": "x" }] }"#,
        )
        .unwrap();

        diff(DiffArgs {
            old,
            new,
            json: true,
        })
        .unwrap();
    }

    #[test]
    fn test_diff_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let args = DiffArgs {
            old: dir.path().join("nope.json"),
            new: dir.path().join("nope.json"),
            json: false,
        };
        assert!(diff(args).is_err());
    }
}
