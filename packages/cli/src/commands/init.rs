use anyhow::Result;
use clap::Args;
use colored::Colorize;
use nodedoc_sync::{SyncConfig, DEFAULT_CONFIG_NAME};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Sync server origin
    #[arg(short, long, default_value = "http://127.0.0.1:3030")]
    pub base_url: String,

    /// Channel to subscribe on start (repeatable)
    #[arg(short, long = "channel")]
    pub channels: Vec<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing NodeDoc sync config...".bright_blue().bold());

    let config = SyncConfig {
        base_url: args.base_url.trim_end_matches('/').to_string(),
        channels: args
            .channels
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        ..SyncConfig::default()
    };
    config.check()?;

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("Next steps:");
    println!("  1. export NODEDOC_TOKEN=<credential>");
    println!("  2. Run: nodedoc listen --doc <ID>=<PATH>");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            base_url: "https://sync.example.org/".to_string(),
            channels: vec![" thread-1 ".to_string(), "".to_string()],
            force: false,
        };

        init(args, dir.path()).unwrap();

        let config = SyncConfig::from_file(&dir.path().join(DEFAULT_CONFIG_NAME)).unwrap();
        assert_eq!(config.base_url, "https://sync.example.org");
        assert_eq!(config.channels, vec!["thread-1"]);
        assert_eq!(config.stream_path, "/api/stream");
    }

    #[test]
    fn test_init_keeps_existing_config_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_NAME);
        fs::write(&path, "{}").unwrap();

        let args = InitArgs {
            base_url: "http://127.0.0.1:3030".to_string(),
            channels: vec![],
            force: false,
        };
        init(args, dir.path()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }
}
