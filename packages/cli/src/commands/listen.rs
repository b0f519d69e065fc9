use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use nodedoc_editor::Revision;
use nodedoc_sync::{EnvCredential, RunExit, SyncConfig, SyncEvent, SyncSession};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Document to keep in sync, as <DOC_ID>=<PATH> (repeatable)
    #[arg(short, long = "doc", value_parser = parse_doc_pair)]
    pub docs: Vec<(String, PathBuf)>,

    /// Extra channel to subscribe (repeatable)
    #[arg(short, long = "channel")]
    pub channels: Vec<String>,

    /// Write accepted revisions back to their files
    #[arg(short, long)]
    pub write: bool,
}

fn parse_doc_pair(pair: &str) -> Result<(String, PathBuf), String> {
    match pair.split_once('=') {
        Some((id, path)) if !id.trim().is_empty() && !path.is_empty() => {
            Ok((id.trim().to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected <DOC_ID>=<PATH>, got `{}`", pair)),
    }
}

pub fn listen(args: ListenArgs, cwd: &Path) -> Result<()> {
    let mut config = SyncConfig::load(cwd)?;
    for channel in &args.channels {
        if !config.channels.contains(channel) {
            config.channels.push(channel.clone());
        }
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(config, args))
}

async fn run(config: SyncConfig, args: ListenArgs) -> Result<()> {
    println!(
        "{} Listening on {}",
        "📡".bright_blue(),
        config.stream_url()
    );

    let session = SyncSession::new(config, Arc::new(EnvCredential::default()))?;
    for (doc_id, path) in &args.docs {
        session.load_file(doc_id.clone(), path)?;
        println!("  {} Loaded {} from {}", "✓".green(), doc_id, path.display());
    }

    let events = session.events();
    let report = session.start().await;
    if !report.connected {
        bail!("No credential in NODEDOC_TOKEN; not connecting");
    }
    for channel in &report.subscribed {
        println!("  {} Subscribed {}", "✓".green(), channel);
    }
    for failure in &report.failed {
        println!("  {} {}", "✗".red(), failure);
    }

    match session.run(events, |event| print_event(event, &args)).await {
        RunExit::Transport(error) => bail!("Stream failed: {}", error),
        RunExit::Handler(error) => Err(error),
        RunExit::Interrupted | RunExit::Closed => {
            println!("{} Disconnected", "●".dimmed());
            Ok(())
        }
    }
}

fn print_event(event: &SyncEvent, args: &ListenArgs) -> Result<()> {
    match event {
        SyncEvent::Opened => println!("{} Stream open", "●".green()),
        SyncEvent::Message(frame) => {
            tracing::debug!(channel = ?frame.channel, kind = ?frame.kind, "Message");
        }
        SyncEvent::Revision(revision) => {
            println!(
                "{} {} r{} ({} changes)",
                "✏️".bright_blue(),
                revision.doc_id,
                revision.number,
                revision.changes.len()
            );
            if args.write {
                write_back(revision, &args.docs)?;
            }
        }
        SyncEvent::Rejected { error, .. } => {
            println!("{} {} {}", "✗".red(), error.code().yellow(), error);
        }
        SyncEvent::TransportError(_) => {}
    }
    Ok(())
}

/// Write an accepted revision over the file its document was loaded from
fn write_back(revision: &Revision, docs: &[(String, PathBuf)]) -> Result<()> {
    if let Some((_, path)) = docs.iter().find(|(id, _)| *id == revision.doc_id) {
        fs::write(path, revision.document.to_json_pretty())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
