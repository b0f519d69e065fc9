use anyhow::bail;
use nodedoc_sync::{EnvCredential, SyncConfig, SyncEvent, SyncSession};
use serde_json::json;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct Args {
    config_dir: PathBuf,
    documents: Vec<(String, PathBuf)>,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_dir = std::env::current_dir()?;
    let mut documents = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--doc" | "-d" => {
                let Some(pair) = args.get(i + 1) else {
                    bail!("--doc requires a value");
                };
                let Some((doc_id, path)) = pair.split_once('=') else {
                    bail!("--doc expects <DOC_ID>=<PATH>, got `{}`", pair);
                };
                documents.push((doc_id.to_string(), PathBuf::from(path)));
                i += 2;
            }
            "--help" | "-h" => {
                println!("Usage: nodedoc-sync [OPTIONS] [CONFIG_DIR]");
                println!();
                println!("Options:");
                println!("  -d, --doc <ID=PATH>     Load a NodeDoc JSON file under a document id");
                println!("  -h, --help              Show this help message");
                println!();
                println!("Arguments:");
                println!("  [CONFIG_DIR]            Directory containing nodedoc.config.json (default: current dir)");
                println!();
                println!("The credential is read from NODEDOC_TOKEN.");
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => {
                config_dir = PathBuf::from(arg);
                i += 1;
            }
            other => bail!("Unknown argument: {}", other),
        }
    }

    Ok(Args {
        config_dir,
        documents,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = parse_args()?;
    let config = SyncConfig::load(&args.config_dir)?;

    let session = SyncSession::new(config, Arc::new(EnvCredential::default()))?;
    for (doc_id, path) in &args.documents {
        session.load_file(doc_id.clone(), path)?;
    }

    let events = session.events();
    let report = session.start().await;
    if !report.connected {
        bail!("No credential in NODEDOC_TOKEN; not connecting");
    }

    let exit = session
        .run(events, |event| {
            print_event(event);
            Ok::<_, Infallible>(())
        })
        .await;
    tracing::debug!(?exit, "Event loop ended");
    Ok(())
}

fn print_event(event: &SyncEvent) {
    let line = match event {
        SyncEvent::Opened => json!({ "event": "opened" }),
        SyncEvent::Message(frame) => json!({
            "event": "message",
            "channel": frame.channel,
            "type": frame.kind,
        }),
        SyncEvent::Revision(revision) => json!({
            "event": "revision",
            "docId": revision.doc_id,
            "number": revision.number,
            "changes": revision.changes,
            "appliedAt": revision.applied_at.to_rfc3339(),
        }),
        SyncEvent::Rejected { error, .. } => json!({
            "event": "rejected",
            "code": error.code(),
            "error": error.to_string(),
        }),
        SyncEvent::TransportError(error) => json!({
            "event": "transport_error",
            "error": error.to_string(),
        }),
    };
    println!("{}", line);
}
