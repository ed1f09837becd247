//! userjs transcript replay
//!
//! Feeds a recorded transcript of host messages to an in-memory session
//! and prints every message the engine sends back, one JSON envelope per
//! line.
//!
//! Usage:
//!   userjs-replay session.jsonl --config engine.toml

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use userjs_bridge::{encode_core, CoreMessage};
use userjs_engine::EngineConfig;
use userjs_replay::{read_transcript, Replay};

#[derive(Parser, Debug)]
#[command(name = "userjs-replay")]
#[command(about = "Replay a host transcript against the userscript engine")]
struct Args {
    /// Transcript file, one framed host message per line
    transcript: PathBuf,

    /// Engine configuration (TOML, `[engine]` table)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not acknowledge injections automatically
    #[arg(long)]
    no_ack: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn print_all(messages: &[CoreMessage]) -> Result<()> {
    for message in messages {
        println!("{}", encode_core(message)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = args.config.map(EngineConfig::load_from).unwrap_or_default();
    let messages = read_transcript(&args.transcript).await?;
    info!(messages = messages.len(), "Replaying transcript");

    let replay = Replay::new(config, !args.no_ack);
    print_all(&replay.start())?;
    for message in messages {
        print_all(&replay.feed(message))?;
    }
    print_all(&replay.finish().await)?;

    let failures = replay.failures();
    for failure in &failures {
        error!(script = %failure.script_name, "{}", failure.message);
    }
    info!(failures = failures.len(), "Replay finished");
    Ok(())
}
