// One-shot repair for calendar events duplicated by self-importing subscriptions.
// Usage:
//   DATABASE_URL=postgres://... PUBLIC_BASE_URL=https://lms.example.edu cargo run --bin dedupe_events
//   cargo run --bin dedupe_events -- --instance-suffix lms.example.edu
//
// Safe to re-run: deleted clones drop out of the candidate pool and the
// reference backfill only touches empty references.

use anyhow::Result;
use clap::Parser;
use event_repair::cli::dedupe_events::{run, DedupeConfig};
use event_repair::util::logging::init_tracing;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "dedupe_events",
    version,
    about = "Delete self-imported duplicate calendar events and backfill missing references"
)]
struct Cli {
    /// Suffix identifying references minted by this instance (default: PUBLIC_BASE_URL without scheme)
    #[arg(long)]
    instance_suffix: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    event_repair::util::env::init_env();
    init_tracing("info")?;

    let cfg = DedupeConfig::from_env(cli.instance_suffix)?;
    let summary = run(cfg).await?;
    info!(
        candidates = summary.candidates,
        deleted = summary.deleted,
        backfilled = summary.backfilled,
        "done"
    );
    Ok(())
}
