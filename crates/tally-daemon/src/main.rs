//! tally-daemon: replays decoded chain events into the points ledger.
//!
//! Reads one JSON event per line from a file or stdin and applies each
//! through the engine against a SQLite database.

mod config;
mod ingest;

use tally_db::SqliteStore;
use tally_engine::{Engine, EngineFlags};
use tokio::io::BufReader;
use tracing::{info, warn};

use crate::config::DaemonConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("tally={}", config.logging.log_level).parse()?),
        )
        .init();

    info!("Tally daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = config.database_path();
    let store = SqliteStore::open(&db_path)?;
    info!(path = ?db_path, "ledger database opened");

    // 3. Build engine
    let flags = EngineFlags::from_env();
    let defaults = config.price_defaults();
    info!(
        ?flags,
        seed_prices = defaults.len(),
        start_block = config.engine.leaderboard_start_block,
        "engine configured"
    );
    let mut engine = Engine::new(store, flags)
        .with_price_defaults(defaults)
        .with_start_block(config.engine.leaderboard_start_block);

    // 4. Ingest until end of input or Ctrl-C
    let halt_on_error = config.ingest.halt_on_error;
    let result = match config.events_path() {
        Some(path) => {
            info!(path = ?path, "reading events from file");
            let file = tokio::fs::File::open(&path).await?;
            tokio::select! {
                stats = ingest::run(&mut engine, BufReader::new(file), halt_on_error) => Some(stats),
                _ = tokio::signal::ctrl_c() => None,
            }
        }
        None => {
            info!("reading events from stdin");
            tokio::select! {
                stats = ingest::run(&mut engine, BufReader::new(tokio::io::stdin()), halt_on_error) => Some(stats),
                _ = tokio::signal::ctrl_c() => None,
            }
        }
    };

    match result {
        Some(stats) => {
            let stats = stats?;
            info!(
                applied = stats.applied,
                duplicates = stats.duplicates,
                failed = stats.failed,
                malformed = stats.malformed,
                "ingestion finished"
            );
        }
        None => warn!("Ctrl-C received, shutting down"),
    }

    info!("Daemon stopped");
    Ok(())
}
