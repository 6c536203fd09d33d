//! NDJSON event ingestion.

use anyhow::Context;
use tally_db::Store;
use tally_engine::{Engine, ProcessOutcome};
use tally_types::events::ChainEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Counters of one ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub malformed: u64,
}

/// Feed every line of `reader` to the engine, in order.
///
/// With `halt_on_error` the first malformed line or failed event stops the
/// run with an error; otherwise it is logged and skipped.
pub async fn run<S, R>(
    engine: &mut Engine<S>,
    reader: R,
    halt_on_error: bool,
) -> anyhow::Result<IngestStats>
where
    S: Store,
    R: AsyncBufRead + Unpin,
{
    let mut stats = IngestStats::default();
    let mut lines = reader.lines();
    let mut line_number: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: ChainEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) if halt_on_error => {
                return Err(e).with_context(|| format!("malformed event on line {line_number}"));
            }
            Err(e) => {
                warn!(line = line_number, error = %e, "malformed event skipped");
                stats.malformed += 1;
                continue;
            }
        };

        match engine.process(&event) {
            Ok(ProcessOutcome::Applied { transitions }) => {
                stats.applied += 1;
                if !transitions.is_empty() {
                    info!(block = event.block_number(), ?transitions, "epoch transitions");
                }
            }
            Ok(ProcessOutcome::Duplicate) => {
                debug!(event_id = %event.event_id(), "already processed");
                stats.duplicates += 1;
            }
            Err(e) if halt_on_error => {
                return Err(e).with_context(|| {
                    format!(
                        "event {} ({}) failed on line {line_number}",
                        event.event_id(),
                        event.event.name()
                    )
                });
            }
            Err(e) => {
                warn!(line = line_number, event_id = %event.event_id(), error = %e, "failed event skipped");
                stats.failed += 1;
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_db::MemoryStore;
    use tally_engine::EngineFlags;

    const SCHEDULE: &str = r#"{"block":{"number":1,"timestamp":100},"transaction":{"hash":"0x01"},"log_index":0,"event":"EpochStartScheduled","params":{"epoch_number":1,"start_time":100}}"#;
    const BAD_USER: &str = r#"{"block":{"number":2,"timestamp":200},"transaction":{"hash":"0x02"},"log_index":0,"event":"UserBlacklisted","params":{"user":"bogus"}}"#;

    fn engine() -> Engine<MemoryStore> {
        Engine::new(MemoryStore::new(), EngineFlags::default())
    }

    #[tokio::test]
    async fn test_counts_applied_and_duplicates() {
        let input = format!("{SCHEDULE}\n\n{SCHEDULE}\n");
        let mut engine = engine();
        let stats = run(&mut engine, input.as_bytes(), true)
            .await
            .expect("run");
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.duplicates, 1);
    }

    #[tokio::test]
    async fn test_halt_on_failed_event() {
        let input = format!("{BAD_USER}\n{SCHEDULE}\n");
        let mut engine = engine();
        assert!(run(&mut engine, input.as_bytes(), true).await.is_err());
        assert_eq!(engine.store().count("processed_event"), 0);
    }

    #[tokio::test]
    async fn test_skip_mode_continues() {
        let input = format!("not json\n{BAD_USER}\n{SCHEDULE}\n");
        let mut engine = engine();
        let stats = run(&mut engine, input.as_bytes(), false)
            .await
            .expect("run");
        assert_eq!(
            stats,
            IngestStats {
                applied: 1,
                duplicates: 0,
                failed: 1,
                malformed: 1,
            }
        );
    }
}
