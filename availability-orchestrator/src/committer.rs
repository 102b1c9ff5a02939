use std::time::Duration;

use common_observability::ObservatoryMetrics;
use observatory_db::models::NewAvailabilityResult;
use observatory_db::repo;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::SweepError;

pub const CHANNEL_CAPACITY: usize = 1_000;

/// Spawns the single-writer committer: drains `rows` into `flush_size`-row
/// transactions, or every `flush_interval`, whichever comes first. Returns
/// the sending half and a handle resolving to the total rows committed.
pub fn spawn(
    pool: PgPool,
    flush_size: usize,
    flush_interval: Duration,
    metrics: ObservatoryMetrics,
) -> (mpsc::Sender<NewAvailabilityResult>, JoinHandle<Result<u64, SweepError>>) {
    let (tx, mut rx) = mpsc::channel::<NewAvailabilityResult>(CHANNEL_CAPACITY);

    let handle = tokio::spawn(async move {
        let mut buffer = Vec::with_capacity(flush_size);
        let mut total: u64 = 0;
        let mut ticker = tokio::time::interval(flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                maybe_row = rx.recv() => {
                    match maybe_row {
                        Some(row) => {
                            buffer.push(row);
                            metrics.work_queue_depth.set(rx.len() as i64);
                            if buffer.len() >= flush_size {
                                total += flush(&pool, &mut buffer, &metrics).await?;
                            }
                        }
                        None => {
                            total += flush(&pool, &mut buffer, &metrics).await?;
                            metrics.work_queue_depth.set(0);
                            debug!(total, "committer channel closed, final flush done");
                            return Ok(total);
                        }
                    }
                }
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        total += flush(&pool, &mut buffer, &metrics).await?;
                    }
                }
            }
        }
    });

    (tx, handle)
}

async fn flush(pool: &PgPool, buffer: &mut Vec<NewAvailabilityResult>, metrics: &ObservatoryMetrics) -> Result<u64, SweepError> {
    if buffer.is_empty() {
        return Ok(0);
    }
    let count = buffer.len() as u64;
    if let Err(err) = repo::availability::append_results_batch(pool, buffer).await {
        warn!(error = %err, rows = count, "batch commit failed");
        buffer.clear();
        return Err(SweepError::Database(err));
    }
    metrics.batch_flush_rows.observe(count as f64);
    buffer.clear();
    Ok(count)
}
