use common_http::{SessionConfig, SessionLayer};
use common_observability::ObservatoryMetrics;
use observatory_db::models::{SweepStatus, SweepType};
use observatory_db::repo;
use platform_client::PlatformClient;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::error;

use crate::discovery;
use crate::error::CatalogSyncError;
use crate::products::load_category_map;

/// Spawns `TargetedDiscovery.ByEan` as a tracked task: opens a `SweepLog`
/// row, owns its own HTTP session, and closes the sweep on completion or
/// failure. The CLI `.await`s the returned handle so the process exit code
/// reflects the outcome, rather than letting this run as an orphaned
/// fire-and-forget coroutine.
pub fn spawn_by_ean(
    pool: PgPool,
    host: String,
    session_config: SessionConfig,
    metrics: ObservatoryMetrics,
) -> JoinHandle<Result<u32, CatalogSyncError>> {
    tokio::spawn(async move {
        let sweep_id = repo::sweep::open(&pool, &host, SweepType::TargetedByEan).await?;
        let outcome = run_by_ean(&pool, &host, &session_config, metrics).await;
        close_sweep(&pool, sweep_id, &outcome).await;
        outcome
    })
}

pub fn spawn_by_brand(
    pool: PgPool,
    host: String,
    session_config: SessionConfig,
    metrics: ObservatoryMetrics,
) -> JoinHandle<Result<u32, CatalogSyncError>> {
    tokio::spawn(async move {
        let sweep_id = repo::sweep::open(&pool, &host, SweepType::TargetedByBrand).await?;
        let outcome = run_by_brand(&pool, &host, &session_config, metrics).await;
        close_sweep(&pool, sweep_id, &outcome).await;
        outcome
    })
}

async fn run_by_ean(
    pool: &PgPool,
    host: &str,
    session_config: &SessionConfig,
    metrics: ObservatoryMetrics,
) -> Result<u32, CatalogSyncError> {
    let session = SessionLayer::new(host.to_string(), session_config, metrics)
        .map_err(|err| CatalogSyncError::Database(sqlx::Error::Protocol(err.to_string())))?;
    let client = PlatformClient::new(&session);
    let category_map = load_category_map(pool, host).await?;
    discovery::discover_by_ean(pool, &client, host, &category_map).await
}

async fn run_by_brand(
    pool: &PgPool,
    host: &str,
    session_config: &SessionConfig,
    metrics: ObservatoryMetrics,
) -> Result<u32, CatalogSyncError> {
    let session = SessionLayer::new(host.to_string(), session_config, metrics)
        .map_err(|err| CatalogSyncError::Database(sqlx::Error::Protocol(err.to_string())))?;
    let client = PlatformClient::new(&session);
    let category_map = load_category_map(pool, host).await?;
    discovery::discover_by_brand_prefix(pool, &client, host, &category_map).await
}

async fn close_sweep(pool: &PgPool, sweep_id: i64, outcome: &Result<u32, CatalogSyncError>) {
    let (status, notes) = match outcome {
        Ok(_) => (SweepStatus::Success, None),
        Err(err) => (SweepStatus::Failed, Some(err.to_string())),
    };
    if let Err(close_err) = repo::sweep::close(pool, sweep_id, status, notes.as_deref()).await {
        error!(sweep_id, error = %close_err, "failed to record sweep outcome");
    }
}
