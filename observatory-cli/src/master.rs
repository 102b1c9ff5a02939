use std::time::Duration;

use common_http::{SessionConfig, SessionLayer};
use common_observability::ObservatoryMetrics;
use observatory_db::models::RetailerConfigRow;
use observatory_db::repo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// `RunFullProcess(hostFilter?)`: for each enabled retailer, sequentially
/// runs targeted discovery (by EAN, then by brand prefix), store mapping,
/// and the EAN-list probe sweep. A step failure is logged and the sequence
/// continues to the next step for that retailer; a whole-retailer failure
/// does not prevent the next retailer from running. Each retailer's whole
/// sequence is bounded by `retailer_timeout` (§5's soft 6-hour per-retailer
/// run limit) -- a timeout is logged and the run moves on to the next
/// retailer rather than hanging the master process.
pub async fn run_full_process(
    pool: &PgPool,
    session_config: &SessionConfig,
    metrics: ObservatoryMetrics,
    host_filter: Option<&str>,
    probe_settings: &availability_orchestrator::ProbeSettings,
    retailer_timeout: Duration,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let retailers = repo::retailers::load_enabled(pool, host_filter).await?;
    if retailers.is_empty() {
        warn!(?host_filter, "no enabled retailers matched, nothing to do");
        return Ok(());
    }

    for retailer in retailers {
        let host = retailer.retailer_host.clone();
        info!(host, "starting full process for retailer");

        let run = run_one_retailer(pool, session_config, metrics.clone(), &retailer, probe_settings, cancel.clone());
        match tokio::time::timeout(retailer_timeout, run).await {
            Ok(()) => {}
            Err(_) => warn!(host, timeout_secs = retailer_timeout.as_secs(), "retailer run exceeded soft timeout, moving on"),
        }

        if cancel.is_cancelled() {
            warn!("cancellation requested, stopping master orchestrator before remaining retailers");
            break;
        }
    }

    Ok(())
}

async fn run_one_retailer(
    pool: &PgPool,
    session_config: &SessionConfig,
    metrics: ObservatoryMetrics,
    retailer: &RetailerConfigRow,
    probe_settings: &availability_orchestrator::ProbeSettings,
    cancel: CancellationToken,
) {
    let host = retailer.retailer_host.clone();
    let sales_channels = retailer.sales_channel_list();

    if let Err(err) = catalog_sync::tasks::spawn_by_ean(pool.clone(), host.clone(), session_config.clone(), metrics.clone())
        .await
        .unwrap_or_else(|join_err| Err(catalog_sync::CatalogSyncError::Database(sqlx::Error::Protocol(join_err.to_string()))))
    {
        warn!(host, error = %err, "targeted discovery by EAN failed, continuing");
    }

    if let Err(err) = catalog_sync::tasks::spawn_by_brand(pool.clone(), host.clone(), session_config.clone(), metrics.clone())
        .await
        .unwrap_or_else(|join_err| Err(catalog_sync::CatalogSyncError::Database(sqlx::Error::Protocol(join_err.to_string()))))
    {
        warn!(host, error = %err, "targeted discovery by brand prefix failed, continuing");
    }

    match SessionLayer::new(host.clone(), session_config, metrics.clone()) {
        Ok(session) => {
            if let Err(err) = store_mapper::map_all(pool, &session, &host, &sales_channels).await {
                warn!(host, error = %err, "store mapping failed, continuing");
            }
        }
        Err(err) => error!(host, error = %err, "failed to build session for store mapping"),
    }

    let sc = sales_channels.first().copied().unwrap_or(1);
    let mut settings = probe_settings.clone();
    settings.sales_channel = sc;
    if let Err(err) = availability_orchestrator::probe_ean_list(pool, &host, metrics.clone(), &settings, cancel).await {
        warn!(host, error = %err, "availability probe sweep failed");
    }
}
