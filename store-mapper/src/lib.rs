pub mod error;
pub mod geo;

use chrono::Utc;
use common_http::SessionLayer;
use observatory_db::models::Store;
use observatory_db::repo;
use platform_client::{PickupPointCandidate, PlatformClient};
use sqlx::PgPool;
use tracing::{debug, info, warn};

pub use error::StoreMapperError;

const SOFT_RADIUS_KM: f64 = 15.0;
const COUNTRY: &str = "AR";

/// Maps every active store of `host` to a platform pickup point, trying
/// geo lookup first and falling back to postal-code lookup per sales
/// channel. Returns the count of stores successfully mapped.
pub async fn map_all(
    pool: &PgPool,
    session: &SessionLayer,
    host: &str,
    sales_channels: &[i32],
) -> Result<u32, StoreMapperError> {
    let stores = repo::stores::list_active_for_host(pool, host).await?;
    let client = PlatformClient::new(session);
    let mut mapped = 0;

    for store in stores {
        match map_store(pool, &client, &store, sales_channels).await {
            Ok(true) => mapped += 1,
            Ok(false) => debug!(store_id = store.id, "no pickup point within radius, leaving unmapped"),
            Err(err) => warn!(store_id = store.id, error = %err, "store mapping failed, continuing"),
        }
    }

    info!(host, mapped, "store mapping pass complete");
    Ok(mapped)
}

/// Maps a single store; returns `Ok(true)` if a pickup point within the
/// soft radius was found and persisted.
pub async fn map_store(
    pool: &PgPool,
    client: &PlatformClient<'_>,
    store: &Store,
    sales_channels: &[i32],
) -> Result<bool, StoreMapperError> {
    let mut candidates: Vec<PickupPointCandidate> = Vec::new();

    for &sc in sales_channels {
        let geo_hits = client.pickup_points_by_geo(store.lon, store.lat, Some(sc)).await?;
        if geo_hits.is_empty() {
            let postal_hits = client.pickup_points_by_postal(&store.postal_code, COUNTRY, Some(sc)).await?;
            candidates.extend(postal_hits);
        } else {
            candidates.extend(geo_hits);
        }
    }

    let best = geo::nearest_within(store.lat, store.lon, SOFT_RADIUS_KM, &candidates);
    let Some(best) = best else { return Ok(false) };

    repo::stores::record_pickup_mapping(pool, store, &best.id, Utc::now()).await?;
    Ok(true)
}
