use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{PickupPoint, Store};

pub async fn list_active_for_host(pool: &PgPool, host: &str) -> Result<Vec<Store>, sqlx::Error> {
    sqlx::query_as::<_, Store>(
        "SELECT id, retailer_host, address, lat, lon, postal_code, bandera, comercio, sucursal, \
                vtex_pickup_point_id, last_vtex_sync, active \
         FROM stores WHERE retailer_host = $1 AND active = TRUE",
    )
    .bind(host)
    .fetch_all(pool)
    .await
}

/// Records a successful pickup-point mapping: updates the store row and
/// upserts the back-referencing `PickupPoint` row in the same transaction.
pub async fn record_pickup_mapping(
    pool: &PgPool,
    store: &Store,
    pickup_point_id: &str,
    mapped_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE stores SET vtex_pickup_point_id = $1, last_vtex_sync = $2 WHERE id = $3")
        .bind(pickup_point_id)
        .bind(mapped_at)
        .bind(store.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO pickup_points (retailer_host, pickup_point_id, bandera, comercio, sucursal) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (retailer_host, pickup_point_id) DO UPDATE \
         SET bandera = EXCLUDED.bandera, comercio = EXCLUDED.comercio, sucursal = EXCLUDED.sucursal",
    )
    .bind(&store.retailer_host)
    .bind(pickup_point_id)
    .bind(&store.bandera)
    .bind(&store.comercio)
    .bind(&store.sucursal)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

#[allow(dead_code)]
pub async fn upsert_pickup_point(pool: &PgPool, pickup: &PickupPoint) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO pickup_points (retailer_host, pickup_point_id, bandera, comercio, sucursal) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (retailer_host, pickup_point_id) DO UPDATE \
         SET bandera = EXCLUDED.bandera, comercio = EXCLUDED.comercio, sucursal = EXCLUDED.sucursal",
    )
    .bind(&pickup.retailer_host)
    .bind(&pickup.pickup_point_id)
    .bind(&pickup.bandera)
    .bind(&pickup.comercio)
    .bind(&pickup.sucursal)
    .execute(pool)
    .await
    .map(|_| ())
}
