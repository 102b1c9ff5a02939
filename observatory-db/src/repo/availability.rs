use sqlx::PgPool;

use crate::models::{NewAvailabilityResult, ProbeWorkUnit};

/// Loads the join `(tracked EAN, SKU, seller, store, pickup id)` for `host`,
/// restricted to `TrackedProduct.track = true` and stores with a resolved
/// pickup point. One row is one work unit for `ProbeEanList`.
pub async fn load_ean_work_units(pool: &PgPool, host: &str) -> Result<Vec<ProbeWorkUnit>, sqlx::Error> {
    sqlx::query_as::<_, ProbeWorkUnit>(
        "SELECT tp.ean AS ean, sk.id AS sku_id, sk.item_id AS item_id, sl.seller_id AS seller_id, \
                st.id AS store_id, st.vtex_pickup_point_id AS vtex_pickup_point_id, st.postal_code AS postal_code \
         FROM tracked_products tp \
         JOIN skus sk ON sk.ean = tp.ean AND sk.retailer_host = $1 \
         JOIN sellers sl ON sl.sku_id = sk.id \
         JOIN stores st ON st.retailer_host = $1 \
         WHERE tp.track = TRUE AND st.vtex_pickup_point_id IS NOT NULL AND st.active = TRUE",
    )
    .bind(host)
    .fetch_all(pool)
    .await
}

/// Same join without the tracked-EAN filter: every SKU known for the host
/// with at least one seller.
pub async fn load_all_work_units(pool: &PgPool, host: &str) -> Result<Vec<ProbeWorkUnit>, sqlx::Error> {
    sqlx::query_as::<_, ProbeWorkUnit>(
        "SELECT COALESCE(sk.ean, '') AS ean, sk.id AS sku_id, sk.item_id AS item_id, sl.seller_id AS seller_id, \
                st.id AS store_id, st.vtex_pickup_point_id AS vtex_pickup_point_id, st.postal_code AS postal_code \
         FROM skus sk \
         JOIN sellers sl ON sl.sku_id = sk.id \
         JOIN stores st ON st.retailer_host = sk.retailer_host \
         WHERE sk.retailer_host = $1 AND st.vtex_pickup_point_id IS NOT NULL AND st.active = TRUE",
    )
    .bind(host)
    .fetch_all(pool)
    .await
}

/// Appends exactly one `AvailabilityResult` row. Always an INSERT: results
/// are never mutated, only appended.
pub async fn append_result(pool: &PgPool, result: &NewAvailabilityResult) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO availability_results \
            (retailer_host, store_id, ean, sku_id, seller_id, sales_channel, is_available, \
             price, list_price, available_quantity, currency, error_message, raw_response) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(&result.retailer_host)
    .bind(result.store_id)
    .bind(&result.ean)
    .bind(result.sku_id)
    .bind(&result.seller_id)
    .bind(result.sales_channel)
    .bind(result.is_available)
    .bind(&result.price)
    .bind(&result.list_price)
    .bind(result.available_quantity)
    .bind(&result.currency)
    .bind(&result.error_message)
    .bind(&result.raw_response)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Appends a batch of results inside one short transaction -- the
/// committer's unit of work.
pub async fn append_results_batch(pool: &PgPool, results: &[NewAvailabilityResult]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for result in results {
        sqlx::query(
            "INSERT INTO availability_results \
                (retailer_host, store_id, ean, sku_id, seller_id, sales_channel, is_available, \
                 price, list_price, available_quantity, currency, error_message, raw_response) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&result.retailer_host)
        .bind(result.store_id)
        .bind(&result.ean)
        .bind(result.sku_id)
        .bind(&result.seller_id)
        .bind(result.sales_channel)
        .bind(result.is_available)
        .bind(&result.price)
        .bind(&result.list_price)
        .bind(result.available_quantity)
        .bind(&result.currency)
        .bind(&result.error_message)
        .bind(&result.raw_response)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}
