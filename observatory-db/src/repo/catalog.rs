use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{CategoryRow, ProductRow, SellerRow, SkuRow};

pub async fn upsert_category(
    pool: &PgPool,
    host: &str,
    external_category_id: i64,
    name: &str,
    parent_external_id: Option<i64>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO categories (retailer_host, external_category_id, name, parent_external_id) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (retailer_host, external_category_id) DO UPDATE \
         SET name = EXCLUDED.name, parent_external_id = EXCLUDED.parent_external_id \
         RETURNING id",
    )
    .bind(host)
    .bind(external_category_id)
    .bind(name)
    .bind(parent_external_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn list_categories_for_host(pool: &PgPool, host: &str) -> Result<Vec<CategoryRow>, sqlx::Error> {
    sqlx::query_as::<_, CategoryRow>(
        "SELECT id, retailer_host, external_category_id, name, parent_external_id, parent_db_id \
         FROM categories WHERE retailer_host = $1",
    )
    .bind(host)
    .fetch_all(pool)
    .await
}

/// Second DFS pass: resolves each node's `parent_db_id` now that every
/// sibling has an assigned internal id.
pub async fn relink_parent_db_id(
    pool: &PgPool,
    host: &str,
    external_category_id: i64,
    parent_db_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE categories SET parent_db_id = $1 WHERE retailer_host = $2 AND external_category_id = $3")
        .bind(parent_db_id)
        .bind(host)
        .bind(external_category_id)
        .execute(pool)
        .await
        .map(|_| ())
}

pub async fn upsert_product(
    pool: &PgPool,
    host: &str,
    external_product_id: i64,
    name: &str,
    brand: Option<&str>,
    brand_id: Option<i64>,
    link_text: Option<&str>,
    link: Option<&str>,
    cache_id: Option<&str>,
    release_date: Option<DateTime<Utc>>,
    raw_json: &str,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO products \
            (retailer_host, external_product_id, name, brand, brand_id, link_text, link, cache_id, release_date, raw_json) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (retailer_host, external_product_id) DO UPDATE \
         SET name = EXCLUDED.name, brand = EXCLUDED.brand, brand_id = EXCLUDED.brand_id, \
             link_text = EXCLUDED.link_text, link = EXCLUDED.link, cache_id = EXCLUDED.cache_id, \
             release_date = EXCLUDED.release_date, raw_json = EXCLUDED.raw_json \
         RETURNING id",
    )
    .bind(host)
    .bind(external_product_id)
    .bind(name)
    .bind(brand)
    .bind(brand_id)
    .bind(link_text)
    .bind(link)
    .bind(cache_id)
    .bind(release_date)
    .bind(raw_json)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Replaces a product's category links wholesale: deletes links not present
/// in `category_db_ids` and inserts the rest, so repeated syncs converge to
/// the upstream set without accumulating stale rows.
pub async fn replace_product_categories(
    pool: &PgPool,
    product_id: i64,
    category_db_ids: &[i64],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM product_categories WHERE product_id = $1 AND NOT (category_id = ANY($2))")
        .bind(product_id)
        .bind(category_db_ids)
        .execute(&mut *tx)
        .await?;
    for category_id in category_db_ids {
        sqlx::query(
            "INSERT INTO product_categories (product_id, category_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn upsert_sku(
    pool: &PgPool,
    host: &str,
    product_id: i64,
    item_id: i64,
    ean: Option<&str>,
    name: &str,
    measurement_unit: Option<&str>,
    unit_multiplier: &BigDecimal,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO skus (retailer_host, product_id, item_id, ean, name, measurement_unit, unit_multiplier) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (retailer_host, item_id) DO UPDATE \
         SET ean = EXCLUDED.ean, name = EXCLUDED.name, measurement_unit = EXCLUDED.measurement_unit, \
             unit_multiplier = EXCLUDED.unit_multiplier \
         RETURNING id",
    )
    .bind(host)
    .bind(product_id)
    .bind(item_id)
    .bind(ean)
    .bind(name)
    .bind(measurement_unit)
    .bind(unit_multiplier)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn upsert_seller(
    pool: &PgPool,
    sku_id: i64,
    seller_id: &str,
    name: Option<&str>,
    is_default: bool,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO sellers (sku_id, seller_id, name, is_default) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (sku_id, seller_id) DO UPDATE \
         SET name = EXCLUDED.name, is_default = EXCLUDED.is_default \
         RETURNING id",
    )
    .bind(sku_id)
    .bind(seller_id)
    .bind(name)
    .bind(is_default)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Appends one commercial offer snapshot. Never updates an existing row --
/// offer history is append-only.
pub async fn append_commercial_offer(
    pool: &PgPool,
    seller_db_id: i64,
    price: Option<&BigDecimal>,
    list_price: Option<&BigDecimal>,
    spot_price: Option<&BigDecimal>,
    price_without_discount: Option<&BigDecimal>,
    valid_until: Option<DateTime<Utc>>,
    available_quantity: Option<i32>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO commercial_offers \
            (seller_id, price, list_price, spot_price, price_without_discount, valid_until, available_quantity) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(seller_db_id)
    .bind(price)
    .bind(list_price)
    .bind(spot_price)
    .bind(price_without_discount)
    .bind(valid_until)
    .bind(available_quantity)
    .execute(pool)
    .await
    .map(|_| ())
}

#[allow(dead_code)]
pub async fn find_sku_by_item_id(pool: &PgPool, host: &str, item_id: i64) -> Result<Option<SkuRow>, sqlx::Error> {
    sqlx::query_as::<_, SkuRow>(
        "SELECT id, retailer_host, product_id, item_id, ean, name, measurement_unit, unit_multiplier \
         FROM skus WHERE retailer_host = $1 AND item_id = $2",
    )
    .bind(host)
    .bind(item_id)
    .fetch_optional(pool)
    .await
}

#[allow(dead_code)]
pub async fn list_sellers_for_sku(pool: &PgPool, sku_id: i64) -> Result<Vec<SellerRow>, sqlx::Error> {
    sqlx::query_as::<_, SellerRow>(
        "SELECT id, sku_id, seller_id, name, is_default FROM sellers WHERE sku_id = $1",
    )
    .bind(sku_id)
    .fetch_all(pool)
    .await
}
