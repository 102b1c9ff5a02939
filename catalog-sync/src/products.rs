use std::collections::HashMap;

use observatory_db::repo;
use platform_client::PlatformClient;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::error::CatalogSyncError;
use crate::parsing;

/// `SyncProducts(host, categoryId?, pageSize, maxPages?)`: if `categoryId` is
/// `None`, iterates every category known for `host`. Returns the total
/// product nodes processed (skipped nodes included in the page count, not
/// in the returned total).
pub async fn sync_products(
    pool: &PgPool,
    client: &PlatformClient<'_>,
    host: &str,
    category_id: Option<i64>,
    page_size: u32,
    max_pages: Option<u32>,
    sc: Option<i32>,
) -> Result<u32, CatalogSyncError> {
    let category_map = load_category_map(pool, host).await?;
    let category_ids: Vec<i64> = match category_id {
        Some(id) => vec![id],
        None => category_map.keys().copied().collect(),
    };

    let mut total = 0u32;
    for category_id in category_ids {
        total += sync_category_pages(pool, client, host, category_id, page_size, max_pages, sc, &category_map).await?;
    }
    Ok(total)
}

async fn sync_category_pages(
    pool: &PgPool,
    client: &PlatformClient<'_>,
    host: &str,
    category_id: i64,
    page_size: u32,
    max_pages: Option<u32>,
    sc: Option<i32>,
    category_map: &HashMap<i64, i64>,
) -> Result<u32, CatalogSyncError> {
    let mut from = 0u32;
    let mut pages = 0u32;
    let mut processed = 0u32;

    loop {
        let to = from + page_size.saturating_sub(1);
        let products = client.search_by_category(category_id, from, to, sc).await?;
        let page_len = products.len();

        for node in &products {
            match upsert_product_node(pool, host, category_map, node).await {
                Ok(()) => processed += 1,
                Err(err) => warn!(host, category_id, error = %err, "skipping product node after upsert failure"),
            }
        }

        pages += 1;
        debug!(host, category_id, from, to, page_len, "catalog page processed");

        if page_len < page_size as usize {
            break;
        }
        if let Some(max_pages) = max_pages {
            if pages >= max_pages {
                break;
            }
        }
        from += page_size;
    }

    info!(host, category_id, processed, "category product sync complete");
    Ok(processed)
}

pub async fn load_category_map(pool: &PgPool, host: &str) -> Result<HashMap<i64, i64>, CatalogSyncError> {
    let rows = repo::catalog::list_categories_for_host(pool, host).await?;
    Ok(rows.into_iter().map(|r| (r.external_category_id, r.id)).collect())
}

/// Upserts one product JSON node: the product row, its category links,
/// every SKU (item), every seller, and -- when a commercial offer is
/// present -- a new `CommercialOffer` snapshot. A product whose `productId`
/// doesn't parse is silently skipped (not an error).
pub async fn upsert_product_node(
    pool: &PgPool,
    host: &str,
    category_map: &HashMap<i64, i64>,
    node: &Value,
) -> Result<(), CatalogSyncError> {
    let Some(external_product_id) = parsing::parse_product_id(node) else {
        return Ok(());
    };

    let name = node.get("productName").and_then(Value::as_str).unwrap_or_default();
    let brand = node.get("brand").and_then(Value::as_str);
    let brand_id = node.get("brandId").and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())));
    let link_text = node.get("linkText").and_then(Value::as_str);
    let link = node.get("link").and_then(Value::as_str);
    let cache_id = node.get("cacheId").and_then(Value::as_str);
    let release_date = parsing::parse_release_date(node.get("releaseDate"));
    let raw_json = node.to_string();

    let product_db_id = repo::catalog::upsert_product(
        pool, host, external_product_id, name, brand, brand_id, link_text, link, cache_id, release_date, &raw_json,
    )
    .await?;

    let category_db_ids: Vec<i64> = parsing::parse_category_external_ids(node)
        .into_iter()
        .filter_map(|external_id| category_map.get(&external_id).copied())
        .collect();
    repo::catalog::replace_product_categories(pool, product_db_id, &category_db_ids).await?;

    let items = node.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
    for item in &items {
        let Some(item_id) = parsing::parse_item_id(item) else { continue };
        let ean = item.get("ean").and_then(Value::as_str);
        let sku_name = item.get("nameComplete").and_then(Value::as_str).unwrap_or(name);
        let measurement_unit = item.get("measurementUnit").and_then(Value::as_str);
        let unit_multiplier = parsing::parse_unit_multiplier(item.get("unitMultiplier"));

        let sku_db_id =
            repo::catalog::upsert_sku(pool, host, product_db_id, item_id, ean, sku_name, measurement_unit, &unit_multiplier)
                .await?;

        let sellers = item.get("sellers").and_then(Value::as_array).cloned().unwrap_or_default();
        for seller in &sellers {
            let Some(seller_id) = seller.get("sellerId").and_then(Value::as_str) else { continue };
            let seller_name = seller.get("sellerName").and_then(Value::as_str);
            let is_default = seller.get("sellerDefault").and_then(Value::as_bool).unwrap_or(false);
            let seller_db_id = repo::catalog::upsert_seller(pool, sku_db_id, seller_id, seller_name, is_default).await?;

            if let Some(offer) = seller.get("commertialOffer") {
                let price = parsing::parse_money(offer.get("Price"));
                let list_price = parsing::parse_money(offer.get("ListPrice"));
                let spot_price = parsing::parse_money(offer.get("SpotPrice"));
                let price_without_discount = parsing::parse_money(offer.get("PriceWithoutDiscount"));
                let available_quantity = parsing::parse_quantity(offer.get("AvailableQuantity"));
                let valid_until = offer
                    .get("PriceValidUntil")
                    .and_then(Value::as_str)
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&chrono::Utc));

                repo::catalog::append_commercial_offer(
                    pool,
                    seller_db_id,
                    price.as_ref(),
                    list_price.as_ref(),
                    spot_price.as_ref(),
                    price_without_discount.as_ref(),
                    valid_until,
                    available_quantity,
                )
                .await?;
            }
        }
    }

    Ok(())
}
