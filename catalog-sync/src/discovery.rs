use std::collections::HashMap;

use observatory_db::repo;
use platform_client::PlatformClient;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use crate::error::CatalogSyncError;
use crate::products::upsert_product_node;

/// Leading digits of an EAN treated as its brand/company prefix. VTEX's own
/// category facets don't expose this; grouping by it is how the operator's
/// brand-level sweeps are scoped without a category id.
pub const BRAND_PREFIX_LEN: usize = 7;

fn node_has_ean(node: &Value, predicate: impl Fn(&str) -> bool) -> bool {
    node.get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().any(|item| item.get("ean").and_then(Value::as_str).is_some_and(&predicate)))
        .unwrap_or(false)
}

/// For each tracked EAN, queries fulltext search and passes any product
/// whose SKUs include that exact EAN through the catalog upsert path.
/// Returns the number of products matched and upserted.
pub async fn discover_by_ean(
    pool: &PgPool,
    client: &PlatformClient<'_>,
    host: &str,
    category_map: &HashMap<i64, i64>,
) -> Result<u32, CatalogSyncError> {
    let tracked = repo::tracked::list_tracked(pool).await?;
    let mut matched = 0u32;

    for product in &tracked {
        let ean = product.ean.clone();
        let results = client.search_by_fulltext(&ean, 0, 49).await?;
        for node in &results {
            if node_has_ean(node, |candidate| candidate == ean) {
                upsert_product_node(pool, host, category_map, node).await?;
                matched += 1;
            }
        }
    }

    info!(host, matched, "targeted discovery by EAN complete");
    Ok(matched)
}

/// Groups tracked EANs by their leading `BRAND_PREFIX_LEN` digits and issues
/// one fulltext query per distinct prefix, filtering results whose SKU EAN
/// starts with that prefix.
pub async fn discover_by_brand_prefix(
    pool: &PgPool,
    client: &PlatformClient<'_>,
    host: &str,
    category_map: &HashMap<i64, i64>,
) -> Result<u32, CatalogSyncError> {
    let tracked = repo::tracked::list_tracked(pool).await?;

    let mut prefixes: Vec<String> = Vec::new();
    for product in &tracked {
        let prefix_len = BRAND_PREFIX_LEN.min(product.ean.len());
        let prefix = product.ean[..prefix_len].to_string();
        if !prefixes.contains(&prefix) {
            prefixes.push(prefix);
        }
    }

    let mut matched = 0u32;
    for prefix in &prefixes {
        let results = client.search_by_fulltext(prefix, 0, 49).await?;
        for node in &results {
            let prefix = prefix.clone();
            if node_has_ean(node, move |candidate| candidate.starts_with(prefix.as_str())) {
                upsert_product_node(pool, host, category_map, node).await?;
                matched += 1;
            }
        }
    }

    info!(host, prefixes = prefixes.len(), matched, "targeted discovery by brand prefix complete");
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_has_ean_matches_exact_predicate() {
        let node = json!({"items": [{"ean": "7791234567890"}, {"ean": "7790000000000"}]});
        assert!(node_has_ean(&node, |e| e == "7790000000000"));
        assert!(!node_has_ean(&node, |e| e == "nope"));
    }

    #[test]
    fn node_has_ean_handles_missing_items() {
        assert!(!node_has_ean(&json!({}), |_| true));
    }
}
