use std::collections::HashMap;

use observatory_db::repo;
use platform_client::{flatten_tree, PlatformClient};
use sqlx::PgPool;
use tracing::info;

use crate::error::CatalogSyncError;

/// `SyncCategories(host, depth)`: fetches the category tree, flattens it via
/// DFS, upserts every node by `(host, categoryId)` in a first pass, then
/// resolves each node's internal `parentDbId` in a second pass now that
/// every external id has an assigned row. Returns the node count seen.
pub async fn sync_categories(
    pool: &PgPool,
    client: &PlatformClient<'_>,
    host: &str,
    depth: u32,
) -> Result<u32, CatalogSyncError> {
    let tree = client.category_tree(depth).await?;
    let flat = flatten_tree(&tree);

    let mut db_ids: HashMap<i64, i64> = HashMap::with_capacity(flat.len());
    for node in &flat {
        let db_id = repo::catalog::upsert_category(pool, host, node.external_id, &node.name, node.parent_external_id).await?;
        db_ids.insert(node.external_id, db_id);
    }

    for node in &flat {
        if let Some(parent_external_id) = node.parent_external_id {
            if let Some(&parent_db_id) = db_ids.get(&parent_external_id) {
                repo::catalog::relink_parent_db_id(pool, host, node.external_id, parent_db_id).await?;
            }
        }
    }

    info!(host, nodes = flat.len(), "category sync complete");
    Ok(flat.len() as u32)
}
