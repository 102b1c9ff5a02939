use sqlx::PgPool;

use crate::models::TrackedProduct;

pub async fn list_tracked(pool: &PgPool) -> Result<Vec<TrackedProduct>, sqlx::Error> {
    sqlx::query_as::<_, TrackedProduct>(
        "SELECT ean, owner_label, product_name, track FROM tracked_products WHERE track = TRUE",
    )
    .fetch_all(pool)
    .await
}
