use sqlx::PgPool;

use crate::models::RetailerConfigRow;

pub async fn load_enabled(pool: &PgPool, host_filter: Option<&str>) -> Result<Vec<RetailerConfigRow>, sqlx::Error> {
    match host_filter {
        Some(host) => {
            sqlx::query_as::<_, RetailerConfigRow>(
                "SELECT retailer_id, retailer_host, sales_channels, enabled \
                 FROM vtex_retailers_config WHERE enabled = TRUE AND retailer_host = $1",
            )
            .bind(host)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, RetailerConfigRow>(
                "SELECT retailer_id, retailer_host, sales_channels, enabled \
                 FROM vtex_retailers_config WHERE enabled = TRUE",
            )
            .fetch_all(pool)
            .await
        }
    }
}
