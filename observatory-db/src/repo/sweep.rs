use chrono::Utc;
use sqlx::PgPool;

use crate::models::{SweepStatus, SweepType};

/// Opens a `SweepLog` row with `status = running`. Returns the row id so the
/// caller can close it when the sweep finishes or fails.
pub async fn open(pool: &PgPool, host: &str, sweep_type: SweepType) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO sweep_logs (retailer_host, sweep_type, status) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(host)
    .bind(sweep_type.as_str())
    .bind(SweepStatus::Running.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn close(pool: &PgPool, sweep_id: i64, status: SweepStatus, notes: Option<&str>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sweep_logs SET status = $1, completed_at = $2, notes = $3 WHERE id = $4")
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(notes)
        .bind(sweep_id)
        .execute(pool)
        .await
        .map(|_| ())
}
