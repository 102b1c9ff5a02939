pub mod outcome;

use observatory_db::models::{NewAvailabilityResult, ProbeWorkUnit};
use observatory_db::repo;
use platform_client::PlatformClient;
use sqlx::PgPool;
use tracing::debug;

pub use outcome::ProbeOutcome;

/// Issues one cart-simulation probe and interprets the result. Never
/// returns an `Err` -- a failed HTTP call is folded into
/// `ProbeOutcome::Failed` so the caller always has exactly one row to
/// persist.
pub async fn probe_pickup(
    client: &PlatformClient<'_>,
    sc: i32,
    country: &str,
    work: &ProbeWorkUnit,
) -> (ProbeOutcome, Option<String>) {
    match client
        .simulate_pickup(work.item_id, &work.seller_id, sc, country, &work.postal_code, &work.vtex_pickup_point_id)
        .await
    {
        Ok((status, value)) => {
            let raw = Some(value.to_string());
            (outcome::extract_from_response(status, &value), raw)
        }
        Err(err) => {
            debug!(ean = %work.ean, store_id = work.store_id, error = %err, "probe failed");
            (ProbeOutcome::Failed { message: err.as_error_message() }, None)
        }
    }
}

/// Maps a probe outcome onto the append-only row shape. `errorMessage` is
/// only ever set for `Failed`; `Unavailable` persists as a normal zero-stock
/// row, not an error.
pub fn to_new_result(
    host: &str,
    sc: i32,
    work: &ProbeWorkUnit,
    outcome: &ProbeOutcome,
    raw_response: Option<String>,
) -> NewAvailabilityResult {
    let base = NewAvailabilityResult {
        retailer_host: host.to_string(),
        store_id: work.store_id,
        ean: work.ean.clone(),
        sku_id: work.sku_id,
        seller_id: work.seller_id.clone(),
        sales_channel: sc,
        is_available: false,
        price: None,
        list_price: None,
        available_quantity: 0,
        currency: "ARS".to_string(),
        error_message: None,
        raw_response,
    };

    match outcome {
        ProbeOutcome::Available { price, list_price, quantity, currency } => NewAvailabilityResult {
            is_available: true,
            price: price.clone(),
            list_price: list_price.clone(),
            available_quantity: *quantity,
            currency: currency.clone(),
            ..base
        },
        ProbeOutcome::Unavailable => base,
        ProbeOutcome::Failed { message } => {
            NewAvailabilityResult { error_message: Some(message.clone()), raw_response: None, ..base }
        }
    }
}

/// Probes one work unit and appends its result directly. The orchestrator
/// (§4.7) batches these instead of calling this per-unit, but it's the
/// building block both it and ad-hoc tooling use.
pub async fn probe_and_persist(
    pool: &PgPool,
    client: &PlatformClient<'_>,
    host: &str,
    sc: i32,
    country: &str,
    work: &ProbeWorkUnit,
) -> Result<(), sqlx::Error> {
    let (outcome, raw) = probe_pickup(client, sc, country, work).await;
    let result = to_new_result(host, sc, work, &outcome, raw);
    repo::availability::append_result(pool, &result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn work_unit() -> ProbeWorkUnit {
        ProbeWorkUnit {
            ean: "7791234567890".into(),
            sku_id: 1,
            item_id: 42,
            seller_id: "1".into(),
            store_id: 9,
            vtex_pickup_point_id: "pp-1".into(),
            postal_code: "1425".into(),
        }
    }

    #[test]
    fn available_outcome_maps_to_positive_row() {
        let work = work_unit();
        let outcome = ProbeOutcome::Available {
            price: Some(BigDecimal::from(100)),
            list_price: Some(BigDecimal::from(150)),
            quantity: 5,
            currency: "ARS".into(),
        };
        let row = to_new_result("retailer.example", 1, &work, &outcome, Some("{}".into()));
        assert!(row.is_available);
        assert_eq!(row.available_quantity, 5);
        assert_eq!(row.error_message, None);
    }

    #[test]
    fn unavailable_outcome_has_no_error_message() {
        let work = work_unit();
        let row = to_new_result("retailer.example", 1, &work, &ProbeOutcome::Unavailable, None);
        assert!(!row.is_available);
        assert_eq!(row.error_message, None);
        assert_eq!(row.available_quantity, 0);
    }

    #[test]
    fn failed_outcome_carries_error_message_and_drops_raw_response() {
        let work = work_unit();
        let outcome = ProbeOutcome::Failed { message: "500:internal error".into() };
        let row = to_new_result("retailer.example", 1, &work, &outcome, Some("should be dropped".into()));
        assert!(!row.is_available);
        assert_eq!(row.error_message.as_deref(), Some("500:internal error"));
        assert_eq!(row.raw_response, None);
    }
}
