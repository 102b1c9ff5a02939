use bigdecimal::BigDecimal;
use serde_json::Value;

/// Result of one probe, kept as a pure sum type so the persistence step can
/// be unit-tested against synthetic outcomes without a mock server.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Available { price: Option<BigDecimal>, list_price: Option<BigDecimal>, quantity: i32, currency: String },
    Unavailable,
    Failed { message: String },
}

const DEFAULT_CURRENCY: &str = "ARS";

/// Interprets a simulation response. `status` must already be one of
/// 200/206/400 -- anything else should have been turned into a
/// `PlatformError` by the caller before reaching here.
pub fn extract_from_response(status: u16, body: &Value) -> ProbeOutcome {
    let items = body.get("items").and_then(Value::as_array);
    let empty_items = items.map(|a| a.is_empty()).unwrap_or(true);

    if status == 400 {
        let looks_unauthorized = body
            .to_string()
            .contains("operationNotAuthorized");
        if looks_unauthorized || empty_items {
            return ProbeOutcome::Unavailable;
        }
        return ProbeOutcome::Failed { message: format!("400:{body}") };
    }

    if empty_items {
        return ProbeOutcome::Unavailable;
    }

    let item = &items.unwrap()[0];
    let available = item.get("availability").and_then(Value::as_str) == Some("available");
    if !available {
        return ProbeOutcome::Unavailable;
    }

    let price = item.get("sellingPrice").and_then(Value::as_i64).map(cents_to_decimal);
    let list_price = item.get("listPrice").and_then(Value::as_i64).map(cents_to_decimal);
    let quantity = item
        .get("quantity")
        .and_then(Value::as_i64)
        .or_else(|| {
            body.get("logisticsInfo")
                .and_then(Value::as_array)
                .and_then(|l| l.first())
                .and_then(|l| l.get("slas"))
                .and_then(Value::as_array)
                .and_then(|s| s.first())
                .and_then(|s| s.get("availableDeliveryWindows"))
                .and_then(Value::as_array)
                .map(|w| w.len() as i64)
        })
        .unwrap_or(0) as i32;
    let currency = body
        .get("storePreferencesData")
        .and_then(|s| s.get("currencyCode"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string();

    ProbeOutcome::Available { price, list_price, quantity, currency }
}

fn cents_to_decimal(cents: i64) -> BigDecimal {
    BigDecimal::from(cents) / BigDecimal::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn available_item_extracts_price_and_quantity() {
        let body = json!({
            "items": [{"availability": "available", "sellingPrice": 123450, "listPrice": 150000, "quantity": 7}],
            "storePreferencesData": {"currencyCode": "ARS"},
        });
        let outcome = extract_from_response(200, &body);
        assert_eq!(
            outcome,
            ProbeOutcome::Available {
                price: Some(BigDecimal::from(123450) / BigDecimal::from(100)),
                list_price: Some(BigDecimal::from(150000) / BigDecimal::from(100)),
                quantity: 7,
                currency: "ARS".into(),
            }
        );
    }

    #[test]
    fn quantity_falls_back_to_delivery_windows_length() {
        let body = json!({
            "items": [{"availability": "available", "sellingPrice": 100, "listPrice": 100}],
            "logisticsInfo": [{"slas": [{"availableDeliveryWindows": [1, 2, 3]}]}],
        });
        let outcome = extract_from_response(200, &body);
        match outcome {
            ProbeOutcome::Available { quantity, .. } => assert_eq!(quantity, 3),
            other => panic!("expected Available, got {other:?}"),
        }
    }

    #[test]
    fn missing_quantity_and_windows_defaults_to_zero() {
        let body = json!({"items": [{"availability": "available", "sellingPrice": 100, "listPrice": 100}]});
        match extract_from_response(200, &body) {
            ProbeOutcome::Available { quantity, .. } => assert_eq!(quantity, 0),
            other => panic!("expected Available, got {other:?}"),
        }
    }

    #[test]
    fn non_available_string_is_unavailable() {
        let body = json!({"items": [{"availability": "withoutStock"}]});
        assert_eq!(extract_from_response(200, &body), ProbeOutcome::Unavailable);
    }

    #[test]
    fn empty_items_array_is_unavailable_not_failed() {
        let body = json!({"items": []});
        assert_eq!(extract_from_response(200, &body), ProbeOutcome::Unavailable);
    }

    #[test]
    fn bad_request_with_operation_not_authorized_is_unavailable() {
        let body = json!({"error": "operationNotAuthorized"});
        assert_eq!(extract_from_response(400, &body), ProbeOutcome::Unavailable);
    }

    #[test]
    fn bad_request_with_empty_items_is_unavailable() {
        let body = json!({"items": []});
        assert_eq!(extract_from_response(400, &body), ProbeOutcome::Unavailable);
    }

    #[test]
    fn bad_request_with_unrelated_error_is_failed() {
        let body = json!({"error": "somethingElseEntirely", "items": [{"availability": "available"}]});
        match extract_from_response(400, &body) {
            ProbeOutcome::Failed { message } => assert!(message.starts_with("400:")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn missing_currency_defaults_to_ars() {
        let body = json!({"items": [{"availability": "available", "sellingPrice": 100, "listPrice": 100}]});
        match extract_from_response(200, &body) {
            ProbeOutcome::Available { currency, .. } => assert_eq!(currency, "ARS"),
            other => panic!("expected Available, got {other:?}"),
        }
    }
}
