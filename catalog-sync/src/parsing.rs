use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// `productId` must parse as a positive integer; anything else (missing,
/// non-numeric, zero, negative) means "skip this product".
pub fn parse_product_id(node: &Value) -> Option<i64> {
    let raw = node.get("productId")?;
    let id = raw.as_i64().or_else(|| raw.as_str().and_then(|s| s.parse::<i64>().ok()))?;
    (id > 0).then_some(id)
}

/// `itemId` must be present and parse as an integer; a SKU missing it is
/// skipped entirely.
pub fn parse_item_id(item: &Value) -> Option<i64> {
    let raw = item.get("itemId")?;
    raw.as_i64().or_else(|| raw.as_str().and_then(|s| s.parse::<i64>().ok()))
}

/// `categoriesIds` entries look like `/1/23/456/`; strips the leading and
/// trailing slash and returns every numeric segment across every entry,
/// deduplicated.
pub fn parse_category_external_ids(node: &Value) -> Vec<i64> {
    let Some(entries) = node.get("categoriesIds").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut ids = Vec::new();
    for entry in entries {
        let Some(path) = entry.as_str() else { continue };
        for segment in path.trim_matches('/').split('/') {
            if let Ok(id) = segment.parse::<i64>() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

/// Accepts ISO-8601 or Unix-millis; absent or unparseable is `None`.
pub fn parse_release_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let value = value?;
    if let Some(s) = value.as_str() {
        return DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc));
    }
    if let Some(millis) = value.as_i64() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    None
}

/// Absent or unparseable defaults to 1.
pub fn parse_unit_multiplier(value: Option<&Value>) -> BigDecimal {
    value
        .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .and_then(|f| BigDecimal::try_from(f).ok())
        .unwrap_or_else(|| BigDecimal::from(1))
}

pub fn parse_money(value: Option<&Value>) -> Option<BigDecimal> {
    value.and_then(|v| v.as_f64()).and_then(|f| BigDecimal::try_from(f).ok())
}

pub fn parse_quantity(value: Option<&Value>) -> Option<i32> {
    value.and_then(Value::as_i64).map(|n| n as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_id_accepts_numeric_string_and_rejects_non_positive() {
        assert_eq!(parse_product_id(&json!({"productId": "42"})), Some(42));
        assert_eq!(parse_product_id(&json!({"productId": 42})), Some(42));
        assert_eq!(parse_product_id(&json!({"productId": "0"})), None);
        assert_eq!(parse_product_id(&json!({"productId": "-1"})), None);
        assert_eq!(parse_product_id(&json!({"productId": "abc"})), None);
        assert_eq!(parse_product_id(&json!({})), None);
    }

    #[test]
    fn item_id_missing_is_none() {
        assert_eq!(parse_item_id(&json!({})), None);
        assert_eq!(parse_item_id(&json!({"itemId": "99"})), Some(99));
    }

    #[test]
    fn category_ids_are_deduplicated_across_paths() {
        let node = json!({"categoriesIds": ["/1/2/", "/1/3/"]});
        let ids = parse_category_external_ids(&node);
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn category_ids_absent_is_empty() {
        assert!(parse_category_external_ids(&json!({})).is_empty());
    }

    #[test]
    fn release_date_accepts_rfc3339_and_millis() {
        let iso = parse_release_date(Some(&json!("2020-01-01T00:00:00Z"))).unwrap();
        assert_eq!(iso.to_rfc3339(), "2020-01-01T00:00:00+00:00");
        let millis = parse_release_date(Some(&json!(1_577_836_800_000i64))).unwrap();
        assert_eq!(millis.to_rfc3339(), "2020-01-01T00:00:00+00:00");
        assert_eq!(parse_release_date(None), None);
        assert_eq!(parse_release_date(Some(&json!("not a date"))), None);
    }

    #[test]
    fn unit_multiplier_defaults_to_one() {
        assert_eq!(parse_unit_multiplier(None), BigDecimal::from(1));
        assert_eq!(parse_unit_multiplier(Some(&json!("garbage"))), BigDecimal::from(1));
        assert_eq!(parse_unit_multiplier(Some(&json!(2.5))), BigDecimal::try_from(2.5).unwrap());
    }
}
