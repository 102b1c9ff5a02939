use common_http::{SessionError, SessionLayer};
use serde_json::Value;
use tracing::debug;

use crate::error::{context, PlatformError};
use crate::types::{CategoryNode, PickupPointCandidate, RegionSeller};

/// Thin typed wrapper over the platform's public JSON endpoints. Holds no
/// state of its own beyond the session layer -- every method is a pure
/// request/response translation.
pub struct PlatformClient<'a> {
    session: &'a SessionLayer,
}

impl<'a> PlatformClient<'a> {
    pub fn new(session: &'a SessionLayer) -> Self {
        Self { session }
    }

    pub async fn category_tree(&self, depth: u32) -> Result<Vec<CategoryNode>, PlatformError> {
        let path = format!("/api/catalog_system/pub/category/tree/{depth}");
        let raw = self.get(&path, &[("operation", "category_tree")]).await?;
        self.decode_json(&raw.status, &raw.body, "category_tree")
    }

    pub async fn search_by_category(
        &self,
        category_id: i64,
        from: u32,
        to: u32,
        sc: Option<i32>,
    ) -> Result<Vec<Value>, PlatformError> {
        if from > to {
            return Ok(Vec::new());
        }
        let mut path = format!(
            "/api/catalog_system/pub/products/search?fq=C:/{category_id}/&_from={from}&_to={to}"
        );
        if let Some(sc) = sc {
            path.push_str(&format!("&sc={sc}"));
        }
        let raw = self.get(&path, &[("operation", "search_by_category")]).await?;
        self.decode_product_list(&raw.status, &raw.body, "search_by_category")
    }

    pub async fn search_by_fulltext(&self, query: &str, from: u32, to: u32) -> Result<Vec<Value>, PlatformError> {
        if from > to {
            return Ok(Vec::new());
        }
        let encoded = urlencoding::encode(query);
        let path = format!("/api/catalog_system/pub/products/search?ft={encoded}&_from={from}&_to={to}");
        let raw = self.get(&path, &[("operation", "search_by_fulltext"), ("query", query)]).await?;
        self.decode_product_list(&raw.status, &raw.body, "search_by_fulltext")
    }

    pub async fn pickup_points_by_geo(
        &self,
        lon: f64,
        lat: f64,
        sc: Option<i32>,
    ) -> Result<Vec<PickupPointCandidate>, PlatformError> {
        let mut path = format!("/api/checkout/pub/pickup-points?geoCoordinates={lon};{lat}");
        if let Some(sc) = sc {
            path.push_str(&format!("&sc={sc}"));
        }
        let raw = self.get(&path, &[("operation", "pickup_points_by_geo")]).await?;
        self.decode_json(&raw.status, &raw.body, "pickup_points_by_geo")
    }

    pub async fn pickup_points_by_postal(
        &self,
        postal: &str,
        country: &str,
        sc: Option<i32>,
    ) -> Result<Vec<PickupPointCandidate>, PlatformError> {
        let mut path = format!("/api/checkout/pub/pickup-points?postalCode={postal}&countryCode={country}");
        if let Some(sc) = sc {
            path.push_str(&format!("&sc={sc}"));
        }
        let raw = self.get(&path, &[("operation", "pickup_points_by_postal")]).await?;
        self.decode_json(&raw.status, &raw.body, "pickup_points_by_postal")
    }

    pub async fn region_sellers(
        &self,
        postal: &str,
        country: &str,
        sc: Option<i32>,
    ) -> Result<Vec<RegionSeller>, PlatformError> {
        let mut path = format!("/api/checkout/pub/regions?country={country}&postalCode={postal}");
        if let Some(sc) = sc {
            path.push_str(&format!("&sc={sc}"));
        }
        let raw = self.get(&path, &[("operation", "region_sellers")]).await?;
        self.decode_json(&raw.status, &raw.body, "region_sellers")
    }

    /// Cart simulation shaped as a pickup-point reservation. Returns the raw
    /// simulation JSON; field extraction (availability/price/quantity) is
    /// the availability prober's responsibility, not the client's -- see
    /// DESIGN.md.
    pub async fn simulate_pickup(
        &self,
        sku: i64,
        seller: &str,
        sc: i32,
        country: &str,
        postal: &str,
        pickup_id: &str,
    ) -> Result<(u16, Value), PlatformError> {
        let body = serde_json::json!({
            "items": [{ "id": sku.to_string(), "quantity": 1, "seller": seller }],
            "country": country,
            "postalCode": postal,
            "logisticsInfo": [{
                "itemIndex": 0,
                "selectedSla": "pickup-in-point",
                "selectedDeliveryChannel": "pickup-in-point",
                "addressId": pickup_id,
            }],
        });
        self.simulate(&format!("/api/checkout/pub/orderForms/simulation?sc={sc}"), &body, "simulate_pickup").await
    }

    pub async fn simulate_delivery(
        &self,
        sku: i64,
        seller: &str,
        sc: i32,
        country: &str,
        postal: &str,
        quantity: u32,
    ) -> Result<(u16, Value), PlatformError> {
        let body = serde_json::json!({
            "items": [{ "id": sku.to_string(), "quantity": quantity, "seller": seller }],
            "country": country,
            "postalCode": postal,
        });
        self.simulate(&format!("/api/checkout/pub/orderForms/simulation?sc={sc}"), &body, "simulate_delivery").await
    }

    async fn simulate(&self, path: &str, body: &Value, operation: &str) -> Result<(u16, Value), PlatformError> {
        let payload = serde_json::to_vec(body).map_err(|e| {
            PlatformError::decode(0, e.to_string(), context(&[("operation", operation)]))
        })?;
        let raw = self
            .session
            .post_json(path, payload)
            .await
            .map_err(|e| self.map_session_error(e, operation))?;

        // 200/206/400 are all structurally meaningful responses for a
        // simulation call; the prober decides whether 400 means
        // "unavailable" or a real failure.
        let value: Value = serde_json::from_slice(&raw.body).map_err(|e| {
            PlatformError::decode(
                raw.status.as_u16(),
                format!("{e}: {}", String::from_utf8_lossy(&raw.body)),
                context(&[("operation", operation)]),
            )
        })?;
        Ok((raw.status.as_u16(), value))
    }

    async fn get(&self, path: &str, ctx: &[(&str, &str)]) -> Result<common_http::RawResponse, PlatformError> {
        debug!(path, "platform client GET");
        self.session.get(path).await.map_err(|e| self.map_session_error_with(e, ctx))
    }

    fn decode_json<T: serde::de::DeserializeOwned>(
        &self,
        status: &reqwest::StatusCode,
        body: &[u8],
        operation: &str,
    ) -> Result<T, PlatformError> {
        if !(status.is_success() || *status == reqwest::StatusCode::PARTIAL_CONTENT) {
            return Err(PlatformError::unexpected_status(
                status.as_u16(),
                String::from_utf8_lossy(body),
                context(&[("operation", operation)]),
            ));
        }
        serde_json::from_slice(body).map_err(|e| {
            PlatformError::decode(
                status.as_u16(),
                format!("{e}: {}", String::from_utf8_lossy(body)),
                context(&[("operation", operation)]),
            )
        })
    }

    fn decode_product_list(
        &self,
        status: &reqwest::StatusCode,
        body: &[u8],
        operation: &str,
    ) -> Result<Vec<Value>, PlatformError> {
        self.decode_json(status, body, operation)
    }

    fn map_session_error(&self, err: SessionError, operation: &str) -> PlatformError {
        self.map_session_error_with(err, &[("operation", operation)])
    }

    fn map_session_error_with(&self, err: SessionError, ctx: &[(&str, &str)]) -> PlatformError {
        match err {
            SessionError::RetriesExhausted { last_status, .. } => PlatformError::unexpected_status(
                last_status.unwrap_or(0),
                "retries exhausted",
                context(ctx),
            ),
            other => PlatformError::transport(context(ctx), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use common_http::{SessionConfig, SessionLayer};
    use common_observability::ObservatoryMetrics;
    use crate::error::PlatformErrorKind;
    use httpmock::prelude::*;

    use super::*;

    fn session(server: &MockServer) -> SessionLayer {
        SessionLayer::new(server.base_url(), &SessionConfig::default(), ObservatoryMetrics::new()).unwrap()
    }

    #[tokio::test]
    async fn search_by_category_empty_window_short_circuits() {
        let server = MockServer::start();
        let session = session(&server);
        let client = PlatformClient::new(&session);
        let result = client.search_by_category(10, 5, 3, None).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn category_tree_decodes_and_flattens() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/catalog_system/pub/category/tree/50");
            then.status(200).json_body(serde_json::json!([
                {"id": 1, "name": "root", "children": [
                    {"id": 2, "name": "a", "children": []},
                    {"id": 3, "name": "b", "children": []}
                ]}
            ]));
        });
        let session = session(&server);
        let client = PlatformClient::new(&session);
        let tree = client.category_tree(50).await.unwrap();
        let flat = flatten_tree(&tree);
        assert_eq!(flat.len(), 3);
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn unexpected_status_on_category_tree_is_structured_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/catalog_system/pub/category/tree/50");
            then.status(418).body("teapot");
        });
        let session = session(&server);
        let client = PlatformClient::new(&session);
        let err = client.category_tree(50).await.unwrap_err();
        assert_eq!(err.status, Some(418));
        assert_eq!(err.kind, PlatformErrorKind::UnexpectedStatus);
    }
}
