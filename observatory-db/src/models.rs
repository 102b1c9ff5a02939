use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct RetailerConfigRow {
    pub retailer_id: i64,
    pub retailer_host: String,
    pub sales_channels: String,
    pub enabled: bool,
}

impl RetailerConfigRow {
    /// Parses the comma-separated `sales_channels` column into integers,
    /// skipping anything that doesn't parse rather than failing the whole
    /// retailer's config.
    pub fn sales_channel_list(&self) -> Vec<i32> {
        self.sales_channels
            .split(',')
            .filter_map(|s| s.trim().parse::<i32>().ok())
            .collect()
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub retailer_host: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub postal_code: String,
    pub bandera: String,
    pub comercio: String,
    pub sucursal: String,
    pub vtex_pickup_point_id: Option<String>,
    pub last_vtex_sync: Option<DateTime<Utc>>,
    pub active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PickupPoint {
    pub id: i64,
    pub retailer_host: String,
    pub pickup_point_id: String,
    pub bandera: Option<String>,
    pub comercio: Option<String>,
    pub sucursal: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: i64,
    pub retailer_host: String,
    pub external_category_id: i64,
    pub name: String,
    pub parent_external_id: Option<i64>,
    pub parent_db_id: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: i64,
    pub retailer_host: String,
    pub external_product_id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub brand_id: Option<i64>,
    pub link_text: Option<String>,
    pub link: Option<String>,
    pub cache_id: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub raw_json: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SkuRow {
    pub id: i64,
    pub retailer_host: String,
    pub product_id: i64,
    pub item_id: i64,
    pub ean: Option<String>,
    pub name: String,
    pub measurement_unit: Option<String>,
    pub unit_multiplier: BigDecimal,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SellerRow {
    pub id: i64,
    pub sku_id: i64,
    pub seller_id: String,
    pub name: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TrackedProduct {
    pub ean: String,
    pub owner_label: String,
    pub product_name: Option<String>,
    pub track: bool,
}

/// One row of the work-unit join consumed by the availability orchestrator:
/// `(tracked EAN, SKU, seller, store, pickup id)`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProbeWorkUnit {
    pub ean: String,
    pub sku_id: i64,
    pub item_id: i64,
    pub seller_id: String,
    pub store_id: i64,
    pub vtex_pickup_point_id: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAvailabilityResult {
    pub retailer_host: String,
    pub store_id: i64,
    pub ean: String,
    pub sku_id: i64,
    pub seller_id: String,
    pub sales_channel: i32,
    pub is_available: bool,
    pub price: Option<BigDecimal>,
    pub list_price: Option<BigDecimal>,
    pub available_quantity: i32,
    pub currency: String,
    pub error_message: Option<String>,
    pub raw_response: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepStatus {
    Running,
    Success,
    Failed,
}

impl SweepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepStatus::Running => "running",
            SweepStatus::Success => "success",
            SweepStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepType {
    CatalogSync,
    TargetedByEan,
    TargetedByBrand,
    StoreMapping,
    ProbeEanList,
    ProbeAll,
}

impl SweepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepType::CatalogSync => "catalog_sync",
            SweepType::TargetedByEan => "targeted_by_ean",
            SweepType::TargetedByBrand => "targeted_by_brand",
            SweepType::StoreMapping => "store_mapping",
            SweepType::ProbeEanList => "probe_ean_list",
            SweepType::ProbeAll => "probe_all",
        }
    }
}
