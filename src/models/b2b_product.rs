use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    InStock,
    LowStock,
    OutOfStock,
    Preorder,
    Discontinued,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::InStock => "in_stock",
            AvailabilityStatus::LowStock => "low_stock",
            AvailabilityStatus::OutOfStock => "out_of_stock",
            AvailabilityStatus::Preorder => "preorder",
            AvailabilityStatus::Discontinued => "discontinued",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_stock" => Some(AvailabilityStatus::InStock),
            "low_stock" => Some(AvailabilityStatus::LowStock),
            "out_of_stock" => Some(AvailabilityStatus::OutOfStock),
            "preorder" => Some(AvailabilityStatus::Preorder),
            "discontinued" => Some(AvailabilityStatus::Discontinued),
            _ => None,
        }
    }
}

/// One quantity break in a bulk pricing ladder. `unit_price` is a decimal
/// string to avoid float rounding in money values.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceTier {
    pub quantity: i64,
    pub unit_price: String,
}

/// Wholesale configuration attached to a product. One row per product.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct B2bProductConfig {
    pub id: Uuid,
    pub product_id: Uuid,
    pub min_order_quantity: i64,
    pub lead_time_days: Option<i64>,
    pub bulk_pricing_tiers: Option<Vec<PriceTier>>,
    pub b2b_only: bool,
    pub unit_of_measure: String,
    pub availability: AvailabilityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
