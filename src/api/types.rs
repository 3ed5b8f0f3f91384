use crate::models::b2b_product::{AvailabilityStatus, PriceTier};
use crate::models::escrow::EscrowTransaction;
use crate::models::notification::Notification;
use crate::models::order::Order;
use crate::models::tracking::ShipmentTracking;
use crate::models::verification::{ProfileType, VerificationDocument};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Common query parameters for the admin listing endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    /// Effective (limit, offset) after defaulting and capping.
    pub fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EscrowListResponse {
    pub escrows: Vec<EscrowTransaction>,
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EscrowActionResponse {
    pub escrow: EscrowTransaction,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentListResponse {
    pub shipments: Vec<ShipmentTracking>,
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationListResponse {
    pub verifications: Vec<VerificationDocument>,
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitVerificationRequest {
    pub profile_type: ProfileType,
    pub document_urls: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewVerificationRequest {
    pub approve: bool,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertB2bConfigRequest {
    pub min_order_quantity: i64,
    pub lead_time_days: Option<i64>,
    pub bulk_pricing_tiers: Option<Vec<PriceTier>>,
    #[serde(default)]
    pub b2b_only: bool,
    pub unit_of_measure: String,
    pub availability: AvailabilityStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AcceptOrderResponse {
    pub order: Order,
    pub escrow: EscrowTransaction,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults() {
        let q = ListQuery::default();
        assert_eq!(q.page(), (DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn page_caps_limit() {
        let q = ListQuery {
            limit: Some(5000),
            offset: Some(40),
            status: None,
        };
        assert_eq!(q.page(), (MAX_PAGE_SIZE, 40));
    }

    #[test]
    fn page_rejects_negatives() {
        let q = ListQuery {
            limit: Some(-1),
            offset: Some(-10),
            status: None,
        };
        assert_eq!(q.page(), (1, 0));
    }
}
