use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    OrderPlaced,
    OrderAccepted,
    OrderRejected,
    EscrowUpdate,
    ShipmentUpdate,
    VerificationReviewed,
    SystemAlert,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OrderPlaced => "order_placed",
            NotificationType::OrderAccepted => "order_accepted",
            NotificationType::OrderRejected => "order_rejected",
            NotificationType::EscrowUpdate => "escrow_update",
            NotificationType::ShipmentUpdate => "shipment_update",
            NotificationType::VerificationReviewed => "verification_reviewed",
            NotificationType::SystemAlert => "system_alert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order_placed" => Some(NotificationType::OrderPlaced),
            "order_accepted" => Some(NotificationType::OrderAccepted),
            "order_rejected" => Some(NotificationType::OrderRejected),
            "escrow_update" => Some(NotificationType::EscrowUpdate),
            "shipment_update" => Some(NotificationType::ShipmentUpdate),
            "verification_reviewed" => Some(NotificationType::VerificationReviewed),
            "system_alert" => Some(NotificationType::SystemAlert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
