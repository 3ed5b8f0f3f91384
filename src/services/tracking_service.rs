use crate::database::sqlite::SqliteDatabase;
use crate::errors::Result;
use crate::models::tracking::{ShipmentStatus, ShipmentTracking, TrackingEvent};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct TrackingService {
    database: Arc<SqliteDatabase>,
}

impl TrackingService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        Self { database }
    }

    pub async fn list(
        &self,
        status: Option<ShipmentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ShipmentTracking>, i64)> {
        let items = self.database.list_shipment_trackings(status, limit, offset).await?;
        let count = self.database.count_shipment_trackings(status).await?;
        Ok((items, count))
    }

    /// Registers a new parcel for an order. Starts in `pending` with an
    /// initial event so the history is never empty.
    pub async fn register_shipment(
        &self,
        order_id: &Uuid,
        carrier: &str,
        tracking_number: &str,
    ) -> Result<ShipmentTracking> {
        let now = Utc::now();
        let tracking = ShipmentTracking {
            id: Uuid::new_v4(),
            order_id: *order_id,
            carrier: carrier.to_string(),
            tracking_number: tracking_number.to_string(),
            status: ShipmentStatus::Pending,
            events: vec![TrackingEvent {
                status: ShipmentStatus::Pending,
                location: None,
                occurred_at: now,
            }],
            created_at: now,
            updated_at: now,
        };
        self.database.store_shipment_tracking(&tracking).await?;
        Ok(tracking)
    }

    pub async fn record_event(
        &self,
        tracking_id: &Uuid,
        status: ShipmentStatus,
        location: Option<String>,
    ) -> Result<()> {
        let event = TrackingEvent {
            status,
            location,
            occurred_at: Utc::now(),
        };
        self.database.append_tracking_event(tracking_id, &event).await
    }
}
