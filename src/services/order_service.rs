use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::escrow::{EscrowStatus, EscrowTransaction};
use crate::models::order::Order;
use crate::services::notification_service::NotificationService;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct OrderService {
    database: Arc<SqliteDatabase>,
}

impl OrderService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        Self { database }
    }

    pub async fn get_order(&self, order_id: &Uuid) -> Result<Option<Order>> {
        self.database.get_order_by_id(order_id).await
    }

    /// The order-acceptance workflow: pending -> accepted, funds held in
    /// escrow, buyer notified. The status change and the escrow hold commit
    /// in one transaction, and the change is conditional on the order still
    /// being pending, so a concurrent accept conflicts instead of holding a
    /// second escrow. Caller is responsible for verifying the actor is the
    /// order's seller.
    pub async fn accept_order(&self, order_id: &Uuid) -> Result<(Order, EscrowTransaction)> {
        let order = self
            .database
            .get_order_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

        let now = Utc::now();
        let escrow = EscrowTransaction {
            id: Uuid::new_v4(),
            order_id: *order_id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            amount: order.total_amount.clone(),
            currency: order.currency.clone(),
            status: EscrowStatus::Held,
            created_at: now,
            updated_at: now,
            released_at: None,
        };

        if !self.database.accept_order_with_escrow(order_id, &escrow).await? {
            let current = self
                .database
                .get_order_by_id(order_id)
                .await?
                .map(|o| o.status.as_str())
                .unwrap_or("missing");
            return Err(AppError::Conflict(format!(
                "Order is {}, only pending orders can be accepted",
                current
            )));
        }

        let notifications = NotificationService::new(self.database.clone());
        if let Err(e) = notifications
            .notify_order_accepted(
                &order.buyer_id,
                order_id,
                &order.total_amount,
                &order.currency,
                order.buyer_email.as_deref(),
            )
            .await
        {
            tracing::warn!(action = "order_accept_notify_failed", order_id = %order_id, error = %e);
        }

        info!(action = "order_accepted", order_id = %order_id, escrow_id = %escrow.id);

        let accepted = self
            .database
            .get_order_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::InternalError("Order vanished after update".to_string()))?;
        Ok((accepted, escrow))
    }
}
