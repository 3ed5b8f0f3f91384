use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::escrow::{EscrowStatus, EscrowTransaction};
use crate::services::notification_service::NotificationService;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct EscrowService {
    database: Arc<SqliteDatabase>,
}

impl EscrowService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        Self { database }
    }

    /// One page of escrow transactions plus the total count for the filter.
    pub async fn list(
        &self,
        status: Option<EscrowStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<EscrowTransaction>, i64)> {
        let items = self.database.list_escrow_transactions(status, limit, offset).await?;
        let count = self.database.count_escrow_transactions(status).await?;
        Ok((items, count))
    }

    /// held -> released. Pays out to the seller once the order completes.
    pub async fn release(&self, escrow_id: &Uuid) -> Result<EscrowTransaction> {
        self.transition(escrow_id, EscrowStatus::Released).await
    }

    /// held -> refunded. Returns the funds to the buyer.
    pub async fn refund(&self, escrow_id: &Uuid) -> Result<EscrowTransaction> {
        self.transition(escrow_id, EscrowStatus::Refunded).await
    }

    async fn transition(&self, escrow_id: &Uuid, target: EscrowStatus) -> Result<EscrowTransaction> {
        let escrow = self
            .database
            .get_escrow_by_id(escrow_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Escrow transaction {} not found", escrow_id)))?;

        // Conditional on the escrow still being held, so concurrent
        // settlements cannot both apply.
        if !self.database.settle_escrow(escrow_id, target, Utc::now()).await? {
            let current = self
                .database
                .get_escrow_by_id(escrow_id)
                .await?
                .map(|e| e.status.as_str())
                .unwrap_or("missing");
            return Err(AppError::Conflict(format!(
                "Escrow transaction is {}, only held escrows can be {}",
                current,
                target.as_str()
            )));
        }

        let buyer_email = match self.database.get_order_by_id(&escrow.order_id).await {
            Ok(order) => order.and_then(|o| o.buyer_email),
            Err(e) => {
                tracing::warn!(action = "escrow_notify_lookup_failed", escrow_id = %escrow_id, error = %e);
                None
            }
        };

        let notifications = NotificationService::new(self.database.clone());
        // Both sides learn about the settlement; failures here don't undo it.
        for (party, email) in [
            (&escrow.buyer_id, buyer_email.as_deref()),
            (&escrow.seller_id, None),
        ] {
            if let Err(e) = notifications
                .notify_escrow_update(party, escrow_id, &escrow.order_id, target.as_str(), email)
                .await
            {
                tracing::warn!(action = "escrow_notify_failed", escrow_id = %escrow_id, error = %e);
            }
        }

        self.database
            .get_escrow_by_id(escrow_id)
            .await?
            .ok_or_else(|| AppError::InternalError("Escrow transaction vanished after update".to_string()))
    }
}
