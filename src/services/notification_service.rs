use crate::database::sqlite::SqliteDatabase;
use crate::errors::Result;
use crate::models::notification::{Notification, NotificationType};
use chrono::Utc;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

pub struct NotificationService {
    database: Arc<SqliteDatabase>,
    from_email: String,
}

impl NotificationService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        Self {
            database,
            from_email: std::env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@tradehub.example".to_string()),
        }
    }

    /// Notify a buyer that the seller accepted their order.
    pub async fn notify_order_accepted(
        &self,
        buyer_id: &Uuid,
        order_id: &Uuid,
        amount: &str,
        currency: &str,
        buyer_email: Option<&str>,
    ) -> Result<()> {
        let title = "Your order was accepted".to_string();
        let message = format!(
            "The seller accepted your order {}. {} {} is now held in escrow until delivery.",
            order_id, amount, currency
        );

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: *buyer_id,
            notification_type: NotificationType::OrderAccepted,
            title: title.clone(),
            message: message.clone(),
            metadata: Some(serde_json::json!({
                "order_id": order_id,
                "amount": amount,
                "currency": currency,
            })),
            is_read: false,
            created_at: Utc::now(),
        };

        self.database.store_notification(&notification).await?;

        if let Some(email) = buyer_email {
            if let Err(e) = self.send_email_smtp(email, &title, &message) {
                warn!(action = "notification_email_failed", user_id = %buyer_id, error = %e);
            }
        }

        Ok(())
    }

    /// Notify a user that their verification submission was reviewed.
    pub async fn notify_verification_reviewed(
        &self,
        user_id: &Uuid,
        document_id: &Uuid,
        approved: bool,
        rejection_reason: Option<&str>,
        contact_email: Option<&str>,
    ) -> Result<()> {
        let title = if approved {
            "Verification approved".to_string()
        } else {
            "Verification rejected".to_string()
        };
        let message = if approved {
            "Your identity verification was approved. You can now trade on the marketplace.".to_string()
        } else {
            format!(
                "Your identity verification was rejected. Reason: {}",
                rejection_reason.unwrap_or("not provided")
            )
        };

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: *user_id,
            notification_type: NotificationType::VerificationReviewed,
            title: title.clone(),
            message: message.clone(),
            metadata: Some(serde_json::json!({
                "document_id": document_id,
                "approved": approved,
            })),
            is_read: false,
            created_at: Utc::now(),
        };

        self.database.store_notification(&notification).await?;

        if let Some(email) = contact_email {
            if let Err(e) = self.send_email_smtp(email, &title, &message) {
                warn!(action = "notification_email_failed", user_id = %user_id, error = %e);
            }
        }

        Ok(())
    }

    /// Notify both parties that an escrow transaction changed state.
    pub async fn notify_escrow_update(
        &self,
        user_id: &Uuid,
        escrow_id: &Uuid,
        order_id: &Uuid,
        new_status: &str,
        contact_email: Option<&str>,
    ) -> Result<()> {
        let title = format!("Escrow {}", new_status);
        let message = format!(
            "The escrow for order {} is now {}.",
            order_id, new_status
        );

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: *user_id,
            notification_type: NotificationType::EscrowUpdate,
            title: title.clone(),
            message: message.clone(),
            metadata: Some(serde_json::json!({
                "escrow_id": escrow_id,
                "order_id": order_id,
                "status": new_status,
            })),
            is_read: false,
            created_at: Utc::now(),
        };

        self.database.store_notification(&notification).await?;

        if let Some(email) = contact_email {
            if let Err(e) = self.send_email_smtp(email, &title, &message) {
                warn!(action = "notification_email_failed", user_id = %user_id, error = %e);
            }
        }

        Ok(())
    }

    // SMTP config comes from the environment; missing config disables email.
    fn send_email_smtp(&self, to_email: &str, subject: &str, body: &str) -> std::result::Result<(), String> {
        let smtp_server = match std::env::var("SMTP_SERVER") {
            Ok(s) => s,
            Err(_) => return Ok(()), // email channel not configured
        };
        let smtp_username = std::env::var("SMTP_USERNAME").map_err(|_| "SMTP_USERNAME not set".to_string())?;
        let smtp_password = std::env::var("SMTP_PASSWORD").map_err(|_| "SMTP_PASSWORD not set".to_string())?;
        let smtp_port: u16 = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);

        let email = Message::builder()
            .from(self.from_email.parse().map_err(|e| format!("From parse error: {}", e))?)
            .to(to_email.parse().map_err(|e| format!("To parse error: {}", e))?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| format!("Message build error: {}", e))?;

        let creds = Credentials::new(smtp_username, smtp_password);

        let mailer = SmtpTransport::starttls_relay(&smtp_server)
            .map_err(|e| format!("SMTP relay error: {}", e))?
            .port(smtp_port)
            .credentials(creds)
            .build();

        mailer.send(&email).map_err(|e| format!("Send error: {}", e))?;
        Ok(())
    }

    // Get one page of a user's notifications plus the total count.
    pub async fn get_user_notifications(
        &self,
        user_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Notification>, i64)> {
        let items = self.database.get_user_notifications(user_id, limit, offset).await?;
        let count = self.database.count_user_notifications(user_id).await?;
        Ok((items, count))
    }

    pub async fn count_unread(&self, user_id: &Uuid) -> Result<i64> {
        self.database.count_unread_notifications(user_id).await
    }

    pub async fn get_notification(&self, notification_id: &Uuid) -> Result<Option<Notification>> {
        self.database.get_notification_by_id(notification_id).await
    }

    pub async fn mark_notification_read(&self, notification_id: &Uuid) -> Result<()> {
        self.database.mark_notification_read(notification_id).await
    }

    pub async fn mark_all_notifications_read(&self, user_id: &Uuid) -> Result<()> {
        self.database.mark_all_notifications_read(user_id).await
    }
}
