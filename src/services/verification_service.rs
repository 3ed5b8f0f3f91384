use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::verification::{ProfileType, VerificationDocument, VerificationStatus};
use crate::services::notification_service::NotificationService;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct VerificationService {
    database: Arc<SqliteDatabase>,
}

impl VerificationService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        Self { database }
    }

    /// Creates a pending submission. A user can only have one open
    /// submission at a time.
    pub async fn submit(
        &self,
        user_id: &Uuid,
        profile_type: ProfileType,
        document_urls: Vec<String>,
        contact_email: Option<String>,
    ) -> Result<VerificationDocument> {
        if self.database.get_pending_verification_by_user(user_id).await?.is_some() {
            return Err(AppError::Conflict(
                "A pending verification submission already exists for this user".to_string(),
            ));
        }

        let doc = VerificationDocument {
            id: Uuid::new_v4(),
            user_id: *user_id,
            profile_type,
            contact_email,
            document_urls,
            status: VerificationStatus::Pending,
            submitted_at: Utc::now(),
            reviewed_at: None,
            rejection_reason: None,
            reviewed_by: None,
        };
        self.database.create_verification_document(&doc).await?;
        Ok(doc)
    }

    pub async fn list(
        &self,
        status: Option<VerificationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<VerificationDocument>, i64)> {
        let items = self.database.list_verification_documents(status, limit, offset).await?;
        let count = self.database.count_verification_documents(status).await?;
        Ok((items, count))
    }

    /// Review a pending submission. A rejection must carry a reason.
    pub async fn review(
        &self,
        doc_id: &Uuid,
        approve: bool,
        rejection_reason: Option<String>,
        reviewer_id: &Uuid,
    ) -> Result<VerificationDocument> {
        let doc = self
            .database
            .get_verification_by_id(doc_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Verification document {} not found", doc_id)))?;

        if doc.status != VerificationStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Verification document is already {}",
                doc.status.as_str()
            )));
        }

        if !approve && rejection_reason.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(AppError::ValidationError(
                "A rejection reason is required when rejecting a submission".to_string(),
            ));
        }

        let status = if approve {
            VerificationStatus::Approved
        } else {
            VerificationStatus::Rejected
        };
        let reason = if approve { None } else { rejection_reason };

        self.database
            .update_verification_review(doc_id, status, reason.as_deref(), reviewer_id)
            .await?;

        let notifications = NotificationService::new(self.database.clone());
        if let Err(e) = notifications
            .notify_verification_reviewed(
                &doc.user_id,
                doc_id,
                approve,
                reason.as_deref(),
                doc.contact_email.as_deref(),
            )
            .await
        {
            tracing::warn!(action = "verification_notify_failed", document_id = %doc_id, error = %e);
        }

        self.database
            .get_verification_by_id(doc_id)
            .await?
            .ok_or_else(|| AppError::InternalError("Verification document vanished after update".to_string()))
    }
}
