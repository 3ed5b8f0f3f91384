use crate::errors::{AppError, Result};
use crate::models::b2b_product::{AvailabilityStatus, B2bProductConfig};
use crate::models::escrow::{EscrowStatus, EscrowTransaction};
use crate::models::notification::{Notification, NotificationType};
use crate::models::order::{Order, OrderStatus};
use crate::models::tracking::{ShipmentStatus, ShipmentTracking, TrackingEvent};
use crate::models::verification::{ProfileType, VerificationDocument, VerificationStatus};
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub static GLOBAL_DB: OnceCell<Arc<SqliteDatabase>> = OnceCell::new();

#[derive(Debug)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(database_path: &str) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = Path::new(database_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::DatabaseError(format!("Failed to create database directory: {}", e)))?;
        }

        // Create the database file if it doesn't exist
        if !Path::new(database_path).exists() {
            std::fs::File::create(database_path)
                .map_err(|e| AppError::DatabaseError(format!("Failed to create database file: {}", e)))?;
        }
        let database_url = format!("sqlite:{}", database_path);

        let pool = SqlitePool::connect(&database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool };

        db.create_tables().await?;
        db.run_migrations().await?;

        tracing::info!(action = "database_ready", path = %database_path);
        Ok(db)
    }

    async fn create_tables(&self) -> Result<()> {
        // b2b_product_configs is created with the original availability CHECK;
        // migration 1 widens it for existing and fresh databases alike.
        let query = r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                buyer_id TEXT NOT NULL,
                seller_id TEXT NOT NULL,
                buyer_email TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                total_amount TEXT NOT NULL,
                currency TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS escrow_transactions (
                id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL,
                buyer_id TEXT NOT NULL,
                seller_id TEXT NOT NULL,
                amount TEXT NOT NULL,
                currency TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'held',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                released_at TEXT,
                FOREIGN KEY (order_id) REFERENCES orders (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS shipment_trackings (
                id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL,
                carrier TEXT NOT NULL,
                tracking_number TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                events TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (order_id) REFERENCES orders (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                notification_type TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                metadata TEXT,
                is_read BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS verification_documents (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                profile_type TEXT NOT NULL,
                contact_email TEXT,
                document_urls TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                submitted_at TEXT NOT NULL,
                reviewed_at TEXT,
                rejection_reason TEXT,
                reviewed_by TEXT
            );

            CREATE TABLE IF NOT EXISTS b2b_product_configs (
                id TEXT PRIMARY KEY,
                product_id TEXT UNIQUE NOT NULL,
                min_order_quantity INTEGER NOT NULL DEFAULT 1,
                lead_time_days INTEGER,
                bulk_pricing_tiers TEXT,
                b2b_only BOOLEAN NOT NULL DEFAULT FALSE,
                unit_of_measure TEXT NOT NULL DEFAULT 'unit',
                availability TEXT NOT NULL DEFAULT 'in_stock'
                    CHECK (availability IN ('in_stock', 'out_of_stock', 'discontinued')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#;

        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    /// Applies versioned schema migrations that cannot be expressed as
    /// CREATE TABLE IF NOT EXISTS. Safe to run on every startup.
    async fn run_migrations(&self) -> Result<()> {
        if !self.is_migration_applied(1).await? {
            self.migrate_widen_availability_check().await?;
            self.record_migration(1).await?;
            tracing::info!(action = "migration_applied", version = 1);
        }
        Ok(())
    }

    async fn is_migration_applied(&self, version: i64) -> Result<bool> {
        let row = sqlx::query("SELECT version FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read schema_migrations: {}", e)))?;
        Ok(row.is_some())
    }

    async fn record_migration(&self, version: i64) -> Result<()> {
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(version)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to record migration: {}", e)))?;
        Ok(())
    }

    /// Migration 1: widen the availability CHECK constraint on
    /// b2b_product_configs to admit 'low_stock' and 'preorder'. SQLite cannot
    /// alter a CHECK in place, so the table is rebuilt and rows copied over.
    async fn migrate_widen_availability_check(&self) -> Result<()> {
        let query = r#"
            CREATE TABLE b2b_product_configs_new (
                id TEXT PRIMARY KEY,
                product_id TEXT UNIQUE NOT NULL,
                min_order_quantity INTEGER NOT NULL DEFAULT 1,
                lead_time_days INTEGER,
                bulk_pricing_tiers TEXT,
                b2b_only BOOLEAN NOT NULL DEFAULT FALSE,
                unit_of_measure TEXT NOT NULL DEFAULT 'unit',
                availability TEXT NOT NULL DEFAULT 'in_stock'
                    CHECK (availability IN ('in_stock', 'low_stock', 'out_of_stock', 'preorder', 'discontinued')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            INSERT INTO b2b_product_configs_new SELECT * FROM b2b_product_configs;
            DROP TABLE b2b_product_configs;
            ALTER TABLE b2b_product_configs_new RENAME TO b2b_product_configs;
        "#;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin migration: {}", e)))?;
        sqlx::query(query)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to rebuild b2b_product_configs: {}", e)))?;
        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit migration: {}", e)))?;
        Ok(())
    }

    // Order methods

    pub async fn create_order(&self, order: &Order) -> Result<()> {
        let query = r#"
            INSERT INTO orders (id, buyer_id, seller_id, buyer_email, status, total_amount, currency, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#;

        sqlx::query(query)
            .bind(order.id.to_string())
            .bind(order.buyer_id.to_string())
            .bind(order.seller_id.to_string())
            .bind(order.buyer_email.as_deref())
            .bind(order.status.as_str())
            .bind(&order.total_amount)
            .bind(&order.currency)
            .bind(order.created_at.to_rfc3339())
            .bind(order.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create order: {}", e)))?;

        Ok(())
    }

    pub async fn get_order_by_id(&self, order_id: &Uuid) -> Result<Option<Order>> {
        let query = r#"
            SELECT id, buyer_id, seller_id, buyer_email, status, total_amount, currency, created_at, updated_at
            FROM orders
            WHERE id = ?1
        "#;

        let row = sqlx::query(query)
            .bind(order_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch order: {}", e)))?;

        row.map(|r| Self::row_to_order(&r)).transpose()
    }

    /// Accepts a pending order and stores its held escrow in one transaction.
    /// The status change is conditional on the order still being pending;
    /// returns false (and writes nothing) when the condition fails, so a
    /// concurrent accept cannot hold a second escrow.
    pub async fn accept_order_with_escrow(&self, order_id: &Uuid, escrow: &EscrowTransaction) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let updated = sqlx::query(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(OrderStatus::Accepted.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(order_id.to_string())
        .bind(OrderStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to accept order: {}", e)))?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO escrow_transactions (
                id, order_id, buyer_id, seller_id, amount, currency,
                status, created_at, updated_at, released_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(escrow.id.to_string())
        .bind(escrow.order_id.to_string())
        .bind(escrow.buyer_id.to_string())
        .bind(escrow.seller_id.to_string())
        .bind(&escrow.amount)
        .bind(&escrow.currency)
        .bind(escrow.status.as_str())
        .bind(escrow.created_at.to_rfc3339())
        .bind(escrow.updated_at.to_rfc3339())
        .bind(escrow.released_at.map(|dt| dt.to_rfc3339()))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to store escrow transaction: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit order acceptance: {}", e)))?;

        Ok(true)
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order> {
        Ok(Order {
            id: Self::parse_uuid(row, "id")?,
            buyer_id: Self::parse_uuid(row, "buyer_id")?,
            seller_id: Self::parse_uuid(row, "seller_id")?,
            buyer_email: row.get("buyer_email"),
            status: OrderStatus::parse(&row.get::<String, _>("status"))
                .ok_or_else(|| AppError::DatabaseError("Invalid order status".to_string()))?,
            total_amount: row.get("total_amount"),
            currency: row.get("currency"),
            created_at: Self::parse_datetime(row, "created_at")?,
            updated_at: Self::parse_datetime(row, "updated_at")?,
        })
    }

    // Escrow methods

    pub async fn store_escrow_transaction(&self, escrow: &EscrowTransaction) -> Result<()> {
        let query = r#"
            INSERT INTO escrow_transactions (
                id, order_id, buyer_id, seller_id, amount, currency,
                status, created_at, updated_at, released_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#;

        sqlx::query(query)
            .bind(escrow.id.to_string())
            .bind(escrow.order_id.to_string())
            .bind(escrow.buyer_id.to_string())
            .bind(escrow.seller_id.to_string())
            .bind(&escrow.amount)
            .bind(&escrow.currency)
            .bind(escrow.status.as_str())
            .bind(escrow.created_at.to_rfc3339())
            .bind(escrow.updated_at.to_rfc3339())
            .bind(escrow.released_at.map(|dt| dt.to_rfc3339()))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store escrow transaction: {}", e)))?;

        Ok(())
    }

    pub async fn get_escrow_by_id(&self, escrow_id: &Uuid) -> Result<Option<EscrowTransaction>> {
        let query = r#"
            SELECT id, order_id, buyer_id, seller_id, amount, currency,
                   status, created_at, updated_at, released_at
            FROM escrow_transactions
            WHERE id = ?1
        "#;

        let row = sqlx::query(query)
            .bind(escrow_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch escrow transaction: {}", e)))?;

        row.map(|r| Self::row_to_escrow(&r)).transpose()
    }

    pub async fn list_escrow_transactions(
        &self,
        status: Option<EscrowStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EscrowTransaction>> {
        let where_clause = if status.is_some() { "WHERE status = ?1" } else { "" };
        let query = format!(
            r#"
            SELECT id, order_id, buyer_id, seller_id, amount, currency,
                   status, created_at, updated_at, released_at
            FROM escrow_transactions
            {}
            ORDER BY created_at DESC
            LIMIT {} OFFSET {}
            "#,
            where_clause, limit, offset
        );

        let mut q = sqlx::query(&query);
        if let Some(s) = status {
            q = q.bind(s.as_str());
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list escrow transactions: {}", e)))?;

        rows.iter().map(Self::row_to_escrow).collect()
    }

    pub async fn count_escrow_transactions(&self, status: Option<EscrowStatus>) -> Result<i64> {
        let where_clause = if status.is_some() { "WHERE status = ?1" } else { "" };
        let query = format!("SELECT COUNT(*) as count FROM escrow_transactions {}", where_clause);

        let mut q = sqlx::query(&query);
        if let Some(s) = status {
            q = q.bind(s.as_str());
        }
        let row = q
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count escrow transactions: {}", e)))?;

        Ok(row.get("count"))
    }

    /// Moves an escrow out of `held`. The update is conditional on the
    /// current status, so concurrent settlements cannot both apply; returns
    /// false when the escrow was not held.
    pub async fn settle_escrow(
        &self,
        escrow_id: &Uuid,
        status: EscrowStatus,
        released_at: DateTime<Utc>,
    ) -> Result<bool> {
        let query = r#"
            UPDATE escrow_transactions
            SET status = ?1, updated_at = ?2, released_at = ?3
            WHERE id = ?4 AND status = ?5
        "#;

        let result = sqlx::query(query)
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(released_at.to_rfc3339())
            .bind(escrow_id.to_string())
            .bind(EscrowStatus::Held.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to settle escrow: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_escrow(row: &SqliteRow) -> Result<EscrowTransaction> {
        Ok(EscrowTransaction {
            id: Self::parse_uuid(row, "id")?,
            order_id: Self::parse_uuid(row, "order_id")?,
            buyer_id: Self::parse_uuid(row, "buyer_id")?,
            seller_id: Self::parse_uuid(row, "seller_id")?,
            amount: row.get("amount"),
            currency: row.get("currency"),
            status: EscrowStatus::parse(&row.get::<String, _>("status"))
                .ok_or_else(|| AppError::DatabaseError("Invalid escrow status".to_string()))?,
            created_at: Self::parse_datetime(row, "created_at")?,
            updated_at: Self::parse_datetime(row, "updated_at")?,
            released_at: Self::parse_datetime_opt(row, "released_at")?,
        })
    }

    // Shipment tracking methods

    pub async fn store_shipment_tracking(&self, tracking: &ShipmentTracking) -> Result<()> {
        let query = r#"
            INSERT INTO shipment_trackings (
                id, order_id, carrier, tracking_number, status, events, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#;

        sqlx::query(query)
            .bind(tracking.id.to_string())
            .bind(tracking.order_id.to_string())
            .bind(&tracking.carrier)
            .bind(&tracking.tracking_number)
            .bind(tracking.status.as_str())
            .bind(serde_json::to_string(&tracking.events)?)
            .bind(tracking.created_at.to_rfc3339())
            .bind(tracking.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store shipment tracking: {}", e)))?;

        Ok(())
    }

    pub async fn get_shipment_tracking_by_id(&self, tracking_id: &Uuid) -> Result<Option<ShipmentTracking>> {
        let query = r#"
            SELECT id, order_id, carrier, tracking_number, status, events, created_at, updated_at
            FROM shipment_trackings
            WHERE id = ?1
        "#;

        let row = sqlx::query(query)
            .bind(tracking_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch shipment tracking: {}", e)))?;

        row.map(|r| Self::row_to_tracking(&r)).transpose()
    }

    pub async fn list_shipment_trackings(
        &self,
        status: Option<ShipmentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ShipmentTracking>> {
        let where_clause = if status.is_some() { "WHERE status = ?1" } else { "" };
        let query = format!(
            r#"
            SELECT id, order_id, carrier, tracking_number, status, events, created_at, updated_at
            FROM shipment_trackings
            {}
            ORDER BY created_at DESC
            LIMIT {} OFFSET {}
            "#,
            where_clause, limit, offset
        );

        let mut q = sqlx::query(&query);
        if let Some(s) = status {
            q = q.bind(s.as_str());
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list shipment trackings: {}", e)))?;

        rows.iter().map(Self::row_to_tracking).collect()
    }

    pub async fn count_shipment_trackings(&self, status: Option<ShipmentStatus>) -> Result<i64> {
        let where_clause = if status.is_some() { "WHERE status = ?1" } else { "" };
        let query = format!("SELECT COUNT(*) as count FROM shipment_trackings {}", where_clause);

        let mut q = sqlx::query(&query);
        if let Some(s) = status {
            q = q.bind(s.as_str());
        }
        let row = q
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count shipment trackings: {}", e)))?;

        Ok(row.get("count"))
    }

    /// Appends a delivery event and moves the shipment to the event's status.
    pub async fn append_tracking_event(&self, tracking_id: &Uuid, event: &TrackingEvent) -> Result<()> {
        let tracking = self
            .get_shipment_tracking_by_id(tracking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shipment tracking {} not found", tracking_id)))?;

        let mut events = tracking.events;
        events.push(event.clone());

        let query = r#"
            UPDATE shipment_trackings
            SET status = ?1, events = ?2, updated_at = ?3
            WHERE id = ?4
        "#;

        sqlx::query(query)
            .bind(event.status.as_str())
            .bind(serde_json::to_string(&events)?)
            .bind(Utc::now().to_rfc3339())
            .bind(tracking_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to append tracking event: {}", e)))?;

        Ok(())
    }

    fn row_to_tracking(row: &SqliteRow) -> Result<ShipmentTracking> {
        Ok(ShipmentTracking {
            id: Self::parse_uuid(row, "id")?,
            order_id: Self::parse_uuid(row, "order_id")?,
            carrier: row.get("carrier"),
            tracking_number: row.get("tracking_number"),
            status: ShipmentStatus::parse(&row.get::<String, _>("status"))
                .ok_or_else(|| AppError::DatabaseError("Invalid shipment status".to_string()))?,
            events: serde_json::from_str(&row.get::<String, _>("events"))
                .map_err(|e| AppError::DatabaseError(format!("Invalid events JSON: {}", e)))?,
            created_at: Self::parse_datetime(row, "created_at")?,
            updated_at: Self::parse_datetime(row, "updated_at")?,
        })
    }

    // Notification methods

    pub async fn store_notification(&self, notification: &Notification) -> Result<()> {
        let query = r#"
            INSERT INTO notifications (
                id, user_id, notification_type, title, message, metadata, is_read, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#;

        sqlx::query(query)
            .bind(notification.id.to_string())
            .bind(notification.user_id.to_string())
            .bind(notification.notification_type.as_str())
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.metadata.as_ref().map(serde_json::to_string).transpose()?)
            .bind(notification.is_read)
            .bind(notification.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store notification: {}", e)))?;

        Ok(())
    }

    pub async fn get_notification_by_id(&self, notification_id: &Uuid) -> Result<Option<Notification>> {
        let query = r#"
            SELECT id, user_id, notification_type, title, message, metadata, is_read, created_at
            FROM notifications
            WHERE id = ?1
        "#;

        let row = sqlx::query(query)
            .bind(notification_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch notification: {}", e)))?;

        row.map(|r| Self::row_to_notification(&r)).transpose()
    }

    pub async fn get_user_notifications(
        &self,
        user_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        let query = format!(
            r#"
            SELECT id, user_id, notification_type, title, message, metadata, is_read, created_at
            FROM notifications
            WHERE user_id = ?1
            ORDER BY created_at DESC
            LIMIT {} OFFSET {}
            "#,
            limit, offset
        );

        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch notifications: {}", e)))?;

        rows.iter().map(Self::row_to_notification).collect()
    }

    pub async fn count_user_notifications(&self, user_id: &Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM notifications WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count notifications: {}", e)))?;
        Ok(row.get("count"))
    }

    pub async fn count_unread_notifications(&self, user_id: &Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM notifications WHERE user_id = ?1 AND is_read = FALSE")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count unread notifications: {}", e)))?;
        Ok(row.get("count"))
    }

    pub async fn mark_notification_read(&self, notification_id: &Uuid) -> Result<()> {
        let query = r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE id = ?1
        "#;

        sqlx::query(query)
            .bind(notification_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to mark notification read: {}", e)))?;

        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, user_id: &Uuid) -> Result<()> {
        let query = r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE user_id = ?1 AND is_read = FALSE
        "#;
        sqlx::query(query)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to mark all notifications as read: {}", e)))?;
        Ok(())
    }

    fn row_to_notification(row: &SqliteRow) -> Result<Notification> {
        Ok(Notification {
            id: Self::parse_uuid(row, "id")?,
            user_id: Self::parse_uuid(row, "user_id")?,
            notification_type: NotificationType::parse(&row.get::<String, _>("notification_type"))
                .ok_or_else(|| AppError::DatabaseError("Invalid notification type".to_string()))?,
            title: row.get("title"),
            message: row.get("message"),
            metadata: row
                .get::<Option<String>, _>("metadata")
                .map(|s| serde_json::from_str(&s))
                .transpose()
                .map_err(|e| AppError::DatabaseError(format!("Invalid metadata JSON: {}", e)))?,
            is_read: row.get("is_read"),
            created_at: Self::parse_datetime(row, "created_at")?,
        })
    }

    // Verification document methods

    pub async fn create_verification_document(&self, doc: &VerificationDocument) -> Result<()> {
        let query = r#"
            INSERT INTO verification_documents (
                id, user_id, profile_type, contact_email, document_urls, status,
                submitted_at, reviewed_at, rejection_reason, reviewed_by
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#;

        sqlx::query(query)
            .bind(doc.id.to_string())
            .bind(doc.user_id.to_string())
            .bind(doc.profile_type.as_str())
            .bind(doc.contact_email.as_deref())
            .bind(serde_json::to_string(&doc.document_urls)?)
            .bind(doc.status.as_str())
            .bind(doc.submitted_at.to_rfc3339())
            .bind(doc.reviewed_at.map(|dt| dt.to_rfc3339()))
            .bind(doc.rejection_reason.as_deref())
            .bind(doc.reviewed_by.map(|id| id.to_string()))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create verification document: {}", e)))?;

        Ok(())
    }

    pub async fn get_verification_by_id(&self, doc_id: &Uuid) -> Result<Option<VerificationDocument>> {
        let query = r#"
            SELECT id, user_id, profile_type, contact_email, document_urls, status,
                   submitted_at, reviewed_at, rejection_reason, reviewed_by
            FROM verification_documents
            WHERE id = ?1
        "#;

        let row = sqlx::query(query)
            .bind(doc_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch verification document: {}", e)))?;

        row.map(|r| Self::row_to_verification(&r)).transpose()
    }

    pub async fn get_pending_verification_by_user(&self, user_id: &Uuid) -> Result<Option<VerificationDocument>> {
        let query = r#"
            SELECT id, user_id, profile_type, contact_email, document_urls, status,
                   submitted_at, reviewed_at, rejection_reason, reviewed_by
            FROM verification_documents
            WHERE user_id = ?1 AND status = 'pending'
            ORDER BY submitted_at DESC
        "#;

        let row = sqlx::query(query)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch pending verification: {}", e)))?;

        row.map(|r| Self::row_to_verification(&r)).transpose()
    }

    pub async fn list_verification_documents(
        &self,
        status: Option<VerificationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VerificationDocument>> {
        let where_clause = if status.is_some() { "WHERE status = ?1" } else { "" };
        let query = format!(
            r#"
            SELECT id, user_id, profile_type, contact_email, document_urls, status,
                   submitted_at, reviewed_at, rejection_reason, reviewed_by
            FROM verification_documents
            {}
            ORDER BY submitted_at DESC
            LIMIT {} OFFSET {}
            "#,
            where_clause, limit, offset
        );

        let mut q = sqlx::query(&query);
        if let Some(s) = status {
            q = q.bind(s.as_str());
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list verification documents: {}", e)))?;

        rows.iter().map(Self::row_to_verification).collect()
    }

    pub async fn count_verification_documents(&self, status: Option<VerificationStatus>) -> Result<i64> {
        let where_clause = if status.is_some() { "WHERE status = ?1" } else { "" };
        let query = format!("SELECT COUNT(*) as count FROM verification_documents {}", where_clause);

        let mut q = sqlx::query(&query);
        if let Some(s) = status {
            q = q.bind(s.as_str());
        }
        let row = q
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count verification documents: {}", e)))?;

        Ok(row.get("count"))
    }

    pub async fn update_verification_review(
        &self,
        doc_id: &Uuid,
        status: VerificationStatus,
        rejection_reason: Option<&str>,
        reviewed_by: &Uuid,
    ) -> Result<()> {
        let query = r#"
            UPDATE verification_documents
            SET status = ?1, reviewed_at = ?2, rejection_reason = ?3, reviewed_by = ?4
            WHERE id = ?5
        "#;

        sqlx::query(query)
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(rejection_reason)
            .bind(reviewed_by.to_string())
            .bind(doc_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update verification review: {}", e)))?;

        Ok(())
    }

    fn row_to_verification(row: &SqliteRow) -> Result<VerificationDocument> {
        Ok(VerificationDocument {
            id: Self::parse_uuid(row, "id")?,
            user_id: Self::parse_uuid(row, "user_id")?,
            profile_type: ProfileType::parse(&row.get::<String, _>("profile_type"))
                .ok_or_else(|| AppError::DatabaseError("Invalid profile type".to_string()))?,
            contact_email: row.get("contact_email"),
            document_urls: serde_json::from_str(&row.get::<String, _>("document_urls"))
                .map_err(|e| AppError::DatabaseError(format!("Invalid document_urls JSON: {}", e)))?,
            status: VerificationStatus::parse(&row.get::<String, _>("status"))
                .ok_or_else(|| AppError::DatabaseError("Invalid verification status".to_string()))?,
            submitted_at: Self::parse_datetime(row, "submitted_at")?,
            reviewed_at: Self::parse_datetime_opt(row, "reviewed_at")?,
            rejection_reason: row.get("rejection_reason"),
            reviewed_by: row
                .get::<Option<String>, _>("reviewed_by")
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .map_err(|e| AppError::DatabaseError(format!("Invalid reviewer ID: {}", e)))?,
        })
    }

    // B2B product configuration methods

    pub async fn upsert_b2b_config(&self, config: &B2bProductConfig) -> Result<()> {
        let query = r#"
            INSERT INTO b2b_product_configs (
                id, product_id, min_order_quantity, lead_time_days, bulk_pricing_tiers,
                b2b_only, unit_of_measure, availability, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (product_id) DO UPDATE SET
                min_order_quantity = excluded.min_order_quantity,
                lead_time_days = excluded.lead_time_days,
                bulk_pricing_tiers = excluded.bulk_pricing_tiers,
                b2b_only = excluded.b2b_only,
                unit_of_measure = excluded.unit_of_measure,
                availability = excluded.availability,
                updated_at = excluded.updated_at
        "#;

        sqlx::query(query)
            .bind(config.id.to_string())
            .bind(config.product_id.to_string())
            .bind(config.min_order_quantity)
            .bind(config.lead_time_days)
            .bind(config.bulk_pricing_tiers.as_ref().map(serde_json::to_string).transpose()?)
            .bind(config.b2b_only)
            .bind(&config.unit_of_measure)
            .bind(config.availability.as_str())
            .bind(config.created_at.to_rfc3339())
            .bind(config.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to upsert B2B config: {}", e)))?;

        Ok(())
    }

    pub async fn get_b2b_config_by_product(&self, product_id: &Uuid) -> Result<Option<B2bProductConfig>> {
        let query = r#"
            SELECT id, product_id, min_order_quantity, lead_time_days, bulk_pricing_tiers,
                   b2b_only, unit_of_measure, availability, created_at, updated_at
            FROM b2b_product_configs
            WHERE product_id = ?1
        "#;

        let row = sqlx::query(query)
            .bind(product_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch B2B config: {}", e)))?;

        row.map(|r| Self::row_to_b2b_config(&r)).transpose()
    }

    fn row_to_b2b_config(row: &SqliteRow) -> Result<B2bProductConfig> {
        Ok(B2bProductConfig {
            id: Self::parse_uuid(row, "id")?,
            product_id: Self::parse_uuid(row, "product_id")?,
            min_order_quantity: row.get("min_order_quantity"),
            lead_time_days: row.get("lead_time_days"),
            bulk_pricing_tiers: row
                .get::<Option<String>, _>("bulk_pricing_tiers")
                .map(|s| serde_json::from_str(&s))
                .transpose()
                .map_err(|e| AppError::DatabaseError(format!("Invalid pricing tiers JSON: {}", e)))?,
            b2b_only: row.get("b2b_only"),
            unit_of_measure: row.get("unit_of_measure"),
            availability: AvailabilityStatus::parse(&row.get::<String, _>("availability"))
                .ok_or_else(|| AppError::DatabaseError("Invalid availability status".to_string()))?,
            created_at: Self::parse_datetime(row, "created_at")?,
            updated_at: Self::parse_datetime(row, "updated_at")?,
        })
    }

    // Row parsing helpers

    fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
        Uuid::parse_str(&row.get::<String, _>(column))
            .map_err(|e| AppError::DatabaseError(format!("Invalid {}: {}", column, e)))
    }

    fn parse_datetime(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&row.get::<String, _>(column))
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AppError::DatabaseError(format!("Invalid {} date: {}", column, e)))
    }

    fn parse_datetime_opt(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
        row.get::<Option<String>, _>(column)
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| AppError::DatabaseError(format!("Invalid {} date: {}", column, e)))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_db() -> SqliteDatabase {
        let path = std::env::temp_dir().join(format!("tradehub-db-{}.db", Uuid::new_v4()));
        SqliteDatabase::new(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn unknown_notification_type_is_a_database_error() {
        let db = temp_db().await;
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, notification_type, title, message, is_read, created_at)
            VALUES (?1, ?2, 'carrier_pigeon', 'title', 'message', FALSE, ?3)
            "#,
        )
        .bind(id.to_string())
        .bind(Uuid::new_v4().to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&db.pool)
        .await
        .unwrap();

        let err = db.get_notification_by_id(&id).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
