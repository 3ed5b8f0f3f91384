use axum::extract::{Path, Query};
use axum::http::{header::AUTHORIZATION, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{extract::FromRequestParts, Json, Router};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::types::*;
use crate::database::sqlite::GLOBAL_DB;
use crate::errors::AppError;
use crate::models::b2b_product::B2bProductConfig;
use crate::models::escrow::EscrowStatus;
use crate::models::tracking::ShipmentStatus;
use crate::models::verification::{VerificationDocument, VerificationStatus};
use crate::services::escrow_service::EscrowService;
use crate::services::jwt::{Actor, JwtManager};
use crate::services::notification_service::NotificationService;
use crate::services::order_service::OrderService;
use crate::services::tracking_service::TrackingService;
use crate::services::verification_service::VerificationService;
use crate::utils::validation::Validator;
use chrono::Utc;

// Bearer-token extractor for Authorization: Bearer ...
pub struct AuthBearer(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.headers.get(AUTHORIZATION) {
            if let Ok(auth_str) = auth.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    return Ok(AuthBearer(token.to_string()));
                }
            }
        }
        Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Missing or invalid Authorization header".to_string(),
            }),
        ))
    }
}

// Resolve the actor attached to the request by the auth middleware.
fn actor_from_token(token: &str) -> Result<Actor, Response> {
    let manager = JwtManager::from_env().map_err(|e| {
        error!(action = "jwt_config_missing", error = %e);
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "Server misconfiguration")
    })?;
    let token_data = manager
        .validate_token(token)
        .map_err(|e| json_error(StatusCode::UNAUTHORIZED, &format!("Invalid token: {}", e)))?;
    Actor::try_from(token_data.claims)
        .map_err(|e| json_error(StatusCode::UNAUTHORIZED, &format!("Invalid token: {}", e)))
}

// Admin routes additionally require the admin role claim.
fn admin_from_token(token: &str) -> Result<Actor, Response> {
    let actor = actor_from_token(token)?;
    if !actor.is_admin() {
        return Err(json_error(StatusCode::FORBIDDEN, "Admin role required"));
    }
    Ok(actor)
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn app_error_response(err: AppError) -> Response {
    let status = match &err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
        AppError::AuthenticationError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, &err.to_string())
}

// Admin: escrow transactions

#[utoipa::path(
    get,
    path = "/api/admin/escrows",
    params(ListQuery),
    responses(
        (status = 200, body = EscrowListResponse, description = "Escrow transactions, newest first"),
        (status = 400, body = ErrorResponse, description = "Unknown status filter"),
        (status = 401, body = ErrorResponse, description = "Missing or invalid token"),
        (status = 403, body = ErrorResponse, description = "Admin role required")
    ),
    tag = "Admin"
)]
pub async fn list_escrows(AuthBearer(token): AuthBearer, Query(query): Query<ListQuery>) -> Response {
    let _admin = match admin_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => match EscrowStatus::parse(s) {
            Some(parsed) => Some(parsed),
            None => return json_error(StatusCode::BAD_REQUEST, &format!("Unknown escrow status: {}", s)),
        },
    };
    let (limit, offset) = query.page();
    match EscrowService::new(db).list(status, limit, offset).await {
        Ok((escrows, count)) => (
            StatusCode::OK,
            Json(EscrowListResponse {
                escrows,
                count,
                limit,
                offset,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(action = "list_escrows_failed", error = %e);
            app_error_response(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/escrows/{id}/release",
    responses(
        (status = 200, body = EscrowActionResponse, description = "Escrow released to the seller"),
        (status = 404, body = ErrorResponse, description = "Escrow not found"),
        (status = 409, body = ErrorResponse, description = "Escrow is not held")
    ),
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Escrow transaction ID"))
)]
pub async fn release_escrow(AuthBearer(token): AuthBearer, Path(escrow_id): Path<Uuid>) -> Response {
    let admin = match admin_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    match EscrowService::new(db).release(&escrow_id).await {
        Ok(escrow) => {
            info!(action = "escrow_released", escrow_id = %escrow_id, admin_id = %admin.actor_id);
            (
                StatusCode::OK,
                Json(EscrowActionResponse {
                    escrow,
                    message: "Escrow released".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(action = "escrow_release_failed", escrow_id = %escrow_id, error = %e);
            app_error_response(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/escrows/{id}/refund",
    responses(
        (status = 200, body = EscrowActionResponse, description = "Escrow refunded to the buyer"),
        (status = 404, body = ErrorResponse, description = "Escrow not found"),
        (status = 409, body = ErrorResponse, description = "Escrow is not held")
    ),
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Escrow transaction ID"))
)]
pub async fn refund_escrow(AuthBearer(token): AuthBearer, Path(escrow_id): Path<Uuid>) -> Response {
    let admin = match admin_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    match EscrowService::new(db).refund(&escrow_id).await {
        Ok(escrow) => {
            info!(action = "escrow_refunded", escrow_id = %escrow_id, admin_id = %admin.actor_id);
            (
                StatusCode::OK,
                Json(EscrowActionResponse {
                    escrow,
                    message: "Escrow refunded".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(action = "escrow_refund_failed", escrow_id = %escrow_id, error = %e);
            app_error_response(e)
        }
    }
}

// Admin: shipment tracking

#[utoipa::path(
    get,
    path = "/api/admin/shipments",
    params(ListQuery),
    responses(
        (status = 200, body = ShipmentListResponse, description = "Shipment tracking records, newest first"),
        (status = 400, body = ErrorResponse, description = "Unknown status filter"),
        (status = 401, body = ErrorResponse, description = "Missing or invalid token"),
        (status = 403, body = ErrorResponse, description = "Admin role required")
    ),
    tag = "Admin"
)]
pub async fn list_shipments(AuthBearer(token): AuthBearer, Query(query): Query<ListQuery>) -> Response {
    let _admin = match admin_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => match ShipmentStatus::parse(s) {
            Some(parsed) => Some(parsed),
            None => return json_error(StatusCode::BAD_REQUEST, &format!("Unknown shipment status: {}", s)),
        },
    };
    let (limit, offset) = query.page();
    match TrackingService::new(db).list(status, limit, offset).await {
        Ok((shipments, count)) => (
            StatusCode::OK,
            Json(ShipmentListResponse {
                shipments,
                count,
                limit,
                offset,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(action = "list_shipments_failed", error = %e);
            app_error_response(e)
        }
    }
}

// Admin: verification documents

#[utoipa::path(
    get,
    path = "/api/admin/verifications",
    params(ListQuery),
    responses(
        (status = 200, body = VerificationListResponse, description = "Verification submissions, newest first"),
        (status = 400, body = ErrorResponse, description = "Unknown status filter"),
        (status = 401, body = ErrorResponse, description = "Missing or invalid token"),
        (status = 403, body = ErrorResponse, description = "Admin role required")
    ),
    tag = "Admin"
)]
pub async fn list_verifications(AuthBearer(token): AuthBearer, Query(query): Query<ListQuery>) -> Response {
    let _admin = match admin_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => match VerificationStatus::parse(s) {
            Some(parsed) => Some(parsed),
            None => {
                return json_error(StatusCode::BAD_REQUEST, &format!("Unknown verification status: {}", s))
            }
        },
    };
    let (limit, offset) = query.page();
    match VerificationService::new(db).list(status, limit, offset).await {
        Ok((verifications, count)) => (
            StatusCode::OK,
            Json(VerificationListResponse {
                verifications,
                count,
                limit,
                offset,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(action = "list_verifications_failed", error = %e);
            app_error_response(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/verifications/{id}/review",
    request_body = ReviewVerificationRequest,
    responses(
        (status = 200, body = VerificationDocument, description = "Review recorded"),
        (status = 400, body = ErrorResponse, description = "Rejection without a reason"),
        (status = 404, body = ErrorResponse, description = "Submission not found"),
        (status = 409, body = ErrorResponse, description = "Submission already reviewed")
    ),
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Verification document ID"))
)]
pub async fn review_verification(
    AuthBearer(token): AuthBearer,
    Path(doc_id): Path<Uuid>,
    Json(req): Json<ReviewVerificationRequest>,
) -> Response {
    let admin = match admin_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    if let Some(reason) = &req.rejection_reason {
        if let Err(e) = Validator::validate_rejection_reason(reason) {
            return app_error_response(e);
        }
    }
    let db = GLOBAL_DB.get().unwrap().clone();
    match VerificationService::new(db)
        .review(&doc_id, req.approve, req.rejection_reason, &admin.actor_id)
        .await
    {
        Ok(doc) => {
            info!(action = "verification_reviewed", document_id = %doc_id, approved = req.approve, admin_id = %admin.actor_id);
            (StatusCode::OK, Json(doc)).into_response()
        }
        Err(e) => {
            error!(action = "verification_review_failed", document_id = %doc_id, error = %e);
            app_error_response(e)
        }
    }
}

// Admin: B2B product configuration

#[utoipa::path(
    get,
    path = "/api/admin/products/{product_id}/b2b-config",
    responses(
        (status = 200, body = B2bProductConfig, description = "B2B configuration for the product"),
        (status = 404, body = ErrorResponse, description = "No configuration for this product")
    ),
    tag = "Admin",
    params(("product_id" = Uuid, Path, description = "Product ID"))
)]
pub async fn get_b2b_config(AuthBearer(token): AuthBearer, Path(product_id): Path<Uuid>) -> Response {
    let _admin = match admin_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    match db.get_b2b_config_by_product(&product_id).await {
        Ok(Some(config)) => (StatusCode::OK, Json(config)).into_response(),
        Ok(None) => json_error(
            StatusCode::NOT_FOUND,
            &format!("No B2B configuration for product {}", product_id),
        ),
        Err(e) => {
            error!(action = "get_b2b_config_failed", product_id = %product_id, error = %e);
            app_error_response(e)
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{product_id}/b2b-config",
    request_body = UpsertB2bConfigRequest,
    responses(
        (status = 200, body = B2bProductConfig, description = "Configuration saved"),
        (status = 400, body = ErrorResponse, description = "Validation failure")
    ),
    tag = "Admin",
    params(("product_id" = Uuid, Path, description = "Product ID"))
)]
pub async fn upsert_b2b_config(
    AuthBearer(token): AuthBearer,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpsertB2bConfigRequest>,
) -> Response {
    let admin = match admin_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    if let Err(e) = Validator::validate_min_order_quantity(req.min_order_quantity) {
        return app_error_response(e);
    }
    if let Err(e) = Validator::validate_unit_of_measure(&req.unit_of_measure) {
        return app_error_response(e);
    }
    if let Some(tiers) = &req.bulk_pricing_tiers {
        if let Err(e) = Validator::validate_pricing_tiers(tiers, req.min_order_quantity) {
            return app_error_response(e);
        }
    }

    let db = GLOBAL_DB.get().unwrap().clone();
    // Keep id and created_at stable across repeated configuration saves.
    let existing = match db.get_b2b_config_by_product(&product_id).await {
        Ok(c) => c,
        Err(e) => {
            error!(action = "get_b2b_config_failed", product_id = %product_id, error = %e);
            return app_error_response(e);
        }
    };
    let now = Utc::now();
    let config = B2bProductConfig {
        id: existing.as_ref().map(|c| c.id).unwrap_or_else(Uuid::new_v4),
        product_id,
        min_order_quantity: req.min_order_quantity,
        lead_time_days: req.lead_time_days,
        bulk_pricing_tiers: req.bulk_pricing_tiers,
        b2b_only: req.b2b_only,
        unit_of_measure: req.unit_of_measure.trim().to_string(),
        availability: req.availability,
        created_at: existing.as_ref().map(|c| c.created_at).unwrap_or(now),
        updated_at: now,
    };
    match db.upsert_b2b_config(&config).await {
        Ok(()) => {
            info!(action = "b2b_config_saved", product_id = %product_id, admin_id = %admin.actor_id);
            (StatusCode::OK, Json(config)).into_response()
        }
        Err(e) => {
            error!(action = "upsert_b2b_config_failed", product_id = %product_id, error = %e);
            app_error_response(e)
        }
    }
}

// Storefront: notifications

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(ListQuery),
    responses(
        (status = 200, body = NotificationListResponse, description = "The actor's notifications, newest first"),
        (status = 401, body = ErrorResponse, description = "Missing or invalid token")
    ),
    tag = "Notification"
)]
pub async fn list_notifications(AuthBearer(token): AuthBearer, Query(query): Query<ListQuery>) -> Response {
    let actor = match actor_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    let (limit, offset) = query.page();
    match NotificationService::new(db)
        .get_user_notifications(&actor.actor_id, limit, offset)
        .await
    {
        Ok((notifications, count)) => (
            StatusCode::OK,
            Json(NotificationListResponse {
                notifications,
                count,
                limit,
                offset,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(action = "list_notifications_failed", user_id = %actor.actor_id, error = %e);
            app_error_response(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread",
    responses(
        (status = 200, body = UnreadCountResponse, description = "Number of unread notifications"),
        (status = 401, body = ErrorResponse, description = "Missing or invalid token")
    ),
    tag = "Notification"
)]
pub async fn unread_notifications(AuthBearer(token): AuthBearer) -> Response {
    let actor = match actor_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    match NotificationService::new(db).count_unread(&actor.actor_id).await {
        Ok(count) => (StatusCode::OK, Json(UnreadCountResponse { count })).into_response(),
        Err(e) => {
            error!(action = "unread_count_failed", user_id = %actor.actor_id, error = %e);
            app_error_response(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    responses(
        (status = 200, body = MessageResponse, description = "Notification marked as read"),
        (status = 403, body = ErrorResponse, description = "Notification belongs to another user"),
        (status = 404, body = ErrorResponse, description = "Notification not found")
    ),
    tag = "Notification",
    params(("id" = Uuid, Path, description = "Notification ID"))
)]
pub async fn mark_notification_read(AuthBearer(token): AuthBearer, Path(notification_id): Path<Uuid>) -> Response {
    let actor = match actor_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    let service = NotificationService::new(db);
    let notification = match service.get_notification(&notification_id).await {
        Ok(Some(n)) => n,
        Ok(None) => {
            return json_error(
                StatusCode::NOT_FOUND,
                &format!("Notification {} not found", notification_id),
            )
        }
        Err(e) => {
            error!(action = "get_notification_failed", notification_id = %notification_id, error = %e);
            return app_error_response(e);
        }
    };
    if notification.user_id != actor.actor_id {
        return json_error(StatusCode::FORBIDDEN, "Notification belongs to another user");
    }
    match service.mark_notification_read(&notification_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Notification marked as read".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(action = "mark_notification_read_failed", notification_id = %notification_id, error = %e);
            app_error_response(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, body = MessageResponse, description = "All notifications marked as read"),
        (status = 401, body = ErrorResponse, description = "Missing or invalid token")
    ),
    tag = "Notification"
)]
pub async fn mark_all_notifications_read(AuthBearer(token): AuthBearer) -> Response {
    let actor = match actor_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    match NotificationService::new(db).mark_all_notifications_read(&actor.actor_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "All notifications marked as read".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(action = "mark_all_read_failed", user_id = %actor.actor_id, error = %e);
            app_error_response(e)
        }
    }
}

// Storefront: orders

#[utoipa::path(
    post,
    path = "/api/orders/{id}/accept",
    responses(
        (status = 200, body = AcceptOrderResponse, description = "Order accepted, funds held in escrow"),
        (status = 401, body = ErrorResponse, description = "Missing or invalid token"),
        (status = 403, body = ErrorResponse, description = "Actor is not the order's seller"),
        (status = 404, body = ErrorResponse, description = "Order not found"),
        (status = 409, body = ErrorResponse, description = "Order is not pending")
    ),
    tag = "Order",
    params(("id" = Uuid, Path, description = "Order ID"))
)]
pub async fn accept_order(AuthBearer(token): AuthBearer, Path(order_id): Path<Uuid>) -> Response {
    let actor = match actor_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let db = GLOBAL_DB.get().unwrap().clone();
    let service = OrderService::new(db);
    let order = match service.get_order(&order_id).await {
        Ok(Some(o)) => o,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, &format!("Order {} not found", order_id)),
        Err(e) => {
            error!(action = "get_order_failed", order_id = %order_id, error = %e);
            return app_error_response(e);
        }
    };
    if order.seller_id != actor.actor_id {
        return json_error(StatusCode::FORBIDDEN, "Only the order's seller can accept it");
    }
    match service.accept_order(&order_id).await {
        Ok((order, escrow)) => (
            StatusCode::OK,
            Json(AcceptOrderResponse {
                order,
                escrow,
                message: "Order accepted".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(action = "accept_order_failed", order_id = %order_id, error = %e);
            app_error_response(e)
        }
    }
}

// Storefront: verification submissions

#[utoipa::path(
    post,
    path = "/api/verifications",
    request_body = SubmitVerificationRequest,
    responses(
        (status = 201, body = VerificationDocument, description = "Submission created, pending review"),
        (status = 400, body = ErrorResponse, description = "Invalid document URLs"),
        (status = 401, body = ErrorResponse, description = "Missing or invalid token"),
        (status = 409, body = ErrorResponse, description = "A pending submission already exists")
    ),
    tag = "Verification"
)]
pub async fn submit_verification(
    AuthBearer(token): AuthBearer,
    Json(req): Json<SubmitVerificationRequest>,
) -> Response {
    let actor = match actor_from_token(&token) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    if let Err(e) = Validator::validate_document_urls(&req.document_urls) {
        return app_error_response(e);
    }
    let db = GLOBAL_DB.get().unwrap().clone();
    match VerificationService::new(db)
        .submit(&actor.actor_id, req.profile_type, req.document_urls, actor.email.clone())
        .await
    {
        Ok(doc) => {
            info!(action = "verification_submitted", user_id = %actor.actor_id, document_id = %doc.id);
            (StatusCode::CREATED, Json(doc)).into_response()
        }
        Err(e) => {
            error!(action = "submit_verification_failed", user_id = %actor.actor_id, error = %e);
            app_error_response(e)
        }
    }
}

// Routers

pub fn admin_router() -> Router {
    Router::new()
        .route("/escrows", get(list_escrows))
        .route("/escrows/:id/release", post(release_escrow))
        .route("/escrows/:id/refund", post(refund_escrow))
        .route("/shipments", get(list_shipments))
        .route("/verifications", get(list_verifications))
        .route("/verifications/:id/review", post(review_verification))
        .route("/products/:product_id/b2b-config", get(get_b2b_config))
        .route("/products/:product_id/b2b-config", put(upsert_b2b_config))
}

pub fn notifications_router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread", get(unread_notifications))
        .route("/:id/read", post(mark_notification_read))
        .route("/read-all", post(mark_all_notifications_read))
}

pub fn orders_router() -> Router {
    Router::new().route("/:id/accept", post(accept_order))
}

pub fn verifications_router() -> Router {
    Router::new().route("/", post(submit_verification))
}
