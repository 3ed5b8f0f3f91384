use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::database::sqlite::{SqliteDatabase, GLOBAL_DB};
use crate::errors::{AppError, Result};
use crate::utils::middleware::global_rate_limiter;
use hyper::Method;

pub mod docs;
pub mod routes;
pub mod types;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Admin endpoints:
        routes::list_escrows,
        routes::release_escrow,
        routes::refund_escrow,
        routes::list_shipments,
        routes::list_verifications,
        routes::review_verification,
        routes::get_b2b_config,
        routes::upsert_b2b_config,
        // Storefront endpoints:
        routes::list_notifications,
        routes::unread_notifications,
        routes::mark_notification_read,
        routes::mark_all_notifications_read,
        routes::accept_order,
        routes::submit_verification,
    ),
    components(
        schemas(
            types::ErrorResponse,
            types::EscrowListResponse,
            types::EscrowActionResponse,
            types::ShipmentListResponse,
            types::VerificationListResponse,
            types::SubmitVerificationRequest,
            types::ReviewVerificationRequest,
            types::UpsertB2bConfigRequest,
            types::NotificationListResponse,
            types::UnreadCountResponse,
            types::AcceptOrderResponse,
            types::MessageResponse,

            crate::models::escrow::EscrowTransaction,
            crate::models::escrow::EscrowStatus,
            crate::models::tracking::ShipmentTracking,
            crate::models::tracking::TrackingEvent,
            crate::models::tracking::ShipmentStatus,
            crate::models::notification::Notification,
            crate::models::notification::NotificationType,
            crate::models::order::Order,
            crate::models::order::OrderStatus,
            crate::models::verification::VerificationDocument,
            crate::models::verification::VerificationStatus,
            crate::models::verification::ProfileType,
            crate::models::b2b_product::B2bProductConfig,
            crate::models::b2b_product::PriceTier,
            crate::models::b2b_product::AvailabilityStatus,
        )
    ),
    tags(
        (name = "Admin", description = "Escrow oversight, shipment tracking, verification review and wholesale product configuration. Requires the admin role."),
        (name = "Notification", description = "Per-user notification feed. Use the Authorize button and paste your token as 'Bearer <token>'."),
        (name = "Order", description = "Order acceptance workflow"),
        (name = "Verification", description = "Seller and buyer identity verification")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
        openapi.security = Some(vec![utoipa::openapi::security::SecurityRequirement::new(
            "bearerAuth",
            Vec::<String>::new(),
        )]);
    }
}

pub async fn request_id_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());
    let span = tracing::info_span!("request", request_id = %request_id, method = %req.method(), uri = %req.uri());
    // An entered guard must not be held across an await point.
    next.run(req).instrument(span).await
}

/// Build the full application router with CORS, rate limiting and docs routes.
pub fn build_router() -> Router {
    let openapi = ApiDoc::openapi();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .nest("/api/admin", routes::admin_router())
        .nest("/api/notifications", routes::notifications_router())
        .nest("/api/orders", routes::orders_router())
        .nest("/api/verifications", routes::verifications_router())
        .route("/health", axum::routing::get(health_check))
        .route("/docs/openapi.json", axum::routing::get(openapi_json))
        .route("/docs/markdown", axum::routing::get(api_markdown))
        .route("/docs", axum::routing::get(api_documentation))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi.clone()))
        .merge(Redoc::with_url("/api/redoc", openapi))
        .layer(cors)
        .layer(axum::middleware::from_fn(global_rate_limiter))
        .layer(axum::middleware::from_fn(request_id_middleware))
}

/// Main entry point for the TradeHub API server.
pub async fn start_http_server() -> Result<()> {
    let db_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| "tradehub.db".to_string());
    let db = Arc::new(SqliteDatabase::new(&db_path).await?);
    GLOBAL_DB
        .set(db)
        .map_err(|_| AppError::InternalError("Database already initialized".to_string()))?;

    let app = build_router();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr: SocketAddr = format!("0.0.0.0:{}", port)
        .parse()
        .map_err(|e| AppError::ConfigError(format!("Invalid PORT: {}", e)))?;

    tracing::info!(action = "server_started", address = %addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::ConfigError(format!("Failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::InternalError(format!("Server error: {}", e)))?;
    Ok(())
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Export OpenAPI specification as JSON
async fn openapi_json() -> Json<Value> {
    let openapi = ApiDoc::openapi();
    Json(serde_json::to_value(openapi).unwrap_or(Value::Null))
}

/// Serves the API documentation as downloadable Markdown.
async fn api_markdown() -> impl IntoResponse {
    let markdown = docs::generate_markdown_docs();
    axum::response::Response::builder()
        .header("Content-Type", "text/markdown")
        .header(
            "Content-Disposition",
            "attachment; filename=\"API_DOCUMENTATION.md\"",
        )
        .body(axum::body::Body::from(markdown))
        .unwrap()
}

/// Serves the main API documentation HTML page.
async fn api_documentation() -> impl IntoResponse {
    let html = docs::generate_documentation_html();
    axum::response::Html(html)
}
