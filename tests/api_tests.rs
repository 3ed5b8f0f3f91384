use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use tradehub::api;
use tradehub::database::sqlite::{SqliteDatabase, GLOBAL_DB};
use tradehub::errors::AppError;
use tradehub::models::escrow::{EscrowStatus, EscrowTransaction};
use tradehub::models::notification::{Notification, NotificationType};
use tradehub::models::order::{Order, OrderStatus};
use tradehub::models::tracking::ShipmentStatus;
use tradehub::services::escrow_service::EscrowService;
use tradehub::services::jwt::JwtManager;
use tradehub::services::order_service::OrderService;
use tradehub::services::tracking_service::TrackingService;

// All tests share one database file through GLOBAL_DB, so each test works
// with its own users, orders and escrows to keep counts deterministic.
async fn test_db() -> Arc<SqliteDatabase> {
    std::env::set_var("JWT_SECRET", "integration-test-secret");
    std::env::set_var("RATE_LIMIT_PER_SEC", "100000");
    if let Some(db) = GLOBAL_DB.get() {
        return db.clone();
    }
    let path = std::env::temp_dir().join(format!("tradehub-test-{}.db", Uuid::new_v4()));
    let db = Arc::new(SqliteDatabase::new(path.to_str().unwrap()).await.unwrap());
    let _ = GLOBAL_DB.set(db);
    GLOBAL_DB.get().unwrap().clone()
}

fn token_for(actor_id: &Uuid, role: &str) -> String {
    JwtManager::from_env()
        .unwrap()
        .generate_token(actor_id, role, None)
        .unwrap()
}

fn token_with_email(actor_id: &Uuid, role: &str, email: &str) -> String {
    JwtManager::from_env()
        .unwrap()
        .generate_token(actor_id, role, Some(email))
        .unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    match body {
        Some(value) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(req: Request<Body>) -> (StatusCode, Value) {
    let response = api::build_router().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn seed_order(db: &SqliteDatabase, buyer_id: Uuid, seller_id: Uuid, amount: &str) -> Order {
    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        buyer_id,
        seller_id,
        buyer_email: Some("buyer@tradehub.example".to_string()),
        status: OrderStatus::Pending,
        total_amount: amount.to_string(),
        currency: "USD".to_string(),
        created_at: now,
        updated_at: now,
    };
    db.create_order(&order).await.unwrap();
    order
}

#[tokio::test]
async fn storefront_requires_token() {
    test_db().await;

    let (status, _) = send(request("GET", "/api/notifications", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(request("GET", "/api/notifications", Some("not-a-jwt"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Invalid token"));

    let (status, _) = send(request(
        "POST",
        &format!("/api/orders/{}/accept", Uuid::new_v4()),
        None,
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_non_admin() {
    test_db().await;
    let user_token = token_for(&Uuid::new_v4(), "user");

    let (status, body) = send(request("GET", "/api/admin/escrows", Some(&user_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin role required");

    let (status, _) = send(request("GET", "/api/admin/shipments", Some(&user_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn escrow_listing_filters_and_paginates() {
    let db = test_db().await;
    let admin_token = token_for(&Uuid::new_v4(), "admin");

    // Disputed is not produced by any workflow here, so counts are exact.
    let now = Utc::now();
    let mut ids = Vec::new();
    for i in 0..3i64 {
        let order = seed_order(&db, Uuid::new_v4(), Uuid::new_v4(), "100.00").await;
        let escrow = EscrowTransaction {
            id: Uuid::new_v4(),
            order_id: order.id,
            buyer_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            amount: format!("{}00.00", i + 1),
            currency: "USD".to_string(),
            status: EscrowStatus::Disputed,
            created_at: now - Duration::seconds(i * 10),
            updated_at: now - Duration::seconds(i * 10),
            released_at: None,
        };
        db.store_escrow_transaction(&escrow).await.unwrap();
        ids.push(escrow.id.to_string());
    }

    let (status, body) = send(request(
        "GET",
        "/api/admin/escrows?status=disputed&limit=2",
        Some(&admin_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["offset"], 0);
    let escrows = body["escrows"].as_array().unwrap();
    assert_eq!(escrows.len(), 2);
    // Newest first.
    assert_eq!(escrows[0]["id"], ids[0].as_str());
    assert_eq!(escrows[1]["id"], ids[1].as_str());

    let (status, body) = send(request(
        "GET",
        "/api/admin/escrows?status=disputed&limit=2&offset=2",
        Some(&admin_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["offset"], 2);
    assert_eq!(body["escrows"].as_array().unwrap().len(), 1);
    assert_eq!(body["escrows"][0]["id"], ids[2].as_str());

    let (status, _) = send(request(
        "GET",
        "/api/admin/escrows?status=bogus",
        Some(&admin_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn escrow_release_and_refund_transitions() {
    let db = test_db().await;
    let admin_token = token_for(&Uuid::new_v4(), "admin");
    let buyer_id = Uuid::new_v4();
    let seller_id = Uuid::new_v4();

    let now = Utc::now();
    let order = seed_order(&db, buyer_id, seller_id, "750.00").await;
    let escrow = EscrowTransaction {
        id: Uuid::new_v4(),
        order_id: order.id,
        buyer_id,
        seller_id,
        amount: "750.00".to_string(),
        currency: "EUR".to_string(),
        status: EscrowStatus::Held,
        created_at: now,
        updated_at: now,
        released_at: None,
    };
    db.store_escrow_transaction(&escrow).await.unwrap();

    let (status, body) = send(request(
        "POST",
        &format!("/api/admin/escrows/{}/release", escrow.id),
        Some(&admin_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["escrow"]["status"], "released");
    assert!(body["escrow"]["released_at"].is_string());

    // Already settled: neither release nor refund is allowed.
    let (status, _) = send(request(
        "POST",
        &format!("/api/admin/escrows/{}/release", escrow.id),
        Some(&admin_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(request(
        "POST",
        &format!("/api/admin/escrows/{}/refund", escrow.id),
        Some(&admin_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(request(
        "POST",
        &format!("/api/admin/escrows/{}/refund", Uuid::new_v4()),
        Some(&admin_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Both parties were told about the settlement.
    assert_eq!(db.count_user_notifications(&buyer_id).await.unwrap(), 1);
    assert_eq!(db.count_user_notifications(&seller_id).await.unwrap(), 1);

    // held -> refunded on a fresh escrow.
    let refund_order = seed_order(&db, Uuid::new_v4(), Uuid::new_v4(), "120.00").await;
    let refundable = EscrowTransaction {
        id: Uuid::new_v4(),
        order_id: refund_order.id,
        buyer_id: refund_order.buyer_id,
        seller_id: refund_order.seller_id,
        amount: "120.00".to_string(),
        currency: "USD".to_string(),
        status: EscrowStatus::Held,
        created_at: now,
        updated_at: now,
        released_at: None,
    };
    db.store_escrow_transaction(&refundable).await.unwrap();

    let (status, body) = send(request(
        "POST",
        &format!("/api/admin/escrows/{}/refund", refundable.id),
        Some(&admin_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Escrow refunded");
    assert_eq!(body["escrow"]["status"], "refunded");
    assert!(body["escrow"]["released_at"].is_string());
}

#[tokio::test]
async fn concurrent_accepts_hold_one_escrow() {
    let db = test_db().await;
    let order = seed_order(&db, Uuid::new_v4(), Uuid::new_v4(), "320.00").await;

    let service = OrderService::new(db.clone());
    let (first, second) = tokio::join!(service.accept_order(&order.id), service.accept_order(&order.id));

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.into_iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(loser.unwrap_err(), AppError::Conflict(_)));

    // Exactly one escrow was held for the order.
    let (held, _) = EscrowService::new(db.clone())
        .list(Some(EscrowStatus::Held), 1000, 0)
        .await
        .unwrap();
    let for_order = held.iter().filter(|e| e.order_id == order.id).count();
    assert_eq!(for_order, 1);

    let accepted = db.get_order_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(accepted.status, OrderStatus::Accepted);
}

#[tokio::test]
async fn concurrent_settlements_pick_one_winner() {
    let db = test_db().await;
    let now = Utc::now();
    let order = seed_order(&db, Uuid::new_v4(), Uuid::new_v4(), "90.00").await;
    let escrow = EscrowTransaction {
        id: Uuid::new_v4(),
        order_id: order.id,
        buyer_id: order.buyer_id,
        seller_id: order.seller_id,
        amount: "90.00".to_string(),
        currency: "USD".to_string(),
        status: EscrowStatus::Held,
        created_at: now,
        updated_at: now,
        released_at: None,
    };
    db.store_escrow_transaction(&escrow).await.unwrap();

    let service = EscrowService::new(db.clone());
    let (release, refund) = tokio::join!(service.release(&escrow.id), service.refund(&escrow.id));

    assert_eq!([release.is_ok(), refund.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let expected = if release.is_ok() {
        EscrowStatus::Released
    } else {
        EscrowStatus::Refunded
    };
    let stored = db.get_escrow_by_id(&escrow.id).await.unwrap().unwrap();
    assert_eq!(stored.status, expected);
    assert!(stored.released_at.is_some());
}

#[tokio::test]
async fn shipment_listing_reflects_recorded_events() {
    let db = test_db().await;
    let admin_token = token_for(&Uuid::new_v4(), "admin");

    let service = TrackingService::new(db.clone());
    let moving_order = seed_order(&db, Uuid::new_v4(), Uuid::new_v4(), "60.00").await;
    let moving = service
        .register_shipment(&moving_order.id, "DHL", "JD014600003828")
        .await
        .unwrap();
    service
        .record_event(&moving.id, ShipmentStatus::InTransit, Some("Leipzig".to_string()))
        .await
        .unwrap();
    let parked_order = seed_order(&db, Uuid::new_v4(), Uuid::new_v4(), "75.00").await;
    service
        .register_shipment(&parked_order.id, "UPS", "1Z999AA10123456784")
        .await
        .unwrap();

    let (status, body) = send(request(
        "GET",
        "/api/admin/shipments?status=in_transit",
        Some(&admin_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let shipment = &body["shipments"][0];
    assert_eq!(shipment["id"], moving.id.to_string());
    assert_eq!(shipment["status"], "in_transit");
    let events = shipment["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1]["location"], "Leipzig");
}

#[tokio::test]
async fn notification_flow() {
    let db = test_db().await;
    let user_id = Uuid::new_v4();
    let user_token = token_for(&user_id, "user");

    let now = Utc::now();
    let mut ids = Vec::new();
    for i in 0..2i64 {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            notification_type: NotificationType::SystemAlert,
            title: format!("Alert {}", i),
            message: "Maintenance window".to_string(),
            metadata: None,
            is_read: false,
            created_at: now - Duration::seconds(i * 10),
        };
        db.store_notification(&notification).await.unwrap();
        ids.push(notification.id);
    }

    let (status, body) = send(request("GET", "/api/notifications", Some(&user_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let items = body["notifications"].as_array().unwrap();
    assert_eq!(items[0]["id"], ids[0].to_string());
    assert_eq!(items[1]["id"], ids[1].to_string());

    let (status, body) = send(request(
        "GET",
        "/api/notifications/unread",
        Some(&user_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    // Another user cannot mark someone else's notification.
    let stranger_token = token_for(&Uuid::new_v4(), "user");
    let (status, _) = send(request(
        "POST",
        &format!("/api/notifications/{}/read", ids[0]),
        Some(&stranger_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(request(
        "POST",
        &format!("/api/notifications/{}/read", Uuid::new_v4()),
        Some(&user_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(request(
        "POST",
        &format!("/api/notifications/{}/read", ids[0]),
        Some(&user_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.count_unread_notifications(&user_id).await.unwrap(), 1);

    let (status, _) = send(request(
        "POST",
        "/api/notifications/read-all",
        Some(&user_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.count_unread_notifications(&user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn order_acceptance_holds_escrow_and_notifies_buyer() {
    let db = test_db().await;
    let buyer_id = Uuid::new_v4();
    let seller_id = Uuid::new_v4();
    let order = seed_order(&db, buyer_id, seller_id, "500.00").await;

    // Only the order's seller may accept.
    let stranger_token = token_for(&Uuid::new_v4(), "user");
    let (status, body) = send(request(
        "POST",
        &format!("/api/orders/{}/accept", order.id),
        Some(&stranger_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only the order's seller can accept it");

    let seller_token = token_for(&seller_id, "user");
    let (status, body) = send(request(
        "POST",
        &format!("/api/orders/{}/accept", order.id),
        Some(&seller_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "accepted");
    assert_eq!(body["escrow"]["status"], "held");
    assert_eq!(body["escrow"]["amount"], "500.00");
    assert_eq!(body["escrow"]["order_id"], order.id.to_string());

    // Accepting twice is a conflict.
    let (status, _) = send(request(
        "POST",
        &format!("/api/orders/{}/accept", order.id),
        Some(&seller_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(request(
        "POST",
        &format!("/api/orders/{}/accept", Uuid::new_v4()),
        Some(&seller_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (items, count) = tradehub::services::notification_service::NotificationService::new(db.clone())
        .get_user_notifications(&buyer_id, 10, 0)
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(items[0].notification_type, NotificationType::OrderAccepted);
}

#[tokio::test]
async fn verification_submission_and_review() {
    test_db().await;
    let user_id = Uuid::new_v4();
    let user_token = token_with_email(&user_id, "user", "seller@tradehub.example");
    let admin_token = token_for(&Uuid::new_v4(), "admin");

    let (status, _) = send(request(
        "POST",
        "/api/verifications",
        Some(&user_token),
        Some(json!({"profile_type": "seller", "document_urls": ["ftp://bad/doc.pdf"]})),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(request(
        "POST",
        "/api/verifications",
        Some(&user_token),
        Some(json!({
            "profile_type": "seller",
            "document_urls": ["https://cdn.example/docs/registration.pdf"]
        })),
    ))
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    // The submitter's token email is kept for the review outcome mail.
    assert_eq!(body["contact_email"], "seller@tradehub.example");
    let doc_id = body["id"].as_str().unwrap().to_string();

    // One open submission per user.
    let (status, _) = send(request(
        "POST",
        "/api/verifications",
        Some(&user_token),
        Some(json!({
            "profile_type": "seller",
            "document_urls": ["https://cdn.example/docs/registration.pdf"]
        })),
    ))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Rejecting without a reason is refused.
    let (status, _) = send(request(
        "POST",
        &format!("/api/admin/verifications/{}/review", doc_id),
        Some(&admin_token),
        Some(json!({"approve": false})),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(request(
        "POST",
        &format!("/api/admin/verifications/{}/review", doc_id),
        Some(&admin_token),
        Some(json!({"approve": false, "rejection_reason": "Document scan is unreadable"})),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["rejection_reason"], "Document scan is unreadable");
    assert!(body["reviewed_at"].is_string());

    // Reviews are one-shot.
    let (status, _) = send(request(
        "POST",
        &format!("/api/admin/verifications/{}/review", doc_id),
        Some(&admin_token),
        Some(json!({"approve": true})),
    ))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The rejection landed in the user's notification feed.
    let (status, body) = send(request(
        "GET",
        "/api/notifications/unread",
        Some(&user_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn b2b_config_upsert_keeps_identity_stable() {
    test_db().await;
    let admin_token = token_for(&Uuid::new_v4(), "admin");
    let product_id = Uuid::new_v4();
    let uri = format!("/api/admin/products/{}/b2b-config", product_id);

    let (status, _) = send(request("GET", &uri, Some(&admin_token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(request(
        "PUT",
        &uri,
        Some(&admin_token),
        Some(json!({
            "min_order_quantity": 0,
            "unit_of_measure": "case",
            "availability": "in_stock"
        })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // low_stock exercises the widened availability constraint.
    let (status, body) = send(request(
        "PUT",
        &uri,
        Some(&admin_token),
        Some(json!({
            "min_order_quantity": 50,
            "lead_time_days": 14,
            "bulk_pricing_tiers": [
                {"quantity": 50, "unit_price": "9.50"},
                {"quantity": 200, "unit_price": "8.25"}
            ],
            "b2b_only": true,
            "unit_of_measure": "case",
            "availability": "low_stock"
        })),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availability"], "low_stock");
    let config_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(request("GET", &uri, Some(&admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], config_id.as_str());
    assert_eq!(body["min_order_quantity"], 50);
    assert_eq!(body["bulk_pricing_tiers"][1]["unit_price"], "8.25");

    // A second save replaces the values but not the row identity.
    let (status, body) = send(request(
        "PUT",
        &uri,
        Some(&admin_token),
        Some(json!({
            "min_order_quantity": 25,
            "unit_of_measure": "pallet",
            "availability": "preorder"
        })),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], config_id.as_str());
    assert_eq!(body["availability"], "preorder");
    assert_eq!(body["bulk_pricing_tiers"], Value::Null);

    // A tier ladder below the minimum order quantity is refused.
    let (status, _) = send(request(
        "PUT",
        &uri,
        Some(&admin_token),
        Some(json!({
            "min_order_quantity": 100,
            "bulk_pricing_tiers": [{"quantity": 10, "unit_price": "9.50"}],
            "unit_of_measure": "case",
            "availability": "in_stock"
        })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn startup_migration_is_idempotent() {
    // Opening the same file twice must not re-run the table rebuild.
    let path = std::env::temp_dir().join(format!("tradehub-migrate-{}.db", Uuid::new_v4()));
    let path = path.to_str().unwrap().to_string();

    let db = SqliteDatabase::new(&path).await.unwrap();
    drop(db);
    let db = SqliteDatabase::new(&path).await.unwrap();

    // The widened constraint admits the new availability states.
    let now = Utc::now();
    let config = tradehub::models::b2b_product::B2bProductConfig {
        id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        min_order_quantity: 10,
        lead_time_days: None,
        bulk_pricing_tiers: None,
        b2b_only: false,
        unit_of_measure: "unit".to_string(),
        availability: tradehub::models::b2b_product::AvailabilityStatus::Preorder,
        created_at: now,
        updated_at: now,
    };
    db.upsert_b2b_config(&config).await.unwrap();
    let stored = db
        .get_b2b_config_by_product(&config.product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.availability,
        tradehub::models::b2b_product::AvailabilityStatus::Preorder
    );
}

#[tokio::test]
async fn health_and_docs_are_public() {
    test_db().await;

    let (status, _) = send(request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(request("GET", "/docs/openapi.json", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/admin/escrows"].is_object());
}
