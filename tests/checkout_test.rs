mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use booknest::domain::{DomainError, NewOrder, NewOrderLine};
use booknest::infrastructure::{AppState, Config};
use booknest::models::{OrderStatus, PaymentMethod, Role};
use booknest::modules::payments::StripeConfig;
use booknest::modules::payments::stripe::signature_header;
use common::*;
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`
use wiremock::matchers::{header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEBHOOK_SECRET: &str = "whsec_test_secret";

fn stripe_config(api_base: &str) -> Config {
    Config {
        stripe: Some(StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            success_url: Some("http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}".to_string()),
            cancel_url: Some("http://localhost:3000/cart".to_string()),
            api_base: api_base.to_string(),
        }),
        ..Config::default()
    }
}

fn paid_session(session_id: &str, user_id: i32, cart: Value) -> Value {
    json!({
        "id": session_id,
        "object": "checkout.session",
        "payment_status": "paid",
        "url": null,
        "metadata": {
            "user_id": user_id.to_string(),
            "cart": cart.to_string()
        }
    })
}

async fn post_webhook(state: &AppState, payload: &[u8], signature: Option<String>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    let request = builder.body(Body::from(payload.to_vec())).unwrap();

    let response = app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_manual_order_totals_and_decrements_stock() {
    let state = setup_default_state().await;
    let (user_id, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let river = create_book(&state, fiction, "the-silent-river", 1899, 14).await;
    let orchard = create_book(&state, fiction, "the-glass-orchard", 1999, 11).await;

    let (status, body) = send(
        app(&state),
        "POST",
        "/api/orders/manual",
        Some(&token),
        Some(json!({ "items": [
            { "book_id": river.id, "quantity": 2 },
            { "book_id": orchard.id, "quantity": 1 }
        ]})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_cents"], 2 * 1899 + 1999);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["currency"], "MRU");
    assert!(body["instructions"]["whatsapp_url"]
        .as_str()
        .unwrap()
        .starts_with("https://wa.me/"));

    assert_eq!(stock_of(&state, river.id).await, 12);
    assert_eq!(stock_of(&state, orchard.id).await, 10);

    let (status, body) = send(app(&state), "GET", "/api/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["user_id"], user_id);
    assert_eq!(orders[0]["payment_method"], "manual");
    assert_eq!(orders[0]["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_stock_untouched() {
    let state = setup_default_state().await;
    let (_, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let science = create_category(&state, "Science", "science").await;
    let plenty = create_book(&state, science, "signal-and-noise", 2199, 13).await;
    let scarce = create_book(&state, science, "quantum-garden", 2499, 1).await;

    let (status, body) = send(
        app(&state),
        "POST",
        "/api/orders/manual",
        Some(&token),
        Some(json!({ "items": [
            { "book_id": plenty.id, "quantity": 2 },
            { "book_id": scarce.id, "quantity": 2 }
        ]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Some items are no longer available.");
    assert_eq!(stock_of(&state, plenty.id).await, 13);
    assert_eq!(stock_of(&state, scarce.id).await, 1);

    let (status, _) = send(
        app(&state),
        "POST",
        "/api/orders/manual",
        Some(&token),
        Some(json!({ "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app(&state),
        "POST",
        "/api/orders/manual",
        None,
        Some(json!({ "items": [{ "book_id": plenty.id, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn order_line(book_id: i32, quantity: i32, price_cents: i64) -> NewOrderLine {
    NewOrderLine {
        book_id,
        title: format!("Book {}", book_id),
        quantity,
        price_cents,
        image_url: None,
    }
}

#[tokio::test]
async fn test_place_rolls_back_earlier_lines_when_a_later_one_is_short() {
    let state = setup_default_state().await;
    let (user_id, _) = create_user(&state, "reader@booknest.test", Role::User).await;
    let science = create_category(&state, "Science", "science").await;
    let plenty = create_book(&state, science, "signal-and-noise", 2199, 5).await;
    let scarce = create_book(&state, science, "quantum-garden", 2499, 1).await;

    let result = state
        .order_repo
        .place(NewOrder {
            user_id,
            total_cents: 2 * 2199 + 2 * 2499,
            currency: "MRU".to_string(),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Manual,
            stripe_session_id: None,
            lines: vec![
                order_line(plenty.id, 2, 2199),
                order_line(scarce.id, 2, 2499),
            ],
        })
        .await;

    assert!(matches!(result, Err(DomainError::InsufficientStock)));
    assert_eq!(stock_of(&state, plenty.id).await, 5);
    assert_eq!(stock_of(&state, scarce.id).await, 1);
    assert!(state.order_repo.find_by_user(user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleted_book_keeps_order_history() {
    let state = setup_default_state().await;
    let (_, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let (_, admin) = create_user(&state, "admin@booknest.test", Role::Admin).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "out-of-print", 1899, 4).await;

    let (status, receipt) = send(
        app(&state),
        "POST",
        "/api/orders/manual",
        Some(&token),
        Some(json!({ "items": [{ "book_id": book.id, "quantity": 2 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_uri = format!("/api/orders/{}", receipt["order_id"].as_i64().unwrap());

    let (status, _) = send(app(&state), "DELETE", &format!("/api/books/{}", book.id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, order) = send(app(&state), "GET", &order_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let item = &order["items"][0];
    assert!(item["book_id"].is_null());
    assert_eq!(item["title"], "Book out-of-print");
    assert_eq!(item["quantity"], 2);
    assert_eq!(item["price_cents"], 1899);
    assert_eq!(order["total_cents"], 2 * 1899);
}

#[tokio::test]
async fn test_unknown_order_status_is_rejected() {
    let state = setup_default_state().await;
    let (_, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let (_, admin) = create_user(&state, "admin@booknest.test", Role::Admin).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "the-artisan-ledger", 2099, 10).await;

    let (_, receipt) = send(
        app(&state),
        "POST",
        "/api/orders/manual",
        Some(&token),
        Some(json!({ "items": [{ "book_id": book.id, "quantity": 1 }] })),
    )
    .await;
    let order_id = receipt["order_id"].as_i64().unwrap();
    let status_uri = format!("/api/orders/{}/status", order_id);

    for bogus in ["REFUNDED", "paid", ""] {
        let (status, body) = send(
            app(&state),
            "PUT",
            &status_uri,
            Some(&admin),
            Some(json!({ "status": bogus })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid status.");
    }

    let (_, order) = send(app(&state), "GET", &format!("/api/orders/{}", order_id), Some(&admin), None).await;
    assert_eq!(order["status"], "PENDING");
}

#[tokio::test]
async fn test_order_visibility_and_status_updates() {
    let state = setup_default_state().await;
    let (_, owner) = create_user(&state, "owner@booknest.test", Role::User).await;
    let (_, stranger) = create_user(&state, "stranger@booknest.test", Role::User).await;
    let (_, admin) = create_user(&state, "admin@booknest.test", Role::Admin).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "the-artisan-ledger", 2099, 10).await;

    let (_, receipt) = send(
        app(&state),
        "POST",
        "/api/orders/manual",
        Some(&owner),
        Some(json!({ "items": [{ "book_id": book.id, "quantity": 1 }] })),
    )
    .await;
    let order_id = receipt["order_id"].as_i64().unwrap();
    let order_uri = format!("/api/orders/{}", order_id);

    let (status, _) = send(app(&state), "GET", &order_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(app(&state), "GET", &order_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(app(&state), "GET", &order_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let status_uri = format!("/api/orders/{}/status", order_id);
    let (status, _) = send(
        app(&state),
        "PUT",
        &status_uri,
        Some(&owner),
        Some(json!({ "status": "PAID" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        app(&state),
        "PUT",
        &status_uri,
        Some(&admin),
        Some(json!({ "status": "SHIPPED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid status.");

    let (status, body) = send(
        app(&state),
        "PUT",
        &status_uri,
        Some(&admin),
        Some(json!({ "status": "PAID" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PAID");

    let (status, _) = send(
        app(&state),
        "PUT",
        "/api/orders/9999/status",
        Some(&admin),
        Some(json!({ "status": "PAID" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(app(&state), "GET", "/api/admin/orders?status=PAID", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["user_email"], "owner@booknest.test");

    let (status, body) = send(app(&state), "GET", "/api/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"], 1);
    assert_eq!(body["revenue_cents"], 2099);
    assert_eq!(body["users"], 3);
}

#[tokio::test]
async fn test_card_checkout_requires_stripe_configuration() {
    let state = setup_default_state().await;
    let (_, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "the-silent-river", 1899, 14).await;

    let (status, _) = send(
        app(&state),
        "POST",
        "/api/checkout",
        Some(&token),
        Some(json!({ "items": [{ "book_id": book.id, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_card_checkout_opens_stripe_session() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header_matcher("authorization", "Bearer sk_test_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_abc",
            "object": "checkout.session",
            "url": "https://checkout.stripe.test/c/cs_test_abc",
            "payment_status": "unpaid"
        })))
        .expect(1)
        .mount(&stripe)
        .await;

    let state = setup_state(stripe_config(&stripe.uri())).await;
    let (_, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "the-silent-river", 1899, 14).await;

    let (status, body) = send(
        app(&state),
        "POST",
        "/api/checkout",
        Some(&token),
        Some(json!({ "items": [{ "book_id": book.id, "quantity": 2 }] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "cs_test_abc");
    assert_eq!(body["url"], "https://checkout.stripe.test/c/cs_test_abc");
    // Stock only moves once payment is confirmed
    assert_eq!(stock_of(&state, book.id).await, 14);
}

#[tokio::test]
async fn test_stripe_api_failure_is_bad_gateway() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Invalid currency: mru" }
        })))
        .mount(&stripe)
        .await;

    let state = setup_state(stripe_config(&stripe.uri())).await;
    let (_, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "the-silent-river", 1899, 14).await;

    let (status, body) = send(
        app(&state),
        "POST",
        "/api/checkout",
        Some(&token),
        Some(json!({ "items": [{ "book_id": book.id, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Invalid currency: mru");
}

#[tokio::test]
async fn test_webhook_rejects_bad_signatures() {
    let state = setup_state(stripe_config("http://127.0.0.1:9")).await;
    let payload = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{}}}"#;

    let (status, body) = post_webhook(&state, payload, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing signature");

    let forged = signature_header(payload, "whsec_wrong", chrono::Utc::now().timestamp());
    let (status, _) = post_webhook(&state, payload, Some(forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stale = signature_header(payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp() - 3600);
    let (status, _) = post_webhook(&state, payload, Some(stale)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_duplicate_delivery_creates_one_order() {
    let state = setup_state(stripe_config("http://127.0.0.1:9")).await;
    let (user_id, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "the-silent-river", 1899, 14).await;

    let session = paid_session(
        "cs_test_dup",
        user_id,
        json!([{ "book_id": book.id, "quantity": 3 }]),
    );
    let event = json!({
        "id": "evt_dup",
        "type": "checkout.session.completed",
        "data": { "object": session }
    });
    let payload = event.to_string().into_bytes();

    for _ in 0..2 {
        let signature = signature_header(&payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
        let (status, body) = post_webhook(&state, &payload, Some(signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["received"], true);
    }

    let (_, orders) = send(app(&state), "GET", "/api/orders", Some(&token), None).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "CONFIRMED");
    assert_eq!(orders[0]["payment_method"], "stripe");
    assert_eq!(orders[0]["stripe_session_id"], "cs_test_dup");
    assert_eq!(orders[0]["total_cents"], 3 * 1899);
    assert_eq!(stock_of(&state, book.id).await, 11);
}

#[tokio::test]
async fn test_webhook_with_insufficient_stock_is_rejected() {
    let state = setup_state(stripe_config("http://127.0.0.1:9")).await;
    let (user_id, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "last-copies", 1899, 2).await;

    let payload = json!({
        "id": "evt_short",
        "type": "checkout.session.completed",
        "data": { "object": paid_session(
            "cs_test_short",
            user_id,
            json!([{ "book_id": book.id, "quantity": 3 }]),
        ) }
    })
    .to_string()
    .into_bytes();
    let signature = signature_header(&payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
    let (status, body) = post_webhook(&state, &payload, Some(signature)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(stock_of(&state, book.id).await, 2);
    let (_, orders) = send(app(&state), "GET", "/api/orders", Some(&token), None).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_webhook_ignores_unpaid_sessions_and_other_events() {
    let state = setup_state(stripe_config("http://127.0.0.1:9")).await;
    let (user_id, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "the-silent-river", 1899, 14).await;

    let mut session = paid_session(
        "cs_test_unpaid",
        user_id,
        json!([{ "book_id": book.id, "quantity": 1 }]),
    );
    session["payment_status"] = json!("unpaid");

    for event_type in ["checkout.session.completed", "payment_intent.created"] {
        let payload = json!({
            "id": "evt_other",
            "type": event_type,
            "data": { "object": session }
        })
        .to_string()
        .into_bytes();
        let signature = signature_header(&payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
        let (status, _) = post_webhook(&state, &payload, Some(signature)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, orders) = send(app(&state), "GET", "/api/orders", Some(&token), None).await;
    assert!(orders.as_array().unwrap().is_empty());
    assert_eq!(stock_of(&state, book.id).await, 14);
}

#[tokio::test]
async fn test_confirm_checkout_creates_order_for_owner_only() {
    let stripe = MockServer::start().await;
    let state = setup_state(stripe_config(&stripe.uri())).await;
    let (user_id, token) = create_user(&state, "reader@booknest.test", Role::User).await;
    let (_, other) = create_user(&state, "other@booknest.test", Role::User).await;
    let fiction = create_category(&state, "Fiction", "fiction").await;
    let book = create_book(&state, fiction, "the-silent-river", 1899, 14).await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_confirm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paid_session(
            "cs_test_confirm",
            user_id,
            json!([{ "book_id": book.id, "quantity": 1 }]),
        )))
        .mount(&stripe)
        .await;

    let (status, _) = send(
        app(&state),
        "POST",
        "/api/checkout/confirm",
        Some(&other),
        Some(json!({ "session_id": "cs_test_confirm" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        app(&state),
        "POST",
        "/api/checkout/confirm",
        Some(&token),
        Some(json!({ "session_id": "cs_test_confirm" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["stripe_session_id"], "cs_test_confirm");
    let first_id = body["order"]["id"].clone();

    // The webhook may still arrive afterwards; it must not double-book
    let (status, body) = send(
        app(&state),
        "POST",
        "/api/checkout/confirm",
        Some(&token),
        Some(json!({ "session_id": "cs_test_confirm" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["id"], first_id);
    assert_eq!(stock_of(&state, book.id).await, 13);
}
