pub mod admin;
pub mod auth;
pub mod books;
pub mod categories;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod user;
pub mod webhooks;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::domain::DomainError;
use crate::infrastructure::AppState;

pub fn api_router_with_state(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::get_me))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            put(categories::update_category).delete(categories::delete_category),
        )
        // Checkout
        .route("/checkout", post(checkout::create_checkout_session))
        .route("/checkout/confirm", post(checkout::confirm_checkout))
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        // Orders
        .route("/orders", get(orders::list_my_orders))
        .route("/orders/manual", post(orders::create_manual_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", put(orders::update_order_status))
        // Admin
        .route("/admin/orders", get(orders::list_all_orders))
        .route("/admin/stats", get(admin::get_stats))
        .route("/users", get(user::list_users))
        .route("/users/:id/role", put(user::update_role))
        .with_state(state)
}

/// Map a domain failure onto an HTTP status with a `{"error": ...}` body
pub fn error_response(e: DomainError) -> Response {
    let (status, message) = match &e {
        DomainError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        DomainError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        DomainError::InsufficientStock => (StatusCode::BAD_REQUEST, e.to_string()),
        DomainError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        DomainError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
        DomainError::External(msg) => {
            tracing::error!("Payment provider failure: {}", msg);
            (StatusCode::BAD_GATEWAY, msg.clone())
        }
        DomainError::Internal(msg) => {
            tracing::error!("Internal error: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
        }
        DomainError::Database(_) => {
            tracing::error!("{}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    (status, Json(json!({ "error": message }))).into_response()
}

/// Malformed or incomplete JSON bodies are client errors
pub fn bad_json(rejection: JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": rejection.body_text() })),
    )
        .into_response()
}

pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}
