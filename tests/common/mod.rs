#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use booknest::auth;
use booknest::db;
use booknest::domain::{BookInput, CategoryInput, NewUser};
use booknest::infrastructure::{AppState, Config};
use booknest::models::{Book, Role};
use booknest::server::build_router;
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot`

// Helper to create a test app state
pub async fn setup_state(config: Config) -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    AppState::with_config(db, config)
}

pub async fn setup_default_state() -> AppState {
    setup_state(Config::default()).await
}

pub fn app(state: &AppState) -> Router {
    build_router(state.clone())
}

// Helper to create an account and a bearer token for it
pub async fn create_user(state: &AppState, email: &str, role: Role) -> (i32, String) {
    let user = state
        .user_repo
        .create(NewUser {
            name: Some("Test User".to_string()),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
        })
        .await
        .expect("Failed to create user");
    let token = auth::create_jwt(&state.config.jwt_secret, user.id, &user.email, &user.role)
        .expect("Failed to create token");
    (user.id, token)
}

pub async fn create_category(state: &AppState, name: &str, slug: &str) -> i32 {
    state
        .category_repo
        .create(CategoryInput {
            name: name.to_string(),
            slug: slug.to_string(),
        })
        .await
        .expect("Failed to create category")
        .id
}

pub fn book_input(category_id: i32, title: &str, slug: &str, price_cents: i64, stock: i32) -> BookInput {
    BookInput {
        title: title.to_string(),
        slug: slug.to_string(),
        author: "Ava Bennett".to_string(),
        description: "A lyrical mystery about a quiet river town.".to_string(),
        price_cents,
        currency: "MRU".to_string(),
        stock,
        image_url: "/images/books/placeholder.svg".to_string(),
        category_id,
    }
}

pub async fn create_book(
    state: &AppState,
    category_id: i32,
    slug: &str,
    price_cents: i64,
    stock: i32,
) -> Book {
    state
        .book_repo
        .create(book_input(category_id, &format!("Book {}", slug), slug, price_cents, stock))
        .await
        .expect("Failed to create book")
}

pub async fn stock_of(state: &AppState, book_id: i32) -> i32 {
    state
        .book_repo
        .find_by_id(book_id)
        .await
        .expect("Failed to load book")
        .expect("Book should exist")
        .stock
}

/// Send one request through the full router and decode the JSON body
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
