//! Catalog API handlers using repository pattern

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::{bad_json, error_response};
use crate::auth::AdminClaims;
use crate::domain::{BookFilter, BookInput, DomainError};
use crate::infrastructure::AppState;

/// Query parameters for browsing the catalog
#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/books",
    params(
        ("q" = Option<String>, Query, description = "Title or author substring"),
        ("category" = Option<String>, Query, description = "Category slug"),
        ("sort" = Option<String>, Query, description = "price-asc, price-desc or newest"),
        ("page" = Option<u64>, Query, description = "Zero-based page"),
        ("limit" = Option<u64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Books with their category")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ListBooksQuery>,
) -> impl IntoResponse {
    let filter = BookFilter {
        query: params.q,
        category: params.category,
        sort: params.sort,
        page: params.page,
        limit: params.limit,
    };

    match state.book_repo.find_all(filter).await {
        Ok(result) => Json(json!({
            "books": result.books,
            "total": result.total
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// `key` is a numeric id or a slug
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(("id" = String, Path, description = "Book id or slug")),
    responses(
        (status = 200, description = "Book found"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(key): Path<String>) -> impl IntoResponse {
    let by_id = match key.parse::<i32>() {
        Ok(id) => state.book_repo.find_by_id(id).await,
        Err(_) => Ok(None),
    };

    let found = match by_id {
        Ok(Some(book)) => Ok(Some(book)),
        Ok(None) => state.book_repo.find_by_slug(&key).await,
        Err(e) => Err(e),
    };

    match found {
        Ok(Some(book)) => (StatusCode::OK, Json(json!({ "book": book }))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Book not found" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn create_book(
    State(state): State<AppState>,
    _admin: AdminClaims,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> impl IntoResponse {
    let Json(input) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    if let Err(e) = input.validate() {
        return error_response(e);
    }

    match state.book_repo.create(input).await {
        Ok(book) => {
            tracing::info!("Book {} '{}' added to the catalog", book.id, book.slug);
            (
                StatusCode::CREATED,
                Json(json!({
                    "message": "Book created successfully",
                    "book": book
                })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn update_book(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> impl IntoResponse {
    let Json(input) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    if let Err(e) = input.validate() {
        return error_response(e);
    }

    match state.book_repo.update(id, input).await {
        Ok(book) => (StatusCode::OK, Json(json!({ "book": book }))).into_response(),
        Err(DomainError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Book not found" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_book(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.book_repo.delete(id).await {
        Ok(()) => {
            tracing::info!("Book {} removed from the catalog", id);
            (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
        }
        Err(DomainError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Book not found" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
