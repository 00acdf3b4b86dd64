use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use super::{bad_json, error_response};
use crate::auth::AdminClaims;
use crate::domain::{CategoryInput, DomainError};
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Categories ordered by name")
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    match state.category_repo.find_all().await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminClaims,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> impl IntoResponse {
    let Json(input) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    if let Err(e) = input.validate() {
        return error_response(e);
    }

    match state.category_repo.create(input).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> impl IntoResponse {
    let Json(input) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    if let Err(e) = input.validate() {
        return error_response(e);
    }

    match state.category_repo.update(id, input).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(DomainError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Category not found" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.category_repo.delete(id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(DomainError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Category not found" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
