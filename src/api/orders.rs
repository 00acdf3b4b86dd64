//! Order history, manual checkout and fulfilment status

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::checkout::CheckoutRequest;
use super::{bad_json, error_response, unauthorized};
use crate::auth::{AdminClaims, Claims};
use crate::domain::{DomainError, OrderFilter};
use crate::infrastructure::AppState;
use crate::models::OrderStatus;
use crate::services::checkout_service;

pub async fn list_my_orders(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return unauthorized();
    };

    match state.order_repo.find_by_user(user_id).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Owners see their own orders, admins see any
pub async fn get_order(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.order_repo.find_by_id(id).await {
        Ok(Some(order)) => {
            if claims.user_id() != Some(order.user_id) && !claims.is_admin() {
                return error_response(DomainError::Forbidden);
            }
            (StatusCode::OK, Json(order)).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Order not found" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn create_manual_order(
    State(state): State<AppState>,
    claims: Claims,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    let Some(user_id) = claims.user_id() else {
        return unauthorized();
    };

    match checkout_service::place_manual_order(&state, user_id, &payload.items).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    let Ok(status) = payload.status.parse::<OrderStatus>() else {
        return error_response(DomainError::Validation("Invalid status.".to_string()));
    };

    match state.order_repo.update_status(id, status).await {
        Ok(order) => {
            tracing::info!("Order {} moved to {}", order.id, order.status);
            (StatusCode::OK, Json(order)).into_response()
        }
        Err(DomainError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Order not found" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminOrdersQuery {
    pub status: Option<String>,
    pub limit: Option<u64>,
}

pub async fn list_all_orders(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Query(params): Query<AdminOrdersQuery>,
) -> impl IntoResponse {
    let status = match params.status.as_deref() {
        None | Some("") => None,
        Some(raw) => match raw.parse::<OrderStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return error_response(DomainError::Validation("Invalid status.".to_string()));
            }
        },
    };

    let filter = OrderFilter {
        status,
        limit: params.limit,
    };

    match state.order_repo.find_all(filter).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => error_response(e),
    }
}
