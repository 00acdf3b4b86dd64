use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::{bad_json, error_response, unauthorized};
use crate::auth::Claims;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::services::checkout_service::{self, CartItem, METADATA_USER_ID};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub session_id: String,
}

/// Open a Stripe Checkout Session for the caller's cart
pub async fn create_checkout_session(
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

    match checkout_service::start_stripe_checkout(
        &state,
        user_id,
        Some(claims.email.clone()),
        &payload.items,
    )
    .await
    {
        Ok(redirect) => (StatusCode::OK, Json(redirect)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Client-side fallback for when the webhook has not arrived yet
pub async fn confirm_checkout(
    State(state): State<AppState>,
    claims: Claims,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    let Some(user_id) = claims.user_id() else {
        return unauthorized();
    };
    let Some(stripe) = state.stripe.clone() else {
        return error_response(DomainError::Internal("Stripe is not configured.".to_string()));
    };

    let session = match stripe.retrieve_checkout_session(&payload.session_id).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    let owner = session
        .metadata_value(METADATA_USER_ID)
        .and_then(|raw| raw.parse::<i32>().ok());
    if owner != Some(user_id) && !claims.is_admin() {
        tracing::warn!(
            "User {} tried to confirm session {} they do not own",
            user_id,
            session.id
        );
        return error_response(DomainError::Forbidden);
    }

    match checkout_service::create_order_from_session(&state, &session).await {
        Ok(Some(order)) => (StatusCode::OK, Json(json!({ "order": order }))).into_response(),
        Ok(None) => (StatusCode::OK, Json(json!({ "pending": true }))).into_response(),
        Err(e) => error_response(e),
    }
}
