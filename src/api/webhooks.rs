use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;

use crate::infrastructure::AppState;
use crate::modules::payments::stripe::{self, CHECKOUT_COMPLETED, CheckoutSession};
use crate::services::checkout_service;

fn rejected(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

/// Stripe delivers events here. The raw body is needed for the signature
/// check so it is taken as bytes.
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    responses(
        (status = 200, description = "Event accepted"),
        (status = 400, description = "Missing or invalid signature")
    )
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok());
    let secret = state
        .stripe
        .as_ref()
        .and_then(|client| client.config().webhook_secret.clone());

    let (Some(signature), Some(secret)) = (signature, secret) else {
        return rejected("Missing signature");
    };

    let event = match stripe::construct_event(&body, signature, &secret) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Rejected webhook delivery: {}", e);
            return rejected(e.to_string());
        }
    };

    if event.event_type == CHECKOUT_COMPLETED {
        let session: CheckoutSession = match serde_json::from_value(event.data.object) {
            Ok(session) => session,
            Err(e) => return rejected(format!("Invalid session object: {}", e)),
        };

        match checkout_service::create_order_from_session(&state, &session).await {
            Ok(Some(order)) => {
                tracing::info!("Event {} settled order {}", event.id, order.id);
            }
            Ok(None) => {
                tracing::info!("Event {} did not produce an order", event.id);
            }
            Err(e) => {
                tracing::error!("Event {} failed: {}", event.id, e);
                return rejected(e.to_string());
            }
        }
    } else {
        tracing::debug!("Ignoring webhook event {} ({})", event.id, event.event_type);
    }

    (StatusCode::OK, Json(json!({ "received": true }))).into_response()
}
