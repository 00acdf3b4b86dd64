use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use super::error_response;
use crate::auth::AdminClaims;
use crate::domain::{DomainError, OrderFilter};
use crate::infrastructure::AppState;
use crate::utils::format::format_price;

const RECENT_ORDERS: u64 = 5;

/// Dashboard figures: catalog size, customers, orders and revenue
pub async fn get_stats(State(state): State<AppState>, _admin: AdminClaims) -> impl IntoResponse {
    match collect_stats(&state).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn collect_stats(state: &AppState) -> Result<serde_json::Value, DomainError> {
    let books = state.book_repo.count().await?;
    let categories = state.category_repo.count().await?;
    let users = state.user_repo.count().await?;
    let totals = state.order_repo.totals().await?;
    let recent = state
        .order_repo
        .find_all(OrderFilter {
            status: None,
            limit: Some(RECENT_ORDERS),
        })
        .await?;

    Ok(json!({
        "books": books,
        "categories": categories,
        "users": users,
        "orders": totals.orders,
        "revenue_cents": totals.revenue_cents,
        "revenue_display": format_price(totals.revenue_cents),
        "recent_orders": recent,
    }))
}
