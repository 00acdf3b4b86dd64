use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::{bad_json, error_response};
use crate::auth::AdminClaims;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::{Role, UserProfile};

pub async fn list_users(State(state): State<AppState>, _admin: AdminClaims) -> impl IntoResponse {
    match state.user_repo.find_all().await {
        Ok(users) => {
            let users: Vec<UserProfile> = users.into_iter().map(UserProfile::from).collect();
            (StatusCode::OK, Json(users)).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub role: String,
}

pub async fn update_role(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };

    let Ok(role) = payload.role.parse::<Role>() else {
        return error_response(DomainError::Validation("Invalid role.".to_string()));
    };

    match state.user_repo.update_role(id, role).await {
        Ok(user) => {
            tracing::info!("Admin {} set user {} to {}", admin.sub, user.id, user.role);
            (
                StatusCode::OK,
                Json(json!({ "id": user.id, "role": user.role })),
            )
                .into_response()
        }
        Err(DomainError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
