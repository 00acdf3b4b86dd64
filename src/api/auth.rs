use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::{bad_json, error_response, unauthorized};
use crate::auth::{Claims, create_jwt, hash_password, verify_password};
use crate::domain::{DomainError, NewUser, validation::validate_signup};
use crate::infrastructure::AppState;
use crate::models::{Role, UserProfile};

#[derive(Deserialize)]
pub struct SignupRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };

    if let Err(e) = validate_signup(&payload.name, &payload.email, &payload.password) {
        return error_response(e);
    }

    let email = payload.email.trim().to_lowercase();

    match state.user_repo.find_by_email(&email).await {
        Ok(Some(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Email is already in use." })),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(e) => return error_response(e),
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => return error_response(DomainError::Internal(e)),
    };

    let role = if state.config.admin_email.as_deref() == Some(email.as_str()) {
        Role::Admin
    } else {
        Role::User
    };

    let new_user = NewUser {
        name: Some(payload.name.trim().to_string()),
        email,
        password_hash,
        role,
    };

    match state.user_repo.create(new_user).await {
        Ok(user) => {
            tracing::info!("New {} account {}", user.role, user.id);
            (
                StatusCode::CREATED,
                Json(json!({ "id": user.id, "email": user.email, "role": user.role })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };

    let email = payload.email.trim().to_lowercase();
    tracing::info!("Login attempt for {}", email);

    let user = match state.user_repo.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            tracing::warn!("Unknown account: {}", email);
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid credentials" })),
            )
                .into_response();
        }
        Err(e) => return error_response(e),
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => match create_jwt(&state.config.jwt_secret, user.id, &user.email, &user.role) {
            Ok(token) => (
                StatusCode::OK,
                Json(json!({
                    "token": token,
                    "role": user.role,
                    "user": UserProfile::from(user),
                })),
            )
                .into_response(),
            Err(e) => error_response(DomainError::Internal(e)),
        },
        _ => {
            tracing::warn!("Password verification failed for user {}", user.id);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid credentials" })),
            )
                .into_response()
        }
    }
}

pub async fn get_me(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return unauthorized();
    };

    match state.user_repo.find_by_id(user_id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(UserProfile::from(user))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
