use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::{
    errors::Result,
    handlers::AppState,
    models::{AuthResponse, CreateUserRequest, LoginRequest, RefreshRequest, UserResponse},
};

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let (user, tokens) = state
        .accounts
        .register(&request.email, &request.password)
        .await?;
    state.metrics.record_tokens_issued();

    let response = AuthResponse {
        tokens,
        user: UserResponse::from(user),
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "data": response
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    let (user, tokens) = state
        .accounts
        .login(&request.email, &request.password)
        .await?;
    state.metrics.record_tokens_issued();

    let response = AuthResponse {
        tokens,
        user: UserResponse::from(user),
    };

    Ok(Json(json!({
        "message": "Login successful",
        "data": response
    })))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>> {
    let tokens = match state.accounts.refresh(&request.refresh_token).await {
        Ok(tokens) => tokens,
        Err(e) => {
            state.metrics.record_token_rejection(&e);
            return Err(e);
        }
    };
    state.metrics.record_tokens_issued();

    Ok(Json(json!({
        "message": "Token refreshed successfully",
        "data": tokens
    })))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>> {
    state.accounts.logout(&request.refresh_token).await?;

    Ok(Json(json!({
        "message": "Logged out"
    })))
}
