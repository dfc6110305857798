use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::{ApiKeyResponse, ChangePlanRequest, CreateApiKeyRequest, UsageResponse, UserResponse},
};

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>> {
    let user = state
        .accounts
        .find_user(user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn create_api_key(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyResponse>)> {
    let api_key = state.accounts.create_api_key(user.id, request.name).await?;

    Ok((StatusCode::CREATED, Json(ApiKeyResponse { api_key })))
}

pub async fn get_api_key(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiKeyResponse>> {
    let api_key = state.accounts.get_api_key(user.id).await?;
    Ok(Json(ApiKeyResponse { api_key }))
}

pub async fn delete_api_key(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    state.accounts.delete_api_key(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn usage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UsageResponse>> {
    let account = state
        .accounts
        .find_user(user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    let (today, total) = match state.usage.usage_for_owner(user.id).await? {
        Some((api_key, today)) => (today, api_key.total_usage),
        None => (0, 0),
    };

    Ok(Json(UsageResponse {
        plan: account.plan,
        daily_limit: account.plan.daily_limit(),
        today,
        total,
    }))
}

pub async fn change_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ChangePlanRequest>,
) -> Result<Json<serde_json::Value>> {
    let plan = state
        .accounts
        .change_plan(user.id, request.change, request.plan)
        .await?;

    Ok(Json(json!({
        "plan": plan,
        "daily_limit": plan.daily_limit()
    })))
}
