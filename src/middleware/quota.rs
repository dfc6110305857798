use axum::{
    extract::{Query, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::{
    auth::ApiKeyService,
    errors::{AppError, Result},
    handlers::AppState,
    services::usage_limiter::MeteredRequest,
};

#[derive(Debug, Deserialize)]
pub struct ApiKeyQuery {
    pub apikey: Option<String>,
}

/// Gate for metered routes: the request is counted against the key's daily
/// quota before the handler runs. Any failure rejects the request.
pub async fn track_usage(
    State(state): State<AppState>,
    Query(query): Query<ApiKeyQuery>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let api_key = match query.apikey.filter(|key| !key.is_empty()) {
        Some(key) => {
            ApiKeyService::validate_api_key_format(&key)?;
            key
        }
        None => {
            let header = request
                .headers()
                .get("x-api-key")
                .and_then(|header| header.to_str().ok())
                .ok_or(AppError::ApiKeyRequired)?;
            ApiKeyService::extract_key_from_header(header)?
        }
    };

    let metered = match state.usage.meter(&api_key).await {
        Ok(metered) => metered,
        Err(e) => {
            if matches!(e, AppError::UsageLimitReached) {
                state.metrics.record_quota_denial();
            }
            return Err(e);
        }
    };
    state.metrics.record_metered_request();

    let limit = metered.plan.daily_limit();
    let remaining = metered.remaining();
    request.extensions_mut().insert::<MeteredRequest>(metered);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-quota-limit", HeaderValue::from(limit));
    headers.insert("x-quota-remaining", HeaderValue::from(remaining));

    Ok(response)
}
