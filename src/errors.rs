use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store operation timed out")]
    StoreTimeout,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Token signing error: {0}")]
    Signing(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API key is required")]
    ApiKeyRequired,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Usage limit reached")]
    UsageLimitReached,

    #[error("Unsupported action type: {0}")]
    UnsupportedActionType(String),

    #[error("Record was modified concurrently")]
    ConcurrentModification,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Redis(_) => "store_unavailable",
            AppError::StoreTimeout => "store_timeout",
            AppError::InvalidToken => "invalid_token",
            AppError::TokenExpired => "token_expired",
            AppError::TokenNotFound => "token_not_found",
            AppError::Signing(_) => "signing",
            AppError::Auth(_) => "auth",
            AppError::ApiKeyRequired => "api_key_required",
            AppError::InvalidApiKey => "invalid_api_key",
            AppError::UsageLimitReached => "usage_limit_reached",
            AppError::UnsupportedActionType(_) => "unsupported_action_type",
            AppError::ConcurrentModification => "concurrent_modification",
            AppError::Validation(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::NotFound => "not_found",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_)
            | AppError::Redis(_)
            | AppError::Signing(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreTimeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::TokenNotFound
            | AppError::Auth(_)
            | AppError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            AppError::ApiKeyRequired
            | AppError::UnsupportedActionType(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UsageLimitReached => StatusCode::PAYMENT_REQUIRED,
            AppError::ConcurrentModification | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "Store unavailable".to_string()
            }
            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                "Store unavailable".to_string()
            }
            AppError::StoreTimeout => {
                tracing::warn!("Store operation timed out");
                "Store operation timed out, retry later".to_string()
            }
            AppError::Signing(ref msg) => {
                tracing::error!("Signing error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            ref other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
