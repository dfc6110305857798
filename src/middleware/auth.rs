use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{auth::TokenKind, errors::AppError, handlers::AppState};

/// Subject of a valid bearer access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Auth("Authentication required".to_string()))?;

        let subject = match state.tokens.validate(TokenKind::Access, token).await {
            Ok(subject) => subject,
            Err(e) => {
                tracing::warn!(reason = e.kind(), "rejected access token");
                state.metrics.record_token_rejection(&e);
                return Err(e);
            }
        };

        let id = Uuid::parse_str(&subject).map_err(|_| AppError::InvalidToken)?;
        Ok(AuthenticatedUser { id })
    }
}
