use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::TokenConfig,
    errors::{AppError, Result},
    models::AuthTokenPair,
    store::{with_deadline, ExpiringStore},
};

const REFRESH_KEY_PREFIX: &str = "refresh:";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

struct SigningKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    duration: Duration,
}

impl SigningKeys {
    fn from_base64_pem(private_key: &str, public_key: &str, duration: Duration) -> Result<Self> {
        let private_pem = decode_key(private_key, "private")?;
        let public_pem = decode_key(public_key, "public")?;

        Ok(Self {
            encoding_key: EncodingKey::from_rsa_pem(&private_pem)
                .map_err(|e| AppError::Signing(format!("Invalid private key: {}", e)))?,
            decoding_key: DecodingKey::from_rsa_pem(&public_pem)
                .map_err(|e| AppError::Signing(format!("Invalid public key: {}", e)))?,
            duration,
        })
    }
}

fn decode_key(encoded: &str, which: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::Signing(format!("Failed to decode {} key: {}", which, e)))
}

/// Issues and validates RS256 bearer tokens.
///
/// Access tokens are self-validating: verification needs only the public
/// key. Refresh tokens are additionally recorded in the expiring store under
/// `refresh:<token>`; the record's presence is what makes them valid, so
/// revocation is deletion.
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
    store: Arc<dyn ExpiringStore>,
    store_timeout: std::time::Duration,
}

impl TokenService {
    pub fn new(
        config: &TokenConfig,
        store: Arc<dyn ExpiringStore>,
        store_timeout: std::time::Duration,
    ) -> Result<Self> {
        Ok(Self {
            access: SigningKeys::from_base64_pem(
                &config.access_private_key,
                &config.access_public_key,
                config.access_token_ttl,
            )?,
            refresh: SigningKeys::from_base64_pem(
                &config.refresh_private_key,
                &config.refresh_public_key,
                config.refresh_token_ttl,
            )?,
            store,
            store_timeout,
        })
    }

    pub async fn issue(&self, subject: &str) -> Result<AuthTokenPair> {
        let access_token = Self::sign(&self.access, subject)?;
        let refresh_token = Self::sign(&self.refresh, subject)?;

        let ttl = self
            .refresh
            .duration
            .to_std()
            .map_err(|_| AppError::Signing("Refresh token lifetime must be positive".to_string()))?;

        with_deadline(
            self.store_timeout,
            self.store.set(&refresh_key(&refresh_token), subject, ttl),
        )
        .await?;

        tracing::info!(subject, "issued token pair");

        Ok(AuthTokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Returns the subject the token was issued for.
    pub async fn validate(&self, kind: TokenKind, token: &str) -> Result<String> {
        match kind {
            TokenKind::Access => {
                let claims = Self::verify(&self.access, token).map_err(|kind| match kind {
                    ErrorKind::ExpiredSignature => AppError::TokenExpired,
                    _ => AppError::InvalidToken,
                })?;
                Ok(claims.sub)
            }
            TokenKind::Refresh => {
                let claims = Self::verify(&self.refresh, token).map_err(|kind| match kind {
                    ErrorKind::ExpiredSignature => AppError::TokenNotFound,
                    _ => AppError::InvalidToken,
                })?;

                let stored = with_deadline(self.store_timeout, self.store.get(&refresh_key(token)))
                    .await?
                    .ok_or(AppError::TokenNotFound)?;

                if stored != claims.sub {
                    tracing::warn!("refresh token record does not match its subject claim");
                    return Err(AppError::InvalidToken);
                }

                Ok(stored)
            }
        }
    }

    /// Deletes the refresh record. Returns `false` if it was already gone.
    pub async fn revoke(&self, refresh_token: &str) -> Result<bool> {
        let removed = with_deadline(
            self.store_timeout,
            self.store.delete(&refresh_key(refresh_token)),
        )
        .await?;

        tracing::debug!(removed, "revoked refresh token");
        Ok(removed)
    }

    fn sign(keys: &SigningKeys, subject: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + keys.duration).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &keys.encoding_key)
            .map_err(|e| AppError::Signing(format!("Failed to sign token: {}", e)))
    }

    fn verify(keys: &SigningKeys, token: &str) -> std::result::Result<Claims, ErrorKind> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;

        decode::<Claims>(token, &keys.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| e.into_kind())
    }
}

fn refresh_key(token: &str) -> String {
    format!("{}{}", REFRESH_KEY_PREFIX, token)
}
