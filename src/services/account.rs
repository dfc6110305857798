use chrono::Utc;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    auth::{ApiKeyService, PasswordService, TokenKind, TokenService},
    errors::{AppError, Result},
    models::{ApiKey, AuthTokenPair, Plan, PlanChange, User},
    store::{with_deadline, CredentialStore},
};

/// Registration, login and the per-user API key lifecycle.
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    store_timeout: Duration,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            tokens,
            store_timeout,
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(User, AuthTokenPair)> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }
        PasswordService::validate_password_strength(password)?;

        let password_hash = PasswordService::hash_password(password)?;
        let user = with_deadline(
            self.store_timeout,
            self.store.create_user(&email, &password_hash, Plan::Free),
        )
        .await?;

        tracing::info!(user_id = %user.id, "registered user");

        let tokens = self.tokens.issue(&user.id.to_string()).await?;
        Ok((user, tokens))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(User, AuthTokenPair)> {
        let email = email.trim().to_lowercase();
        let user = with_deadline(self.store_timeout, self.store.find_user_by_email(&email))
            .await?
            .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

        if !PasswordService::verify_password(password, &user.password_hash)? {
            return Err(AppError::Auth("Invalid email or password".to_string()));
        }

        let tokens = self.tokens.issue(&user.id.to_string()).await?;
        Ok((user, tokens))
    }

    /// Exchanges a refresh token for a new pair. The old refresh token is
    /// revoked first, so it can be redeemed at most once.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokenPair> {
        let subject = self.tokens.validate(TokenKind::Refresh, refresh_token).await?;

        if !self.tokens.revoke(refresh_token).await? {
            // Lost a race with a concurrent refresh or logout.
            return Err(AppError::TokenNotFound);
        }

        self.tokens.issue(&subject).await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        self.tokens.revoke(refresh_token).await?;
        Ok(())
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        with_deadline(self.store_timeout, self.store.find_user(user_id)).await
    }

    pub async fn create_api_key(&self, owner_id: Uuid, name: Option<String>) -> Result<ApiKey> {
        let api_key = ApiKey {
            key: ApiKeyService::generate_api_key(),
            owner_id,
            name: name.unwrap_or_default(),
            total_usage: 0,
            created_at: Utc::now(),
        };

        with_deadline(self.store_timeout, self.store.create_api_key(&api_key)).await?;
        tracing::info!(%owner_id, "created api key");

        Ok(api_key)
    }

    pub async fn get_api_key(&self, owner_id: Uuid) -> Result<ApiKey> {
        with_deadline(self.store_timeout, self.store.find_api_key_by_owner(owner_id))
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn delete_api_key(&self, owner_id: Uuid) -> Result<()> {
        if !with_deadline(self.store_timeout, self.store.delete_api_key(owner_id)).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!(%owner_id, "deleted api key");
        Ok(())
    }

    pub async fn change_plan(
        &self,
        user_id: Uuid,
        change: PlanChange,
        target: Plan,
    ) -> Result<Plan> {
        let user = self.find_user(user_id).await?.ok_or(AppError::NotFound)?;

        let plan = match change {
            PlanChange::Upgrade => user.plan.upgrade(target)?,
            PlanChange::Downgrade => user.plan.downgrade(target)?,
        };

        if !with_deadline(self.store_timeout, self.store.set_plan(user_id, plan)).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!(%user_id, from = %user.plan, to = %plan, "changed plan");
        Ok(plan)
    }
}
