use chrono::{Local, NaiveDate};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    models::{ApiKey, Plan},
    store::{with_deadline, CredentialStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allow,
    Deny,
}

/// A request that passed the metering gate.
#[derive(Debug, Clone)]
pub struct MeteredRequest {
    pub api_key: ApiKey,
    pub plan: Plan,
    pub daily_count: i64,
}

impl MeteredRequest {
    pub fn remaining(&self) -> i64 {
        (self.plan.daily_limit() - self.daily_count).max(0)
    }
}

/// Meters API-key usage against the owner's plan quota.
///
/// Counting is delegated to the store's atomic increment-and-return, so
/// concurrent requests against one key each observe a distinct count. The
/// daily and lifetime counters are two separate increments; a failure
/// between them leaves the lifetime counter one behind.
pub struct UsageLimiter {
    store: Arc<dyn CredentialStore>,
    store_timeout: Duration,
}

impl UsageLimiter {
    pub fn new(store: Arc<dyn CredentialStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Calendar day the daily counter is keyed on, in server-local time.
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Returns the daily count after counting this request.
    pub async fn increment_usage(&self, api_key: &str) -> Result<i64> {
        let key = self.lookup(api_key).await?;
        self.increment(&key.key).await
    }

    /// Allows up to and including `limit` on the count; the request that
    /// lands exactly on the limit is still served.
    pub fn check_quota(daily_count: i64, plan: Plan) -> QuotaDecision {
        if daily_count > plan.daily_limit() {
            QuotaDecision::Deny
        } else {
            QuotaDecision::Allow
        }
    }

    /// The metering gate: resolve the key, count the request, then check the
    /// owner's quota. Any store failure rejects the request.
    pub async fn meter(&self, api_key: &str) -> Result<MeteredRequest> {
        let key = self.lookup(api_key).await?;
        let daily_count = self.increment(&key.key).await?;

        let owner = with_deadline(self.store_timeout, self.store.find_user(key.owner_id))
            .await?
            .ok_or_else(|| {
                tracing::warn!(owner_id = %key.owner_id, "api key owner no longer exists");
                AppError::InvalidApiKey
            })?;

        match Self::check_quota(daily_count, owner.plan) {
            QuotaDecision::Allow => Ok(MeteredRequest {
                api_key: key,
                plan: owner.plan,
                daily_count,
            }),
            QuotaDecision::Deny => {
                tracing::warn!(
                    owner_id = %owner.id,
                    plan = %owner.plan,
                    daily_count,
                    "daily usage limit reached"
                );
                Err(AppError::UsageLimitReached)
            }
        }
    }

    /// Today's count and the key itself for an owner, `None` without a key.
    pub async fn usage_for_owner(&self, owner_id: Uuid) -> Result<Option<(ApiKey, i64)>> {
        let Some(key) =
            with_deadline(self.store_timeout, self.store.find_api_key_by_owner(owner_id)).await?
        else {
            return Ok(None);
        };

        let today = with_deadline(
            self.store_timeout,
            self.store.daily_usage(&key.key, Self::today()),
        )
        .await?;

        Ok(Some((key, today)))
    }

    async fn lookup(&self, api_key: &str) -> Result<ApiKey> {
        with_deadline(self.store_timeout, self.store.find_api_key(api_key))
            .await?
            .ok_or(AppError::InvalidApiKey)
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let daily_count = with_deadline(
            self.store_timeout,
            self.store.increment_daily_usage(key, Self::today()),
        )
        .await?;

        let total = with_deadline(self.store_timeout, self.store.increment_total_usage(key))
            .await?
            .ok_or(AppError::InvalidApiKey)?;

        tracing::debug!(daily_count, total, "counted metered request");
        Ok(daily_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::User, store::MockCredentialStore};
    use chrono::Utc;

    fn api_key(owner_id: Uuid) -> ApiKey {
        ApiKey {
            key: "oxf_test".to_string(),
            owner_id,
            name: "test".to_string(),
            total_usage: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_quota_boundary_is_strict() {
        assert_eq!(UsageLimiter::check_quota(10, Plan::Free), QuotaDecision::Allow);
        assert_eq!(UsageLimiter::check_quota(11, Plan::Free), QuotaDecision::Deny);
        assert_eq!(UsageLimiter::check_quota(1000, Plan::Pro), QuotaDecision::Allow);
        assert_eq!(UsageLimiter::check_quota(1001, Plan::Pro), QuotaDecision::Deny);
    }

    #[tokio::test]
    async fn test_unknown_key_never_increments() {
        let mut store = MockCredentialStore::new();
        store.expect_find_api_key().returning(|_| Ok(None));
        store.expect_increment_daily_usage().never();
        store.expect_increment_total_usage().never();

        let limiter = UsageLimiter::new(Arc::new(store), Duration::from_secs(1));
        assert!(matches!(
            limiter.increment_usage("oxf_missing").await,
            Err(AppError::InvalidApiKey)
        ));
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let owner_id = Uuid::new_v4();
        let mut store = MockCredentialStore::new();
        store
            .expect_find_api_key()
            .returning(move |_| Ok(Some(api_key(owner_id))));
        store
            .expect_increment_daily_usage()
            .returning(|_, _| Err(AppError::Internal(anyhow::anyhow!("connection refused"))));
        store.expect_find_user().never();

        let limiter = UsageLimiter::new(Arc::new(store), Duration::from_secs(1));
        assert!(matches!(
            limiter.meter("oxf_test").await,
            Err(AppError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_meter_denies_past_limit() {
        let owner_id = Uuid::new_v4();
        let mut store = MockCredentialStore::new();
        store
            .expect_find_api_key()
            .returning(move |_| Ok(Some(api_key(owner_id))));
        store.expect_increment_daily_usage().returning(|_, _| Ok(11));
        store.expect_increment_total_usage().returning(|_| Ok(Some(42)));
        store.expect_find_user().returning(move |id| {
            Ok(Some(User {
                id,
                email: "learner@example.com".to_string(),
                password_hash: String::new(),
                plan: Plan::Free,
                created_at: Utc::now(),
            }))
        });

        let limiter = UsageLimiter::new(Arc::new(store), Duration::from_secs(1));
        assert!(matches!(
            limiter.meter("oxf_test").await,
            Err(AppError::UsageLimitReached)
        ));
    }
}
