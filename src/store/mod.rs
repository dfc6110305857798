//! Repository traits over the persistent and expiring stores.
//!
//! Every correctness guarantee of the services (exactly-once usage
//! accounting, single review record per word, refresh token validity) is
//! pushed down into the atomic primitives declared here:
//!
//! - [`CredentialStore`]: users, API keys, daily usage counters. Increments
//!   return the post-increment value in one step.
//! - [`ReviewStore`]: review states with atomic find-or-create and
//!   compare-and-replace keyed on `(id, version)`.
//! - [`ExpiringStore`]: string values with a TTL.
//! - [`WordStore`]: read-only access to dictionary entries.
//!
//! Production backends live in [`postgres`] and [`redis`]; [`memory`] holds
//! the in-process backend used by tests and `STORE_BACKEND=memory`.

pub mod memory;
pub mod postgres;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::{future::Future, sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    database::Database,
    errors::{AppError, Result},
    models::{ApiKey, Plan, ReviewState, User, Word},
    services::redis::RedisService,
};

pub use memory::{MemoryExpiringStore, MemoryStore};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str, plan: Plan) -> Result<User>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns `false` when no such user exists.
    async fn set_plan(&self, id: Uuid, plan: Plan) -> Result<bool>;

    /// Fails with `Conflict` when the owner already has a key or the key
    /// value is taken.
    async fn create_api_key(&self, api_key: &ApiKey) -> Result<()>;

    async fn find_api_key(&self, key: &str) -> Result<Option<ApiKey>>;

    async fn find_api_key_by_owner(&self, owner_id: Uuid) -> Result<Option<ApiKey>>;

    /// Returns `false` when the owner had no key.
    async fn delete_api_key(&self, owner_id: Uuid) -> Result<bool>;

    /// Creates the `(key, date)` entry on first use and returns the count
    /// after incrementing it.
    async fn increment_daily_usage(&self, key: &str, date: NaiveDate) -> Result<i64>;

    /// Returns the lifetime count after incrementing, `None` if the key is gone.
    async fn increment_total_usage(&self, key: &str) -> Result<Option<i64>>;

    async fn daily_usage(&self, key: &str, date: NaiveDate) -> Result<i64>;
}

/// Result of a compare-and-replace on a review record.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplaceOutcome {
    Applied(ReviewState),
    NotFound,
    Conflict,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Inserts `initial` unless a record for its `(owner_id, word_id)`
    /// already exists, and returns whichever record is stored.
    async fn find_or_create(&self, initial: &ReviewState) -> Result<ReviewState>;

    async fn find(&self, owner_id: Uuid, word_id: Uuid) -> Result<Option<ReviewState>>;

    /// Replaces the record with `state.id` if its stored version still
    /// equals `state.version`. The stored version is bumped by one.
    async fn replace(&self, state: &ReviewState) -> Result<ReplaceOutcome>;

    async fn list_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<ReviewState>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn delete(&self, key: &str) -> Result<bool>;
}

#[async_trait]
pub trait WordStore: Send + Sync {
    /// One entry per `(word, part_of_speech)`. Without a part of speech the
    /// alphabetically first one is returned.
    async fn find_word(&self, word: &str, part_of_speech: Option<&str>) -> Result<Option<Word>>;

    async fn find_word_by_id(&self, id: Uuid) -> Result<Option<Word>>;
}

/// Collection of all stores handed to the services.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub expiring: Arc<dyn ExpiringStore>,
    pub words: Arc<dyn WordStore>,
}

impl Stores {
    /// In-process stores backed by fresh state. The dictionary holds only
    /// the built-in sample entries.
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::with_words(memory::sample_words()));
        Self {
            credentials: store.clone(),
            reviews: store.clone(),
            expiring: Arc::new(MemoryExpiringStore::new()),
            words: store,
        }
    }

    /// Postgres for records, Redis for expiring entries.
    pub fn connected(database: Database, redis: RedisService) -> Self {
        let database = Arc::new(database);
        Self {
            credentials: database.clone(),
            reviews: database.clone(),
            expiring: Arc::new(redis),
            words: database,
        }
    }
}

/// Bounds a single store round trip. An elapsed deadline surfaces as the
/// retryable [`AppError::StoreTimeout`].
pub async fn with_deadline<T, F>(deadline: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => Err(AppError::StoreTimeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses_into_store_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, AppError>(1)
        };

        let result = with_deadline(Duration::from_millis(100), slow).await;
        assert!(matches!(result, Err(AppError::StoreTimeout)));
    }

    #[tokio::test]
    async fn test_memory_stores_serve_sample_dictionary() {
        let stores = Stores::memory();

        let verb = stores.words.find_word("run", Some("verb")).await.unwrap().unwrap();
        assert_eq!(verb.part_of_speech, "verb");

        let found = stores.words.find_word_by_id(verb.id).await.unwrap();
        assert_eq!(found.map(|w| w.word), Some("run".to_string()));
        assert!(stores.words.find_word("serendipity", None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let value = with_deadline(Duration::from_secs(1), async { Ok::<_, AppError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
