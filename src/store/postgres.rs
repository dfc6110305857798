use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    database::{
        queries::{ApiKeyQueries, ReviewQueries, UsageQueries, UserQueries, WordQueries},
        Database,
    },
    errors::Result,
    models::{ApiKey, Plan, ReviewState, User, Word},
    store::{CredentialStore, ReplaceOutcome, ReviewStore, WordStore},
};

#[async_trait]
impl CredentialStore for Database {
    async fn create_user(&self, email: &str, password_hash: &str, plan: Plan) -> Result<User> {
        UserQueries::create_user(self.pool(), email, password_hash, plan).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        UserQueries::find_by_id(self.pool(), id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserQueries::find_by_email(self.pool(), email).await
    }

    async fn set_plan(&self, id: Uuid, plan: Plan) -> Result<bool> {
        UserQueries::set_plan(self.pool(), id, plan).await
    }

    async fn create_api_key(&self, api_key: &ApiKey) -> Result<()> {
        ApiKeyQueries::create_api_key(self.pool(), api_key).await
    }

    async fn find_api_key(&self, key: &str) -> Result<Option<ApiKey>> {
        ApiKeyQueries::find_by_key(self.pool(), key).await
    }

    async fn find_api_key_by_owner(&self, owner_id: Uuid) -> Result<Option<ApiKey>> {
        ApiKeyQueries::find_by_owner(self.pool(), owner_id).await
    }

    async fn delete_api_key(&self, owner_id: Uuid) -> Result<bool> {
        ApiKeyQueries::delete_by_owner(self.pool(), owner_id).await
    }

    async fn increment_daily_usage(&self, key: &str, date: NaiveDate) -> Result<i64> {
        UsageQueries::increment_daily_usage(self.pool(), key, date).await
    }

    async fn increment_total_usage(&self, key: &str) -> Result<Option<i64>> {
        ApiKeyQueries::increment_total_usage(self.pool(), key).await
    }

    async fn daily_usage(&self, key: &str, date: NaiveDate) -> Result<i64> {
        UsageQueries::get_daily_usage(self.pool(), key, date).await
    }
}

#[async_trait]
impl ReviewStore for Database {
    async fn find_or_create(&self, initial: &ReviewState) -> Result<ReviewState> {
        ReviewQueries::find_or_create(self.pool(), initial).await
    }

    async fn find(&self, owner_id: Uuid, word_id: Uuid) -> Result<Option<ReviewState>> {
        ReviewQueries::find(self.pool(), owner_id, word_id).await
    }

    async fn replace(&self, state: &ReviewState) -> Result<ReplaceOutcome> {
        if let Some(updated) = ReviewQueries::replace(self.pool(), state).await? {
            return Ok(ReplaceOutcome::Applied(updated));
        }

        // Zero rows matched: tell a vanished record apart from a stale version.
        if ReviewQueries::exists(self.pool(), state.id).await? {
            Ok(ReplaceOutcome::Conflict)
        } else {
            Ok(ReplaceOutcome::NotFound)
        }
    }

    async fn list_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<ReviewState>> {
        ReviewQueries::list_due(self.pool(), owner_id, now).await
    }
}

#[async_trait]
impl WordStore for Database {
    async fn find_word(&self, word: &str, part_of_speech: Option<&str>) -> Result<Option<Word>> {
        WordQueries::find_by_word(self.pool(), word, part_of_speech).await
    }

    async fn find_word_by_id(&self, id: Uuid) -> Result<Option<Word>> {
        WordQueries::find_by_id(self.pool(), id).await
    }
}
