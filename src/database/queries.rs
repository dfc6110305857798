use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::*;

const REVIEW_COLUMNS: &str =
    "id, owner_id, word_id, level, last_action, last_update, next_repeat, version";

fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        other => AppError::Database(other),
    }
}

pub struct UserQueries;

impl UserQueries {
    pub async fn create_user(
        pool: &PgPool,
        email: &str,
        password_hash: &str,
        plan: Plan,
    ) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, password_hash, plan)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, plan, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(plan.as_str())
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already registered"))?;

        row.try_into()
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, plan, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, plan, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    pub async fn set_plan(pool: &PgPool, id: Uuid, plan: Plan) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET plan = $1 WHERE id = $2")
            .bind(plan.as_str())
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct ApiKeyQueries;

impl ApiKeyQueries {
    pub async fn create_api_key(pool: &PgPool, api_key: &ApiKey) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (key, owner_id, name, total_usage, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&api_key.key)
        .bind(api_key.owner_id)
        .bind(&api_key.name)
        .bind(api_key.total_usage)
        .bind(api_key.created_at)
        .execute(pool)
        .await
        .map_err(|e| conflict_on_unique(e, "api key already exists"))?;

        Ok(())
    }

    pub async fn find_by_key(pool: &PgPool, key: &str) -> Result<Option<ApiKey>> {
        let api_key = sqlx::query_as::<_, ApiKey>(
            "SELECT key, owner_id, name, total_usage, created_at FROM api_keys WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        Ok(api_key)
    }

    pub async fn find_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Option<ApiKey>> {
        let api_key = sqlx::query_as::<_, ApiKey>(
            "SELECT key, owner_id, name, total_usage, created_at FROM api_keys WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(api_key)
    }

    pub async fn delete_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE owner_id = $1")
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_total_usage(pool: &PgPool, key: &str) -> Result<Option<i64>> {
        let total = sqlx::query_scalar::<_, i64>(
            "UPDATE api_keys SET total_usage = total_usage + 1 WHERE key = $1 RETURNING total_usage",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        Ok(total)
    }
}

pub struct UsageQueries;

impl UsageQueries {
    /// Upsert-with-post-image: concurrent callers serialize on the row lock
    /// and each sees a distinct count.
    pub async fn increment_daily_usage(pool: &PgPool, key: &str, date: NaiveDate) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO daily_usage (api_key, date, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (api_key, date) DO UPDATE SET count = daily_usage.count + 1
            RETURNING count
            "#,
        )
        .bind(key)
        .bind(date)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    pub async fn get_daily_usage(pool: &PgPool, key: &str, date: NaiveDate) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count FROM daily_usage WHERE api_key = $1 AND date = $2",
        )
        .bind(key)
        .bind(date)
        .fetch_optional(pool)
        .await?;

        Ok(count.unwrap_or(0))
    }
}

pub struct ReviewQueries;

impl ReviewQueries {
    pub async fn find_or_create(pool: &PgPool, initial: &ReviewState) -> Result<ReviewState> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let sql = format!(
            r#"
            INSERT INTO review_states ({REVIEW_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (owner_id, word_id) DO UPDATE SET owner_id = EXCLUDED.owner_id
            RETURNING {REVIEW_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(initial.id)
            .bind(initial.owner_id)
            .bind(initial.word_id)
            .bind(initial.level)
            .bind(initial.last_action.as_str())
            .bind(initial.last_update)
            .bind(initial.next_repeat)
            .bind(initial.version)
            .fetch_one(pool)
            .await?;

        row.try_into()
    }

    pub async fn find(pool: &PgPool, owner_id: Uuid, word_id: Uuid) -> Result<Option<ReviewState>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM review_states WHERE owner_id = $1 AND word_id = $2"
        );

        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(owner_id)
            .bind(word_id)
            .fetch_optional(pool)
            .await?;

        row.map(ReviewState::try_from).transpose()
    }

    /// `None` when no row matched `(id, version)`.
    pub async fn replace(pool: &PgPool, state: &ReviewState) -> Result<Option<ReviewState>> {
        let sql = format!(
            r#"
            UPDATE review_states
            SET level = $3, last_action = $4, last_update = $5, next_repeat = $6,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {REVIEW_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(state.id)
            .bind(state.version)
            .bind(state.level)
            .bind(state.last_action.as_str())
            .bind(state.last_update)
            .bind(state.next_repeat)
            .fetch_optional(pool)
            .await?;

        row.map(ReviewState::try_from).transpose()
    }

    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM review_states WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    pub async fn list_due(
        pool: &PgPool,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewState>> {
        let sql = format!(
            r#"
            SELECT {REVIEW_COLUMNS}
            FROM review_states
            WHERE owner_id = $1 AND next_repeat <= $2
            ORDER BY next_repeat
            "#
        );

        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(owner_id)
            .bind(now)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(ReviewState::try_from).collect()
    }
}

pub struct WordQueries;

impl WordQueries {
    pub async fn find_by_word(
        pool: &PgPool,
        word: &str,
        part_of_speech: Option<&str>,
    ) -> Result<Option<Word>> {
        let word = sqlx::query_as::<_, Word>(
            r#"
            SELECT id, word, part_of_speech, data
            FROM words
            WHERE word = $1 AND ($2::TEXT IS NULL OR part_of_speech = $2)
            ORDER BY part_of_speech, id
            LIMIT 1
            "#,
        )
        .bind(word)
        .bind(part_of_speech)
        .fetch_optional(pool)
        .await?;

        Ok(word)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Word>> {
        let word = sqlx::query_as::<_, Word>(
            "SELECT id, word, part_of_speech, data FROM words WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(word)
    }
}
