use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    models::{BoxAction, LastAction, ReviewState},
    store::{with_deadline, ReplaceOutcome, ReviewStore},
};

pub const MAX_LEVEL: i32 = 7;
pub const MIN_LEVEL: i32 = 1;

/// Review interval for a level. Levels outside `1..=7` fall back to the
/// longest interval; transitions never ask for level 0 (reset uses its own
/// fixed delay).
pub fn interval(level: i32) -> Duration {
    let day = Duration::days(1);
    let week = day * 7;
    let month = week * 4;
    let year = month * 12;

    match level {
        1 => day,
        2 => day * 3,
        3 => week,
        4 => week * 2,
        5 => month,
        6 => month * 3,
        _ => year,
    }
}

/// Applies one action to a state, producing the state to persist.
pub fn transition(state: &ReviewState, action: BoxAction, now: DateTime<Utc>) -> ReviewState {
    let (level, next_repeat) = match action {
        BoxAction::LevelUp => {
            let level = (state.level + 1).min(MAX_LEVEL);
            (level, now + interval(level))
        }
        BoxAction::LevelDown => {
            let level = (state.level - 1).max(MIN_LEVEL);
            (level, now + interval(level))
        }
        BoxAction::Reset => (0, now + Duration::days(1)),
    };

    ReviewState {
        level,
        last_action: LastAction::from(action),
        last_update: now,
        next_repeat,
        ..state.clone()
    }
}

/// Leitner-box scheduling of word reviews, one record per (owner, word).
pub struct ReviewScheduler {
    store: Arc<dyn ReviewStore>,
    store_timeout: std::time::Duration,
}

impl ReviewScheduler {
    pub fn new(store: Arc<dyn ReviewStore>, store_timeout: std::time::Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    pub async fn get_or_init(&self, owner_id: Uuid, word_id: Uuid) -> Result<ReviewState> {
        let initial = ReviewState::initial(owner_id, word_id, Utc::now());
        with_deadline(self.store_timeout, self.store.find_or_create(&initial)).await
    }

    /// Parses `action_name` before touching the store, so an unsupported
    /// name leaves no trace.
    pub async fn apply_action(
        &self,
        owner_id: Uuid,
        word_id: Uuid,
        action_name: &str,
    ) -> Result<ReviewState> {
        let action: BoxAction = action_name.parse()?;
        let current = self.get_or_init(owner_id, word_id).await?;
        let next = transition(&current, action, Utc::now());

        match with_deadline(self.store_timeout, self.store.replace(&next)).await? {
            ReplaceOutcome::Applied(stored) => {
                tracing::debug!(
                    %owner_id,
                    %word_id,
                    from = current.level,
                    to = stored.level,
                    action = %stored.last_action,
                    "applied review action"
                );
                Ok(stored)
            }
            ReplaceOutcome::NotFound | ReplaceOutcome::Conflict => {
                tracing::warn!(%owner_id, %word_id, "review record changed underneath");
                Err(AppError::ConcurrentModification)
            }
        }
    }

    pub async fn find(&self, owner_id: Uuid, word_id: Uuid) -> Result<Option<ReviewState>> {
        with_deadline(self.store_timeout, self.store.find(owner_id, word_id)).await
    }

    pub async fn due_reviews(
        &self,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewState>> {
        with_deadline(self.store_timeout, self.store.list_due(owner_id, now)).await
    }
}
