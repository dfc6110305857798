use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::errors::AppError;

/// A review outcome reported by the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxAction {
    LevelUp,
    LevelDown,
    Reset,
}

impl FromStr for BoxAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level-up" => Ok(BoxAction::LevelUp),
            "level-down" => Ok(BoxAction::LevelDown),
            "reset" => Ok(BoxAction::Reset),
            other => Err(AppError::UnsupportedActionType(other.to_string())),
        }
    }
}

/// The action that produced the current state of a review record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LastAction {
    Init,
    LevelUp,
    LevelDown,
    Reset,
}

impl LastAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LastAction::Init => "init",
            LastAction::LevelUp => "level-up",
            LastAction::LevelDown => "level-down",
            LastAction::Reset => "reset",
        }
    }
}

impl From<BoxAction> for LastAction {
    fn from(action: BoxAction) -> Self {
        match action {
            BoxAction::LevelUp => LastAction::LevelUp,
            BoxAction::LevelDown => LastAction::LevelDown,
            BoxAction::Reset => LastAction::Reset,
        }
    }
}

impl fmt::Display for LastAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LastAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(LastAction::Init),
            other => other.parse::<BoxAction>().map(LastAction::from),
        }
    }
}

/// Leitner-box state of one word for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub word_id: Uuid,
    pub level: i32,
    pub last_action: LastAction,
    pub last_update: DateTime<Utc>,
    pub next_repeat: DateTime<Utc>,
    /// Bumped by the store on every applied replace.
    pub version: i64,
}

impl ReviewState {
    pub fn initial(owner_id: Uuid, word_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            word_id,
            level: 0,
            last_action: LastAction::Init,
            last_update: now,
            next_repeat: now,
            version: 0,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub word_id: Uuid,
    pub level: i32,
    pub last_action: String,
    pub last_update: DateTime<Utc>,
    pub next_repeat: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<ReviewRow> for ReviewState {
    type Error = AppError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let last_action = row.last_action.parse().map_err(|_| {
            AppError::Internal(anyhow::anyhow!(
                "stored review {} has unknown last action {:?}",
                row.id,
                row.last_action
            ))
        })?;

        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            word_id: row.word_id,
            level: row.level,
            last_action,
            last_update: row.last_update,
            next_repeat: row.next_repeat,
            version: row.version,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BoxActionRequest {
    pub word_id: Uuid,
    pub action_name: String,
}
