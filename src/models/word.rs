use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A dictionary entry as written by the scraper. Read-only here.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Word {
    pub id: Uuid,
    pub word: String,
    pub part_of_speech: String,
    pub data: serde_json::Value,
}
