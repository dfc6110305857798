use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    models::Word,
    services::usage_limiter::MeteredRequest,
    store::with_deadline,
};

#[derive(Debug, Deserialize)]
pub struct WordQuery {
    pub part_of_speech: Option<String>,
}

/// Metered lookup; only reachable behind `track_usage`.
pub async fn lookup_word(
    State(state): State<AppState>,
    Extension(metered): Extension<MeteredRequest>,
    Path(word): Path<String>,
    Query(query): Query<WordQuery>,
) -> Result<Json<serde_json::Value>> {
    let word = word.trim().to_lowercase();
    let part_of_speech = query
        .part_of_speech
        .map(|pos| pos.trim().to_lowercase())
        .filter(|pos| !pos.is_empty());

    let entry = with_deadline(
        state.store_timeout,
        state.words.find_word(&word, part_of_speech.as_deref()),
    )
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(word_response(entry, &metered))
}

pub async fn lookup_word_by_id(
    State(state): State<AppState>,
    Extension(metered): Extension<MeteredRequest>,
    Path(word_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let entry = with_deadline(state.store_timeout, state.words.find_word_by_id(word_id))
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(word_response(entry, &metered))
}

fn word_response(entry: Word, metered: &MeteredRequest) -> Json<serde_json::Value> {
    Json(json!({
        "data": entry,
        "usage": {
            "today": metered.daily_count,
            "remaining": metered.remaining()
        }
    }))
}
