use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    errors::Result,
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::{BoxActionRequest, ReviewState},
};

pub async fn apply_action(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<BoxActionRequest>,
) -> Result<Json<ReviewState>> {
    let review = state
        .reviews
        .apply_action(user.id, request.word_id, &request.action_name)
        .await?;
    state.metrics.record_review_action(review.last_action.as_str());

    Ok(Json(review))
}

pub async fn get_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(word_id): Path<Uuid>,
) -> Result<Json<ReviewState>> {
    let review = state.reviews.get_or_init(user.id, word_id).await?;
    Ok(Json(review))
}

pub async fn due_reviews(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ReviewState>>> {
    let due = state.reviews.due_reviews(user.id, Utc::now()).await?;
    Ok(Json(due))
}
