use axum::{
    extract::{Path, State},
    Json,
};

use qz_common::api::analytics::{QuizCompletionResponse, RatingResponse};
use qz_common::db::{fetch_aggregate_score, fetch_last_completions};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

pub async fn self_rating(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<RatingResponse>, ApiError> {
    let aggregate_score = fetch_aggregate_score(&state.pool, user_id).await?;
    Ok(Json(RatingResponse {
        user_id,
        aggregate_score,
    }))
}

pub async fn last_completions(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<QuizCompletionResponse>>, ApiError> {
    let completions = fetch_last_completions(&state.pool, user_id).await?;
    Ok(Json(completions.into_iter().map(Into::into).collect()))
}
