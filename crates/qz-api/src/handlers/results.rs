use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use qz_common::api::results::QuizResultResponse;
use qz_common::db::compute_user_results;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

/// The explicit "compute my results" trigger: re-grades the user's full
/// ledger and returns the batch created by this run.
pub async fn compute_results(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<QuizResultResponse>>, ApiError> {
    let created = compute_user_results(&state.pool, user_id, Utc::now()).await?;
    Ok(Json(created.into_iter().map(Into::into).collect()))
}
