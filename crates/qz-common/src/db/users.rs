use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::quiz::CoreError;

/// Stored correct-count for a user, refreshed by every scoring run.
#[instrument(skip(pool))]
pub async fn fetch_aggregate_score(pool: &PgPool, user_id: i64) -> Result<i64, CoreError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt_cached(
            "SELECT aggregate_score FROM quiz.users WHERE user_id = $1",
            &[&user_id],
            "users.fetch_aggregate_score",
        )
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("user {user_id} not found")))?;

    Ok(row.get("aggregate_score"))
}
