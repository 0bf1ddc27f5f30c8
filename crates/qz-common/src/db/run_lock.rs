use deadpool_postgres::{Client, ClientWrapper};
use tracing::instrument;

use crate::db::PgPool;
use crate::quiz::CoreError;

/// A session-scoped advisory lock held on a connection detached from the
/// pool. Dropping the lock closes that connection, which releases the lock
/// even if the holder crashes mid-run.
pub struct RunLock {
    _client: ClientWrapper,
}

/// Try to take the advisory lock for `key`. Returns `None` when another
/// session already holds it, in which case the caller should skip its run
/// rather than double-emit.
#[instrument(skip(pool))]
pub async fn try_acquire_run_lock(pool: &PgPool, key: i64) -> Result<Option<RunLock>, CoreError> {
    let object = pool.get().await?;
    // Detach from the pool: the lock must live and die with this exact
    // connection, not with whatever the pool recycles it into.
    let client = Client::take(object);

    let row = client
        .query_one("SELECT pg_try_advisory_lock($1)", &[&key])
        .await?;
    let acquired: bool = row.get(0);

    if acquired {
        Ok(Some(RunLock { _client: client }))
    } else {
        Ok(None)
    }
}
