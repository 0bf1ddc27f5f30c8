use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::quiz::{CoreError, Notification};

fn row_to_notification(row: &Row) -> Notification {
    Notification {
        id: row.get("notification_id"),
        user_id: row.get("user_id"),
        text: row.get("text"),
        unread: row.get("unread"),
        created_at: row.get("created_at"),
    }
}

pub async fn create_notification<C: GenericClient>(
    client: &C,
    user_id: i64,
    text: &str,
) -> Result<Notification, CoreError> {
    let row = client
        .timed_query_one_cached(
            "INSERT INTO quiz.notifications (user_id, text)
             VALUES ($1, $2)
             RETURNING notification_id, user_id, text, unread, created_at",
            &[&user_id, &text],
            "notifications.create",
        )
        .await?;

    Ok(row_to_notification(&row))
}

#[instrument(skip(pool))]
pub async fn list_unread(pool: &PgPool, user_id: i64) -> Result<Vec<Notification>, CoreError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT notification_id, user_id, text, unread, created_at
             FROM quiz.notifications
             WHERE user_id = $1 AND unread
             ORDER BY created_at DESC, notification_id DESC",
            &[&user_id],
            "notifications.list_unread",
        )
        .await?;

    Ok(rows.iter().map(row_to_notification).collect())
}

/// Flip one unread notification to read. Absent or already-read
/// notifications are NotFound; there is nothing to conflict with.
#[instrument(skip(pool))]
pub async fn mark_read(
    pool: &PgPool,
    user_id: i64,
    notification_id: i64,
) -> Result<Notification, CoreError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt_cached(
            "UPDATE quiz.notifications
             SET unread = FALSE
             WHERE notification_id = $1 AND user_id = $2 AND unread
             RETURNING notification_id, user_id, text, unread, created_at",
            &[&notification_id, &user_id],
            "notifications.mark_read",
        )
        .await?
        .ok_or_else(|| {
            CoreError::NotFound(format!(
                "no unread notification {notification_id} for user {user_id}"
            ))
        })?;

    Ok(row_to_notification(&row))
}
