use axum::{
    extract::{Path, State},
    Json,
};

use qz_common::api::notifications::NotificationResponse;
use qz_common::db::{list_unread, mark_read};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

pub async fn list_unread_notifications(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = list_unread(&state.pool, user_id).await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

pub async fn mark_notification_read(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Path((user_id, notification_id)): Path<(i64, i64)>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = mark_read(&state.pool, user_id, notification_id).await?;
    Ok(Json(notification.into()))
}
