use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quiz::Notification;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationResponse {
    pub id: i64,
    pub text: String,
    pub unread: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            text: notification.text,
            unread: notification.unread,
            created_at: notification.created_at,
        }
    }
}
