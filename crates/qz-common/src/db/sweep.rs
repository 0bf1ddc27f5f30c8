use tokio::time::Duration;

use crate::db::answers::list_answer_events;
use crate::db::catalog::{fetch_active_question_ids, fetch_active_quizzes};
use crate::db::memberships::fetch_active_memberships;
use crate::db::notifications::create_notification;
use crate::db::util::with_read_retries;
use crate::db::PgPool;
use crate::quiz::sweep::SweepStore;
use crate::quiz::{AnswerEvent, CoreError, Membership, Notification, Quiz};

const READ_RETRY_ATTEMPTS: u32 = 3;
const READ_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Pool-backed `SweepStore`. Reads go through the bounded retry helper;
/// notification creation is a write and is attempted exactly once.
pub struct PgSweepStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgSweepStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl SweepStore for PgSweepStore<'_> {
    async fn active_memberships(&self) -> Result<Vec<Membership>, CoreError> {
        with_read_retries(
            "sweep.active_memberships",
            READ_RETRY_ATTEMPTS,
            READ_RETRY_BACKOFF,
            || async {
                let client = self.pool.get().await?;
                fetch_active_memberships(&client).await
            },
        )
        .await
    }

    async fn active_quizzes(&self, company_id: i64) -> Result<Vec<Quiz>, CoreError> {
        with_read_retries(
            "sweep.active_quizzes",
            READ_RETRY_ATTEMPTS,
            READ_RETRY_BACKOFF,
            || async {
                let client = self.pool.get().await?;
                fetch_active_quizzes(&client, company_id).await
            },
        )
        .await
    }

    async fn active_question_ids(&self, quiz_id: i64) -> Result<Vec<i64>, CoreError> {
        with_read_retries(
            "sweep.active_question_ids",
            READ_RETRY_ATTEMPTS,
            READ_RETRY_BACKOFF,
            || async {
                let client = self.pool.get().await?;
                fetch_active_question_ids(&client, quiz_id).await
            },
        )
        .await
    }

    async fn answer_events(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Vec<AnswerEvent>, CoreError> {
        with_read_retries(
            "sweep.answer_events",
            READ_RETRY_ATTEMPTS,
            READ_RETRY_BACKOFF,
            || async {
                let client = self.pool.get().await?;
                list_answer_events(&client, user_id, quiz_id).await
            },
        )
        .await
    }

    async fn create_notification(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<Notification, CoreError> {
        let client = self.pool.get().await?;
        create_notification(&client, user_id, text).await
    }
}
