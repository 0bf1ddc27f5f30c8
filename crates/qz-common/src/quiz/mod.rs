pub mod retake;
pub mod scoring;
pub mod sweep;

use chrono::{DateTime, Utc};
use deadpool_postgres::PoolError;
use strum::AsRefStr;
use thiserror::Error;
use tokio_postgres::error::SqlState;
use tokio_postgres::Error as PgError;

/// One recorded answer submission. Append-only; `attempt_cycle` counts how
/// many times the same user answered the same question before this event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEvent {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub answer_id: i64,
    pub attempt_cycle: i32,
    pub submitted_at: DateTime<Utc>,
}

/// A graded answer event pending persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizResult {
    pub user_id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub answer_event_id: i64,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub answer_event_id: i64,
    pub is_correct: bool,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub frequency_in_days: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub user_id: i64,
    pub company_id: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub unread: bool,
    pub created_at: DateTime<Utc>,
}

/// Why the Retake Gate refused a submission. A refusal is an expected
/// outcome the caller branches on, not a storage fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    AlreadyAnswered,
    CadenceNotElapsed { days_remaining: i64 },
}

impl RejectReason {
    pub fn message(&self) -> String {
        match self {
            RejectReason::AlreadyAnswered => {
                "this question has already been answered in the current attempt".to_string()
            }
            RejectReason::CadenceNotElapsed { days_remaining } => {
                format!("a new attempt can start in {days_remaining} more day(s)")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(AnswerEvent),
    Rejected(RejectReason),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<PoolError> for CoreError {
    fn from(err: PoolError) -> Self {
        CoreError::Unavailable(format!("failed to get postgres connection: {err}"))
    }
}

impl From<PgError> for CoreError {
    fn from(err: PgError) -> Self {
        match err.code() {
            Some(code) if *code == SqlState::UNIQUE_VIOLATION => {
                CoreError::Conflict(err.to_string())
            }
            Some(code) if *code == SqlState::FOREIGN_KEY_VIOLATION => {
                CoreError::NotFound(err.to_string())
            }
            _ => CoreError::Unavailable(err.to_string()),
        }
    }
}
