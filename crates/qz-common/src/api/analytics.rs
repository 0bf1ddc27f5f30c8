use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::QuizCompletion;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatingResponse {
    pub user_id: i64,
    pub aggregate_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizCompletionResponse {
    pub quiz_id: i64,
    pub last_completed_at: DateTime<Utc>,
}

impl From<QuizCompletion> for QuizCompletionResponse {
    fn from(completion: QuizCompletion) -> Self {
        Self {
            quiz_id: completion.quiz_id,
            last_completed_at: completion.last_completed_at,
        }
    }
}
