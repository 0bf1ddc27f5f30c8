use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quiz::QuizResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizResultResponse {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub answer_event_id: i64,
    pub is_correct: bool,
    pub computed_at: DateTime<Utc>,
}

impl From<QuizResult> for QuizResultResponse {
    fn from(result: QuizResult) -> Self {
        Self {
            id: result.id,
            user_id: result.user_id,
            quiz_id: result.quiz_id,
            question_id: result.question_id,
            answer_event_id: result.answer_event_id,
            is_correct: result.is_correct,
            computed_at: result.computed_at,
        }
    }
}
