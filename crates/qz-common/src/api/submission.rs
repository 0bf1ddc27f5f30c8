use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quiz::AnswerEvent;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitAnswerRequest {
    pub user_id: i64,
    pub answer_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEventResponse {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub answer_id: i64,
    pub attempt_cycle: i32,
    pub submitted_at: DateTime<Utc>,
}

impl From<AnswerEvent> for AnswerEventResponse {
    fn from(event: AnswerEvent) -> Self {
        Self {
            id: event.id,
            user_id: event.user_id,
            quiz_id: event.quiz_id,
            question_id: event.question_id,
            answer_id: event.answer_id,
            attempt_cycle: event.attempt_cycle,
            submitted_at: event.submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_from_snake_case_json() {
        let request: SubmitAnswerRequest =
            serde_json::from_str(r#"{"user_id": 5, "answer_id": 12}"#).unwrap();

        assert_eq!(
            request,
            SubmitAnswerRequest {
                user_id: 5,
                answer_id: 12
            }
        );
    }
}
