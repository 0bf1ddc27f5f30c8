use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use qz_common::api::submission::{AnswerEventResponse, SubmitAnswerRequest};
use qz_common::db::{submit_answer as store_answer, SubmitAnswer};
use qz_common::quiz::SubmitOutcome;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

fn validate(payload: &SubmitAnswerRequest) -> Result<(), ApiError> {
    if payload.user_id <= 0 {
        return Err(ApiError::BadRequest("user_id must be positive".into()));
    }
    if payload.answer_id <= 0 {
        return Err(ApiError::BadRequest("answer_id must be positive".into()));
    }
    Ok(())
}

pub async fn submit_answer(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerEventResponse>, ApiError> {
    validate(&payload)?;

    let submission = SubmitAnswer {
        user_id: payload.user_id,
        quiz_id,
        question_id,
        answer_id: payload.answer_id,
    };

    match store_answer(&state.pool, &submission, Utc::now()).await? {
        SubmitOutcome::Accepted(event) => Ok(Json(event.into())),
        SubmitOutcome::Rejected(reason) => Err(ApiError::Forbidden(format!(
            "{}: {}",
            reason.as_ref(),
            reason.message()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_non_positive_ids() {
        let err = validate(&SubmitAnswerRequest {
            user_id: 0,
            answer_id: 3,
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = validate(&SubmitAnswerRequest {
            user_id: 3,
            answer_id: -1,
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn validate_allows_positive_ids() {
        assert!(validate(&SubmitAnswerRequest {
            user_id: 1,
            answer_id: 2,
        })
        .is_ok());
    }
}
