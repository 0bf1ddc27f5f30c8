use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::catalog::{fetch_active_question_ids, fetch_answer_option, fetch_quiz};
use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::quiz::retake::{evaluate, RetakeDecision};
use crate::quiz::{AnswerEvent, CoreError, RejectReason, SubmitOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitAnswer {
    pub user_id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub answer_id: i64,
}

fn row_to_event(row: &Row) -> AnswerEvent {
    AnswerEvent {
        id: row.get("user_answer_id"),
        user_id: row.get("user_id"),
        quiz_id: row.get("quiz_id"),
        question_id: row.get("question_id"),
        answer_id: row.get("answer_id"),
        attempt_cycle: row.get("attempt_cycle"),
        submitted_at: row.get("submitted_at"),
    }
}

pub async fn list_answer_events<C: GenericClient>(
    client: &C,
    user_id: i64,
    quiz_id: i64,
) -> Result<Vec<AnswerEvent>, CoreError> {
    let rows = client
        .timed_query_cached(
            "SELECT user_answer_id, user_id, quiz_id, question_id, answer_id,
                    attempt_cycle, submitted_at
             FROM quiz.user_answers
             WHERE user_id = $1 AND quiz_id = $2
             ORDER BY submitted_at, user_answer_id",
            &[&user_id, &quiz_id],
            "answers.list_events",
        )
        .await?;

    Ok(rows.iter().map(row_to_event).collect())
}

async fn user_exists<C: GenericClient>(client: &C, user_id: i64) -> Result<bool, CoreError> {
    let row = client
        .timed_query_one_cached(
            "SELECT EXISTS (SELECT 1 FROM quiz.users WHERE user_id = $1)",
            &[&user_id],
            "answers.user_exists",
        )
        .await?;
    Ok(row.get(0))
}

/// Record one answer submission, gated by the retake rules.
///
/// Catalog reads, the gate decision and the insert run in one transaction.
/// Two racing submissions for the same `(user, question)` compute the same
/// attempt cycle; the unique index on
/// `(user_id, question_id, attempt_cycle)` then fails the slower one with a
/// Conflict instead of double-recording.
#[instrument(skip(pool))]
pub async fn submit_answer(
    pool: &PgPool,
    submission: &SubmitAnswer,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome, CoreError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    if !user_exists(&tx, submission.user_id).await? {
        return Err(CoreError::NotFound(format!(
            "user {} not found",
            submission.user_id
        )));
    }

    let quiz = fetch_quiz(&tx, submission.quiz_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("quiz {} not found", submission.quiz_id)))?;

    let question_ids = fetch_active_question_ids(&tx, submission.quiz_id).await?;
    if !question_ids.contains(&submission.question_id) {
        return Err(CoreError::NotFound(format!(
            "question {} is not an active question of quiz {}",
            submission.question_id, submission.quiz_id
        )));
    }

    let option = fetch_answer_option(&tx, submission.answer_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound(format!("answer option {} not found", submission.answer_id))
        })?;
    if option.question_id != submission.question_id {
        return Err(CoreError::NotFound(format!(
            "answer option {} does not belong to question {}",
            submission.answer_id, submission.question_id
        )));
    }

    let events = list_answer_events(&tx, submission.user_id, submission.quiz_id).await?;

    let attempt_cycle = match evaluate(
        &question_ids,
        &events,
        submission.question_id,
        quiz.frequency_in_days,
        now,
    ) {
        RetakeDecision::Allow { attempt_cycle } => attempt_cycle,
        RetakeDecision::AlreadyAnswered => {
            return Ok(SubmitOutcome::Rejected(RejectReason::AlreadyAnswered));
        }
        RetakeDecision::CadenceNotElapsed { days_remaining } => {
            return Ok(SubmitOutcome::Rejected(RejectReason::CadenceNotElapsed {
                days_remaining,
            }));
        }
    };

    let row = tx
        .timed_query_one_cached(
            "INSERT INTO quiz.user_answers
                (user_id, quiz_id, question_id, answer_id, attempt_cycle, submitted_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING user_answer_id, user_id, quiz_id, question_id, answer_id,
                       attempt_cycle, submitted_at",
            &[
                &submission.user_id,
                &submission.quiz_id,
                &submission.question_id,
                &submission.answer_id,
                &attempt_cycle,
                &now,
            ],
            "answers.insert_event",
        )
        .await?;

    let event = row_to_event(&row);
    tx.commit().await?;

    Ok(SubmitOutcome::Accepted(event))
}
