use std::collections::HashMap;

use chrono::{DateTime, Utc};
use deadpool_postgres::Transaction;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::catalog::fetch_answer_correctness;
use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::quiz::scoring::{self, ScoringStore};
use crate::quiz::{AnswerEvent, CoreError, NewQuizResult, QuizResult};

fn row_to_result(row: &Row) -> QuizResult {
    QuizResult {
        id: row.get("result_id"),
        user_id: row.get("user_id"),
        quiz_id: row.get("quiz_id"),
        question_id: row.get("question_id"),
        answer_event_id: row.get("answer_event_id"),
        is_correct: row.get("is_correct"),
        computed_at: row.get("computed_at"),
    }
}

/// `ScoringStore` backed by one open transaction. Every scoring run for a
/// user goes through a single transaction holding the per-user advisory
/// lock, so concurrent runs cannot interleave the recount with the batch
/// insert.
pub struct PgScoringStore<'a> {
    tx: Transaction<'a>,
}

impl ScoringStore for PgScoringStore<'_> {
    async fn answer_events(&mut self, user_id: i64) -> Result<Vec<AnswerEvent>, CoreError> {
        let rows = self
            .tx
            .timed_query_cached(
                "SELECT user_answer_id, user_id, quiz_id, question_id, answer_id,
                        attempt_cycle, submitted_at
                 FROM quiz.user_answers
                 WHERE user_id = $1
                 ORDER BY submitted_at, user_answer_id",
                &[&user_id],
                "results.answer_events",
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| AnswerEvent {
                id: row.get("user_answer_id"),
                user_id: row.get("user_id"),
                quiz_id: row.get("quiz_id"),
                question_id: row.get("question_id"),
                answer_id: row.get("answer_id"),
                attempt_cycle: row.get("attempt_cycle"),
                submitted_at: row.get("submitted_at"),
            })
            .collect())
    }

    async fn answer_correctness(
        &mut self,
        answer_ids: &[i64],
    ) -> Result<HashMap<i64, bool>, CoreError> {
        fetch_answer_correctness(&self.tx, answer_ids).await
    }

    async fn append_results(
        &mut self,
        batch: &[NewQuizResult],
        computed_at: DateTime<Utc>,
    ) -> Result<Vec<QuizResult>, CoreError> {
        let mut created = Vec::with_capacity(batch.len());
        for pending in batch {
            let row = self
                .tx
                .timed_query_one_cached(
                    "INSERT INTO quiz.quiz_results
                        (user_id, quiz_id, question_id, answer_event_id, is_correct, computed_at)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     RETURNING result_id, user_id, quiz_id, question_id, answer_event_id,
                               is_correct, computed_at",
                    &[
                        &pending.user_id,
                        &pending.quiz_id,
                        &pending.question_id,
                        &pending.answer_event_id,
                        &pending.is_correct,
                        &computed_at,
                    ],
                    "results.append",
                )
                .await?;
            created.push(row_to_result(&row));
        }
        Ok(created)
    }

    async fn count_correct(&mut self, user_id: i64) -> Result<i64, CoreError> {
        let row = self
            .tx
            .timed_query_one_cached(
                "SELECT COUNT(*) FROM quiz.quiz_results WHERE user_id = $1 AND is_correct",
                &[&user_id],
                "results.count_correct",
            )
            .await?;
        Ok(row.get(0))
    }

    async fn set_aggregate_score(&mut self, user_id: i64, score: i64) -> Result<(), CoreError> {
        let updated = self
            .tx
            .timed_execute_cached(
                "UPDATE quiz.users SET aggregate_score = $2 WHERE user_id = $1",
                &[&user_id, &score],
                "results.set_aggregate_score",
            )
            .await?;

        if updated == 0 {
            return Err(CoreError::NotFound(format!("user {user_id} not found")));
        }
        Ok(())
    }
}

/// Run the scoring engine for one user and return the newly created batch.
#[instrument(skip(pool))]
pub async fn compute_user_results(
    pool: &PgPool,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<QuizResult>, CoreError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    // Serializes concurrent scoring runs for the same user for the duration
    // of this transaction.
    tx.execute("SELECT pg_advisory_xact_lock($1)", &[&user_id])
        .await?;

    let exists: bool = tx
        .timed_query_one_cached(
            "SELECT EXISTS (SELECT 1 FROM quiz.users WHERE user_id = $1)",
            &[&user_id],
            "results.user_exists",
        )
        .await?
        .get(0);
    if !exists {
        return Err(CoreError::NotFound(format!("user {user_id} not found")));
    }

    let mut store = PgScoringStore { tx };
    let created = scoring::compute_results(&mut store, user_id, now).await?;

    let PgScoringStore { tx } = store;
    tx.commit().await?;

    Ok(created)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizCompletion {
    pub quiz_id: i64,
    pub last_completed_at: DateTime<Utc>,
}

/// Latest result timestamp per quiz the user has results for.
#[instrument(skip(pool))]
pub async fn fetch_last_completions(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<QuizCompletion>, CoreError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT quiz_id, MAX(computed_at) AS last_completed_at
             FROM quiz.quiz_results
             WHERE user_id = $1
             GROUP BY quiz_id
             ORDER BY quiz_id",
            &[&user_id],
            "results.last_completions",
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| QuizCompletion {
            quiz_id: row.get("quiz_id"),
            last_completed_at: row.get("last_completed_at"),
        })
        .collect())
}
