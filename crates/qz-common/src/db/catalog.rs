use std::collections::HashMap;

use deadpool_postgres::GenericClient;
use tokio_postgres::Row;

use crate::db::util::TimedClientExt;
use crate::quiz::{CoreError, Quiz};

/// One answer option as the catalog stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub answer_id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub is_correct: bool,
}

fn row_to_quiz(row: &Row) -> Result<Quiz, CoreError> {
    Ok(Quiz {
        id: row.try_get("quiz_id")?,
        company_id: row.try_get("company_id")?,
        name: row.try_get("name")?,
        frequency_in_days: row.try_get("frequency_in_days")?,
        is_active: row.try_get("is_active")?,
    })
}

pub async fn fetch_quiz<C: GenericClient>(
    client: &C,
    quiz_id: i64,
) -> Result<Option<Quiz>, CoreError> {
    let row = client
        .timed_query_opt_cached(
            "SELECT quiz_id, company_id, name, frequency_in_days, is_active
             FROM quiz.quizzes WHERE quiz_id = $1",
            &[&quiz_id],
            "catalog.fetch_quiz",
        )
        .await?;

    row.as_ref().map(row_to_quiz).transpose()
}

pub async fn fetch_active_quizzes<C: GenericClient>(
    client: &C,
    company_id: i64,
) -> Result<Vec<Quiz>, CoreError> {
    let rows = client
        .timed_query_cached(
            "SELECT quiz_id, company_id, name, frequency_in_days, is_active
             FROM quiz.quizzes
             WHERE company_id = $1 AND is_active
             ORDER BY quiz_id",
            &[&company_id],
            "catalog.fetch_active_quizzes",
        )
        .await?;

    rows.iter().map(row_to_quiz).collect()
}

pub async fn fetch_active_question_ids<C: GenericClient>(
    client: &C,
    quiz_id: i64,
) -> Result<Vec<i64>, CoreError> {
    let rows = client
        .timed_query_cached(
            "SELECT question_id FROM quiz.questions
             WHERE quiz_id = $1 AND is_active
             ORDER BY question_id",
            &[&quiz_id],
            "catalog.fetch_active_question_ids",
        )
        .await?;

    rows.iter()
        .map(|row| row.try_get("question_id").map_err(CoreError::from))
        .collect()
}

pub async fn fetch_answer_option<C: GenericClient>(
    client: &C,
    answer_id: i64,
) -> Result<Option<AnswerOption>, CoreError> {
    let row = client
        .timed_query_opt_cached(
            "SELECT answer_id, quiz_id, question_id, is_correct
             FROM quiz.answers WHERE answer_id = $1",
            &[&answer_id],
            "catalog.fetch_answer_option",
        )
        .await?;

    Ok(row.map(|row| AnswerOption {
        answer_id: row.get("answer_id"),
        quiz_id: row.get("quiz_id"),
        question_id: row.get("question_id"),
        is_correct: row.get("is_correct"),
    }))
}

/// Current correctness flags for a set of answer options, keyed by id.
/// Missing ids are simply absent from the map; callers decide whether that
/// is fatal.
pub async fn fetch_answer_correctness<C: GenericClient>(
    client: &C,
    answer_ids: &[i64],
) -> Result<HashMap<i64, bool>, CoreError> {
    if answer_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let ids: Vec<i64> = answer_ids.to_vec();
    let rows = client
        .timed_query_cached(
            "SELECT answer_id, is_correct FROM quiz.answers WHERE answer_id = ANY($1)",
            &[&ids],
            "catalog.fetch_answer_correctness",
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("answer_id"), row.get("is_correct")))
        .collect())
}
