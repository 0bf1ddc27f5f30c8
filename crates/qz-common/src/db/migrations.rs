use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::{DbPoolError, PgPool};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to build pool: {0}")]
    PoolBuild(#[from] DbPoolError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    id: 1,
    description: "create quiz platform tables",
    sql: r#"
CREATE TABLE IF NOT EXISTS quiz.users (
    user_id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    surname TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    aggregate_score BIGINT NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS quiz.companies (
    company_id BIGSERIAL PRIMARY KEY,
    owner_id BIGINT NOT NULL REFERENCES quiz.users(user_id),
    name TEXT NOT NULL,
    description TEXT,
    is_active BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS quiz.company_membership (
    user_id BIGINT NOT NULL REFERENCES quiz.users(user_id),
    company_id BIGINT NOT NULL REFERENCES quiz.companies(company_id),
    is_owner BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    PRIMARY KEY (user_id, company_id)
);

CREATE TABLE IF NOT EXISTS quiz.quizzes (
    quiz_id BIGSERIAL PRIMARY KEY,
    company_id BIGINT NOT NULL REFERENCES quiz.companies(company_id),
    author_id BIGINT NOT NULL REFERENCES quiz.users(user_id),
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    frequency_in_days INTEGER NOT NULL CHECK (frequency_in_days > 0),
    is_active BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS quiz.questions (
    question_id BIGSERIAL PRIMARY KEY,
    quiz_id BIGINT NOT NULL REFERENCES quiz.quizzes(quiz_id),
    question_text TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS quiz.answers (
    answer_id BIGSERIAL PRIMARY KEY,
    quiz_id BIGINT NOT NULL REFERENCES quiz.quizzes(quiz_id),
    question_id BIGINT NOT NULL REFERENCES quiz.questions(question_id),
    answer_text TEXT NOT NULL,
    is_correct BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS quiz.user_answers (
    user_answer_id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES quiz.users(user_id),
    quiz_id BIGINT NOT NULL REFERENCES quiz.quizzes(quiz_id),
    question_id BIGINT NOT NULL REFERENCES quiz.questions(question_id),
    answer_id BIGINT NOT NULL REFERENCES quiz.answers(answer_id),
    attempt_cycle INTEGER NOT NULL DEFAULT 0,
    submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Rejects the loser of a concurrent duplicate submission.
CREATE UNIQUE INDEX IF NOT EXISTS uq_user_answers_attempt
    ON quiz.user_answers(user_id, question_id, attempt_cycle);
CREATE INDEX IF NOT EXISTS idx_user_answers_user_quiz
    ON quiz.user_answers(user_id, quiz_id);

CREATE TABLE IF NOT EXISTS quiz.quiz_results (
    result_id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES quiz.users(user_id),
    quiz_id BIGINT NOT NULL REFERENCES quiz.quizzes(quiz_id),
    question_id BIGINT NOT NULL REFERENCES quiz.questions(question_id),
    answer_event_id BIGINT NOT NULL REFERENCES quiz.user_answers(user_answer_id),
    is_correct BOOLEAN NOT NULL,
    computed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_quiz_results_user
    ON quiz.quiz_results(user_id, computed_at);

CREATE TABLE IF NOT EXISTS quiz.notifications (
    notification_id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES quiz.users(user_id),
    text TEXT NOT NULL,
    unread BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_notifications_user_unread
    ON quiz.notifications(user_id) WHERE unread;

CREATE INDEX IF NOT EXISTS idx_questions_quiz_active
    ON quiz.questions(quiz_id) WHERE is_active;

CREATE INDEX IF NOT EXISTS idx_quizzes_company_active
    ON quiz.quizzes(company_id) WHERE is_active;
"#,
}];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS quiz;
             CREATE TABLE IF NOT EXISTS quiz.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM quiz.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO quiz.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
