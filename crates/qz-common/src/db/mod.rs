pub mod answers;
pub mod catalog;
pub mod memberships;
pub mod migrations;
pub mod notifications;
pub mod pool;
pub mod results;
pub mod run_lock;
pub mod sweep;
pub mod users;
pub mod util;

// Keep re-exports unique so downstream crates see a single symbol per helper.
pub use answers::{list_answer_events, submit_answer, SubmitAnswer};
pub use catalog::{
    fetch_active_question_ids, fetch_active_quizzes, fetch_answer_correctness,
    fetch_answer_option, fetch_quiz, AnswerOption,
};
pub use memberships::fetch_active_memberships;
pub use migrations::{run_migrations, MigrationError};
pub use notifications::{create_notification, list_unread, mark_read};
pub use pool::{create_pool_from_url, create_pool_from_url_checked, DbPoolError, PgPool};
pub use results::{compute_user_results, fetch_last_completions, QuizCompletion};
pub use run_lock::{try_acquire_run_lock, RunLock};
pub use sweep::PgSweepStore;
pub use users::fetch_aggregate_score;
pub use util::{with_read_retries, TimedClientExt};
