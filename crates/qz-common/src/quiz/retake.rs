use chrono::{DateTime, Duration, Utc};

use crate::quiz::AnswerEvent;

/// Outcome of the retake gate for one `(user, quiz, question)` submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetakeDecision {
    /// Submission may proceed; the event is recorded under this cycle.
    Allow { attempt_cycle: i32 },
    /// The question was answered and the current attempt is still open.
    AlreadyAnswered,
    /// The attempt is complete but the quiz cadence has not elapsed yet.
    CadenceNotElapsed { days_remaining: i64 },
}

/// Number of active questions the user has answered at least once.
pub(crate) fn distinct_answered(active_question_ids: &[i64], events: &[AnswerEvent]) -> usize {
    active_question_ids
        .iter()
        .filter(|id| events.iter().any(|event| event.question_id == **id))
        .count()
}

/// Decide whether a new answer for `question_id` is currently allowed.
///
/// A question never attempted before is always open, regardless of cadence:
/// the cadence gates restarting a finished attempt, not finishing an open
/// one. Re-answering is only possible once every active question has been
/// answered and `frequency_in_days` has passed since the latest event of the
/// attempt.
pub fn evaluate(
    active_question_ids: &[i64],
    prior_events: &[AnswerEvent],
    question_id: i64,
    frequency_in_days: i32,
    now: DateTime<Utc>,
) -> RetakeDecision {
    let attempt_cycle = prior_events
        .iter()
        .filter(|event| event.question_id == question_id)
        .count() as i32;

    if attempt_cycle == 0 {
        return RetakeDecision::Allow { attempt_cycle: 0 };
    }

    let answered = distinct_answered(active_question_ids, prior_events);
    if answered < active_question_ids.len() {
        return RetakeDecision::AlreadyAnswered;
    }

    // Attempt complete; the newest event across the whole quiz marks when it
    // finished.
    let last_submitted = prior_events
        .iter()
        .map(|event| event.submitted_at)
        .max()
        .unwrap_or(now);

    let elapsed = now - last_submitted;
    let required = Duration::days(i64::from(frequency_in_days));
    if elapsed < required {
        return RetakeDecision::CadenceNotElapsed {
            days_remaining: i64::from(frequency_in_days) - elapsed.num_days(),
        };
    }

    RetakeDecision::Allow { attempt_cycle }
}
