#![allow(async_fn_in_trait)]

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use tracing::{instrument, warn};

use crate::quiz::retake::distinct_answered;
use crate::quiz::{AnswerEvent, CoreError, Membership, Notification, Quiz};

/// Storage operations one sweep pass needs. The Postgres implementation
/// lives in the db layer; tests provide an in-memory store.
pub trait SweepStore {
    async fn active_memberships(&self) -> Result<Vec<Membership>, CoreError>;
    async fn active_quizzes(&self, company_id: i64) -> Result<Vec<Quiz>, CoreError>;
    async fn active_question_ids(&self, quiz_id: i64) -> Result<Vec<i64>, CoreError>;
    async fn answer_events(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Vec<AnswerEvent>, CoreError>;
    async fn create_notification(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<Notification, CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    /// The member never answered anything in this quiz.
    Available,
    /// The attempt is open: some questions are still unanswered.
    Incomplete,
    /// The attempt is complete and the retake cadence has elapsed.
    RetakeDue,
}

/// Pick at most one reminder for a `(member, quiz)` pair.
///
/// The branches are a strict priority chain: an empty ledger always reads as
/// "available" and never also as "incomplete", and only a fully answered
/// quiz is ever checked against the cadence.
pub fn reminder_for(
    active_question_ids: &[i64],
    events: &[AnswerEvent],
    frequency_in_days: i32,
    now: DateTime<Utc>,
) -> Option<Reminder> {
    if events.is_empty() {
        return Some(Reminder::Available);
    }

    if distinct_answered(active_question_ids, events) < active_question_ids.len() {
        return Some(Reminder::Incomplete);
    }

    let last_submitted = events.iter().map(|event| event.submitted_at).max()?;
    if now - last_submitted >= Duration::days(i64::from(frequency_in_days)) {
        return Some(Reminder::RetakeDue);
    }

    None
}

pub fn reminder_text(reminder: Reminder, quiz: &Quiz) -> String {
    match reminder {
        Reminder::Available => format!(
            "Quiz {} is available! Take the test right now!",
            quiz.name
        ),
        Reminder::Incomplete => format!("Complete the quiz {}", quiz.name),
        Reminder::RetakeDue => format!(
            "The frequency in days {} has already passed. Take the {} test now!",
            quiz.frequency_in_days, quiz.name
        ),
    }
}

/// What one sweep pass did, for the caller's log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub memberships: usize,
    pub pairs: usize,
    pub available: usize,
    pub incomplete: usize,
    pub retake_due: usize,
    pub failures: usize,
    pub cancelled: bool,
}

impl SweepReport {
    fn record(&mut self, reminder: Reminder) {
        match reminder {
            Reminder::Available => self.available += 1,
            Reminder::Incomplete => self.incomplete += 1,
            Reminder::RetakeDue => self.retake_due += 1,
        }
    }
}

async fn sweep_pair<S: SweepStore>(
    store: &S,
    membership: &Membership,
    quiz: &Quiz,
    now: DateTime<Utc>,
) -> Result<Option<Reminder>, CoreError> {
    let question_ids = store.active_question_ids(quiz.id).await?;
    let events = store.answer_events(membership.user_id, quiz.id).await?;

    let Some(reminder) = reminder_for(&question_ids, &events, quiz.frequency_in_days, now) else {
        return Ok(None);
    };

    store
        .create_notification(membership.user_id, &reminder_text(reminder, quiz))
        .await?;
    Ok(Some(reminder))
}

/// One full sweep over every active membership.
///
/// A failing lookup or emit for one `(member, quiz)` pair is logged and
/// counted but never aborts the batch; each emitted notification commits
/// independently. The cancellation flag is honored between membership
/// iterations, so a shutdown leaves no partially written pair behind.
#[instrument(skip(store, cancel))]
pub async fn run_sweep<S: SweepStore>(
    store: &S,
    now: DateTime<Utc>,
    cancel: &AtomicBool,
) -> Result<SweepReport, CoreError> {
    let memberships = store.active_memberships().await?;

    let mut report = SweepReport {
        memberships: memberships.len(),
        ..SweepReport::default()
    };

    for membership in &memberships {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }

        let quizzes = match store.active_quizzes(membership.company_id).await {
            Ok(quizzes) => quizzes,
            Err(err) => {
                warn!(
                    user_id = membership.user_id,
                    company_id = membership.company_id,
                    error = %err,
                    "skipping membership: quiz listing failed"
                );
                report.failures += 1;
                continue;
            }
        };

        for quiz in &quizzes {
            report.pairs += 1;
            match sweep_pair(store, membership, quiz, now).await {
                Ok(Some(reminder)) => report.record(reminder),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        user_id = membership.user_id,
                        quiz_id = quiz.id,
                        error = %err,
                        "skipping pair: reminder evaluation failed"
                    );
                    report.failures += 1;
                }
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryState {
        memberships: Vec<Membership>,
        quizzes: Vec<Quiz>,
        questions: HashMap<i64, Vec<i64>>,
        events: Vec<AnswerEvent>,
        notifications: Vec<Notification>,
        broken_quizzes: Vec<i64>,
    }

    #[derive(Default)]
    struct MemoryStore {
        state: Mutex<MemoryState>,
    }

    impl SweepStore for MemoryStore {
        async fn active_memberships(&self) -> Result<Vec<Membership>, CoreError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .memberships
                .iter()
                .filter(|m| m.is_active)
                .copied()
                .collect())
        }

        async fn active_quizzes(&self, company_id: i64) -> Result<Vec<Quiz>, CoreError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .quizzes
                .iter()
                .filter(|q| q.company_id == company_id && q.is_active)
                .cloned()
                .collect())
        }

        async fn active_question_ids(&self, quiz_id: i64) -> Result<Vec<i64>, CoreError> {
            let state = self.state.lock().unwrap();
            if state.broken_quizzes.contains(&quiz_id) {
                return Err(CoreError::Unavailable("question lookup failed".into()));
            }
            Ok(state.questions.get(&quiz_id).cloned().unwrap_or_default())
        }

        async fn answer_events(
            &self,
            user_id: i64,
            quiz_id: i64,
        ) -> Result<Vec<AnswerEvent>, CoreError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .events
                .iter()
                .filter(|e| e.user_id == user_id && e.quiz_id == quiz_id)
                .cloned()
                .collect())
        }

        async fn create_notification(
            &self,
            user_id: i64,
            text: &str,
        ) -> Result<Notification, CoreError> {
            let mut state = self.state.lock().unwrap();
            let notification = Notification {
                id: state.notifications.len() as i64 + 1,
                user_id,
                text: text.to_string(),
                unread: true,
                created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            };
            state.notifications.push(notification.clone());
            Ok(notification)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()
    }

    fn quiz(id: i64, company_id: i64, frequency_in_days: i32) -> Quiz {
        Quiz {
            id,
            company_id,
            name: format!("Quiz {id}"),
            frequency_in_days,
            is_active: true,
        }
    }

    fn event(user_id: i64, quiz_id: i64, question_id: i64, at: DateTime<Utc>) -> AnswerEvent {
        AnswerEvent {
            id: question_id,
            user_id,
            quiz_id,
            question_id,
            answer_id: question_id * 100,
            attempt_cycle: 0,
            submitted_at: at,
        }
    }

    fn store_with_member(user_id: i64, company_id: i64) -> MemoryStore {
        let store = MemoryStore::default();
        {
            let mut state = store.state.lock().unwrap();
            state.memberships.push(Membership {
                user_id,
                company_id,
                is_active: true,
            });
        }
        store
    }

    #[test]
    fn untouched_quiz_reads_as_available_only() {
        assert_eq!(reminder_for(&[1, 2], &[], 2, now()), Some(Reminder::Available));
    }

    #[test]
    fn open_attempt_reads_as_incomplete() {
        let events = vec![event(1, 7, 1, now())];
        assert_eq!(
            reminder_for(&[1, 2], &events, 2, now()),
            Some(Reminder::Incomplete)
        );
    }

    #[test]
    fn completed_attempt_is_quiet_until_cadence() {
        let finished = now() - Duration::days(1);
        let events = vec![event(1, 7, 1, finished), event(1, 7, 2, finished)];
        assert_eq!(reminder_for(&[1, 2], &events, 2, now()), None);
    }

    #[test]
    fn completed_attempt_becomes_due_after_cadence() {
        let finished = now() - Duration::days(3);
        let events = vec![event(1, 7, 1, finished), event(1, 7, 2, finished)];
        assert_eq!(
            reminder_for(&[1, 2], &events, 2, now()),
            Some(Reminder::RetakeDue)
        );
    }

    #[tokio::test]
    async fn fresh_member_gets_exactly_one_available_reminder() {
        let store = store_with_member(1, 50);
        {
            let mut state = store.state.lock().unwrap();
            state.quizzes.push(quiz(7, 50, 2));
            state.questions.insert(7, vec![1, 2]);
        }

        let report = run_sweep(&store, now(), &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(report.available, 1);
        assert_eq!(report.retake_due, 0);
        let state = store.state.lock().unwrap();
        assert_eq!(state.notifications.len(), 1);
        assert!(state.notifications[0].text.contains("is available"));
    }

    #[tokio::test]
    async fn overdue_member_gets_exactly_one_retake_reminder() {
        let store = store_with_member(1, 50);
        let finished = now() - Duration::days(3);
        {
            let mut state = store.state.lock().unwrap();
            state.quizzes.push(quiz(7, 50, 2));
            state.questions.insert(7, vec![1, 2]);
            state.events.push(event(1, 7, 1, finished));
            state.events.push(event(1, 7, 2, finished));
        }

        let report = run_sweep(&store, now(), &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(report.retake_due, 1);
        assert_eq!(report.available, 0);
        assert_eq!(report.incomplete, 0);
        let state = store.state.lock().unwrap();
        assert_eq!(state.notifications.len(), 1);
        assert!(state.notifications[0].text.contains("has already passed"));
    }

    #[tokio::test]
    async fn inactive_memberships_are_skipped() {
        let store = MemoryStore::default();
        {
            let mut state = store.state.lock().unwrap();
            state.memberships.push(Membership {
                user_id: 1,
                company_id: 50,
                is_active: false,
            });
            state.quizzes.push(quiz(7, 50, 2));
            state.questions.insert(7, vec![1, 2]);
        }

        let report = run_sweep(&store, now(), &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(report.memberships, 0);
        assert!(store.state.lock().unwrap().notifications.is_empty());
    }

    #[tokio::test]
    async fn one_broken_pair_does_not_abort_the_batch() {
        let store = store_with_member(1, 50);
        {
            let mut state = store.state.lock().unwrap();
            state.quizzes.push(quiz(7, 50, 2));
            state.quizzes.push(quiz(8, 50, 2));
            state.questions.insert(7, vec![1, 2]);
            state.questions.insert(8, vec![3, 4]);
            state.broken_quizzes.push(7);
        }

        let report = run_sweep(&store, now(), &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.available, 1);
        assert_eq!(store.state.lock().unwrap().notifications.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_between_memberships() {
        let store = MemoryStore::default();
        {
            let mut state = store.state.lock().unwrap();
            for user_id in 1..=3 {
                state.memberships.push(Membership {
                    user_id,
                    company_id: 50,
                    is_active: true,
                });
            }
            state.quizzes.push(quiz(7, 50, 2));
            state.questions.insert(7, vec![1, 2]);
        }

        let report = run_sweep(&store, now(), &AtomicBool::new(true))
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.pairs, 0);
        assert!(store.state.lock().unwrap().notifications.is_empty());
    }
}
