#![allow(async_fn_in_trait)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use crate::quiz::{AnswerEvent, CoreError, NewQuizResult, QuizResult};

/// Storage operations the scoring engine needs, one repository per concern.
/// The Postgres implementation runs every call inside a single transaction
/// holding a per-user advisory lock; tests provide an in-memory store.
pub trait ScoringStore {
    async fn answer_events(&mut self, user_id: i64) -> Result<Vec<AnswerEvent>, CoreError>;
    /// Correctness flags for the given answer options, keyed by answer id.
    async fn answer_correctness(
        &mut self,
        answer_ids: &[i64],
    ) -> Result<HashMap<i64, bool>, CoreError>;
    async fn append_results(
        &mut self,
        batch: &[NewQuizResult],
        computed_at: DateTime<Utc>,
    ) -> Result<Vec<QuizResult>, CoreError>;
    /// Count of correct results over ALL persisted rows for the user.
    async fn count_correct(&mut self, user_id: i64) -> Result<i64, CoreError>;
    async fn set_aggregate_score(&mut self, user_id: i64, score: i64) -> Result<(), CoreError>;
}

/// Grade every event against the catalog's current correctness flags.
///
/// Emits exactly one pending result per event. An answer option missing from
/// the lookup aborts the whole batch; nothing is persisted by the caller in
/// that case.
pub fn grade(
    events: &[AnswerEvent],
    correctness: &HashMap<i64, bool>,
) -> Result<Vec<NewQuizResult>, CoreError> {
    events
        .iter()
        .map(|event| {
            let is_correct = correctness.get(&event.answer_id).copied().ok_or_else(|| {
                CoreError::NotFound(format!(
                    "answer option {} referenced by event {} is missing from the catalog",
                    event.answer_id, event.id
                ))
            })?;

            Ok(NewQuizResult {
                user_id: event.user_id,
                quiz_id: event.quiz_id,
                question_id: event.question_id,
                answer_event_id: event.id,
                is_correct,
            })
        })
        .collect()
}

fn log_duplicate_events(user_id: i64, events: &[AnswerEvent]) {
    let mut per_cycle: HashMap<(i64, i32), usize> = HashMap::new();
    for event in events {
        *per_cycle
            .entry((event.question_id, event.attempt_cycle))
            .or_default() += 1;
    }

    for ((question_id, attempt_cycle), count) in per_cycle {
        if count > 1 {
            warn!(
                user_id,
                question_id,
                attempt_cycle,
                count,
                "duplicate answer events for one question; results will be inflated"
            );
        }
    }
}

/// Recompute the user's quiz results from the full answer ledger.
///
/// Every event produces one result row; correctness is resolved from the
/// catalog at call time, so a later edit to an answer option applies
/// retroactively. After persisting the batch, the aggregate score is
/// overwritten with the correct-count over all persisted rows. Re-running
/// without new events appends another identical batch and doubles the
/// aggregate; callers own that trade-off.
#[instrument(skip(store))]
pub async fn compute_results<S: ScoringStore>(
    store: &mut S,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<QuizResult>, CoreError> {
    let events = store.answer_events(user_id).await?;
    log_duplicate_events(user_id, &events);

    let mut answer_ids: Vec<i64> = events.iter().map(|event| event.answer_id).collect();
    answer_ids.sort_unstable();
    answer_ids.dedup();

    let correctness = store.answer_correctness(&answer_ids).await?;
    let batch = grade(&events, &correctness)?;

    let created = store.append_results(&batch, now).await?;

    let score = store.count_correct(user_id).await?;
    store.set_aggregate_score(user_id, score).await?;

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Default)]
    struct MemoryStore {
        events: Vec<AnswerEvent>,
        correctness: HashMap<i64, bool>,
        results: Vec<QuizResult>,
        aggregate: HashMap<i64, i64>,
        next_result_id: i64,
    }

    impl ScoringStore for MemoryStore {
        async fn answer_events(&mut self, user_id: i64) -> Result<Vec<AnswerEvent>, CoreError> {
            Ok(self
                .events
                .iter()
                .filter(|event| event.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn answer_correctness(
            &mut self,
            answer_ids: &[i64],
        ) -> Result<HashMap<i64, bool>, CoreError> {
            Ok(answer_ids
                .iter()
                .filter_map(|id| self.correctness.get(id).map(|flag| (*id, *flag)))
                .collect())
        }

        async fn append_results(
            &mut self,
            batch: &[NewQuizResult],
            computed_at: DateTime<Utc>,
        ) -> Result<Vec<QuizResult>, CoreError> {
            let mut created = Vec::with_capacity(batch.len());
            for pending in batch {
                self.next_result_id += 1;
                let row = QuizResult {
                    id: self.next_result_id,
                    user_id: pending.user_id,
                    quiz_id: pending.quiz_id,
                    question_id: pending.question_id,
                    answer_event_id: pending.answer_event_id,
                    is_correct: pending.is_correct,
                    computed_at,
                };
                self.results.push(row.clone());
                created.push(row);
            }
            Ok(created)
        }

        async fn count_correct(&mut self, user_id: i64) -> Result<i64, CoreError> {
            Ok(self
                .results
                .iter()
                .filter(|row| row.user_id == user_id && row.is_correct)
                .count() as i64)
        }

        async fn set_aggregate_score(
            &mut self,
            user_id: i64,
            score: i64,
        ) -> Result<(), CoreError> {
            self.aggregate.insert(user_id, score);
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn event(id: i64, question_id: i64, answer_id: i64) -> AnswerEvent {
        AnswerEvent {
            id,
            user_id: 1,
            quiz_id: 7,
            question_id,
            answer_id,
            attempt_cycle: 0,
            submitted_at: now(),
        }
    }

    fn store_with_two_answers() -> MemoryStore {
        let mut store = MemoryStore::default();
        store.events = vec![event(1, 10, 100), event(2, 11, 111)];
        store.correctness.insert(100, true);
        store.correctness.insert(111, false);
        store
    }

    #[tokio::test]
    async fn grades_one_result_per_event_and_updates_aggregate() {
        let mut store = store_with_two_answers();

        let created = compute_results(&mut store, 1, now()).await.unwrap();

        assert_eq!(created.len(), 2);
        assert!(created[0].is_correct);
        assert!(!created[1].is_correct);
        assert_eq!(created[0].answer_event_id, 1);
        assert_eq!(store.aggregate[&1], 1);
    }

    #[tokio::test]
    async fn rerun_without_new_events_doubles_rows_and_score() {
        let mut store = store_with_two_answers();

        compute_results(&mut store, 1, now()).await.unwrap();
        let second = compute_results(&mut store, 1, now()).await.unwrap();

        // The second run re-emits the whole batch instead of merging; the
        // aggregate counts both copies.
        assert_eq!(second.len(), 2);
        assert_eq!(store.results.len(), 4);
        assert_eq!(store.aggregate[&1], 2);
    }

    #[tokio::test]
    async fn correctness_edits_apply_retroactively() {
        let mut store = store_with_two_answers();
        compute_results(&mut store, 1, now()).await.unwrap();
        assert_eq!(store.aggregate[&1], 1);

        // Flip the previously-wrong option; the next run grades the same
        // events against the edited catalog.
        store.correctness.insert(111, true);
        let rerun = compute_results(&mut store, 1, now()).await.unwrap();

        assert!(rerun.iter().all(|row| row.is_correct));
        assert_eq!(store.aggregate[&1], 3);
    }

    #[tokio::test]
    async fn duplicate_events_produce_duplicate_results() {
        let mut store = store_with_two_answers();
        // Reachable anomaly: the same question answered twice in one cycle.
        store.events.push(event(3, 10, 100));

        let created = compute_results(&mut store, 1, now()).await.unwrap();

        assert_eq!(created.len(), 3);
        assert_eq!(store.aggregate[&1], 2);
    }

    #[tokio::test]
    async fn missing_answer_option_aborts_without_writes() {
        let mut store = store_with_two_answers();
        store.correctness.remove(&111);

        let err = compute_results(&mut store, 1, now()).await.unwrap_err();

        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(store.results.is_empty());
        assert!(store.aggregate.is_empty());
    }

    #[tokio::test]
    async fn no_events_still_refreshes_aggregate() {
        let mut store = MemoryStore::default();

        let created = compute_results(&mut store, 1, now()).await.unwrap();

        assert!(created.is_empty());
        assert_eq!(store.aggregate[&1], 0);
    }
}
