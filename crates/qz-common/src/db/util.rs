#![allow(async_fn_in_trait)]

use deadpool_postgres::GenericClient;
use std::future::Future;
use std::{sync::OnceLock, time::Instant};
use tokio::time::{sleep, Duration};
use tracing::warn;

use crate::quiz::CoreError;

fn slow_query_threshold_ms() -> Option<u64> {
    static CACHE: OnceLock<Option<u64>> = OnceLock::new();

    *CACHE.get_or_init(|| {
        std::env::var("QZ_DB_LOG_MIN_DURATION_MS")
            .ok()
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(|v| v.max(0) as u64)
            .filter(|v| *v > 0)
    })
}

fn maybe_log_slow_query(label: &str, started_at: Instant) {
    if let Some(threshold_ms) = slow_query_threshold_ms() {
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        if elapsed_ms >= threshold_ms {
            warn!(query = label, elapsed_ms, "slow_query_detected");
        }
    }
}

/// Cached-statement query helpers that surface slow statements through
/// `QZ_DB_LOG_MIN_DURATION_MS`.
pub trait TimedClientExt: GenericClient {
    async fn timed_query_cached(
        &self,
        statement: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        label: &str,
    ) -> Result<Vec<tokio_postgres::Row>, tokio_postgres::Error> {
        let started = Instant::now();
        let prepared = self.prepare_cached(statement).await?;
        let result = self.query(&prepared, params).await;
        maybe_log_slow_query(label, started);
        result
    }

    async fn timed_query_opt_cached(
        &self,
        statement: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        label: &str,
    ) -> Result<Option<tokio_postgres::Row>, tokio_postgres::Error> {
        let started = Instant::now();
        let prepared = self.prepare_cached(statement).await?;
        let result = self.query_opt(&prepared, params).await;
        maybe_log_slow_query(label, started);
        result
    }

    async fn timed_query_one_cached(
        &self,
        statement: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        label: &str,
    ) -> Result<tokio_postgres::Row, tokio_postgres::Error> {
        let started = Instant::now();
        let prepared = self.prepare_cached(statement).await?;
        let result = self.query_one(&prepared, params).await;
        maybe_log_slow_query(label, started);
        result
    }

    async fn timed_execute_cached(
        &self,
        statement: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        label: &str,
    ) -> Result<u64, tokio_postgres::Error> {
        let started = Instant::now();
        let prepared = self.prepare_cached(statement).await?;
        let result = self.execute(&prepared, params).await;
        maybe_log_slow_query(label, started);
        result
    }
}

impl<T: GenericClient + ?Sized> TimedClientExt for T {}

/// Retry an idempotent read a bounded number of times with linear backoff.
///
/// Only `Unavailable` failures are retried; NotFound/Conflict carry meaning
/// and are returned immediately. Writes must not go through this helper:
/// retrying an append can duplicate rows.
pub async fn with_read_retries<T, F, Fut>(
    label: &str,
    attempts: u32,
    backoff: Duration,
    op: F,
) -> Result<T, CoreError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut last_message = String::new();
    for attempt in 1..=attempts.max(1) {
        match op().await {
            Ok(value) => return Ok(value),
            Err(CoreError::Unavailable(message)) => {
                warn!(query = label, attempt, error = %message, "read failed; retrying");
                last_message = message;
                if attempt < attempts {
                    sleep(backoff * attempt).await;
                }
            }
            Err(other) => return Err(other),
        }
    }

    Err(CoreError::Unavailable(last_message))
}
