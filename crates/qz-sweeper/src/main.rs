use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;
use qz_common::db::{create_pool_from_url_checked, try_acquire_run_lock, PgPool, PgSweepStore};
use qz_common::logging;
use qz_common::quiz::sweep::run_sweep;
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

// One lock key shared by every sweeper instance pointed at the same
// database; a second instance skips its pass instead of double-emitting.
const SWEEP_RUN_LOCK_KEY: i64 = 7_413_002;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "qz-sweeper",
    about = "Periodic reminder sweep over quiz memberships"
)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Hours between sweep passes
    #[arg(long, env = "QZ_SWEEP_INTERVAL_HOURS", default_value_t = 24)]
    interval_hours: u64,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

fn sweep_interval(cli: &Cli) -> Duration {
    Duration::from_secs(cli.interval_hours.max(1) * 3600)
}

async fn sweep_once(pool: &PgPool, cancel: &AtomicBool) {
    match try_acquire_run_lock(pool, SWEEP_RUN_LOCK_KEY).await {
        Ok(Some(lock)) => {
            let store = PgSweepStore::new(pool);
            match run_sweep(&store, Utc::now(), cancel).await {
                Ok(report) => info!(
                    memberships = report.memberships,
                    pairs = report.pairs,
                    available = report.available,
                    incomplete = report.incomplete,
                    retake_due = report.retake_due,
                    failures = report.failures,
                    cancelled = report.cancelled,
                    "sweep finished"
                ),
                Err(err) => error!(error = %err, "sweep aborted"),
            }
            drop(lock);
        }
        Ok(None) => warn!("another sweep holds the run lock; skipping this pass"),
        Err(err) => error!(error = %err, "failed to acquire the run lock"),
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    logging::init(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();
    let interval = sweep_interval(&cli);

    let pool = match create_pool_from_url_checked(&cli.database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            error!(error = %err, "failed to connect to the database");
            std::process::exit(1);
        }
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let shutdown = Arc::new(Notify::new());

    {
        let cancel = cancel.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown requested; finishing the current membership");
            cancel.store(true, Ordering::Relaxed);
            shutdown.notify_one();
        });
    }

    info!(
        interval_hours = cli.interval_hours,
        once = cli.once,
        "qz-sweeper started"
    );

    loop {
        sweep_once(&pool, &cancel).await;

        if cli.once || cancel.load(Ordering::Relaxed) {
            break;
        }

        tokio::select! {
            _ = sleep(interval) => {}
            _ = shutdown.notified() => break,
        }
    }

    info!("qz-sweeper stopped");
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_a_daily_cadence() {
        let cli = Cli::try_parse_from(["qz-sweeper", "--database-url", "postgres://x"]).unwrap();

        assert_eq!(cli.interval_hours, 24);
        assert!(!cli.once);
        assert_eq!(sweep_interval(&cli), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn once_flag_and_interval_override() {
        let cli = Cli::try_parse_from([
            "qz-sweeper",
            "--database-url",
            "postgres://x",
            "--interval-hours",
            "6",
            "--once",
        ])
        .unwrap();

        assert!(cli.once);
        assert_eq!(sweep_interval(&cli), Duration::from_secs(6 * 3600));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let cli = Cli::try_parse_from([
            "qz-sweeper",
            "--database-url",
            "postgres://x",
            "--interval-hours",
            "0",
        ])
        .unwrap();

        assert_eq!(sweep_interval(&cli), Duration::from_secs(3600));
    }
}
