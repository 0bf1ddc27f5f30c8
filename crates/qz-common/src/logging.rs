use std::panic;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

// Keeps the non-blocking writer alive for the lifetime of the process.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Where log lines go: stdout by default, a daily-rotated file when
/// `QZ_LOG_DIR` points at a writable directory.
fn pick_writer(app_name: &'static str) -> BoxMakeWriter {
    let Some(dir) = std::env::var_os("QZ_LOG_DIR").map(PathBuf::from) else {
        return BoxMakeWriter::new(std::io::stdout);
    };

    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!("QZ_LOG_DIR is not usable ({err}); logging to stdout");
        return BoxMakeWriter::new(std::io::stdout);
    }

    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    BoxMakeWriter::new(writer)
}

fn route_panics_through_tracing(app_name: &'static str) {
    static HOOKED: OnceLock<()> = OnceLock::new();

    HOOKED.get_or_init(|| {
        let previous = panic::take_hook();
        let chain_default = env_flag("QZ_LOG_INCLUDE_BACKTRACE");

        panic::set_hook(Box::new(move |info| {
            let payload = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned());

            let thread = std::thread::current();
            tracing::error!(
                application = app_name,
                thread_name = thread.name().unwrap_or("unknown"),
                location = info
                    .location()
                    .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
                    .as_deref()
                    .unwrap_or("unknown"),
                panic_message = payload.as_deref().unwrap_or("panic payload not string"),
                "panic captured"
            );

            if chain_default {
                previous(info);
            }
        }));
    });
}

/// Set up logging for one binary: an `EnvFilter` subscriber (`RUST_LOG`,
/// defaulting to `info`), optional daily file rotation via `QZ_LOG_DIR`, and a
/// panic hook that records panics as structured error events. Idempotent.
pub fn init(app_name: &'static str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(pick_writer(app_name))
        .try_init();

    route_panics_through_tracing(app_name);
}
