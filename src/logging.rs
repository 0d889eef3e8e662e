use once_cell::sync::Lazy;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Keeps the non-blocking file writer flushing for the life of the process.
static FILE_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Initialise logging. Without `debug` the level is forced to `info`
/// regardless of `RUST_LOG`; with it, `RUST_LOG` may override the `debug`
/// default. When `log_file` is given, output is appended to that file
/// instead of stderr. Calling this more than once is harmless.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let file_writer = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                if let Ok(mut slot) = FILE_GUARD.lock() {
                    *slot = Some(guard);
                }
                Some(writer)
            }
            Err(err) => {
                eprintln!("failed to open log file {}: {err}", path.display());
                None
            }
        }
    });

    let (file_layer, stderr_layer) = match file_writer {
        Some(writer) => (Some(fmt::layer().with_writer(writer).with_ansi(false)), None),
        None => (None, Some(fmt::layer().with_writer(std::io::stderr))),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();
}
