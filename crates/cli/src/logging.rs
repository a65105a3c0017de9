//! Tracing initialization.
//!
//! Log lines go to the configured log file through a non-blocking
//! appender, and to stderr for interactive runs. `RUST_LOG` overrides the
//! default `info` filter.

use std::ffi::OsString;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber.
///
/// The returned guard must stay alive for the program's lifetime or
/// buffered log lines are lost.
pub fn init(log_file: &Path) -> color_eyre::Result<WorkerGuard> {
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let file_name = log_file
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("streampilot.log"));

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(guard)
}
