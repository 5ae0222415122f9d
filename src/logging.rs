use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Initializes the logging system with both console and file output.
pub fn init_logging() {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    // One run per invocation, so a single never-rotated file is enough
    let file_appender = tracing_appender::rolling::never("logs", "banks_etl.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_writer);

    // Console output goes to stderr so stdout stays reserved for table output
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    // Respect RUST_LOG if set; otherwise info for our crate
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("banks_etl=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // We need to keep the guard in scope to ensure logs are flushed on exit
    std::mem::forget(_guard);
}

/// Append-only record of pipeline stage transitions.
///
/// Each call to [`ProgressLogger::log_progress`] appends `<timestamp> : <message>`
/// to the progress file, prints the message, and forwards it to `tracing`.
#[derive(Debug, Clone)]
pub struct ProgressLogger {
    path: PathBuf,
    echo: bool,
}

impl ProgressLogger {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            echo: true,
        }
    }

    /// Same as `new` but without printing to stdout.
    pub fn quiet<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            echo: false,
        }
    }

    pub fn log_progress(&self, message: &str) -> Result<()> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{} : {}", timestamp, message)?;

        tracing::info!(stage = %message, "progress");
        if self.echo {
            println!("{}", message);
        }
        Ok(())
    }
}
