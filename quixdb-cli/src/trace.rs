//! Logging setup: a rolling daily file appender for everything at or above
//! the configured level, plus a colored stderr channel for warnings.
//!
//! Grounded on the teacher's `kv-cli::trace::init_logging`, which pairs
//! `fern` for formatting/dispatch with `tracing-appender` for the
//! non-blocking rolling file writer. Made synchronous here since the CLI
//! has no async runtime of its own.

use std::io::BufWriter;
use std::str::FromStr;

use anyhow::Result;
use log::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

const MAX_LOG_FILES: usize = 10;

/// Initializes global logging. Returns the guards that must be kept alive
/// for the lifetime of the process to flush the non-blocking file writer.
pub fn init_logging(dir: &str, level: &str) -> Result<Vec<Box<dyn Drop + Send + Sync + 'static>>> {
    let mut guards: Vec<Box<dyn Drop + Send + Sync + 'static>> = Vec::new();
    let mut logger = fern::Dispatch::new();

    let rolling = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("quixdb-cli.log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)?;
    let (non_blocking, flush_guard) = tracing_appender::non_blocking(rolling);
    let buffered_non_blocking = BufWriter::with_capacity(64 * 1024 * 1024, non_blocking);
    guards.push(Box::new(flush_guard));

    let dispatch_file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] - {} - [{}] {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::from_str(level).unwrap_or(LevelFilter::Info))
        .chain(Box::new(buffered_non_blocking) as Box<dyn std::io::Write + Send>);
    logger = logger.chain(dispatch_file);

    let dispatch_stderr = fern::Dispatch::new()
        .level(LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "\x1B[{}m[{}] {}\x1B[0m",
                fern::colors::Color::Yellow.to_fg_str(),
                record.level(),
                message
            ))
        })
        .chain(std::io::stderr());
    logger = logger.chain(dispatch_stderr);

    if logger.apply().is_err() {
        // Already initialized in this process (e.g. a test harness that
        // constructs the CLI more than once); not an error.
        return Ok(Vec::new());
    }

    Ok(guards)
}
