//! Logging and observability infrastructure for svcpack
//!
//! Structured `tracing` output for packaging runs plus a small console
//! [`Logger`] used by the CLI for `--verbose` progress lines.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{Level, debug, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects
/// `svcpack=debug,info` and the default is `svcpack=info,warn`.
/// `json` switches the fmt layer to newline-delimited JSON.
///
/// Events go to stderr so stdout stays reserved for command output.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("svcpack=debug,info")
            } else {
                EnvFilter::try_new("svcpack=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?;
    } else if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one packaging run.
pub fn packaging_span(service_root: &str, artifact: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "packaging",
        service_root = %service_root,
        artifact = %artifact,
    )
}

/// Log the pattern sets a run starts from.
pub fn log_patterns(stage: &str, exclude: &[String], include: &[String]) {
    debug!(
        stage = %stage,
        exclude = ?exclude,
        include = ?include,
        "Packaging patterns"
    );
}

/// Log completion of a packaging run.
pub fn log_packaging_complete(artifact: &str, files: usize, duration_ms: u128) {
    info!(
        artifact = %artifact,
        files = files,
        duration_ms = %duration_ms,
        "Packaging completed"
    );
}

/// Console logger for verbose CLI output with per-operation timings.
pub struct Logger {
    verbose: bool,
    start_time: Instant,
    operation_starts: HashMap<String, Instant>,
    operation_timings: HashMap<String, Duration>,
}

/// Timing information for a finished operation
#[derive(Debug, Clone)]
pub struct TimingInfo {
    pub operation: String,
    pub duration: Duration,
}

impl Logger {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            start_time: Instant::now(),
            operation_starts: HashMap::new(),
            operation_timings: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Print `message` to stderr with an elapsed-time prefix when verbose.
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            let elapsed = self.start_time.elapsed();
            debug!(
                duration_ms = %elapsed.as_millis(),
                message = %message,
                "Verbose log"
            );
            eprintln!("[{:>8.3}s] {}", elapsed.as_secs_f64(), message);
        }
    }

    pub fn verbose_fmt(&self, args: std::fmt::Arguments) {
        if self.verbose {
            self.verbose(&format!("{args}"));
        }
    }

    /// Start timing an operation
    pub fn start_timing(&mut self, operation: &str) {
        self.operation_starts
            .insert(operation.to_string(), Instant::now());
        self.verbose(&format!("Starting: {operation}"));
    }

    /// End timing an operation and record the duration.
    ///
    /// An operation that was never started is timed from logger creation.
    pub fn end_timing(&mut self, operation: &str) -> Duration {
        let started = self
            .operation_starts
            .remove(operation)
            .unwrap_or(self.start_time);
        let duration = started.elapsed();
        self.operation_timings
            .insert(operation.to_string(), duration);

        self.verbose(&format!(
            "Completed: {} ({:.3}s)",
            operation,
            duration.as_secs_f64()
        ));

        duration
    }

    /// Timings for all finished operations, sorted by operation name.
    #[must_use]
    pub fn get_timing_summary(&self) -> Vec<TimingInfo> {
        let mut summary: Vec<TimingInfo> = self
            .operation_timings
            .iter()
            .map(|(op, duration)| TimingInfo {
                operation: op.clone(),
                duration: *duration,
            })
            .collect();
        summary.sort_by(|a, b| a.operation.cmp(&b.operation));
        summary
    }

    #[must_use]
    pub fn total_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_logger_creation() {
        let logger = Logger::new(true);
        assert!(logger.is_verbose());
        assert!(logger.operation_timings.is_empty());
    }

    #[test]
    fn test_timing_operations() {
        let mut logger = Logger::new(false);

        logger.start_timing("resolve");
        thread::sleep(Duration::from_millis(10));
        let duration = logger.end_timing("resolve");

        assert!(duration >= Duration::from_millis(10));
        assert!(logger.operation_timings.contains_key("resolve"));
        assert!(logger.operation_starts.is_empty());
    }

    #[test]
    fn test_timing_summary_sorted() {
        let mut logger = Logger::new(false);

        logger.start_timing("write");
        logger.end_timing("write");
        logger.start_timing("prune");
        thread::sleep(Duration::from_millis(5));
        logger.end_timing("prune");

        let summary = logger.get_timing_summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].operation, "prune");
        assert!(summary[0].duration >= Duration::from_millis(5));
    }

    #[test]
    fn test_verbose_mode_disabled() {
        let logger = Logger::new(false);
        logger.verbose("test message");
        logger.verbose_fmt(format_args!("formatted {}", "message"));
    }

    #[test]
    fn test_tracing_initialization() {
        // Fails if another test already installed a subscriber; either way it must not panic
        let result = init_tracing(false, false);
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_packaging_span_creation() {
        let span = packaging_span("/srv/app", "service.zip");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "packaging");
        }
    }

    #[test]
    fn test_structured_logging_functions() {
        log_patterns("merged", &["node_modules/**".to_string()], &["**".to_string()]);
        log_packaging_complete("service.zip", 3, 12);
    }
}
