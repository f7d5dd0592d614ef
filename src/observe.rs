//! Observability port
//!
//! Components report what they do through an injected [`Observer`] instead of
//! touching process-wide logging state directly. The binary wires in
//! [`LogObserver`], tests use [`RecordingObserver`] or [`SilentObserver`].

use std::sync::{Arc, Mutex};

/// Severity of a recorded line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Sink for informational and error messages
pub trait Observer: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Shared handle passed to every component
pub type SharedObserver = Arc<dyn Observer>;

/// Forwards messages to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn error(&self, message: &str) {
        log::error!("{}", message);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl Observer for SilentObserver {
    fn info(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Keeps every message in memory so tests can assert on them
#[derive(Debug, Default)]
pub struct RecordingObserver {
    lines: Mutex<Vec<(Level, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded lines in order
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Returns only the error messages
    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(level, _)| *level == Level::Error)
            .map(|(_, message)| message)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}

impl Observer for RecordingObserver {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

/// Installs the process logger: timestamped lines appended to `log_file`,
/// optionally mirrored to stderr.
pub fn setup_logging(log_file: &std::path::Path, verbose: bool) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("hyper_util", log::LevelFilter::Warn)
        .chain(fern::log_file(log_file)?);

    if verbose {
        dispatch = dispatch.chain(std::io::stderr());
    }

    dispatch.apply()?;
    Ok(())
}
