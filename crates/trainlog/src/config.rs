//! Logging configuration.
//!
//! `LoggingConfig::template()` is the baseline sink layout. Every setup
//! attempt starts from a fresh copy of it and only then applies the
//! caller's paths and thresholds.

use crate::{Error, Result};
use std::path::PathBuf;

pub use tracing::level_filters::LevelFilter;

/// Where console records are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

/// Human-readable console sink.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsoleSinkConfig {
    /// Minimum severity written to the console
    pub level: LevelFilter,
    /// Output stream
    pub target: ConsoleTarget,
    /// Render markup tags as terminal styles
    pub markup: bool,
    /// Prefix lines with the local time
    pub show_time: bool,
    /// Prefix lines with the severity
    pub show_level: bool,
    /// Prefix lines with the event target (module path)
    pub show_target: bool,
}

/// Plain-text file sink.
#[derive(Clone, Debug, PartialEq)]
pub struct FileSinkConfig {
    /// Minimum severity written to the file
    pub level: LevelFilter,
    /// Log file path
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    pub append: bool,
    /// Remove markup tags before writing
    pub strip_markup: bool,
}

/// Description of both sinks plus the root threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    /// Upper verbosity bound shared by every sink
    pub root_level: LevelFilter,
    pub console: ConsoleSinkConfig,
    pub file: FileSinkConfig,
}

/// File name of the log inside a run directory.
pub const LOG_FILE_NAME: &str = "result.log";

impl LoggingConfig {
    /// The baseline configuration.
    pub fn template() -> Self {
        Self {
            root_level: LevelFilter::DEBUG,
            console: ConsoleSinkConfig {
                level: LevelFilter::INFO,
                target: ConsoleTarget::Stdout,
                markup: true,
                show_time: false,
                show_level: false,
                show_target: false,
            },
            file: FileSinkConfig {
                level: LevelFilter::INFO,
                path: PathBuf::from(LOG_FILE_NAME),
                append: true,
                strip_markup: true,
            },
        }
    }

    /// Effective console threshold (the stricter of root and sink level).
    pub fn console_filter(&self) -> LevelFilter {
        self.root_level.min(self.console.level)
    }

    /// Effective file threshold (the stricter of root and sink level).
    pub fn file_filter(&self) -> LevelFilter {
        self.root_level.min(self.file.level)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::template()
    }
}

/// Caller inputs for `LoggingContext::setup`.
#[derive(Clone, Debug)]
pub struct SetupOptions {
    /// Dataset name, used as a directory component
    pub dataset: String,
    /// Model name, used as a directory component
    pub model: String,
    /// Disable all logging output
    pub no_log: bool,
    /// Root of the run directories
    pub log_dir: PathBuf,
    /// Console sink threshold
    pub console_level: LevelFilter,
    /// File sink threshold
    pub file_level: LevelFilter,
    /// Replace the panic hook with one that logs through tracing
    pub install_panic_hook: bool,
}

impl SetupOptions {
    /// Options with default paths and thresholds for a dataset/model pair.
    pub fn new(dataset: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            model: model.into(),
            no_log: false,
            log_dir: PathBuf::from("./log"),
            console_level: LevelFilter::INFO,
            file_level: LevelFilter::INFO,
            install_panic_hook: true,
        }
    }

    /// Suppress all logging output.
    pub fn no_log(mut self, enabled: bool) -> Self {
        self.no_log = enabled;
        self
    }

    /// Set the root log directory.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the console threshold.
    pub fn console_level(mut self, level: LevelFilter) -> Self {
        self.console_level = level;
        self
    }

    /// Set the file threshold.
    pub fn file_level(mut self, level: LevelFilter) -> Self {
        self.file_level = level;
        self
    }

    /// Enable/disable the panic hook.
    pub fn install_panic_hook(mut self, enabled: bool) -> Self {
        self.install_panic_hook = enabled;
        self
    }
}

/// Parses a severity name into a threshold.
///
/// `critical` and `fatal` map to `ERROR`, the most severe level tracing has.
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" | "critical" | "fatal" => Ok(LevelFilter::ERROR),
        "off" | "none" => Ok(LevelFilter::OFF),
        _ => Err(Error::InvalidLevel(level.to_string())),
    }
}
