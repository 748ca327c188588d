//! # trainlog
//!
//! Run logging and training metric forwarding.
//!
//! ## Overview
//!
//! trainlog provides:
//! - One-shot, fail-soft logging setup with a console sink and a plain-text
//!   file sink under `log_dir/dataset/model/<timestamp>/result.log`
//! - Markup stripping for non-interactive sinks
//! - An unhandled-error boundary for the host entry point
//! - `MetricLogger` backends and a forwarder that routes metrics by shape
//!
//! ## Features
//!
//! - `default` - Console, in-memory and no-op metric backends
//! - `tensorboard` - TensorBoard event file backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trainlog::prelude::*;
//!
//! let mut logging = LoggingContext::new();
//! let run_dir = logging.setup(&SetupOptions::new("cifar10", "resnet18"));
//!
//! let code = run_guarded(&logging, || {
//!     let sink = ConsoleLogger::new();
//!     let mut record = MetricRecord::new();
//!     record.insert("loss".into(), MetricValue::Float(0.25));
//!     forward(&sink, 1, &record);
//!     Ok(())
//! });
//! ```

pub mod boundary;
pub mod config;
pub mod format;
pub mod log;
pub mod markup;
pub mod metrics;
pub mod session;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::boundary::{report_unhandled, run_guarded};
    pub use crate::config::{parse_level, ConsoleTarget, LevelFilter, LoggingConfig, SetupOptions};
    pub use crate::metrics::{forward, MetricRecord, MetricValue};
    pub use crate::session::LoggingContext;

    #[cfg(feature = "tensorboard")]
    pub use crate::log::TensorBoardLogger;
    pub use crate::log::{
        CompositeLogger, ConsoleLogger, Histogram, MemoryLogger, MetricLogger, NoOpLogger,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use std::path::PathBuf;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Invalid {kind} name {value:?}: must be a single path component")]
    InvalidComponent { kind: &'static str, value: String },

    #[error("Failed to create log directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log file {path}")]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A process-wide logging subscriber is already active")]
    AlreadyActive,

    #[error("Failed to activate logging configuration")]
    Activate(#[from] tracing_subscriber::util::TryInitError),

    #[error("Interrupted")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, Error>;
