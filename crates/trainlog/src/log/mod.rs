//! Metric logging backends.
//!
//! Provides:
//! - `MetricLogger` trait for composable backends
//! - `ConsoleLogger` for lightweight logging through tracing
//! - `MemoryLogger` for inspecting what was sent
//! - `TensorBoardLogger` for visualization (optional)
//! - `CompositeLogger` for multi-backend logging
//! - `Histogram` summaries for multi-valued metrics

mod console;
mod histogram;
mod logger;
mod memory;
#[cfg(feature = "tensorboard")]
mod tensorboard;

pub use console::ConsoleLogger;
pub use histogram::Histogram;
pub use logger::{CompositeLogger, MetricLogger, NoOpLogger};
pub use memory::{MemoryLogger, Sample};
#[cfg(feature = "tensorboard")]
pub use tensorboard::TensorBoardLogger;
