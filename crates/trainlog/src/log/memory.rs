//! In-memory logging backend.

use super::{Histogram, MetricLogger};
use std::sync::Mutex;

/// A single recorded sample.
#[derive(Clone, Debug, PartialEq)]
pub enum Sample {
    Scalar {
        name: String,
        value: f64,
        step: u64,
    },
    Histogram {
        name: String,
        histogram: Histogram,
        step: u64,
    },
}

/// Logger that keeps every sample in memory, in arrival order.
#[derive(Default)]
pub struct MemoryLogger {
    samples: Mutex<Vec<Sample>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, sample: Sample) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.push(sample);
        }
    }

    /// Snapshot of all recorded samples.
    pub fn samples(&self) -> Vec<Sample> {
        self.samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }

    /// Recorded scalars as `(name, value, step)`.
    pub fn scalars(&self) -> Vec<(String, f64, u64)> {
        self.samples()
            .into_iter()
            .filter_map(|sample| match sample {
                Sample::Scalar { name, value, step } => Some((name, value, step)),
                Sample::Histogram { .. } => None,
            })
            .collect()
    }

    /// Recorded histograms as `(name, histogram, step)`.
    pub fn histograms(&self) -> Vec<(String, Histogram, u64)> {
        self.samples()
            .into_iter()
            .filter_map(|sample| match sample {
                Sample::Histogram {
                    name,
                    histogram,
                    step,
                } => Some((name, histogram, step)),
                Sample::Scalar { .. } => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all recorded samples.
    pub fn clear(&self) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.clear();
        }
    }
}

impl MetricLogger for MemoryLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        self.push(Sample::Scalar {
            name: name.to_string(),
            value,
            step,
        });
    }

    fn log_histogram(&self, name: &str, histogram: &Histogram, step: u64) {
        self.push(Sample::Histogram {
            name: name.to_string(),
            histogram: histogram.clone(),
            step,
        });
    }
}
