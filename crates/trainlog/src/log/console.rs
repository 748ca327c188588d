//! Console logging backend.

use super::{Histogram, MetricLogger};
use std::collections::HashMap;

/// Logger that prints metrics through tracing.
pub struct ConsoleLogger;

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }
}

/// One-line summary of a histogram.
pub(crate) fn describe(histogram: &Histogram) -> String {
    match histogram.mean() {
        Some(mean) => format!(
            "n={} min={:.4} max={:.4} mean={:.4}",
            histogram.num, histogram.min, histogram.max, mean
        ),
        None => "n=0".to_string(),
    }
}

impl MetricLogger for ConsoleLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        tracing::info!("Step {}: {} = {:.4}", step, name, value);
    }

    fn log_histogram(&self, name: &str, histogram: &Histogram, step: u64) {
        tracing::info!("Step {}: {} ~ {}", step, name, describe(histogram));
    }

    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        // Group output to avoid spamming lines
        let mut output = format!("Step {}: ", step);
        let mut sorted: Vec<_> = metrics.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        for (i, (key, value)) in sorted.iter().enumerate() {
            if i > 0 {
                output.push_str(", ");
            }
            output.push_str(&format!("{}={:.4}", key, value));
        }

        tracing::info!("{}", output);
    }
}
