//! Histogram summaries for multi-valued metrics.

use std::sync::OnceLock;

/// Bucketed summary of a set of values.
///
/// Bucket `i` counts the values in `(bucket_limits[i - 1], bucket_limits[i]]`.
/// Only the span between the first and last non-empty bucket is kept.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub num: u64,
    pub sum: f64,
    pub sum_squares: f64,
    pub bucket_limits: Vec<f64>,
    pub bucket_counts: Vec<u64>,
}

/// TensorBoard's default edges: `±1e-12 * 1.1^k` below `1e20`, zero, and a
/// final catch-all edge.
fn default_bucket_limits() -> &'static [f64] {
    static LIMITS: OnceLock<Vec<f64>> = OnceLock::new();
    LIMITS.get_or_init(|| {
        let mut positive = Vec::new();
        let mut v = 1e-12;
        while v < 1e20 {
            positive.push(v);
            v *= 1.1;
        }
        let mut limits: Vec<f64> = positive.iter().rev().map(|v| -v).collect();
        limits.push(0.0);
        limits.extend(positive);
        limits.push(f64::MAX);
        limits
    })
}

impl Histogram {
    /// A histogram with no values and no buckets.
    pub fn empty() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            num: 0,
            sum: 0.0,
            sum_squares: 0.0,
            bucket_limits: Vec::new(),
            bucket_counts: Vec::new(),
        }
    }

    /// Summarize values. Non-finite values are ignored.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let limits = default_bucket_limits();
        let mut counts = vec![0u64; limits.len()];
        let mut hist = Self::empty();
        hist.min = f64::INFINITY;
        hist.max = f64::NEG_INFINITY;

        for value in values.into_iter().filter(|v| v.is_finite()) {
            hist.min = hist.min.min(value);
            hist.max = hist.max.max(value);
            hist.num += 1;
            hist.sum += value;
            hist.sum_squares += value * value;
            counts[limits.partition_point(|&limit| limit < value)] += 1;
        }

        if hist.num == 0 {
            return Self::empty();
        }

        let first = counts.iter().position(|&c| c > 0).unwrap_or(0);
        let last = counts.iter().rposition(|&c| c > 0).unwrap_or(first);
        hist.bucket_limits = limits[first..=last].to_vec();
        hist.bucket_counts = counts[first..=last].to_vec();
        hist
    }

    /// True when no values were recorded.
    pub fn is_empty(&self) -> bool {
        self.num == 0
    }

    /// Arithmetic mean, if any values were recorded.
    pub fn mean(&self) -> Option<f64> {
        (self.num > 0).then(|| self.sum / self.num as f64)
    }
}
