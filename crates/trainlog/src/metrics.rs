//! Metric forwarding.
//!
//! A training loop hands over a map of named values once per step;
//! [`forward`] routes each value to a [`MetricLogger`] by shape.

use crate::log::{Histogram, MetricLogger};
use ndarray::{ArrayD, IxDyn};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single metric value.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    /// Numeric tensor of any rank, including 0-D
    Tensor(ArrayD<f32>),
    Int(i64),
    Float(f64),
    /// Forwarded as 0 or 1
    Bool(bool),
    /// Non-numeric; never forwarded
    Text(String),
}

/// Metrics reported for one step, keyed by name.
pub type MetricRecord = BTreeMap<String, MetricValue>;

impl MetricValue {
    /// Converts a JSON value.
    ///
    /// Rectangular nested arrays of numbers become tensors with the
    /// inferred shape. Null, objects and ragged or mixed arrays become
    /// `Text` holding their JSON rendering.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) => tensor_from_json(value)
                .map(Self::Tensor)
                .unwrap_or_else(|| Self::Text(value.to_string())),
            Value::Null | Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

struct TensorBuilder {
    shape: Vec<usize>,
    leaf_depth: Option<usize>,
    data: Vec<f32>,
}

impl TensorBuilder {
    fn visit(&mut self, value: &Value, depth: usize) -> bool {
        match value {
            Value::Array(items) => {
                if self.leaf_depth.is_some_and(|leaf| depth >= leaf) {
                    return false;
                }
                match self.shape.get(depth) {
                    Some(&len) if len != items.len() => return false,
                    Some(_) => {}
                    None => self.shape.push(items.len()),
                }
                items.iter().all(|item| self.visit(item, depth + 1))
            }
            Value::Number(n) => {
                if *self.leaf_depth.get_or_insert(depth) != depth || self.shape.len() != depth {
                    return false;
                }
                match n.as_f64() {
                    Some(v) => {
                        self.data.push(v as f32);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }
}

fn tensor_from_json(value: &Value) -> Option<ArrayD<f32>> {
    let mut builder = TensorBuilder {
        shape: Vec::new(),
        leaf_depth: None,
        data: Vec::new(),
    };
    if !builder.visit(value, 0) {
        return None;
    }
    ArrayD::from_shape_vec(IxDyn(&builder.shape), builder.data).ok()
}

impl From<ArrayD<f32>> for MetricValue {
    fn from(tensor: ArrayD<f32>) -> Self {
        Self::Tensor(tensor)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Send one step's metrics to `sink`.
///
/// - 0-D tensors and plain numbers: one scalar sample each
/// - tensors with one or more dimensions: one histogram sample each
/// - text: skipped
pub fn forward(sink: &dyn MetricLogger, step: u64, metrics: &MetricRecord) {
    for (name, value) in metrics {
        match value {
            MetricValue::Tensor(tensor) if tensor.ndim() == 0 => {
                if let Some(v) = tensor.first() {
                    sink.log_scalar(name, *v as f64, step);
                }
            }
            MetricValue::Tensor(tensor) => {
                let histogram = Histogram::from_values(tensor.iter().map(|&v| v as f64));
                sink.log_histogram(name, &histogram, step);
            }
            MetricValue::Int(v) => sink.log_scalar(name, *v as f64, step),
            MetricValue::Float(v) => sink.log_scalar(name, *v, step),
            MetricValue::Bool(v) => sink.log_scalar(name, if *v { 1.0 } else { 0.0 }, step),
            MetricValue::Text(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{MemoryLogger, Sample};
    use ndarray::{arr0, arr1, arr2};
    use serde_json::json;

    fn record(entries: Vec<(&str, MetricValue)>) -> MetricRecord {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_zero_dim_tensor_is_scalar() {
        let memory = MemoryLogger::new();
        forward(
            &memory,
            5,
            &record(vec![("loss", arr0(0.25f32).into_dyn().into())]),
        );
        assert_eq!(
            memory.samples(),
            vec![Sample::Scalar {
                name: "loss".into(),
                value: 0.25,
                step: 5
            }]
        );
    }

    #[test]
    fn test_multi_dim_tensor_is_histogram() {
        let memory = MemoryLogger::new();
        let weights = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]).into_dyn();
        forward(&memory, 9, &record(vec![("weights", weights.into())]));

        let histograms = memory.histograms();
        assert_eq!(memory.len(), 1);
        assert_eq!(histograms.len(), 1);
        let (name, hist, step) = &histograms[0];
        assert_eq!(name, "weights");
        assert_eq!(*step, 9);
        assert_eq!(hist.num, 4);
        assert_eq!(hist.sum, 10.0);
    }

    #[test]
    fn test_plain_numbers_are_scalars() {
        let memory = MemoryLogger::new();
        forward(
            &memory,
            1,
            &record(vec![
                ("epoch", MetricValue::Int(3)),
                ("lr", MetricValue::Float(0.1)),
                ("converged", MetricValue::Bool(true)),
            ]),
        );
        assert_eq!(
            memory.scalars(),
            vec![
                ("converged".to_string(), 1.0, 1),
                ("epoch".to_string(), 3.0, 1),
                ("lr".to_string(), 0.1, 1),
            ]
        );
    }

    #[test]
    fn test_text_is_skipped() {
        let memory = MemoryLogger::new();
        forward(&memory, 1, &record(vec![("note", "warmup".into())]));
        assert!(memory.is_empty());
    }

    #[test]
    fn test_mixed_record() {
        let memory = MemoryLogger::new();
        forward(
            &memory,
            2,
            &record(vec![
                ("grad", arr1(&[0.1f32, -0.2, 0.3]).into_dyn().into()),
                ("loss", MetricValue::Float(1.5)),
                ("phase", "train".into()),
            ]),
        );
        assert_eq!(memory.histograms().len(), 1);
        assert_eq!(memory.scalars().len(), 1);
    }

    #[test]
    fn test_empty_tensor_forwards_empty_histogram() {
        let memory = MemoryLogger::new();
        let empty = ArrayD::<f32>::zeros(IxDyn(&[0]));
        forward(&memory, 0, &record(vec![("empty", empty.into())]));
        let histograms = memory.histograms();
        assert_eq!(histograms.len(), 1);
        assert!(histograms[0].1.is_empty());
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(MetricValue::from_json(&json!(3)), MetricValue::Int(3));
        assert_eq!(MetricValue::from_json(&json!(0.5)), MetricValue::Float(0.5));
        assert_eq!(MetricValue::from_json(&json!(false)), MetricValue::Bool(false));
        assert_eq!(
            MetricValue::from_json(&json!("hi")),
            MetricValue::Text("hi".into())
        );
        assert_eq!(
            MetricValue::from_json(&json!(null)),
            MetricValue::Text("null".into())
        );
        assert_eq!(
            MetricValue::from_json(&json!({"a": 1})),
            MetricValue::Text(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn test_from_json_tensors() {
        match MetricValue::from_json(&json!([[1, 2, 3], [4, 5, 6]])) {
            MetricValue::Tensor(t) => {
                assert_eq!(t.shape(), &[2, 3]);
                assert_eq!(t.iter().last(), Some(&6.0));
            }
            other => panic!("expected tensor, got {:?}", other),
        }
        match MetricValue::from_json(&json!([])) {
            MetricValue::Tensor(t) => assert_eq!(t.shape(), &[0]),
            other => panic!("expected tensor, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_rejects_ragged_and_mixed() {
        assert!(matches!(
            MetricValue::from_json(&json!([[1, 2], [3]])),
            MetricValue::Text(_)
        ));
        assert!(matches!(
            MetricValue::from_json(&json!([1, [2]])),
            MetricValue::Text(_)
        ));
        assert!(matches!(
            MetricValue::from_json(&json!([[1], 2])),
            MetricValue::Text(_)
        ));
        assert!(matches!(
            MetricValue::from_json(&json!([1, "a"])),
            MetricValue::Text(_)
        ));
    }
}
