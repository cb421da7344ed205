// src/models/mod.rs
//! Model runners
//!
//! The two runner families (classical, quantum) behind the registry, the
//! shared one-vs-rest protocol, and the uniform runner contract: every
//! key trains on the prepared split and returns a probability matrix
//! with timing and runner-specific extras.

pub mod classical;
pub mod optimizer;
pub mod ovr;
pub mod quantum;
pub mod registry;

pub use optimizer::Adam;
pub use ovr::{margins_matrix, softmax_rows, train_one_vs_rest, MarginModel, OvrConfig, OvrHeads};
pub use registry::{
    resolve, ClassicalRunner, ModelFamily, QuantumRunner, RunnerError, CLASSICAL_KEYS,
    QUANTUM_KEYS,
};

use ndarray::{Array2, ArrayView2, Axis};
use serde::Serialize;
use std::time::Instant;

/// JSON object carrying per-runner options
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Typed view over a runner's JSON config. Unknown options are ignored;
/// numeric options accept numbers or numeric strings.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    options: ConfigMap,
}

impl RunnerConfig {
    pub fn new(options: ConfigMap) -> Self {
        RunnerConfig { options }
    }

    pub fn empty() -> Self {
        RunnerConfig::default()
    }

    fn number(&self, key: &str) -> Option<f64> {
        let v = self.options.get(key)?;
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    }

    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.number(key).unwrap_or(default)
    }

    pub fn usize_or(&self, key: &str, default: usize) -> usize {
        self.number(key)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as usize)
            .unwrap_or(default)
    }

    /// Learning rate: `lr` wins over `learning_rate`
    pub fn learning_rate_or(&self, default: f64) -> f64 {
        self.number("lr")
            .or_else(|| self.number("learning_rate"))
            .unwrap_or(default)
    }

    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// Integer-list option, e.g. hidden layer widths
    pub fn usize_list(&self, key: &str) -> Option<Vec<usize>> {
        let arr = self.options.get(key)?.as_array()?;
        arr.iter()
            .map(|v| v.as_u64().map(|u| u as usize))
            .collect()
    }
}

/// Wall-clock timings reported by a runner, in milliseconds
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunnerTiming {
    pub train_ms: f64,
    pub infer_ms: f64,
}

/// What every runner returns: a probability matrix over the test rows
/// (one column per class, rows summing to 1) plus timing and extras
#[derive(Debug, Clone)]
pub struct RunnerOutput {
    pub proba: Array2<f64>,
    pub timing: RunnerTiming,
    pub extras: ConfigMap,
}

/// The fixed capability interface behind both registry namespaces
pub trait Runner {
    fn train_and_predict(
        &self,
        x_train: ArrayView2<f64>,
        y_train: &[usize],
        x_test: ArrayView2<f64>,
        config: &RunnerConfig,
        class_labels: &[String],
    ) -> Result<RunnerOutput, RunnerError>;
}

/// Re-export commonly used types
pub mod prelude {
    pub use super::registry::{
        resolve, ClassicalRunner, ModelFamily, QuantumRunner, RunnerError,
    };
    pub use super::{Runner, RunnerConfig, RunnerOutput, RunnerTiming};
}

pub(crate) fn time_ms<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed().as_secs_f64() * 1000.0)
}

/// Row-gather into a new owned matrix
pub(crate) fn gather_rows(x: ArrayView2<f64>, rows: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), x.ncols()), |(r, c)| x[[rows[r], c]])
}

/// One-hot encode labels into an n x k matrix
pub(crate) fn one_hot(y: &[usize], n_classes: usize) -> Array2<f64> {
    let mut out = Array2::zeros((y.len(), n_classes));
    for (i, &c) in y.iter().enumerate() {
        out[[i, c]] = 1.0;
    }
    out
}

/// Numerically stable row-wise softmax (max subtraction)
pub(crate) fn stable_softmax_rows(logits: &Array2<f64>) -> Array2<f64> {
    let mut out = logits.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        } else {
            let k = row.len() as f64;
            row.fill(1.0 / k);
        }
    }
    out
}
