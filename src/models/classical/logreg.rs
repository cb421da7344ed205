// src/models/classical/logreg.rs
//! Multinomial logistic regression (`logreg`)
//!
//! Softmax regression fit by full-batch gradient descent with L2
//! regularization expressed through the inverse strength C.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use tracing::debug;

use crate::models::{
    one_hot, stable_softmax_rows, time_ms, ConfigMap, RunnerConfig, RunnerError, RunnerOutput,
    RunnerTiming,
};

pub const DEFAULT_MAX_ITER: usize = 200;
pub const DEFAULT_C: f64 = 1.0;
pub const DEFAULT_LR: f64 = 0.1;

/// Softmax regression model
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    weights: Array2<f64>,
    intercept: Array1<f64>,
    max_iter: usize,
    c: f64,
    learning_rate: f64,
}

impl LogisticRegression {
    pub fn new(n_features: usize, n_classes: usize) -> Self {
        LogisticRegression {
            weights: Array2::zeros((n_features, n_classes)),
            intercept: Array1::zeros(n_classes),
            max_iter: DEFAULT_MAX_ITER,
            c: DEFAULT_C,
            learning_rate: DEFAULT_LR,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c.max(1e-12);
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Full-batch gradient descent on the cross-entropy objective
    pub fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) {
        let n = x.nrows().max(1) as f64;
        let targets = one_hot(y, self.intercept.len());
        let alpha = 1.0 / (self.c * n);

        for _iter in 0..self.max_iter {
            let probs = self.decision(x);
            let residual = &probs - &targets;
            let grad_w = x.t().dot(&residual) / n + alpha * &self.weights;
            let grad_b = residual.sum_axis(Axis(0)) / n;
            self.weights.scaled_add(-self.learning_rate, &grad_w);
            self.intercept.scaled_add(-self.learning_rate, &grad_b);
        }
    }

    fn decision(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let mut logits = x.dot(&self.weights);
        for mut row in logits.axis_iter_mut(Axis(0)) {
            row += &self.intercept;
        }
        stable_softmax_rows(&logits)
    }

    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Array2<f64> {
        self.decision(x)
    }
}

pub(crate) fn run(
    key: &str,
    x_train: ArrayView2<f64>,
    y_train: &[usize],
    x_test: ArrayView2<f64>,
    config: &RunnerConfig,
    class_labels: &[String],
) -> Result<RunnerOutput, RunnerError> {
    let max_iter = config.usize_or("epochs", DEFAULT_MAX_ITER);
    let c = config.f64_or("C", DEFAULT_C);
    let lr = config.learning_rate_or(DEFAULT_LR);
    debug!(key, max_iter, c, "training logistic regression");

    if class_labels.is_empty() {
        return Err(RunnerError::training(key, "no classes to fit"));
    }

    let mut model = LogisticRegression::new(x_train.ncols(), class_labels.len())
        .with_max_iter(max_iter)
        .with_c(c)
        .with_learning_rate(lr);

    let ((), train_ms) = time_ms(|| model.fit(x_train, y_train));
    let (proba, infer_ms) = time_ms(|| model.predict_proba(x_test));

    Ok(RunnerOutput {
        proba,
        timing: RunnerTiming { train_ms, infer_ms },
        extras: ConfigMap::new(),
    })
}
