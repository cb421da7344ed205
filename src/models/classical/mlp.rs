// src/models/classical/mlp.rs
//! One-hidden-layer MLP (`mlp`)
//!
//! ReLU hidden layer, softmax cross-entropy head, Adam, seeded shuffled
//! minibatches. Widths beyond one hidden layer live behind the heavier
//! `mlp_torch` runner.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::models::optimizer::Adam;
use crate::models::{
    gather_rows, one_hot, stable_softmax_rows, time_ms, ConfigMap, RunnerConfig, RunnerError,
    RunnerOutput, RunnerTiming,
};
use crate::DEFAULT_SEED;

pub const DEFAULT_HIDDEN: usize = 64;
pub const DEFAULT_EPOCHS: usize = 50;
pub const DEFAULT_LR: f64 = 3e-3;
pub const DEFAULT_BATCH: usize = 32;

/// One-hidden-layer classifier
pub struct MlpClassifier {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
}

impl MlpClassifier {
    /// Xavier-style seeded uniform init
    pub fn new(n_features: usize, hidden: usize, n_classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut xavier = |rows: usize, cols: usize| {
            let bound = (6.0 / (rows + cols) as f64).sqrt();
            Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-bound..bound))
        };
        MlpClassifier {
            w1: xavier(n_features, hidden),
            b1: Array1::zeros(hidden),
            w2: xavier(hidden, n_classes),
            b2: Array1::zeros(n_classes),
        }
    }

    fn hidden(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let mut z = x.dot(&self.w1);
        for mut row in z.axis_iter_mut(Axis(0)) {
            row += &self.b1;
        }
        z
    }

    fn logits_from_hidden(&self, a1: &Array2<f64>) -> Array2<f64> {
        let mut z = a1.dot(&self.w2);
        for mut row in z.axis_iter_mut(Axis(0)) {
            row += &self.b2;
        }
        z
    }

    pub fn fit(
        &mut self,
        x: ArrayView2<f64>,
        y: &[usize],
        epochs: usize,
        lr: f64,
        batch_size: usize,
        seed: u64,
    ) {
        let n = x.nrows();
        if n == 0 {
            return;
        }
        let k = self.b2.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n).collect();
        let batch_size = batch_size.clamp(1, n);

        let mut opt_w1 = Adam::new(lr, self.w1.len());
        let mut opt_b1 = Adam::new(lr, self.b1.len());
        let mut opt_w2 = Adam::new(lr, self.w2.len());
        let mut opt_b2 = Adam::new(lr, self.b2.len());

        for _epoch in 0..epochs {
            indices.shuffle(&mut rng);
            for chunk in indices.chunks(batch_size) {
                let xb = gather_rows(x, chunk);
                let yb: Vec<usize> = chunk.iter().map(|&i| y[i]).collect();
                let targets = one_hot(&yb, k);
                let bs = chunk.len() as f64;

                let z1 = self.hidden(xb.view());
                let a1 = z1.mapv(|v| v.max(0.0));
                let logits = self.logits_from_hidden(&a1);
                let probs = stable_softmax_rows(&logits);

                let delta = (&probs - &targets) / bs;
                let grad_w2 = a1.t().dot(&delta);
                let grad_b2 = delta.sum_axis(Axis(0));
                let mut delta1 = delta.dot(&self.w2.t());
                delta1.zip_mut_with(&z1, |d, &z| {
                    if z <= 0.0 {
                        *d = 0.0;
                    }
                });
                let grad_w1 = xb.t().dot(&delta1);
                let grad_b1 = delta1.sum_axis(Axis(0));

                opt_w1.step(&mut self.w1, &grad_w1);
                opt_b1.step(&mut self.b1, &grad_b1);
                opt_w2.step(&mut self.w2, &grad_w2);
                opt_b2.step(&mut self.b2, &grad_b2);
            }
        }
    }

    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let a1 = self.hidden(x).mapv(|v| v.max(0.0));
        stable_softmax_rows(&self.logits_from_hidden(&a1))
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
    let hidden = config.usize_or("hidden", DEFAULT_HIDDEN).max(1);
    let epochs = config.usize_or("epochs", DEFAULT_EPOCHS);
    let lr = config.learning_rate_or(DEFAULT_LR);
    let batch_size = config.usize_or("batch_size", DEFAULT_BATCH).max(1);
    debug!(key, hidden, epochs, lr, batch_size, "training mlp");

    if class_labels.is_empty() {
        return Err(RunnerError::training(key, "no classes to fit"));
    }

    let mut model = MlpClassifier::new(x_train.ncols(), hidden, class_labels.len(), DEFAULT_SEED);
    let ((), train_ms) = time_ms(|| {
        model.fit(x_train, y_train, epochs, lr, batch_size, DEFAULT_SEED);
    });
    let (proba, infer_ms) = time_ms(|| model.predict_proba(x_test));

    Ok(RunnerOutput {
        proba,
        timing: RunnerTiming { train_ms, infer_ms },
        extras: ConfigMap::new(),
    })
}
