// src/models/classical/svm.rs
//! RBF support vector machine (`svm`)
//!
//! Binary soft-margin SVM trained with a simplified SMO loop over a
//! precomputed kernel matrix, lifted to multiclass one-vs-rest.
//! Probabilities are a softmax over the per-class decision values.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::models::{
    gather_rows, stable_softmax_rows, time_ms, ConfigMap, RunnerConfig, RunnerError, RunnerOutput,
    RunnerTiming,
};
use crate::DEFAULT_SEED;

pub const DEFAULT_C: f64 = 1.0;
pub const DEFAULT_TOL: f64 = 1e-3;
pub const DEFAULT_MAX_ITER: usize = 100;

/// Kernel matrices are quadratic in rows; larger train folds are
/// subsampled before fitting.
pub const MAX_KERNEL_ROWS: usize = 2000;

fn rbf(a: ArrayView1<f64>, b: ArrayView1<f64>, gamma: f64) -> f64 {
    let mut dist = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = x - y;
        dist += d * d;
    }
    (-gamma * dist).exp()
}

/// One binary one-vs-rest head
struct BinaryHead {
    alphas: Array1<f64>,
    bias: f64,
    /// +1/-1 targets the head was fit against
    targets: Array1<f64>,
}

impl BinaryHead {
    /// Simplified SMO: scan all rows, pick the partner at random, stop
    /// after a full pass without updates
    fn fit(
        kernel: &Array2<f64>,
        targets: Array1<f64>,
        c: f64,
        tol: f64,
        max_iter: usize,
        seed: u64,
    ) -> Self {
        let n = targets.len();
        let mut alphas = Array1::zeros(n);
        let mut bias = 0.0;
        let mut rng = StdRng::seed_from_u64(seed);

        let decision = |alphas: &Array1<f64>, bias: f64, i: usize| -> f64 {
            let mut sum = bias;
            for k in 0..n {
                if alphas[k] != 0.0 {
                    sum += alphas[k] * targets[k] * kernel[[k, i]];
                }
            }
            sum
        };

        for _iter in 0..max_iter {
            let mut changed = 0;
            for i in 0..n {
                let e_i = decision(&alphas, bias, i) - targets[i];
                let violates = (targets[i] * e_i < -tol && alphas[i] < c)
                    || (targets[i] * e_i > tol && alphas[i] > 0.0);
                if !violates || n < 2 {
                    continue;
                }

                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let e_j = decision(&alphas, bias, j) - targets[j];

                let (a_i_old, a_j_old) = (alphas[i], alphas[j]);
                let (lo, hi) = if targets[i] != targets[j] {
                    ((a_j_old - a_i_old).max(0.0), (c + a_j_old - a_i_old).min(c))
                } else {
                    ((a_i_old + a_j_old - c).max(0.0), (a_i_old + a_j_old).min(c))
                };
                if lo >= hi {
                    continue;
                }

                let eta = 2.0 * kernel[[i, j]] - kernel[[i, i]] - kernel[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                let mut a_j = a_j_old - targets[j] * (e_i - e_j) / eta;
                a_j = a_j.clamp(lo, hi);
                if (a_j - a_j_old).abs() < 1e-5 {
                    continue;
                }
                let a_i = a_i_old + targets[i] * targets[j] * (a_j_old - a_j);
                alphas[i] = a_i;
                alphas[j] = a_j;

                let b1 = bias
                    - e_i
                    - targets[i] * (a_i - a_i_old) * kernel[[i, i]]
                    - targets[j] * (a_j - a_j_old) * kernel[[i, j]];
                let b2 = bias
                    - e_j
                    - targets[i] * (a_i - a_i_old) * kernel[[i, j]]
                    - targets[j] * (a_j - a_j_old) * kernel[[j, j]];
                bias = if 0.0 < a_i && a_i < c {
                    b1
                } else if 0.0 < a_j && a_j < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };
                changed += 1;
            }
            if changed == 0 {
                break;
            }
        }

        BinaryHead {
            alphas,
            bias,
            targets,
        }
    }

    fn decision_value(&self, train: ArrayView2<f64>, x: ArrayView1<f64>, gamma: f64) -> f64 {
        let mut sum = self.bias;
        for (k, &alpha) in self.alphas.iter().enumerate() {
            if alpha != 0.0 {
                sum += alpha * self.targets[k] * rbf(train.row(k), x, gamma);
            }
        }
        sum
    }
}

/// Gamma as sklearn's "scale": 1 / (n_features * var(X))
fn gamma_scale(x: ArrayView2<f64>) -> f64 {
    let n = (x.nrows() * x.ncols()).max(1) as f64;
    let mean = x.sum() / n;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var > 0.0 && x.ncols() > 0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
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
    let c = config.f64_or("C", DEFAULT_C).max(1e-12);
    let gamma = match config.str_value("gamma") {
        Some("auto") => 1.0 / x_train.ncols().max(1) as f64,
        Some(_) | None => config.f64_or("gamma", gamma_scale(x_train)),
    };
    let max_iter = config.usize_or("epochs", DEFAULT_MAX_ITER).max(1);
    let k = class_labels.len();
    debug!(key, c, gamma, max_iter, "training svm");

    if k == 0 {
        return Err(RunnerError::training(key, "no classes to fit"));
    }

    // Subsample oversized train folds before the kernel matrix.
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
    let (train, labels): (Array2<f64>, Vec<usize>) = if x_train.nrows() > MAX_KERNEL_ROWS {
        let mut rows: Vec<usize> = (0..x_train.nrows()).collect();
        for i in 0..MAX_KERNEL_ROWS {
            let j = rng.gen_range(i..rows.len());
            rows.swap(i, j);
        }
        rows.truncate(MAX_KERNEL_ROWS);
        (
            gather_rows(x_train, &rows),
            rows.iter().map(|&r| y_train[r]).collect(),
        )
    } else {
        (x_train.to_owned(), y_train.to_vec())
    };

    let (heads, train_ms) = time_ms(|| {
        let n = train.nrows();
        let mut kernel = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let v = rbf(train.row(i), train.row(j), gamma);
                kernel[[i, j]] = v;
                kernel[[j, i]] = v;
            }
        }

        (0..k)
            .map(|class| {
                let targets = Array1::from_iter(
                    labels
                        .iter()
                        .map(|&c2| if c2 == class { 1.0 } else { -1.0 }),
                );
                BinaryHead::fit(
                    &kernel,
                    targets,
                    c,
                    DEFAULT_TOL,
                    max_iter,
                    DEFAULT_SEED.wrapping_add(class as u64),
                )
            })
            .collect::<Vec<_>>()
    });

    let (proba, infer_ms) = time_ms(|| {
        let decisions: Vec<Vec<f64>> = (0..x_test.nrows())
            .into_par_iter()
            .map(|r| {
                heads
                    .iter()
                    .map(|h| h.decision_value(train.view(), x_test.row(r), gamma))
                    .collect()
            })
            .collect();
        let mut matrix = Array2::zeros((x_test.nrows(), k));
        for (r, row) in decisions.iter().enumerate() {
            for (cidx, &v) in row.iter().enumerate() {
                matrix[[r, cidx]] = v;
            }
        }
        stable_softmax_rows(&matrix)
    });

    Ok(RunnerOutput {
        proba,
        timing: RunnerTiming { train_ms, infer_ms },
        extras: ConfigMap::new(),
    })
}
