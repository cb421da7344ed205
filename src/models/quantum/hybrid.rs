// src/models/quantum/hybrid.rs
//! Hybrid dense/circuit runner (`hybrid_torch`, `neural` feature)
//!
//! A learned input projection squashed to angles feeds an entangling
//! circuit whose per-qubit <Z_i> readouts drive a small dense head. All
//! parameters train jointly: the dense parts by backpropagation, the
//! circuit by the parameter-shift rule chained through the projection.

use std::f64::consts::{FRAC_PI_2, PI};

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::models::optimizer::Adam;
use crate::models::quantum::vqc::standard_normal;
use crate::models::{
    gather_rows, one_hot, stable_softmax_rows, time_ms, ConfigMap, RunnerConfig, RunnerError,
    RunnerOutput, RunnerTiming,
};
use crate::neural::NET_SEED;
use crate::quantum::{rot, ry, StateVector};

pub const DEFAULT_LAYERS: usize = 2;
pub const DEFAULT_EPOCHS: usize = 15;
pub const DEFAULT_LR: f64 = 1e-3;
pub const DEFAULT_BATCH: usize = 32;

pub const MIN_QUBITS: usize = 2;
pub const MAX_QUBITS: usize = 6;

/// Width of the dense head's hidden layer
const HEAD_HIDDEN: usize = 16;

/// Spread of the initial circuit angles
const INIT_SCALE: f64 = 0.15;

/// Ring-entangled rotation layers over an RY angle embedding, read out
/// as one <Z_i> per qubit
struct EntanglingCircuit {
    n_qubits: usize,
    layers: usize,
}

impl EntanglingCircuit {
    fn parameter_count(&self) -> usize {
        self.layers * self.n_qubits * 3
    }

    fn expectations(&self, angles: &Array1<f64>, theta: &Array1<f64>) -> Result<Array1<f64>, String> {
        let mut state = StateVector::zero_state(self.n_qubits);
        for q in 0..self.n_qubits {
            state.apply_single(&ry(angles[q]), q)?;
        }
        for layer in 0..self.layers {
            for q in 0..self.n_qubits {
                let base = (layer * self.n_qubits + q) * 3;
                state.apply_single(&rot(theta[base], theta[base + 1], theta[base + 2]), q)?;
            }
            for q in 0..self.n_qubits {
                state.apply_cnot(q, (q + 1) % self.n_qubits)?;
            }
        }
        let mut out = Array1::zeros(self.n_qubits);
        for q in 0..self.n_qubits {
            out[q] = state.expectation_z(q)?;
        }
        Ok(out)
    }

    /// Shift-rule Jacobians of every readout against the circuit
    /// parameters and against the embedding angles
    fn jacobians(
        &self,
        angles: &Array1<f64>,
        theta: &Array1<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>), String> {
        let p = self.parameter_count();
        let mut j_theta = Array2::zeros((self.n_qubits, p));
        for pi in 0..p {
            let mut shifted = theta.clone();
            shifted[pi] += FRAC_PI_2;
            let plus = self.expectations(angles, &shifted)?;
            shifted[pi] = theta[pi] - FRAC_PI_2;
            let minus = self.expectations(angles, &shifted)?;
            for q in 0..self.n_qubits {
                j_theta[[q, pi]] = 0.5 * (plus[q] - minus[q]);
            }
        }

        let mut j_angle = Array2::zeros((self.n_qubits, self.n_qubits));
        for ai in 0..self.n_qubits {
            let mut shifted = angles.clone();
            shifted[ai] += FRAC_PI_2;
            let plus = self.expectations(&shifted, theta)?;
            shifted[ai] = angles[ai] - FRAC_PI_2;
            let minus = self.expectations(&shifted, theta)?;
            for q in 0..self.n_qubits {
                j_angle[[q, ai]] = 0.5 * (plus[q] - minus[q]);
            }
        }
        Ok((j_theta, j_angle))
    }
}

/// The full hybrid stack: projection, circuit, dense head
struct HybridNet {
    circuit: EntanglingCircuit,
    w_in: Array2<f64>,
    b_in: Array1<f64>,
    theta: Array1<f64>,
    w_hidden: Array2<f64>,
    b_hidden: Array1<f64>,
    w_out: Array2<f64>,
    b_out: Array1<f64>,
}

impl HybridNet {
    fn new(n_features: usize, n_qubits: usize, layers: usize, n_classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut xavier = |rows: usize, cols: usize| {
            let bound = (6.0 / (rows + cols) as f64).sqrt();
            Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-bound..bound))
        };
        let w_in = xavier(n_features, n_qubits);
        let w_hidden = xavier(n_qubits, HEAD_HIDDEN);
        let w_out = xavier(HEAD_HIDDEN, n_classes);
        let circuit = EntanglingCircuit { n_qubits, layers };
        let theta =
            Array1::from_shape_fn(circuit.parameter_count(), |_| {
                INIT_SCALE * standard_normal(&mut rng)
            });
        HybridNet {
            circuit,
            w_in,
            b_in: Array1::zeros(n_qubits),
            theta,
            w_hidden,
            b_hidden: Array1::zeros(HEAD_HIDDEN),
            w_out,
            b_out: Array1::zeros(n_classes),
        }
    }

    fn affine(x: ArrayView2<f64>, w: &Array2<f64>, b: &Array1<f64>) -> Array2<f64> {
        let mut z = x.dot(w);
        for mut row in z.axis_iter_mut(Axis(0)) {
            row += b;
        }
        z
    }

    /// Projection output and the angle matrix tanh(u) * pi
    fn angles(&self, x: ArrayView2<f64>) -> (Array2<f64>, Array2<f64>) {
        let u = Self::affine(x, &self.w_in, &self.b_in);
        let a = u.mapv(|v| v.tanh() * PI);
        (u, a)
    }

    /// Circuit readouts for every row of the angle matrix
    fn readouts(&self, a: &Array2<f64>) -> Result<Array2<f64>, String> {
        let rows: Vec<Array1<f64>> = (0..a.nrows())
            .into_par_iter()
            .map(|i| self.circuit.expectations(&a.row(i).to_owned(), &self.theta))
            .collect::<Result<_, String>>()?;
        let mut z = Array2::zeros((a.nrows(), self.circuit.n_qubits));
        for (i, row) in rows.iter().enumerate() {
            z.row_mut(i).assign(row);
        }
        Ok(z)
    }

    fn logits_from_readouts(&self, z: &Array2<f64>) -> Array2<f64> {
        let h = Self::affine(z.view(), &self.w_hidden, &self.b_hidden).mapv(|v| v.max(0.0));
        Self::affine(h.view(), &self.w_out, &self.b_out)
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, String> {
        let (_, a) = self.angles(x);
        let z = self.readouts(&a)?;
        Ok(stable_softmax_rows(&self.logits_from_readouts(&z)))
    }

    #[allow(clippy::too_many_arguments)]
    fn fit(
        &mut self,
        x: ArrayView2<f64>,
        y: &[usize],
        n_classes: usize,
        epochs: usize,
        lr: f64,
        batch_size: usize,
        seed: u64,
    ) -> Result<(), String> {
        let n = x.nrows();
        if n == 0 {
            return Ok(());
        }
        let batch_size = batch_size.clamp(1, n);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n).collect();

        let mut opt_w_in = Adam::new(lr, self.w_in.len());
        let mut opt_b_in = Adam::new(lr, self.b_in.len());
        let mut opt_theta = Adam::new(lr, self.theta.len());
        let mut opt_w_hidden = Adam::new(lr, self.w_hidden.len());
        let mut opt_b_hidden = Adam::new(lr, self.b_hidden.len());
        let mut opt_w_out = Adam::new(lr, self.w_out.len());
        let mut opt_b_out = Adam::new(lr, self.b_out.len());

        for epoch in 0..epochs {
            indices.shuffle(&mut rng);
            for chunk in indices.chunks(batch_size) {
                let xb = gather_rows(x, chunk);
                let yb: Vec<usize> = chunk.iter().map(|&i| y[i]).collect();
                let targets = one_hot(&yb, n_classes);
                let bs = chunk.len() as f64;

                let (u, a) = self.angles(xb.view());
                let z = self.readouts(&a)?;
                let h_pre = Self::affine(z.view(), &self.w_hidden, &self.b_hidden);
                let h = h_pre.mapv(|v| v.max(0.0));
                let logits = Self::affine(h.view(), &self.w_out, &self.b_out);
                let probs = stable_softmax_rows(&logits);

                // Dense head backward
                let delta = (&probs - &targets) / bs;
                let grad_w_out = h.t().dot(&delta);
                let grad_b_out = delta.sum_axis(Axis(0));
                let mut delta_h = delta.dot(&self.w_out.t());
                delta_h.zip_mut_with(&h_pre, |d, &zv| {
                    if zv <= 0.0 {
                        *d = 0.0;
                    }
                });
                let grad_w_hidden = z.t().dot(&delta_h);
                let grad_b_hidden = delta_h.sum_axis(Axis(0));
                let delta_z = delta_h.dot(&self.w_hidden.t());

                // Circuit backward: per-sample Jacobians by the shift rule
                let per_sample: Vec<(Array1<f64>, Array1<f64>)> = (0..chunk.len())
                    .into_par_iter()
                    .map(|i| {
                        let angles = a.row(i).to_owned();
                        let (j_theta, j_angle) = self.circuit.jacobians(&angles, &self.theta)?;
                        let dz = delta_z.row(i).to_owned();
                        Ok((j_theta.t().dot(&dz), j_angle.t().dot(&dz)))
                    })
                    .collect::<Result<_, String>>()?;

                let mut grad_theta = Array1::zeros(self.theta.len());
                let mut delta_a = Array2::zeros(u.raw_dim());
                for (i, (g_theta, g_angle)) in per_sample.iter().enumerate() {
                    grad_theta += g_theta;
                    delta_a.row_mut(i).assign(g_angle);
                }

                // Through tanh(u) * pi into the projection
                let mut delta_u = delta_a;
                delta_u.zip_mut_with(&u, |d, &uv| {
                    let t = uv.tanh();
                    *d *= PI * (1.0 - t * t);
                });
                let grad_w_in = xb.t().dot(&delta_u);
                let grad_b_in = delta_u.sum_axis(Axis(0));

                opt_w_in.step(&mut self.w_in, &grad_w_in);
                opt_b_in.step(&mut self.b_in, &grad_b_in);
                opt_theta.step(&mut self.theta, &grad_theta);
                opt_w_hidden.step(&mut self.w_hidden, &grad_w_hidden);
                opt_b_hidden.step(&mut self.b_hidden, &grad_b_hidden);
                opt_w_out.step(&mut self.w_out, &grad_w_out);
                opt_b_out.step(&mut self.b_out, &grad_b_out);
            }
            if epoch % 5 == 0 {
                debug!(epoch, "hybrid epoch done");
            }
        }
        Ok(())
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
    let d = x_train.ncols();
    let n_qubits = config
        .usize_or("n_qubits", d.clamp(MIN_QUBITS, MAX_QUBITS))
        .clamp(MIN_QUBITS, MAX_QUBITS);
    let layers = config.usize_or("layers", DEFAULT_LAYERS).max(1);
    let epochs = config.usize_or("epochs", DEFAULT_EPOCHS);
    let lr = config.learning_rate_or(DEFAULT_LR);
    let batch_size = config.usize_or("batch_size", DEFAULT_BATCH).max(1);
    debug!(key, n_qubits, layers, epochs, lr, batch_size, "training hybrid net");

    if class_labels.is_empty() {
        return Err(RunnerError::training(key, "no classes to fit"));
    }

    let mut net = HybridNet::new(d, n_qubits, layers, class_labels.len(), NET_SEED);
    let (fit, train_ms) = time_ms(|| {
        net.fit(x_train, y_train, class_labels.len(), epochs, lr, batch_size, NET_SEED)
    });
    fit.map_err(|e| RunnerError::training(key, e))?;
    let (proba, infer_ms) = time_ms(|| net.predict_proba(x_test));
    let proba = proba.map_err(|e| RunnerError::training(key, e))?;

    let mut extras = ConfigMap::new();
    extras.insert("n_qubits".to_string(), n_qubits.into());
    extras.insert("n_layers".to_string(), layers.into());

    Ok(RunnerOutput {
        proba,
        timing: RunnerTiming { train_ms, infer_ms },
        extras,
    })
}
