// src/models/quantum/vqc.rs
//! Layered variational ansatz (`qnn` / `vqc`)
//!
//! Scoring primitive: a seeded random projection W maps the feature
//! vector onto one angle per qubit, a = clip(Wx, -5, 5) * pi/5. Each
//! layer re-uploads the RY embedding, entangles with a CNOT chain and
//! applies a trainable Rot (three Euler angles) per qubit, optionally
//! followed by a per-qubit depolarizing channel. The margin is <Z_0>.
//!
//! Noiseless circuits run on the statevector; a nonzero channel
//! probability moves evaluation to the density matrix.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::models::ovr::{self, MarginModel, OvrConfig};
use crate::models::{time_ms, ConfigMap, RunnerConfig, RunnerError, RunnerOutput, RunnerTiming};
use crate::quantum::{rot, ry, DensityMatrix, StateVector};
use crate::DEFAULT_SEED;

pub const DEFAULT_QUBITS: usize = 2;
pub const DEFAULT_LAYERS: usize = 4;
pub const DEFAULT_EPOCHS: usize = 50;
pub const DEFAULT_LR: f64 = 0.08;
pub const DEFAULT_NOISE_PROB: f64 = 0.01;
pub const DEFAULT_BATCH: usize = 32;

/// Spread of the initial Rot angles
const INIT_SCALE: f64 = 0.15;

/// Hyperparameters of one layered-ansatz fit
#[derive(Debug, Clone)]
pub struct VqcParams {
    pub n_qubits: usize,
    pub layers: usize,
    pub epochs: usize,
    pub lr: f64,
    pub noise_prob: f64,
    /// 0 means analytic expectation values
    pub shots: usize,
    pub batch_size: usize,
    pub seed: u64,
}

impl VqcParams {
    pub fn from_config(config: &RunnerConfig) -> Self {
        VqcParams {
            n_qubits: config.usize_or("n_qubits", DEFAULT_QUBITS).max(1),
            layers: config.usize_or("layers", DEFAULT_LAYERS).max(1),
            epochs: config.usize_or("epochs", DEFAULT_EPOCHS),
            lr: config.learning_rate_or(DEFAULT_LR),
            noise_prob: config.f64_or("noise_prob", DEFAULT_NOISE_PROB).clamp(0.0, 1.0),
            shots: config.usize_or("shots", 0),
            batch_size: config.usize_or("batch_size", DEFAULT_BATCH).max(1),
            seed: DEFAULT_SEED,
        }
    }
}

/// The layered ansatz as a one-vs-rest scoring primitive
pub struct LayeredAnsatz {
    n_qubits: usize,
    layers: usize,
    noise_prob: f64,
    shots: usize,
    seed: u64,
    /// Fixed random projection, n_qubits x n_features
    projection: Array2<f64>,
}

impl LayeredAnsatz {
    pub fn new(n_features: usize, params: &VqcParams) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let projection =
            Array2::from_shape_fn((params.n_qubits, n_features), |_| standard_normal(&mut rng));
        LayeredAnsatz {
            n_qubits: params.n_qubits,
            layers: params.layers,
            noise_prob: params.noise_prob,
            shots: params.shots,
            seed: params.seed,
            projection,
        }
    }

    /// Embedding angles: clip(Wx, -5, 5) * pi/5
    fn embed_angles(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.projection.dot(&x).mapv(|v| v.clamp(-5.0, 5.0) * PI / 5.0)
    }

    fn evaluate(&self, angles: &Array1<f64>, params: &Array1<f64>) -> Result<f64, String> {
        if self.noise_prob > 0.0 {
            let mut state = DensityMatrix::zero_state(self.n_qubits);
            self.apply_layers(&mut DensityOps(&mut state), angles, params)?;
            if self.shots > 0 {
                let mut rng = self.shot_rng(angles, params);
                state.sampled_expectation_z(0, self.shots, &mut rng)
            } else {
                state.expectation_z(0)
            }
        } else {
            let mut state = StateVector::zero_state(self.n_qubits);
            self.apply_layers(&mut PureOps(&mut state), angles, params)?;
            if self.shots > 0 {
                let mut rng = self.shot_rng(angles, params);
                state.sampled_expectation_z(0, self.shots, &mut rng)
            } else {
                state.expectation_z(0)
            }
        }
    }

    fn apply_layers(
        &self,
        ops: &mut dyn CircuitOps,
        angles: &Array1<f64>,
        params: &Array1<f64>,
    ) -> Result<(), String> {
        for layer in 0..self.layers {
            for q in 0..self.n_qubits {
                ops.single(&ry(angles[q]), q)?;
            }
            for q in 0..self.n_qubits.saturating_sub(1) {
                ops.cnot(q, q + 1)?;
            }
            for q in 0..self.n_qubits {
                let base = (layer * self.n_qubits + q) * 3;
                ops.single(&rot(params[base], params[base + 1], params[base + 2]), q)?;
            }
            if self.noise_prob > 0.0 {
                for q in 0..self.n_qubits {
                    ops.depolarize(q, self.noise_prob)?;
                }
            }
        }
        Ok(())
    }

    /// Shot noise stays reproducible: the sampling seed is derived from
    /// the base seed and the circuit inputs.
    fn shot_rng(&self, angles: &Array1<f64>, params: &Array1<f64>) -> StdRng {
        let mut h: u64 = 0xcbf29ce484222325;
        for v in angles.iter().chain(params.iter()) {
            h ^= v.to_bits();
            h = h.wrapping_mul(0x100000001b3);
        }
        StdRng::seed_from_u64(self.seed ^ h)
    }
}

impl MarginModel for LayeredAnsatz {
    fn parameter_count(&self) -> usize {
        self.layers * self.n_qubits * 3
    }

    fn init_parameters(&self, rng: &mut StdRng) -> Array1<f64> {
        Array1::from_shape_fn(self.parameter_count(), |_| INIT_SCALE * standard_normal(rng))
    }

    fn margin(&self, x: ArrayView1<f64>, params: &Array1<f64>) -> Result<f64, String> {
        let angles = self.embed_angles(x);
        self.evaluate(&angles, params)
    }
}

/// Uniform view over the two evaluators so the ansatz is written once
trait CircuitOps {
    fn single(&mut self, gate: &Array2<num_complex::Complex64>, qubit: usize) -> Result<(), String>;
    fn cnot(&mut self, control: usize, target: usize) -> Result<(), String>;
    fn depolarize(&mut self, qubit: usize, p: f64) -> Result<(), String>;
}

struct PureOps<'a>(&'a mut StateVector);

impl CircuitOps for PureOps<'_> {
    fn single(&mut self, gate: &Array2<num_complex::Complex64>, qubit: usize) -> Result<(), String> {
        self.0.apply_single(gate, qubit)
    }
    fn cnot(&mut self, control: usize, target: usize) -> Result<(), String> {
        self.0.apply_cnot(control, target)
    }
    fn depolarize(&mut self, _qubit: usize, _p: f64) -> Result<(), String> {
        Err("depolarizing channel needs the density-matrix evaluator".to_string())
    }
}

struct DensityOps<'a>(&'a mut DensityMatrix);

impl CircuitOps for DensityOps<'_> {
    fn single(&mut self, gate: &Array2<num_complex::Complex64>, qubit: usize) -> Result<(), String> {
        self.0.apply_single(gate, qubit)
    }
    fn cnot(&mut self, control: usize, target: usize) -> Result<(), String> {
        self.0.apply_cnot(control, target)
    }
    fn depolarize(&mut self, qubit: usize, p: f64) -> Result<(), String> {
        self.0.depolarize(qubit, p)
    }
}

/// Seeded standard normal via Box-Muller
pub(crate) fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Fit the layered ansatz one-vs-rest and return test probabilities
pub(crate) fn fit_predict(
    key: &str,
    x_train: ArrayView2<f64>,
    y_train: &[usize],
    x_test: ArrayView2<f64>,
    n_classes: usize,
    params: &VqcParams,
) -> Result<Array2<f64>, RunnerError> {
    let model = LayeredAnsatz::new(x_train.ncols(), params);
    let ovr_config = OvrConfig {
        epochs: params.epochs,
        lr: params.lr,
        batch_size: Some(params.batch_size),
        seed: params.seed,
    };
    let heads = ovr::train_one_vs_rest(&model, x_train, y_train, n_classes, &ovr_config)
        .map_err(|e| RunnerError::training(key, e))?;
    let margins = ovr::margins_matrix(&model, &heads, x_test)
        .map_err(|e| RunnerError::training(key, e))?;
    Ok(ovr::softmax_rows(&margins))
}

pub(crate) fn run(
    key: &str,
    x_train: ArrayView2<f64>,
    y_train: &[usize],
    x_test: ArrayView2<f64>,
    config: &RunnerConfig,
    class_labels: &[String],
) -> Result<RunnerOutput, RunnerError> {
    let params = VqcParams::from_config(config);
    debug!(
        key,
        n_qubits = params.n_qubits,
        layers = params.layers,
        epochs = params.epochs,
        noise_prob = params.noise_prob,
        "training layered ansatz"
    );

    let (proba, train_ms) = time_ms(|| {
        fit_predict(key, x_train, y_train, x_test, class_labels.len(), &params)
    });

    Ok(RunnerOutput {
        proba: proba?,
        timing: RunnerTiming {
            train_ms,
            infer_ms: 0.0,
        },
        extras: ConfigMap::new(),
    })
}
