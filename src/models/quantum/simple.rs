// src/models/quantum/simple.rs
//! Fixed two-qubit ansatz (`qnn_simple`)
//!
//! The smallest circuit in the family: the first two standardized
//! features are encoded as RX(x0) on qubit 0 and RY(x1) on qubit 1,
//! followed by four trainable rotations around one CNOT. Trained
//! one-vs-rest on the full batch; margin is <Z_0>.

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::models::ovr::{self, MarginModel, OvrConfig};
use crate::models::{time_ms, ConfigMap, RunnerConfig, RunnerError, RunnerOutput, RunnerTiming};
use crate::quantum::{rx, ry, StateVector};
use crate::DEFAULT_SEED;

pub const DEFAULT_EPOCHS: usize = 25;
pub const DEFAULT_LR: f64 = 0.1;

/// Features the circuit consumes
pub const USED_FEATURES: usize = 2;

/// The two-qubit scoring primitive
pub struct TwoQubitAnsatz;

impl MarginModel for TwoQubitAnsatz {
    fn parameter_count(&self) -> usize {
        4
    }

    fn init_parameters(&self, rng: &mut StdRng) -> Array1<f64> {
        Array1::from_shape_fn(4, |_| rng.gen::<f64>())
    }

    fn margin(&self, x: ArrayView1<f64>, params: &Array1<f64>) -> Result<f64, String> {
        // Datasets with a single feature pad the second angle with 0.
        let x0 = *x.get(0).unwrap_or(&0.0);
        let x1 = *x.get(1).unwrap_or(&0.0);

        let mut state = StateVector::zero_state(2);
        state.apply_single(&rx(x0), 0)?;
        state.apply_single(&ry(x1), 1)?;
        state.apply_single(&ry(params[0]), 0)?;
        state.apply_single(&ry(params[1]), 1)?;
        state.apply_cnot(0, 1)?;
        state.apply_single(&rx(params[2]), 0)?;
        state.apply_single(&rx(params[3]), 1)?;
        state.expectation_z(0)
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
    let epochs = config.usize_or("epochs", DEFAULT_EPOCHS);
    let lr = config.learning_rate_or(DEFAULT_LR);
    debug!(key, epochs, lr, "training two-qubit ansatz");

    let model = TwoQubitAnsatz;
    let ovr_config = OvrConfig {
        epochs,
        lr,
        batch_size: None,
        seed: DEFAULT_SEED,
    };

    let (proba, train_ms) = time_ms(|| -> Result<_, RunnerError> {
        let heads =
            ovr::train_one_vs_rest(&model, x_train, y_train, class_labels.len(), &ovr_config)
                .map_err(|e| RunnerError::training(key, e))?;
        let margins = ovr::margins_matrix(&model, &heads, x_test)
            .map_err(|e| RunnerError::training(key, e))?;
        Ok(ovr::softmax_rows(&margins))
    });

    let mut extras = ConfigMap::new();
    extras.insert("used_features".to_string(), USED_FEATURES.into());

    Ok(RunnerOutput {
        proba: proba?,
        timing: RunnerTiming {
            train_ms,
            infer_ms: 0.0,
        },
        extras,
    })
}
