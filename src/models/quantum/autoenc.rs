// src/models/quantum/autoenc.rs
//! Autoencoder-compressed circuit runner (`aec_qnn`, `neural` feature)
//!
//! Two stages: a dense autoencoder squeezes the standardized features
//! into a narrow code, then the layered ansatz trains one-vs-rest on
//! the encoded rows. Keeps wide datasets inside simulable qubit counts.

use ndarray::ArrayView2;
use tracing::debug;

use crate::models::quantum::vqc::{self, VqcParams};
use crate::models::{time_ms, ConfigMap, RunnerConfig, RunnerError, RunnerOutput, RunnerTiming};
use crate::neural::{Autoencoder, NET_SEED};

pub const DEFAULT_ENCODING_DIM: usize = 4;
pub const DEFAULT_AE_EPOCHS: usize = 20;
pub const DEFAULT_AE_LR: f64 = 1e-3;
pub const DEFAULT_AE_BATCH: usize = 32;

/// Qubit range the encoded width is clamped into
const MIN_QUBITS: usize = 2;
const MAX_QUBITS: usize = 6;

pub(crate) fn run(
    key: &str,
    x_train: ArrayView2<f64>,
    y_train: &[usize],
    x_test: ArrayView2<f64>,
    config: &RunnerConfig,
    class_labels: &[String],
) -> Result<RunnerOutput, RunnerError> {
    let d = x_train.ncols();
    let encoding_dim = config
        .usize_or("encoding_dim", d.min(DEFAULT_ENCODING_DIM))
        .max(1);
    let ae_epochs = config.usize_or("ae_epochs", DEFAULT_AE_EPOCHS);
    let ae_lr = config.f64_or("ae_lr", DEFAULT_AE_LR);
    let ae_batch = config.usize_or("ae_batch_size", DEFAULT_AE_BATCH).max(1);

    // The circuit width follows the code width, not the raw features.
    let mut params = VqcParams::from_config(config);
    params.n_qubits = encoding_dim.clamp(MIN_QUBITS, MAX_QUBITS);
    debug!(
        key,
        encoding_dim,
        ae_epochs,
        n_qubits = params.n_qubits,
        q_epochs = params.epochs,
        "training autoencoded circuit"
    );

    let mut autoencoder = Autoencoder::new(d, encoding_dim, NET_SEED);
    let ((), ae_ms) = time_ms(|| {
        autoencoder.fit(x_train, ae_epochs, ae_lr, ae_batch, NET_SEED);
    });
    let encoded_train = autoencoder.encode(x_train);
    let encoded_test = autoencoder.encode(x_test);

    let (proba, q_ms) = time_ms(|| {
        vqc::fit_predict(
            key,
            encoded_train.view(),
            y_train,
            encoded_test.view(),
            class_labels.len(),
            &params,
        )
    });

    let mut extras = ConfigMap::new();
    extras.insert("encoding_dim".to_string(), encoding_dim.into());

    Ok(RunnerOutput {
        proba: proba?,
        timing: RunnerTiming {
            train_ms: ae_ms + q_ms,
            infer_ms: 0.0,
        },
        extras,
    })
}
