// src/models/classical/deep.rs
//! Deep MLP runner (`mlp_torch`, `neural` feature)
//!
//! Arbitrary-depth relu stack from the dense engine, with inverted
//! dropout. Defaults mirror the lighter `mlp` runner scaled up: two
//! hidden layers of 64 and a larger batch.

use ndarray::ArrayView2;
use tracing::debug;

use crate::models::{time_ms, ConfigMap, RunnerConfig, RunnerError, RunnerOutput, RunnerTiming};
use crate::neural::{Network, NET_SEED};

pub const DEFAULT_HIDDEN: [usize; 2] = [64, 64];
pub const DEFAULT_EPOCHS: usize = 20;
pub const DEFAULT_LR: f64 = 1e-3;
pub const DEFAULT_BATCH: usize = 64;

pub(crate) fn run(
    key: &str,
    x_train: ArrayView2<f64>,
    y_train: &[usize],
    x_test: ArrayView2<f64>,
    config: &RunnerConfig,
    class_labels: &[String],
) -> Result<RunnerOutput, RunnerError> {
    let hidden = config
        .usize_list("hidden")
        .filter(|h| !h.is_empty() && h.iter().all(|&w| w > 0))
        .unwrap_or_else(|| DEFAULT_HIDDEN.to_vec());
    let epochs = config.usize_or("epochs", DEFAULT_EPOCHS);
    let lr = config.learning_rate_or(DEFAULT_LR);
    let batch_size = config.usize_or("batch_size", DEFAULT_BATCH).max(1);
    let dropout = config.f64_or("dropout", 0.0);
    debug!(key, ?hidden, epochs, lr, batch_size, dropout, "training deep mlp");

    if class_labels.is_empty() {
        return Err(RunnerError::training(key, "no classes to fit"));
    }

    let mut net = Network::classifier(x_train.ncols(), &hidden, class_labels.len(), NET_SEED);
    let ((), train_ms) = time_ms(|| {
        net.fit_classifier(x_train, y_train, epochs, lr, batch_size, dropout, NET_SEED);
    });
    let (proba, infer_ms) = time_ms(|| net.predict_proba(x_test));

    let mut extras = ConfigMap::new();
    extras.insert("hidden".to_string(), hidden.into());

    Ok(RunnerOutput {
        proba,
        timing: RunnerTiming { train_ms, infer_ms },
        extras,
    })
}
