// src/models/ovr.rs
//! One-vs-rest training protocol
//!
//! The multi-class decomposition shared by the circuit-scored runners.
//! For K classes it trains K independent binary discriminators against
//! +1/-1 pseudo-targets, minimizing mean squared margin error by
//! gradient descent, then stacks the K test margins and softmaxes them
//! into the probability matrix.
//!
//! The trainer is generic over the scoring primitive; gradients come
//! from the parameter-shift rule, which is exact for rotation-gate
//! parameters: d<Z>/dt = (<Z>(t + pi/2) - <Z>(t - pi/2)) / 2.

use std::f64::consts::FRAC_PI_2;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

/// Scoring primitive trained by the one-vs-rest protocol
pub trait MarginModel: Sync {
    /// Number of trainable parameters
    fn parameter_count(&self) -> usize;

    /// Draw the starting parameter vector
    fn init_parameters(&self, rng: &mut StdRng) -> Array1<f64>;

    /// Scalar score in [-1, 1] for one sample
    fn margin(&self, x: ArrayView1<f64>, params: &Array1<f64>) -> Result<f64, String>;

    /// d margin / d params via the parameter-shift rule
    fn margin_gradient(
        &self,
        x: ArrayView1<f64>,
        params: &Array1<f64>,
    ) -> Result<Array1<f64>, String> {
        let mut shifted = params.clone();
        let mut grad = Array1::zeros(params.len());
        for j in 0..params.len() {
            let original = shifted[j];
            shifted[j] = original + FRAC_PI_2;
            let plus = self.margin(x, &shifted)?;
            shifted[j] = original - FRAC_PI_2;
            let minus = self.margin(x, &shifted)?;
            shifted[j] = original;
            grad[j] = (plus - minus) / 2.0;
        }
        Ok(grad)
    }
}

/// Hyperparameters of one one-vs-rest fit
#[derive(Debug, Clone)]
pub struct OvrConfig {
    pub epochs: usize,
    pub lr: f64,
    /// Rows sampled per epoch without replacement; None trains full batch
    pub batch_size: Option<usize>,
    pub seed: u64,
}

/// Trained per-class parameter vectors
#[derive(Debug, Clone)]
pub struct OvrHeads {
    pub params: Vec<Array1<f64>>,
}

/// Train one discriminator per class. Classes run on the rayon pool;
/// per-class seeds derived from the base seed keep the result identical
/// to sequential execution.
pub fn train_one_vs_rest<M: MarginModel>(
    model: &M,
    x: ArrayView2<f64>,
    y: &[usize],
    n_classes: usize,
    config: &OvrConfig,
) -> Result<OvrHeads, String> {
    let params = (0..n_classes)
        .into_par_iter()
        .map(|class| train_class(model, x, y, class, config))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(OvrHeads { params })
}

fn train_class<M: MarginModel>(
    model: &M,
    x: ArrayView2<f64>,
    y: &[usize],
    class: usize,
    config: &OvrConfig,
) -> Result<Array1<f64>, String> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(class as u64));
    let mut params = model.init_parameters(&mut rng);
    let n = x.nrows();
    if n == 0 {
        return Ok(params);
    }

    let targets: Vec<f64> = y
        .iter()
        .map(|&c| if c == class { 1.0 } else { -1.0 })
        .collect();
    let mut rows: Vec<usize> = (0..n).collect();

    for epoch in 0..config.epochs {
        let batch: Vec<usize> = match config.batch_size {
            Some(b) if b < n => {
                rows.shuffle(&mut rng);
                rows[..b].to_vec()
            }
            _ => rows.clone(),
        };

        let mut grad = Array1::zeros(params.len());
        let mut loss = 0.0;
        for &i in &batch {
            let sample = x.row(i);
            let m = model.margin(sample, &params)?;
            let g = model.margin_gradient(sample, &params)?;
            let err = m - targets[i];
            loss += err * err;
            grad.scaled_add(2.0 * err / batch.len() as f64, &g);
        }
        params.scaled_add(-config.lr, &grad);

        if (epoch + 1) % 10 == 0 {
            debug!(class, epoch = epoch + 1, loss = loss / batch.len() as f64, "ovr epoch");
        }
    }
    Ok(params)
}

/// Margins for every test row and class: n_test x K
pub fn margins_matrix<M: MarginModel>(
    model: &M,
    heads: &OvrHeads,
    x: ArrayView2<f64>,
) -> Result<Array2<f64>, String> {
    let k = heads.params.len();
    let columns = heads
        .params
        .par_iter()
        .map(|p| {
            x.axis_iter(Axis(0))
                .map(|row| model.margin(row, p))
                .collect::<Result<Vec<f64>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Array2::zeros((x.nrows(), k));
    for (c, column) in columns.iter().enumerate() {
        for (i, &v) in column.iter().enumerate() {
            out[[i, c]] = v;
        }
    }
    Ok(out)
}

/// Row-wise softmax at temperature 1. Margins are bounded, so the plain
/// exponential is safe here.
pub fn softmax_rows(margins: &Array2<f64>) -> Array2<f64> {
    let mut out = margins.mapv(f64::exp);
    for mut row in out.axis_iter_mut(Axis(0)) {
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
