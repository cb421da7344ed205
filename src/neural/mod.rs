// src/neural/mod.rs
//! Dense tensor-gradient engine (`neural` feature)
//!
//! The heavier training backend behind `mlp_torch`, `hybrid_torch` and
//! `aec_qnn`: seeded Xavier-initialized dense layers, configurable
//! depth, inverted dropout, Adam, softmax cross-entropy and MSE heads.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::optimizer::Adam;
use crate::models::{gather_rows, one_hot, stable_softmax_rows};

/// Seed for network initialization and batch shuffling
pub const NET_SEED: u64 = 42;

/// Layer activations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Identity,
}

impl Activation {
    fn apply(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Identity => z.clone(),
        }
    }

    /// Zero out gradient entries where the activation was flat
    fn mask_gradient(&self, delta: &mut Array2<f64>, z: &Array2<f64>) {
        if let Activation::Relu = self {
            delta.zip_mut_with(z, |d, &zv| {
                if zv <= 0.0 {
                    *d = 0.0;
                }
            });
        }
    }
}

/// One dense layer
pub struct Dense {
    pub w: Array2<f64>,
    pub b: Array1<f64>,
    pub activation: Activation,
}

impl Dense {
    pub fn new(n_in: usize, n_out: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let bound = (6.0 / (n_in + n_out) as f64).sqrt();
        Dense {
            w: Array2::from_shape_fn((n_in, n_out), |_| rng.gen_range(-bound..bound)),
            b: Array1::zeros(n_out),
            activation,
        }
    }

    /// Pre-activation output
    pub fn affine(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let mut z = x.dot(&self.w);
        for mut row in z.axis_iter_mut(Axis(0)) {
            row += &self.b;
        }
        z
    }
}

/// A stack of dense layers; the last layer is the raw head output
pub struct Network {
    pub layers: Vec<Dense>,
}

impl Network {
    /// Classifier topology: relu hidden layers, identity logits head
    pub fn classifier(n_features: usize, hidden: &[usize], n_classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut dims = vec![n_features];
        dims.extend_from_slice(hidden);
        dims.push(n_classes);

        let layers = (0..dims.len() - 1)
            .map(|i| {
                let act = if i + 2 == dims.len() {
                    Activation::Identity
                } else {
                    Activation::Relu
                };
                Dense::new(dims[i], dims[i + 1], act, &mut rng)
            })
            .collect();
        Network { layers }
    }

    /// Forward pass without dropout; returns the head output
    pub fn forward(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let mut a = x.to_owned();
        for layer in &self.layers {
            a = layer.activation.apply(&layer.affine(a.view()));
        }
        a
    }

    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Array2<f64> {
        stable_softmax_rows(&self.forward(x))
    }

    /// Minibatch training on softmax cross-entropy with optional
    /// inverted dropout on hidden activations
    #[allow(clippy::too_many_arguments)]
    pub fn fit_classifier(
        &mut self,
        x: ArrayView2<f64>,
        y: &[usize],
        epochs: usize,
        lr: f64,
        batch_size: usize,
        dropout: f64,
        seed: u64,
    ) {
        let n = x.nrows();
        if n == 0 || self.layers.is_empty() {
            return;
        }
        let k = self.layers[self.layers.len() - 1].b.len();
        let dropout = dropout.clamp(0.0, 0.99);
        let batch_size = batch_size.clamp(1, n);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n).collect();

        let mut optimizers: Vec<(Adam, Adam)> = self
            .layers
            .iter()
            .map(|l| (Adam::new(lr, l.w.len()), Adam::new(lr, l.b.len())))
            .collect();

        for _epoch in 0..epochs {
            indices.shuffle(&mut rng);
            for chunk in indices.chunks(batch_size) {
                let xb = gather_rows(x, chunk);
                let yb: Vec<usize> = chunk.iter().map(|&i| y[i]).collect();
                let targets = one_hot(&yb, k);
                let bs = chunk.len() as f64;

                // Forward with caches
                let mut pre: Vec<Array2<f64>> = Vec::with_capacity(self.layers.len());
                let mut act: Vec<Array2<f64>> = vec![xb];
                let mut masks: Vec<Option<Array2<f64>>> = Vec::with_capacity(self.layers.len());
                for (li, layer) in self.layers.iter().enumerate() {
                    let z = layer.affine(act[li].view());
                    let mut a = layer.activation.apply(&z);
                    let mask = if dropout > 0.0 && li + 1 < self.layers.len() {
                        let keep = 1.0 - dropout;
                        let m = Array2::from_shape_fn(a.raw_dim(), |_| {
                            if rng.gen::<f64>() < keep {
                                1.0 / keep
                            } else {
                                0.0
                            }
                        });
                        a *= &m;
                        Some(m)
                    } else {
                        None
                    };
                    pre.push(z);
                    act.push(a);
                    masks.push(mask);
                }

                // Backward
                let probs = stable_softmax_rows(&act[self.layers.len()]);
                let mut delta = (&probs - &targets) / bs;
                for li in (0..self.layers.len()).rev() {
                    let grad_w = act[li].t().dot(&delta);
                    let grad_b = delta.sum_axis(Axis(0));

                    if li > 0 {
                        let mut next = delta.dot(&self.layers[li].w.t());
                        if let Some(mask) = &masks[li - 1] {
                            next *= mask;
                        }
                        self.layers[li - 1]
                            .activation
                            .mask_gradient(&mut next, &pre[li - 1]);
                        delta = next;
                    }

                    let (opt_w, opt_b) = &mut optimizers[li];
                    opt_w.step(&mut self.layers[li].w, &grad_w);
                    opt_b.step(&mut self.layers[li].b, &grad_b);
                }
            }
        }
    }
}

/// Relu encoder to a narrow code, linear decoder back, MSE objective
pub struct Autoencoder {
    pub encoder: Dense,
    pub decoder: Dense,
}

impl Autoencoder {
    pub fn new(n_features: usize, encoding_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Autoencoder {
            encoder: Dense::new(n_features, encoding_dim, Activation::Relu, &mut rng),
            decoder: Dense::new(encoding_dim, n_features, Activation::Identity, &mut rng),
        }
    }

    pub fn encode(&self, x: ArrayView2<f64>) -> Array2<f64> {
        self.encoder.activation.apply(&self.encoder.affine(x))
    }

    pub fn fit(
        &mut self,
        x: ArrayView2<f64>,
        epochs: usize,
        lr: f64,
        batch_size: usize,
        seed: u64,
    ) {
        let n = x.nrows();
        let d = x.ncols().max(1);
        if n == 0 {
            return;
        }
        let batch_size = batch_size.clamp(1, n);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n).collect();

        let mut opt_ew = Adam::new(lr, self.encoder.w.len());
        let mut opt_eb = Adam::new(lr, self.encoder.b.len());
        let mut opt_dw = Adam::new(lr, self.decoder.w.len());
        let mut opt_db = Adam::new(lr, self.decoder.b.len());

        for _epoch in 0..epochs {
            indices.shuffle(&mut rng);
            for chunk in indices.chunks(batch_size) {
                let xb = gather_rows(x, chunk);
                let bs = chunk.len() as f64;

                let z_enc = self.encoder.affine(xb.view());
                let code = self.encoder.activation.apply(&z_enc);
                let recon = self.decoder.affine(code.view());

                // d MSE / d recon, averaged over every element
                let delta = (&recon - &xb) * (2.0 / (bs * d as f64));
                let grad_dw = code.t().dot(&delta);
                let grad_db = delta.sum_axis(Axis(0));

                let mut delta_code = delta.dot(&self.decoder.w.t());
                self.encoder
                    .activation
                    .mask_gradient(&mut delta_code, &z_enc);
                let grad_ew = xb.t().dot(&delta_code);
                let grad_eb = delta_code.sum_axis(Axis(0));

                opt_ew.step(&mut self.encoder.w, &grad_ew);
                opt_eb.step(&mut self.encoder.b, &grad_eb);
                opt_dw.step(&mut self.decoder.w, &grad_dw);
                opt_db.step(&mut self.decoder.b, &grad_db);
            }
        }
    }
}
