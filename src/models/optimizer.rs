// src/models/optimizer.rs
//! First-order optimizers for the in-crate trainers
//!
//! One Adam instance owns the moment state for one parameter tensor;
//! trainers hold an instance per tensor and call `step` once per batch.

use ndarray::{Array, Dimension};

/// Adam with bias-corrected first and second moments
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: usize,
}

impl Adam {
    /// Standard betas (0.9, 0.999) and epsilon 1e-8
    pub fn new(learning_rate: f64, parameter_count: usize) -> Self {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            m: vec![0.0; parameter_count],
            v: vec![0.0; parameter_count],
            t: 0,
        }
    }

    /// Apply one update to a parameter tensor given its gradient
    pub fn step<D: Dimension>(&mut self, params: &mut Array<f64, D>, grads: &Array<f64, D>) {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias2 = 1.0 - self.beta2.powi(self.t as i32);

        for (i, (p, &g)) in params.iter_mut().zip(grads.iter()).enumerate() {
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}
