// src/quantum/state.rs
//! Pure-state simulation
//!
//! This module holds the statevector evaluator the noiseless circuit
//! ansatze run on. Gates are applied in place to targeted qubits rather
//! than through full 2^n x 2^n matrices.
//!
//! Qubit indexing is big-endian: qubit 0 is the most significant bit of
//! the basis-state index.

use ndarray::Array1;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::Rng;

/// State vector representation of an n-qubit pure state
#[derive(Clone, Debug)]
pub struct StateVector {
    /// Number of qubits
    qubit_count: usize,

    /// The state vector as an array of complex amplitudes
    amplitudes: Array1<Complex64>,
}

impl StateVector {
    /// Create a state vector from explicit amplitudes
    pub fn new(qubit_count: usize, amplitudes: Array1<Complex64>) -> Result<Self, String> {
        let expected_dim = 1 << qubit_count;

        if amplitudes.len() != expected_dim {
            return Err(format!(
                "State vector dimension mismatch: expected {}, got {}",
                expected_dim,
                amplitudes.len()
            ));
        }

        let norm_sqr: f64 = amplitudes.iter().map(|a| a.norm_sqr()).sum();
        if (norm_sqr - 1.0).abs() > 1e-10 {
            return Err(format!(
                "State vector not normalized: norm^2 = {}",
                norm_sqr
            ));
        }

        Ok(StateVector {
            qubit_count,
            amplitudes,
        })
    }

    /// The |0...0> state on `qubit_count` qubits
    pub fn zero_state(qubit_count: usize) -> Self {
        let dim = 1 << qubit_count;
        let mut amplitudes = Array1::zeros(dim);
        amplitudes[0] = Complex64::new(1.0, 0.0);
        StateVector {
            qubit_count,
            amplitudes,
        }
    }

    /// Returns the number of qubits
    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    /// Returns the dimension of the Hilbert space (2^n for n qubits)
    pub fn dimension(&self) -> usize {
        1 << self.qubit_count
    }

    /// Returns the amplitudes of the state vector
    pub fn amplitudes(&self) -> &Array1<Complex64> {
        &self.amplitudes
    }

    /// Probability of measuring the computational basis state `index`
    pub fn probability(&self, index: usize) -> Result<f64, String> {
        if index >= self.dimension() {
            return Err(format!(
                "Index {} out of bounds for dimension {}",
                index,
                self.dimension()
            ));
        }
        Ok(self.amplitudes[index].norm_sqr())
    }

    fn qubit_stride(&self, qubit: usize) -> usize {
        1 << (self.qubit_count - 1 - qubit)
    }

    /// Apply a 2x2 unitary to a single qubit, in place
    pub fn apply_single(
        &mut self,
        gate: &ndarray::Array2<Complex64>,
        qubit: usize,
    ) -> Result<(), String> {
        if qubit >= self.qubit_count {
            return Err(format!(
                "Qubit index {} out of bounds for {} qubits",
                qubit, self.qubit_count
            ));
        }

        let stride = self.qubit_stride(qubit);
        let (g00, g01) = (gate[[0, 0]], gate[[0, 1]]);
        let (g10, g11) = (gate[[1, 0]], gate[[1, 1]]);

        for i in 0..self.dimension() {
            if i & stride == 0 {
                let j = i | stride;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = g00 * a + g01 * b;
                self.amplitudes[j] = g10 * a + g11 * b;
            }
        }
        Ok(())
    }

    /// Apply CNOT with the given control and target qubits, in place
    pub fn apply_cnot(&mut self, control: usize, target: usize) -> Result<(), String> {
        if control >= self.qubit_count || target >= self.qubit_count {
            return Err(format!(
                "CNOT indices ({}, {}) out of bounds for {} qubits",
                control, target, self.qubit_count
            ));
        }
        if control == target {
            return Err("CNOT control and target must differ".to_string());
        }

        let c_stride = self.qubit_stride(control);
        let t_stride = self.qubit_stride(target);

        for i in 0..self.dimension() {
            if i & c_stride != 0 && i & t_stride == 0 {
                self.amplitudes.swap(i, i | t_stride);
            }
        }
        Ok(())
    }

    /// Analytic expectation value of Pauli Z on one qubit
    ///
    /// Computed from measurement probabilities directly: p(0) - p(1).
    pub fn expectation_z(&self, qubit: usize) -> Result<f64, String> {
        if qubit >= self.qubit_count {
            return Err(format!(
                "Qubit index {} out of bounds for {} qubits",
                qubit, self.qubit_count
            ));
        }

        let stride = self.qubit_stride(qubit);
        let mut value = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            let sign = if i & stride == 0 { 1.0 } else { -1.0 };
            value += sign * amp.norm_sqr();
        }
        Ok(value)
    }

    /// Finite-shot estimate of <Z> on one qubit
    pub fn sampled_expectation_z(
        &self,
        qubit: usize,
        shots: usize,
        rng: &mut StdRng,
    ) -> Result<f64, String> {
        if shots == 0 {
            return self.expectation_z(qubit);
        }

        let stride = self.qubit_stride(qubit);
        let p_one: f64 = self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & stride != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum();

        let ones = (0..shots).filter(|_| rng.gen::<f64>() < p_one).count();
        Ok(1.0 - 2.0 * ones as f64 / shots as f64)
    }
}
