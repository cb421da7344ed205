// src/quantum/density_matrix.rs
//! Mixed-state simulation
//!
//! The layered ansatz supports a depolarizing noise channel, which takes
//! the state out of the pure-state manifold. This module evolves the full
//! density matrix instead: unitaries act as U rho U^dag and the channel
//! mixes in Pauli-conjugated copies of rho.
//!
//! Qubit indexing matches `StateVector` (big-endian).

use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::Rng;

use super::gate::{pauli_x, pauli_y, pauli_z};
use super::state::StateVector;

/// Represents an n-qubit quantum state as a density matrix
#[derive(Clone, Debug)]
pub struct DensityMatrix {
    /// Number of qubits
    qubit_count: usize,

    /// The density matrix as a 2D array of complex values
    matrix: Array2<Complex64>,
}

impl DensityMatrix {
    /// The |0...0><0...0| state on `qubit_count` qubits
    pub fn zero_state(qubit_count: usize) -> Self {
        let dim = 1 << qubit_count;
        let mut matrix = Array2::zeros((dim, dim));
        matrix[[0, 0]] = Complex64::new(1.0, 0.0);
        DensityMatrix {
            qubit_count,
            matrix,
        }
    }

    /// Create a density matrix from a pure state: rho = |psi><psi|
    pub fn from_state_vector(state: &StateVector) -> Self {
        let dim = state.dimension();
        let mut matrix = Array2::zeros((dim, dim));
        let amps = state.amplitudes();

        for i in 0..dim {
            for j in 0..dim {
                matrix[[i, j]] = amps[i] * amps[j].conj();
            }
        }

        DensityMatrix {
            qubit_count: state.qubit_count(),
            matrix,
        }
    }

    /// Returns the number of qubits
    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    /// Returns the dimension of the Hilbert space
    pub fn dimension(&self) -> usize {
        1 << self.qubit_count
    }

    /// Returns the underlying matrix
    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    /// Trace of the density matrix (1 for a valid state)
    pub fn trace(&self) -> Complex64 {
        (0..self.dimension()).map(|i| self.matrix[[i, i]]).sum()
    }

    /// Purity tr(rho^2); 1 for pure states, 1/2^n for maximally mixed
    pub fn purity(&self) -> f64 {
        let dim = self.dimension();
        let mut p = Complex64::new(0.0, 0.0);
        for i in 0..dim {
            for j in 0..dim {
                p += self.matrix[[i, j]] * self.matrix[[j, i]];
            }
        }
        p.re
    }

    fn qubit_stride(&self, qubit: usize) -> usize {
        1 << (self.qubit_count - 1 - qubit)
    }

    /// Apply a 2x2 unitary to one qubit: rho -> U rho U^dag
    pub fn apply_single(
        &mut self,
        gate: &Array2<Complex64>,
        qubit: usize,
    ) -> Result<(), String> {
        if qubit >= self.qubit_count {
            return Err(format!(
                "Qubit index {} out of bounds for {} qubits",
                qubit, self.qubit_count
            ));
        }

        let dim = self.dimension();
        let stride = self.qubit_stride(qubit);
        let (g00, g01) = (gate[[0, 0]], gate[[0, 1]]);
        let (g10, g11) = (gate[[1, 0]], gate[[1, 1]]);

        // Left multiply: rho -> U rho
        for col in 0..dim {
            for row in 0..dim {
                if row & stride == 0 {
                    let r1 = row | stride;
                    let a = self.matrix[[row, col]];
                    let b = self.matrix[[r1, col]];
                    self.matrix[[row, col]] = g00 * a + g01 * b;
                    self.matrix[[r1, col]] = g10 * a + g11 * b;
                }
            }
        }

        // Right multiply: rho -> rho U^dag
        for row in 0..dim {
            for col in 0..dim {
                if col & stride == 0 {
                    let c1 = col | stride;
                    let a = self.matrix[[row, col]];
                    let b = self.matrix[[row, c1]];
                    self.matrix[[row, col]] = a * g00.conj() + b * g01.conj();
                    self.matrix[[row, c1]] = a * g10.conj() + b * g11.conj();
                }
            }
        }
        Ok(())
    }

    /// Apply CNOT: rho -> U rho U^dag with U the controlled-X permutation
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

        let dim = self.dimension();
        let c_stride = self.qubit_stride(control);
        let t_stride = self.qubit_stride(target);

        // Permute rows, then columns
        for col in 0..dim {
            for row in 0..dim {
                if row & c_stride != 0 && row & t_stride == 0 {
                    let r1 = row | t_stride;
                    let tmp = self.matrix[[row, col]];
                    self.matrix[[row, col]] = self.matrix[[r1, col]];
                    self.matrix[[r1, col]] = tmp;
                }
            }
        }
        for row in 0..dim {
            for col in 0..dim {
                if col & c_stride != 0 && col & t_stride == 0 {
                    let c1 = col | t_stride;
                    let tmp = self.matrix[[row, col]];
                    self.matrix[[row, col]] = self.matrix[[row, c1]];
                    self.matrix[[row, c1]] = tmp;
                }
            }
        }
        Ok(())
    }

    /// Single-qubit depolarizing channel with probability `p`:
    /// rho -> (1 - p) rho + p/3 (X rho X + Y rho Y + Z rho Z)
    pub fn depolarize(&mut self, qubit: usize, p: f64) -> Result<(), String> {
        if !(0.0..=1.0).contains(&p) {
            return Err(format!("Depolarizing probability {} outside [0, 1]", p));
        }
        if p == 0.0 {
            return Ok(());
        }

        let mut mixed = &self.matrix * Complex64::new(1.0 - p, 0.0);
        for pauli in [pauli_x(), pauli_y(), pauli_z()] {
            let mut branch = self.clone();
            branch.apply_single(&pauli, qubit)?;
            mixed += &(&branch.matrix * Complex64::new(p / 3.0, 0.0));
        }
        self.matrix = mixed;
        Ok(())
    }

    /// Analytic expectation value of Pauli Z on one qubit: tr(rho Z_q)
    pub fn expectation_z(&self, qubit: usize) -> Result<f64, String> {
        if qubit >= self.qubit_count {
            return Err(format!(
                "Qubit index {} out of bounds for {} qubits",
                qubit, self.qubit_count
            ));
        }

        let stride = self.qubit_stride(qubit);
        let mut value = 0.0;
        for i in 0..self.dimension() {
            let sign = if i & stride == 0 { 1.0 } else { -1.0 };
            value += sign * self.matrix[[i, i]].re;
        }
        Ok(value)
    }

    /// Finite-shot estimate of <Z> on one qubit from the diagonal
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
        let p_one: f64 = (0..self.dimension())
            .filter(|i| i & stride != 0)
            .map(|i| self.matrix[[i, i]].re.max(0.0))
            .sum();
        let p_one = p_one.clamp(0.0, 1.0);

        let ones = (0..shots).filter(|_| rng.gen::<f64>() < p_one).count();
        Ok(1.0 - 2.0 * ones as f64 / shots as f64)
    }
}
