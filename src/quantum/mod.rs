// src/quantum/mod.rs
//! Circuit simulation primitives
//!
//! This module implements the two evaluators the quantum-family runners
//! are scored on: a statevector simulator for noiseless circuits and a
//! density-matrix simulator for circuits with a depolarizing channel.

pub mod density_matrix;
pub mod gate;
pub mod state;

pub use density_matrix::DensityMatrix;
pub use gate::{mat2_mul, pauli_x, pauli_y, pauli_z, rot, rx, ry, rz};
pub use state::StateVector;

/// Re-export commonly used types
pub mod prelude {
    pub use super::{DensityMatrix, StateVector};
    pub use super::{rot, rx, ry, rz};
}
