// src/quantum/gate.rs
//! Single-qubit gate matrices
//!
//! This module builds the 2x2 unitaries used by the circuit ansatze as
//! `Array2<Complex64>`. Rotation conventions follow the usual exponential
//! form, e.g. RY(theta) = exp(-i theta Y / 2).

use ndarray::{array, Array2};
use num_complex::Complex64;

/// Common complex numbers used in gate construction
pub mod constants {
    use num_complex::Complex64;

    /// The imaginary unit i
    pub const I: Complex64 = Complex64::new(0.0, 1.0);

    /// The real unit
    pub const ONE: Complex64 = Complex64::new(1.0, 0.0);

    /// Complex zero
    pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);
}

use constants::{I, ONE, ZERO};

/// Pauli X matrix
pub fn pauli_x() -> Array2<Complex64> {
    array![[ZERO, ONE], [ONE, ZERO]]
}

/// Pauli Y matrix
pub fn pauli_y() -> Array2<Complex64> {
    array![[ZERO, -I], [I, ZERO]]
}

/// Pauli Z matrix
pub fn pauli_z() -> Array2<Complex64> {
    array![[ONE, ZERO], [ZERO, -ONE]]
}

/// Rotation about the X axis: RX(theta) = exp(-i theta X / 2)
pub fn rx(theta: f64) -> Array2<Complex64> {
    let (sin, cos) = (theta / 2.0).sin_cos();
    array![
        [Complex64::new(cos, 0.0), Complex64::new(0.0, -sin)],
        [Complex64::new(0.0, -sin), Complex64::new(cos, 0.0)]
    ]
}

/// Rotation about the Y axis: RY(theta) = exp(-i theta Y / 2)
pub fn ry(theta: f64) -> Array2<Complex64> {
    let (sin, cos) = (theta / 2.0).sin_cos();
    array![
        [Complex64::new(cos, 0.0), Complex64::new(-sin, 0.0)],
        [Complex64::new(sin, 0.0), Complex64::new(cos, 0.0)]
    ]
}

/// Rotation about the Z axis: RZ(theta) = exp(-i theta Z / 2)
pub fn rz(theta: f64) -> Array2<Complex64> {
    let half = theta / 2.0;
    array![
        [(-I * half).exp(), ZERO],
        [ZERO, (I * half).exp()]
    ]
}

/// General single-qubit rotation RZ(omega) RY(theta) RZ(phi)
pub fn rot(phi: f64, theta: f64, omega: f64) -> Array2<Complex64> {
    mat2_mul(&rz(omega), &mat2_mul(&ry(theta), &rz(phi)))
}

/// Multiply two 2x2 complex matrices
pub fn mat2_mul(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    array![
        [
            a[[0, 0]] * b[[0, 0]] + a[[0, 1]] * b[[1, 0]],
            a[[0, 0]] * b[[0, 1]] + a[[0, 1]] * b[[1, 1]]
        ],
        [
            a[[1, 0]] * b[[0, 0]] + a[[1, 1]] * b[[1, 0]],
            a[[1, 0]] * b[[0, 1]] + a[[1, 1]] * b[[1, 1]]
        ]
    ]
}
