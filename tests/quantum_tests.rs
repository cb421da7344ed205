// tests/quantum_tests.rs
//! Tests for the statevector and density-matrix simulators

use ndarray::array;
use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::{FRAC_PI_2, PI};

use qml_bench::quantum::{
    mat2_mul, pauli_x, rot, rx, ry, rz, DensityMatrix, StateVector,
};

/// Helper function for comparing floats with tolerance
fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Helper function for comparing complex numbers with tolerance
fn complex_approx_eq(a: Complex64, b: Complex64, epsilon: f64) -> bool {
    (a - b).norm() < epsilon
}

fn dagger(u: &Array2<Complex64>) -> Array2<Complex64> {
    array![
        [u[[0, 0]].conj(), u[[1, 0]].conj()],
        [u[[0, 1]].conj(), u[[1, 1]].conj()]
    ]
}

#[test]
fn test_rotation_gates_are_unitary() {
    let gates = [rx(0.7), ry(1.3), rz(-0.4), rot(0.3, 0.9, -1.1)];
    for gate in &gates {
        let product = mat2_mul(&dagger(gate), gate);
        assert!(complex_approx_eq(
            product[[0, 0]],
            Complex64::new(1.0, 0.0),
            1e-10
        ));
        assert!(complex_approx_eq(
            product[[1, 1]],
            Complex64::new(1.0, 0.0),
            1e-10
        ));
        assert!(complex_approx_eq(
            product[[0, 1]],
            Complex64::new(0.0, 0.0),
            1e-10
        ));
        assert!(complex_approx_eq(
            product[[1, 0]],
            Complex64::new(0.0, 0.0),
            1e-10
        ));
    }
}

#[test]
fn test_rot_composes_z_y_z() {
    let (phi, theta, omega) = (0.4, 1.2, -0.8);
    let expected = mat2_mul(&rz(omega), &mat2_mul(&ry(theta), &rz(phi)));
    let actual = rot(phi, theta, omega);
    for i in 0..2 {
        for j in 0..2 {
            assert!(complex_approx_eq(actual[[i, j]], expected[[i, j]], 1e-12));
        }
    }
}

#[test]
fn test_ry_rotates_zero_to_equal_superposition() {
    let mut state = StateVector::zero_state(1);
    state.apply_single(&ry(FRAC_PI_2), 0).unwrap();

    assert!(approx_eq(state.probability(0).unwrap(), 0.5, 1e-10));
    assert!(approx_eq(state.probability(1).unwrap(), 0.5, 1e-10));
    assert!(approx_eq(state.expectation_z(0).unwrap(), 0.0, 1e-10));
}

#[test]
fn test_expectation_z_matches_cosine() {
    for &theta in &[0.0, 0.3, 1.0, FRAC_PI_2, 2.5, PI] {
        let mut state = StateVector::zero_state(1);
        state.apply_single(&ry(theta), 0).unwrap();
        assert!(
            approx_eq(state.expectation_z(0).unwrap(), theta.cos(), 1e-10),
            "expectation mismatch at theta = {}",
            theta
        );
    }
}

#[test]
fn test_pauli_x_flips_target_qubit() {
    // Qubit 0 is the most significant bit, so flipping qubit 1 of |00>
    // lands on basis index 1.
    let mut state = StateVector::zero_state(2);
    state.apply_single(&pauli_x(), 1).unwrap();

    assert!(approx_eq(state.probability(0).unwrap(), 0.0, 1e-12));
    assert!(approx_eq(state.probability(1).unwrap(), 1.0, 1e-12));

    let mut other = StateVector::zero_state(2);
    other.apply_single(&pauli_x(), 0).unwrap();
    assert!(approx_eq(other.probability(2).unwrap(), 1.0, 1e-12));
}

#[test]
fn test_cnot_builds_bell_state() {
    let mut state = StateVector::zero_state(2);
    state.apply_single(&ry(FRAC_PI_2), 0).unwrap();
    state.apply_cnot(0, 1).unwrap();

    assert!(approx_eq(state.probability(0).unwrap(), 0.5, 1e-10));
    assert!(approx_eq(state.probability(3).unwrap(), 0.5, 1e-10));
    assert!(approx_eq(state.probability(1).unwrap(), 0.0, 1e-10));
    assert!(approx_eq(state.probability(2).unwrap(), 0.0, 1e-10));

    // Both marginals of a Bell state are unbiased.
    assert!(approx_eq(state.expectation_z(0).unwrap(), 0.0, 1e-10));
    assert!(approx_eq(state.expectation_z(1).unwrap(), 0.0, 1e-10));
}

#[test]
fn test_state_vector_rejects_bad_input() {
    let unnormalized = array![Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)];
    assert!(StateVector::new(1, unnormalized).is_err());

    let wrong_dim = array![Complex64::new(1.0, 0.0)];
    assert!(StateVector::new(1, wrong_dim).is_err());

    let state = StateVector::zero_state(2);
    assert!(state.probability(4).is_err());
    assert!(state.expectation_z(2).is_err());
}

#[test]
fn test_density_matrix_agrees_with_statevector() {
    let mut state = StateVector::zero_state(2);
    state.apply_single(&ry(0.8), 0).unwrap();
    state.apply_single(&rot(0.3, 1.1, -0.5), 1).unwrap();
    state.apply_cnot(0, 1).unwrap();

    let mut rho = DensityMatrix::zero_state(2);
    rho.apply_single(&ry(0.8), 0).unwrap();
    rho.apply_single(&rot(0.3, 1.1, -0.5), 1).unwrap();
    rho.apply_cnot(0, 1).unwrap();

    for qubit in 0..2 {
        assert!(approx_eq(
            state.expectation_z(qubit).unwrap(),
            rho.expectation_z(qubit).unwrap(),
            1e-10
        ));
    }

    let lifted = DensityMatrix::from_state_vector(&state);
    assert!(approx_eq(lifted.purity(), 1.0, 1e-10));
    assert!(complex_approx_eq(
        lifted.trace(),
        Complex64::new(1.0, 0.0),
        1e-10
    ));
}

#[test]
fn test_depolarize_preserves_trace_and_shrinks_z() {
    let mut rho = DensityMatrix::zero_state(1);
    rho.apply_single(&ry(1.0), 0).unwrap();
    let clean_z = rho.expectation_z(0).unwrap();
    assert!(approx_eq(rho.purity(), 1.0, 1e-10));

    let p = 0.2;
    rho.depolarize(0, p).unwrap();

    assert!(complex_approx_eq(
        rho.trace(),
        Complex64::new(1.0, 0.0),
        1e-10
    ));
    assert!(rho.purity() < 1.0 - 1e-6);

    // The channel contracts the Bloch vector by 1 - 4p/3.
    let expected_z = (1.0 - 4.0 * p / 3.0) * clean_z;
    assert!(approx_eq(rho.expectation_z(0).unwrap(), expected_z, 1e-10));
}

#[test]
fn test_depolarize_at_three_quarters_mixes_completely() {
    let mut rho = DensityMatrix::zero_state(1);
    rho.apply_single(&ry(0.3), 0).unwrap();
    rho.depolarize(0, 0.75).unwrap();

    assert!(approx_eq(rho.expectation_z(0).unwrap(), 0.0, 1e-10));
    assert!(approx_eq(rho.purity(), 0.5, 1e-10));
}

#[test]
fn test_depolarize_rejects_bad_probability() {
    let mut rho = DensityMatrix::zero_state(1);
    assert!(rho.depolarize(0, 1.5).is_err());
    assert!(rho.depolarize(0, -0.1).is_err());
    assert!(rho.depolarize(1, 0.1).is_err());
}

#[test]
fn test_sampled_expectation_is_seeded() {
    let mut state = StateVector::zero_state(1);
    state.apply_single(&ry(0.9), 0).unwrap();

    let mut rng_a = StdRng::seed_from_u64(7);
    let mut rng_b = StdRng::seed_from_u64(7);
    let a = state.sampled_expectation_z(0, 512, &mut rng_a).unwrap();
    let b = state.sampled_expectation_z(0, 512, &mut rng_b).unwrap();
    assert_eq!(a, b);

    // Enough shots to land near the analytic value.
    assert!(approx_eq(a, state.expectation_z(0).unwrap(), 0.2));

    // Zero shots falls back to the exact expectation.
    let mut rng_c = StdRng::seed_from_u64(7);
    let exact = state.sampled_expectation_z(0, 0, &mut rng_c).unwrap();
    assert!(approx_eq(exact, state.expectation_z(0).unwrap(), 1e-12));

    let mut rho = DensityMatrix::from_state_vector(&state);
    rho.depolarize(0, 0.1).unwrap();
    let mut rng_d = StdRng::seed_from_u64(11);
    let mut rng_e = StdRng::seed_from_u64(11);
    let d = rho.sampled_expectation_z(0, 256, &mut rng_d).unwrap();
    let e = rho.sampled_expectation_z(0, 256, &mut rng_e).unwrap();
    assert_eq!(d, e);
}
