// tests/ovr_tests.rs
//! Tests for the one-vs-rest trainer and the circuit scoring primitives

use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use qml_bench::models::quantum::{LayeredAnsatz, TwoQubitAnsatz, VqcParams};
use qml_bench::models::{
    margins_matrix, softmax_rows, train_one_vs_rest, MarginModel, OvrConfig,
};

/// Helper function for comparing floats with tolerance
fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn noiseless_params() -> VqcParams {
    VqcParams {
        n_qubits: 2,
        layers: 2,
        epochs: 5,
        lr: 0.08,
        noise_prob: 0.0,
        shots: 0,
        batch_size: 32,
        seed: 7,
    }
}

/// A tiny linearly separable two-class problem on two features.
fn toy_problem() -> (Array2<f64>, Vec<usize>) {
    let x = array![
        [0.9, 0.8],
        [1.1, 0.7],
        [0.8, 1.2],
        [1.0, 1.0],
        [1.2, 0.9],
        [0.7, 1.1],
        [-0.9, -0.8],
        [-1.1, -0.7],
        [-0.8, -1.2],
        [-1.0, -1.0],
        [-1.2, -0.9],
        [-0.7, -1.1],
    ];
    let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];
    (x, y)
}

#[test]
fn test_margins_stay_in_unit_interval() {
    let model = TwoQubitAnsatz;
    let params = array![0.4, -0.2, 0.9, 0.1];
    for &(a, b) in &[(0.0, 0.0), (1.5, -2.0), (-3.0, 0.7), (6.0, 6.0)] {
        let x = array![a, b];
        let m = model.margin(x.view(), &params).unwrap();
        assert!((-1.0..=1.0).contains(&m), "margin {} out of range", m);
    }

    let ansatz = LayeredAnsatz::new(3, &noiseless_params());
    let mut rng = StdRng::seed_from_u64(3);
    let theta = ansatz.init_parameters(&mut rng);
    let x = array![0.3, -1.2, 0.5];
    let m = ansatz.margin(x.view(), &theta).unwrap();
    assert!((-1.0..=1.0).contains(&m));
}

#[test]
fn test_parameter_shift_matches_finite_difference() {
    let h = 1e-5;

    let model = TwoQubitAnsatz;
    let x = array![0.7, -0.3];
    let params = array![0.4, -0.2, 0.9, 0.1];
    let analytic = model.margin_gradient(x.view(), &params).unwrap();
    for j in 0..params.len() {
        let mut plus = params.clone();
        plus[j] += h;
        let mut minus = params.clone();
        minus[j] -= h;
        let numeric = (model.margin(x.view(), &plus).unwrap()
            - model.margin(x.view(), &minus).unwrap())
            / (2.0 * h);
        assert!(
            approx_eq(analytic[j], numeric, 1e-6),
            "param {}: shift {} vs fd {}",
            j,
            analytic[j],
            numeric
        );
    }

    let ansatz = LayeredAnsatz::new(3, &noiseless_params());
    let mut rng = StdRng::seed_from_u64(3);
    let theta = ansatz.init_parameters(&mut rng);
    let x = array![0.3, -1.2, 0.5];
    let analytic = ansatz.margin_gradient(x.view(), &theta).unwrap();
    assert_eq!(analytic.len(), ansatz.parameter_count());
    for j in 0..theta.len() {
        let mut plus = theta.clone();
        plus[j] += h;
        let mut minus = theta.clone();
        minus[j] -= h;
        let numeric = (ansatz.margin(x.view(), &plus).unwrap()
            - ansatz.margin(x.view(), &minus).unwrap())
            / (2.0 * h);
        assert!(
            approx_eq(analytic[j], numeric, 1e-6),
            "param {}: shift {} vs fd {}",
            j,
            analytic[j],
            numeric
        );
    }
}

#[test]
fn test_training_is_deterministic() {
    let (x, y) = toy_problem();
    let config = OvrConfig {
        epochs: 10,
        lr: 0.1,
        batch_size: None,
        seed: 7,
    };
    let model = TwoQubitAnsatz;

    let first = train_one_vs_rest(&model, x.view(), &y, 2, &config).unwrap();
    let second = train_one_vs_rest(&model, x.view(), &y, 2, &config).unwrap();

    assert_eq!(first.params.len(), 2);
    for (a, b) in first.params.iter().zip(&second.params) {
        assert_eq!(a, b);
    }

    let ma = margins_matrix(&model, &first, x.view()).unwrap();
    let mb = margins_matrix(&model, &second, x.view()).unwrap();
    assert_eq!(ma, mb);
}

#[test]
fn test_per_class_heads_start_from_distinct_seeds() {
    let (x, y) = toy_problem();
    let config = OvrConfig {
        epochs: 0,
        lr: 0.1,
        batch_size: None,
        seed: 7,
    };
    let heads = train_one_vs_rest(&TwoQubitAnsatz, x.view(), &y, 3, &config).unwrap();
    assert_eq!(heads.params.len(), 3);
    assert_ne!(heads.params[0], heads.params[1]);
    assert_ne!(heads.params[1], heads.params[2]);
}

#[test]
fn test_softmax_rows_are_probabilities() {
    let margins = array![[0.9, -0.4, 0.1], [-1.0, -1.0, -1.0], [0.0, 0.5, -0.5]];
    let proba = softmax_rows(&margins);

    for i in 0..proba.nrows() {
        let sum: f64 = proba.row(i).sum();
        assert!(approx_eq(sum, 1.0, 1e-9), "row {} sums to {}", i, sum);
        for &p in proba.row(i) {
            assert!(p > 0.0 && p < 1.0);
        }
    }

    // Ordering of margins carries over to probabilities.
    assert!(proba[[0, 0]] > proba[[0, 2]]);
    assert!(proba[[0, 2]] > proba[[0, 1]]);
    // Equal margins split evenly.
    assert!(approx_eq(proba[[1, 0]], 1.0 / 3.0, 1e-9));
}

#[test]
fn test_trained_heads_produce_full_probability_matrix() {
    let (x, y) = toy_problem();
    let config = OvrConfig {
        epochs: 15,
        lr: 0.1,
        batch_size: Some(8),
        seed: 7,
    };
    let model = TwoQubitAnsatz;
    let heads = train_one_vs_rest(&model, x.view(), &y, 2, &config).unwrap();
    let margins = margins_matrix(&model, &heads, x.view()).unwrap();
    let proba = softmax_rows(&margins);

    assert_eq!(proba.dim(), (12, 2));
    assert!(proba.iter().all(|p| p.is_finite()));
    for i in 0..proba.nrows() {
        assert!(approx_eq(proba.row(i).sum(), 1.0, 1e-9));
    }
}

#[test]
fn test_density_evaluator_matches_statevector_at_vanishing_noise() {
    let mut noisy = noiseless_params();
    noisy.noise_prob = 1e-9;
    let pure = LayeredAnsatz::new(3, &noiseless_params());
    let faint = LayeredAnsatz::new(3, &noisy);

    let mut rng = StdRng::seed_from_u64(3);
    let theta = pure.init_parameters(&mut rng);
    let x = array![0.3, -1.2, 0.5];

    let a = pure.margin(x.view(), &theta).unwrap();
    let b = faint.margin(x.view(), &theta).unwrap();
    assert!(approx_eq(a, b, 1e-6), "pure {} vs faint noise {}", a, b);
}

#[test]
fn test_shot_sampling_is_reproducible() {
    let mut params = noiseless_params();
    params.shots = 64;
    let ansatz = LayeredAnsatz::new(3, &params);

    let theta = Array1::from_elem(ansatz.parameter_count(), 0.2);
    let x = array![0.3, -1.2, 0.5];

    let first = ansatz.margin(x.view(), &theta).unwrap();
    let second = ansatz.margin(x.view(), &theta).unwrap();
    assert_eq!(first, second);
    assert!((-1.0..=1.0).contains(&first));
}
