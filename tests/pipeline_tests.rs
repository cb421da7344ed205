// tests/pipeline_tests.rs
//! End-to-end tests for the comparison service

use serde_json::json;

use qml_bench::models::{ConfigMap, RunnerError, CLASSICAL_KEYS, QUANTUM_KEYS};
use qml_bench::service::{
    compare_csv, quickcheck, CompareError, CompareRequest, MAX_DIAGNOSTIC_POINTS,
};

/// Helper function for comparing floats with tolerance
fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// A 150-row, 3-class table with four repeating numeric features and a
/// text label under a synonym header.
fn iris_like_csv() -> String {
    let mut csv = String::from("sepal_a,sepal_b,petal_a,petal_b,species\n");
    let names = ["setosa", "versicolor", "virginica"];
    for c in 0..3 {
        for i in 0..50 {
            let f1 = (i % 10) as f64 + c as f64;
            let f2 = (i % 7) as f64 * 0.5 - c as f64;
            let f3 = ((i * 3) % 5) as f64 + 0.25 * c as f64;
            let f4 = (i % 4) as f64 - 1.5 * c as f64;
            csv.push_str(&format!("{},{},{},{},{}\n", f1, f2, f3, f4, names[c]));
        }
    }
    csv
}

fn config_with_epochs(epochs: usize) -> ConfigMap {
    let mut map = ConfigMap::new();
    map.insert("epochs".to_string(), json!(epochs));
    map
}

#[test]
fn test_compare_end_to_end() {
    let csv = iris_like_csv();
    let request = CompareRequest {
        classical_key: "logreg".to_string(),
        classical_config: ConfigMap::new(),
        quantum_key: "qnn_simple".to_string(),
        quantum_config: config_with_epochs(15),
    };
    let report = compare_csv(csv.as_bytes(), None, &request).unwrap();

    assert_eq!(report.summary.target, "species");
    assert_eq!(report.summary.n_samples, 150);
    assert_eq!(report.summary.classes.len(), 3);

    for side in [&report.metrics.classical, &report.metrics.quantum] {
        assert!(side.metrics.accuracy.is_finite());
        assert!((0.0..=1.0).contains(&side.metrics.accuracy));
        assert!(side.metrics.f1_macro.is_finite());
        assert!(side.metrics.auc.is_finite());
        assert!(side.metrics.log_loss.is_finite());
        assert!(side.metrics.log_loss > 0.0);
        assert!(side.latency_ms > 0.0);
    }

    for details in [&report.details.classical, &report.details.quantum] {
        let confusion_total: u64 = details
            .confusion_matrix
            .iter()
            .flat_map(|row| row.iter())
            .sum();
        assert_eq!(confusion_total, 30);

        let support_total: u64 = details.per_class.iter().map(|c| c.support).sum();
        assert_eq!(support_total, 30);
        assert_eq!(details.per_class.len(), 3);
        assert!(details.timings.train_ms >= 0.0);
    }

    assert_eq!(report.diagnostics.y_true.len(), 30);
    for family in [&report.diagnostics.classical, &report.diagnostics.quantum] {
        assert_eq!(family.proba.len(), 30);
        for row in &family.proba {
            assert_eq!(row.len(), 3);
            let sum: f64 = row.iter().sum();
            assert!(approx_eq(sum, 1.0, 1e-6), "probability row sums to {}", sum);
        }
    }

    // The preparation notes always at least name the target choice.
    assert!(!report.notes.is_empty());
}

#[test]
fn test_unknown_model_key_aborts_before_training() {
    let csv = iris_like_csv();
    let request = CompareRequest {
        classical_key: "perceptron_9000".to_string(),
        classical_config: ConfigMap::new(),
        quantum_key: "qnn_simple".to_string(),
        quantum_config: ConfigMap::new(),
    };

    match compare_csv(csv.as_bytes(), None, &request) {
        Err(CompareError::Runner(RunnerError::UnknownModel { key, valid, .. })) => {
            assert_eq!(key, "perceptron_9000");
            assert!(valid.contains(&"logreg"));
            assert!(valid.contains(&"mlp"));
        }
        other => panic!("expected unknown-model error, got {:?}", other.map(|_| ())),
    }

    // The message lists the valid keys for the caller.
    let request = CompareRequest {
        classical_key: "logreg".to_string(),
        classical_config: ConfigMap::new(),
        quantum_key: "qubitron".to_string(),
        quantum_config: ConfigMap::new(),
    };
    let err = compare_csv(csv.as_bytes(), None, &request).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("qubitron"));
    assert!(message.contains("qnn_simple"));
}

#[cfg(not(feature = "neural"))]
#[test]
fn test_gated_key_reports_missing_feature() {
    // mlp_torch is a known key, so it resolves; running it without the
    // engine compiled in is the failure.
    let csv = iris_like_csv();
    let request = CompareRequest {
        classical_key: "mlp_torch".to_string(),
        classical_config: ConfigMap::new(),
        quantum_key: "qnn_simple".to_string(),
        quantum_config: ConfigMap::new(),
    };
    match compare_csv(csv.as_bytes(), None, &request) {
        Err(CompareError::Runner(RunnerError::MissingDependency { key, feature })) => {
            assert_eq!(key, "mlp_torch");
            assert_eq!(feature, "neural");
        }
        other => panic!("expected missing-dependency error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_compare_is_deterministic() {
    let csv = iris_like_csv();
    let request = CompareRequest {
        classical_key: "logreg".to_string(),
        classical_config: ConfigMap::new(),
        quantum_key: "qnn_simple".to_string(),
        quantum_config: config_with_epochs(10),
    };
    let first = compare_csv(csv.as_bytes(), None, &request).unwrap();
    let second = compare_csv(csv.as_bytes(), None, &request).unwrap();

    assert_eq!(first.diagnostics.y_true, second.diagnostics.y_true);
    assert_eq!(
        first.diagnostics.classical.proba,
        second.diagnostics.classical.proba
    );
    assert_eq!(
        first.diagnostics.quantum.proba,
        second.diagnostics.quantum.proba
    );
}

#[test]
fn test_quickcheck_end_to_end() {
    let csv = iris_like_csv();
    let report = quickcheck(csv.as_bytes(), None).unwrap();

    assert_eq!(report.analysis.n_samples, 150);
    assert_eq!(report.analysis.n_features, 5);
    assert_eq!(report.analysis.n_categorical, 1);
    assert_eq!(report.analysis.n_numeric, 4);
    assert!((0.0..=1.0).contains(&report.analysis.pca_explained_variance));
    assert!(report.analysis.avg_mutual_info >= 0.0);

    assert!(CLASSICAL_KEYS.contains(&report.recommendation.classical.as_str()));
    assert!(QUANTUM_KEYS.contains(&report.recommendation.quantum.as_str()));
    assert!(!report.recommendation.reasons.is_empty());
}

#[test]
fn test_quickcheck_propagates_parse_failures() {
    assert!(quickcheck(b"", None).is_err());
    assert!(quickcheck(b"just-one-column\n1\n2\n", None).is_err());
}

#[test]
fn test_diagnostics_are_capped() {
    // Two balanced classes over 25_100 rows put 5_020 rows in the test
    // fold, just past the diagnostics cap.
    let mut csv = String::from("f1,f2,label\n");
    for i in 0..25_100 {
        let class = if i % 2 == 0 { "a" } else { "b" };
        csv.push_str(&format!(
            "{},{},{}\n",
            (i % 17) as f64 + if i % 2 == 0 { 0.0 } else { 3.0 },
            (i % 23) as f64 * 0.5,
            class
        ));
    }

    let request = CompareRequest {
        classical_key: "logreg".to_string(),
        classical_config: config_with_epochs(1),
        quantum_key: "qnn_simple".to_string(),
        quantum_config: config_with_epochs(1),
    };
    let report = compare_csv(csv.as_bytes(), None, &request).unwrap();

    let n_test: u64 = report
        .details
        .classical
        .confusion_matrix
        .iter()
        .flat_map(|row| row.iter())
        .sum();
    assert_eq!(n_test, 5_020);

    assert_eq!(report.diagnostics.y_true.len(), MAX_DIAGNOSTIC_POINTS);
    assert_eq!(
        report.diagnostics.classical.proba.len(),
        MAX_DIAGNOSTIC_POINTS
    );
    assert_eq!(report.diagnostics.quantum.proba.len(), MAX_DIAGNOSTIC_POINTS);
}
