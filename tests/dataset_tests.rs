// tests/dataset_tests.rs
//! Tests for CSV parsing, target inference and the preparation pipeline

use qml_bench::dataset::{infer_target, prepare, PrepareError, RawTable};

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

#[test]
fn test_parse_sniffs_delimiters() {
    let variants = [
        "a,b,c\n1,2,x\n3,4,y\n",
        "a;b;c\n1;2;x\n3;4;y\n",
        "a\tb\tc\n1\t2\tx\n3\t4\ty\n",
        "a|b|c\n1|2|x\n3|4|y\n",
    ];
    for text in variants {
        let table = RawTable::parse(text.as_bytes()).unwrap();
        assert_eq!(table.n_cols(), 3, "wrong column count for {:?}", text);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert!(table.column(0).is_numeric());
        assert!(!table.column(2).is_numeric());
    }
}

#[test]
fn test_parse_handles_quotes_and_missing_markers() {
    let csv = "name,score,note\n\"Smith, Jane\",1.5,\"said \"\"hi\"\"\"\nNA,2.0,null\nBob,NaN,fine\n";
    let table = RawTable::parse(csv.as_bytes()).unwrap();

    assert_eq!(table.n_rows(), 3);
    assert_eq!(table.column(0).display_value(0), "Smith, Jane");
    assert_eq!(table.column(2).display_value(0), "said \"hi\"");

    // NA, null and NaN all read as missing.
    assert!(table.column(0).is_missing(1));
    assert!(table.column(2).is_missing(1));
    assert!(table.column(1).is_missing(2));
    assert_eq!(table.missing_count(), 3);
}

#[test]
fn test_parse_pads_short_rows() {
    let csv = "a,b,c\n1,2,3\n4,5\n";
    let table = RawTable::parse(csv.as_bytes()).unwrap();
    assert_eq!(table.n_rows(), 2);
    assert!(table.column(2).is_missing(1));
    assert!(!table.column(1).is_missing(1));
}

#[test]
fn test_parse_rejects_oversized_rows_and_empty_input() {
    let long = RawTable::parse(b"a,b\n1,2,3\n");
    assert!(matches!(long, Err(PrepareError::Parse(_))));

    assert!(matches!(
        RawTable::parse(b""),
        Err(PrepareError::Parse(_))
    ));
    assert!(matches!(
        RawTable::parse(b"  \n \n"),
        Err(PrepareError::Parse(_))
    ));
}

#[test]
fn test_target_inference_priority() {
    let csv = "f1,f2,label,species\n1,2,a,x\n3,4,b,y\n";
    let table = RawTable::parse(csv.as_bytes()).unwrap();

    // An exact requested name wins outright.
    assert_eq!(infer_target(&table, Some("f2")).unwrap().column, 1);
    // A requested name that only matches after normalization still wins.
    assert_eq!(infer_target(&table, Some("F 2")).unwrap().column, 1);
    // Without a request, synonyms resolve in a fixed order: label first.
    assert_eq!(infer_target(&table, None).unwrap().column, 2);

    // No synonym present: the last non-numeric column is used.
    let csv = "a,b,city\n1,2,rome\n3,4,oslo\n";
    let table = RawTable::parse(csv.as_bytes()).unwrap();
    assert_eq!(infer_target(&table, None).unwrap().column, 2);
}

#[test]
fn test_target_falls_back_to_low_cardinality_column() {
    let mut csv = String::from("a,b\n");
    for i in 0..60 {
        csv.push_str(&format!("{},{}\n", i, i % 2));
    }
    let table = RawTable::parse(csv.as_bytes()).unwrap();
    assert_eq!(infer_target(&table, None).unwrap().column, 1);
}

#[test]
fn test_target_inference_error_lists_columns() {
    let mut csv = String::from("alpha,beta\n");
    for i in 0..60 {
        csv.push_str(&format!("{},{}\n", i, i as f64 + 0.5));
    }
    match prepare(csv.as_bytes(), None, 7) {
        Err(PrepareError::TargetInference { available }) => {
            assert_eq!(available, vec!["alpha", "beta"]);
        }
        other => panic!("expected target inference failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_prepare_drops_identifier_columns_before_missing_scan() {
    // The id column has a gap, but since id columns are dropped by name
    // before the missing-value scan, no row is lost to it. The ticket
    // column is all-unique numeric and is dropped as identifier-like.
    let csv = "id,f1,ticket,label\n\
               1,3.0,101,a\n\
               ,4.0,102,b\n\
               3,3.5,103,a\n\
               4,4.5,104,b\n\
               5,3.0,105,a\n\
               6,4.0,106,b\n";
    let prepared = prepare(csv.as_bytes(), None, 7).unwrap();

    assert_eq!(prepared.summary.n_samples, 6);
    assert_eq!(prepared.split.feature_names, vec!["f1"]);
    assert!(prepared
        .notes
        .iter()
        .any(|n| n.contains("identifier-like") && n.contains("id") && n.contains("ticket")));
}

#[test]
fn test_prepare_drops_rows_with_missing_features() {
    let csv = "f1,f2,label\n1,2,a\n3,,b\n5,6,a\n7,8,b\n9,10,a\n11,12,b\n";
    let prepared = prepare(csv.as_bytes(), None, 7).unwrap();
    assert_eq!(prepared.summary.n_samples, 5);
    assert!(prepared.notes.iter().any(|n| n.contains("Dropped 1 row")));
}

#[test]
fn test_prepare_rejects_degenerate_targets() {
    // One distinct class.
    let single = "f,label\n1,a\n2,a\n3,a\n";
    assert!(matches!(
        prepare(single.as_bytes(), None, 7),
        Err(PrepareError::Split(_))
    ));

    // A class with a single row cannot be split on both sides.
    let lonely = "f,label\n1,a\n2,a\n3,b\n";
    assert!(matches!(
        prepare(lonely.as_bytes(), None, 7),
        Err(PrepareError::Split(_))
    ));

    // Text-only features leave nothing to train on.
    let texty = "name,label\nfoo,a\nbar,b\nbaz,a\nqux,b\n";
    assert!(matches!(
        prepare(texty.as_bytes(), None, 7),
        Err(PrepareError::NoFeatures)
    ));
}

#[test]
fn test_prepare_builds_stratified_split() {
    let csv = iris_like_csv();
    let prepared = prepare(csv.as_bytes(), None, 7).unwrap();
    let split = &prepared.split;

    assert_eq!(split.x_train.nrows(), 120);
    assert_eq!(split.x_test.nrows(), 30);
    assert_eq!(split.x_train.ncols(), 4);
    assert_eq!(split.n_classes(), 3);
    assert_eq!(
        split.class_labels,
        vec!["setosa", "versicolor", "virginica"]
    );

    // 20% of each class lands in the test fold.
    for class in 0..3 {
        let in_test = split.y_test.iter().filter(|&&y| y == class).count();
        assert_eq!(in_test, 10, "class {} unevenly split", class);
    }

    assert_eq!(prepared.summary.n_samples, 150);
    assert_eq!(prepared.summary.target, "species");
    assert_eq!(prepared.summary.class_counts[0].1, 50);
}

#[test]
fn test_prepare_is_deterministic() {
    let csv = iris_like_csv();
    let first = prepare(csv.as_bytes(), None, 7).unwrap();
    let second = prepare(csv.as_bytes(), None, 7).unwrap();

    assert_eq!(first.split.x_train, second.split.x_train);
    assert_eq!(first.split.x_test, second.split.x_test);
    assert_eq!(first.split.y_train, second.split.y_train);
    assert_eq!(first.split.y_test, second.split.y_test);
}

#[test]
fn test_prepare_standardizes_on_train_fold() {
    let csv = iris_like_csv();
    let prepared = prepare(csv.as_bytes(), None, 7).unwrap();
    let x_train = &prepared.split.x_train;

    let n = x_train.nrows() as f64;
    for j in 0..x_train.ncols() {
        let mean = x_train.column(j).sum() / n;
        let var = x_train
            .column(j)
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;
        assert!(approx_eq(mean, 0.0, 1e-9), "column {} mean {}", j, mean);
        assert!(approx_eq(var.sqrt(), 1.0, 1e-9), "column {} std {}", j, var.sqrt());
    }

    // The test fold reuses the train-fold parameters, so it stays finite
    // but need not be centered.
    assert!(prepared.split.x_test.iter().all(|v| v.is_finite()));
}
