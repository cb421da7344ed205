// src/metrics/mod.rs
//! Probability-matrix metrics
//!
//! Everything the comparison report needs from y_true plus a runner's
//! probability matrix: accuracy, macro F1, ROC-AUC, log loss, the
//! confusion matrix and the per-class breakdown. Degenerate inputs
//! degrade to NaN sentinels, never to errors, so one broken metric
//! cannot abort a finished training run.

use ndarray::Array2;
use serde::Serialize;
use tracing::warn;

/// Clip bound for log-loss probabilities
const EPS: f64 = 1e-15;

/// The four headline metrics. NaN marks "not computable here".
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsReport {
    pub accuracy: f64,
    pub f1_macro: f64,
    pub auc: f64,
    pub log_loss: f64,
}

/// Per-class row of the detailed report
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Compute the headline metrics for one runner's output
pub fn evaluate(y_true: &[usize], proba: &Array2<f64>) -> MetricsReport {
    let y_pred = argmax_rows(proba);
    MetricsReport {
        accuracy: accuracy(y_true, &y_pred),
        f1_macro: macro_f1(y_true, &y_pred, proba.ncols()),
        auc: roc_auc(y_true, proba),
        log_loss: log_loss(y_true, proba),
    }
}

/// Row-wise argmax; ties resolve to the first maximum
pub fn argmax_rows(proba: &Array2<f64>) -> Vec<usize> {
    (0..proba.nrows())
        .map(|i| {
            let mut best = 0;
            let mut best_val = f64::NEG_INFINITY;
            for (j, &v) in proba.row(i).iter().enumerate() {
                if v > best_val {
                    best_val = v;
                    best = j;
                }
            }
            best
        })
        .collect()
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return f64::NAN;
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    hits as f64 / y_true.len() as f64
}

/// Macro-averaged F1 over all `n_classes` classes, zero-division -> 0
pub fn macro_f1(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() || n_classes == 0 {
        return f64::NAN;
    }
    let mut sum = 0.0;
    for c in 0..n_classes {
        let (precision, recall) = precision_recall(y_true, y_pred, c);
        sum += f1_from(precision, recall);
    }
    sum / n_classes as f64
}

fn precision_recall(y_true: &[usize], y_pred: &[usize], class: usize) -> (f64, f64) {
    let mut tp = 0u64;
    let mut fp = 0u64;
    let mut fn_ = 0u64;
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == class, p == class) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let precision = if tp + fp == 0 {
        0.0
    } else {
        tp as f64 / (tp + fp) as f64
    };
    let recall = if tp + fn_ == 0 {
        0.0
    } else {
        tp as f64 / (tp + fn_) as f64
    };
    (precision, recall)
}

fn f1_from(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// ROC-AUC. Binary tasks score column 1; multiclass tasks macro-average
/// one-vs-rest. Any class without both positives and negatives in
/// y_true makes the metric undefined.
pub fn roc_auc(y_true: &[usize], proba: &Array2<f64>) -> f64 {
    let n_classes = proba.ncols();
    if y_true.is_empty() || y_true.len() != proba.nrows() || n_classes < 2 {
        return f64::NAN;
    }

    if n_classes == 2 {
        let scores: Vec<f64> = (0..proba.nrows()).map(|i| proba[[i, 1]]).collect();
        let positives: Vec<bool> = y_true.iter().map(|&t| t == 1).collect();
        let auc = binary_auc(&scores, &positives);
        if auc.is_nan() {
            warn!("AUC undefined: y_true holds a single class");
        }
        return auc;
    }

    let mut sum = 0.0;
    for c in 0..n_classes {
        let scores: Vec<f64> = (0..proba.nrows()).map(|i| proba[[i, c]]).collect();
        let positives: Vec<bool> = y_true.iter().map(|&t| t == c).collect();
        let auc = binary_auc(&scores, &positives);
        if auc.is_nan() {
            warn!(class = c, "AUC undefined: class missing positives or negatives");
            return f64::NAN;
        }
        sum += auc;
    }
    sum / n_classes as f64
}

/// Rank-sum AUC with average ranks over score ties
fn binary_auc(scores: &[f64], positives: &[bool]) -> f64 {
    let n_pos = positives.iter().filter(|&&p| p).count();
    let n_neg = positives.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // 1-based ranks, ties averaged across their run
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            if positives[idx] {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    (rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64)
}

/// Multinomial log loss with clipped, re-normalized probability rows
pub fn log_loss(y_true: &[usize], proba: &Array2<f64>) -> f64 {
    if y_true.is_empty() || y_true.len() != proba.nrows() || proba.ncols() == 0 {
        return f64::NAN;
    }
    let mut total = 0.0;
    for (i, &label) in y_true.iter().enumerate() {
        if label >= proba.ncols() {
            warn!(row = i, label, "log loss undefined: label outside probability columns");
            return f64::NAN;
        }
        let clipped: Vec<f64> = proba.row(i).iter().map(|&p| p.clamp(EPS, 1.0 - EPS)).collect();
        let norm: f64 = clipped.iter().sum();
        total -= (clipped[label] / norm).ln();
    }
    total / y_true.len() as f64
}

/// K x K confusion matrix, rows indexed by the true class
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<u64>> {
    let mut matrix = vec![vec![0u64; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n_classes && p < n_classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

/// Per-class precision, recall, F1 and support
pub fn per_class_report(
    y_true: &[usize],
    y_pred: &[usize],
    class_labels: &[String],
) -> Vec<ClassReport> {
    class_labels
        .iter()
        .enumerate()
        .map(|(c, label)| {
            let (precision, recall) = precision_recall(y_true, y_pred, c);
            let support = y_true.iter().filter(|&&t| t == c).count() as u64;
            ClassReport {
                class: label.clone(),
                precision,
                recall,
                f1: f1_from(precision, recall),
                support,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn accuracy_counts_hits() {
        let acc = accuracy(&[0, 1, 2, 1], &[0, 1, 1, 1]);
        assert!(approx_eq(acc, 0.75, 1e-12));
        assert!(accuracy(&[], &[]).is_nan());
    }

    #[test]
    fn argmax_takes_first_on_ties() {
        let proba = array![[0.5, 0.5], [0.2, 0.8]];
        assert_eq!(argmax_rows(&proba), vec![0, 1]);
    }

    #[test]
    fn macro_f1_zero_division_counts_as_zero() {
        // Class 2 never predicted and never true: contributes 0.
        let f1 = macro_f1(&[0, 0, 1, 1], &[0, 0, 1, 1], 3);
        assert!(approx_eq(f1, 2.0 / 3.0, 1e-12));
    }

    #[test]
    fn binary_auc_orders_and_ties() {
        // Perfect ranking.
        let proba = array![[0.9, 0.1], [0.8, 0.2], [0.2, 0.8], [0.1, 0.9]];
        assert!(approx_eq(roc_auc(&[0, 0, 1, 1], &proba), 1.0, 1e-12));

        // Fully reversed ranking.
        assert!(approx_eq(roc_auc(&[1, 1, 0, 0], &proba), 0.0, 1e-12));

        // All scores tied: chance level.
        let flat = array![[0.5, 0.5], [0.5, 0.5], [0.5, 0.5], [0.5, 0.5]];
        assert!(approx_eq(roc_auc(&[0, 0, 1, 1], &flat), 0.5, 1e-12));
    }

    #[test]
    fn auc_nan_on_single_class() {
        let proba = array![[0.9, 0.1], [0.8, 0.2]];
        assert!(roc_auc(&[0, 0], &proba).is_nan());
    }

    #[test]
    fn multiclass_auc_macro_averages() {
        let proba = array![
            [0.8, 0.1, 0.1],
            [0.7, 0.2, 0.1],
            [0.1, 0.8, 0.1],
            [0.2, 0.7, 0.1],
            [0.1, 0.1, 0.8],
            [0.1, 0.2, 0.7],
        ];
        let auc = roc_auc(&[0, 0, 1, 1, 2, 2], &proba);
        assert!(approx_eq(auc, 1.0, 1e-12));
    }

    #[test]
    fn log_loss_matches_hand_computation() {
        let proba = array![[0.9, 0.1], [0.2, 0.8]];
        let expected = -((0.9f64).ln() + (0.8f64).ln()) / 2.0;
        assert!(approx_eq(log_loss(&[0, 1], &proba), expected, 1e-9));
    }

    #[test]
    fn log_loss_nan_on_empty() {
        let proba = Array2::<f64>::zeros((0, 2));
        assert!(log_loss(&[], &proba).is_nan());
    }

    #[test]
    fn log_loss_survives_zero_probability() {
        let proba = array![[1.0, 0.0], [0.0, 1.0]];
        let loss = log_loss(&[1, 0], &proba);
        assert!(loss.is_finite());
        assert!(loss > 10.0);
    }

    #[test]
    fn confusion_matrix_rows_are_true_classes() {
        let m = confusion_matrix(&[0, 0, 1, 2], &[0, 1, 1, 2], 3);
        assert_eq!(m, vec![vec![1, 1, 0], vec![0, 1, 0], vec![0, 0, 1]]);
        let total: u64 = m.iter().flatten().sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn per_class_supports_sum_to_n() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let report = per_class_report(&[0, 1, 1], &[0, 1, 0], &labels);
        let support: u64 = report.iter().map(|r| r.support).sum();
        assert_eq!(support, 3);
        assert_eq!(report[0].class, "a");
        assert!(approx_eq(report[1].precision, 1.0, 1e-12));
        assert!(approx_eq(report[1].recall, 0.5, 1e-12));
    }

    #[test]
    fn evaluate_bundles_all_four() {
        let proba = array![[0.9, 0.1], [0.3, 0.7], [0.4, 0.6], [0.8, 0.2]];
        let report = evaluate(&[0, 1, 1, 0], &proba);
        assert!(approx_eq(report.accuracy, 1.0, 1e-12));
        assert!(approx_eq(report.f1_macro, 1.0, 1e-12));
        assert!(approx_eq(report.auc, 1.0, 1e-12));
        assert!(report.log_loss.is_finite());
    }
}
