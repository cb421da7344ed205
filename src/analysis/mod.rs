// src/analysis/mod.rs
//! Dataset quickcheck and model recommendation
//!
//! A cheap scan over the raw table, independent of the preparation
//! pipeline: shape, type mix, how concentrated the variance is under
//! the top principal components, and how informative the columns look
//! against the inferred target. A fixed decision tree turns the scan
//! into one suggested runner key per family.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::table::{ColumnData, RawTable};
use crate::dataset::target::infer_target;
use crate::DEFAULT_SEED;

/// Components summed by the explained-variance scan
pub const PCA_COMPONENTS: usize = 5;

/// Shape and signal summary of an uploaded table
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub n_samples: usize,
    /// Every surviving column, target included
    pub n_features: usize,
    pub n_categorical: usize,
    pub n_numeric: usize,
    /// Explained-variance-ratio sum of the top components, 0 when
    /// undefined (fewer than 2 feature columns, missing numeric cells)
    pub pca_explained_variance: f64,
    /// Mean equal-width-binned mutual information between the feature
    /// columns and the target, 0 when undefined
    pub avg_mutual_info: f64,
}

/// One runner key per family, with the reasons that picked them
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub classical: String,
    pub quantum: String,
    pub reasons: Vec<String>,
}

/// Scan the table: drop fully-empty rows and columns, count the type
/// mix, then measure variance concentration and feature/target signal
/// on a label-encoded numeric view.
pub fn analyze(table: &RawTable, requested_target: Option<&str>) -> AnalysisReport {
    let kept_cols: Vec<usize> = (0..table.n_cols())
        .filter(|&c| (0..table.n_rows()).any(|r| !table.column(c).is_missing(r)))
        .collect();
    let kept_rows: Vec<usize> = (0..table.n_rows())
        .filter(|&r| kept_cols.iter().any(|&c| !table.column(c).is_missing(r)))
        .collect();

    let n_categorical = kept_cols
        .iter()
        .filter(|&&c| !table.column(c).is_numeric())
        .count();
    let n_numeric = kept_cols.len() - n_categorical;

    let target_pos = infer_target(table, requested_target)
        .ok()
        .and_then(|choice| kept_cols.iter().position(|&c| c == choice.column));

    let encoded = encode_columns(table, &kept_rows, &kept_cols);
    let features = drop_column(&encoded, target_pos);
    let pca_explained_variance = explained_variance_sum(&features);
    let avg_mutual_info = match target_pos {
        Some(t) => average_mutual_info(&encoded, t),
        None => 0.0,
    };

    info!(
        n_samples = kept_rows.len(),
        n_features = kept_cols.len(),
        n_categorical,
        n_numeric,
        "quickcheck scan"
    );
    debug!(pca_explained_variance, avg_mutual_info, "quickcheck signal");

    AnalysisReport {
        n_samples: kept_rows.len(),
        n_features: kept_cols.len(),
        n_categorical,
        n_numeric,
        pca_explained_variance,
        avg_mutual_info,
    }
}

/// Fixed decision tree over the scan; the first matching rule wins
pub fn recommend(report: &AnalysisReport) -> Recommendation {
    if report.n_features < 50 && report.avg_mutual_info > 0.05 {
        return Recommendation {
            classical: "mlp".to_string(),
            quantum: "qnn_simple".to_string(),
            reasons: vec![
                format!("{} features < 50", report.n_features),
                format!(
                    "avg mutual information {:.3} > 0.05 (informative features)",
                    report.avg_mutual_info
                ),
            ],
        };
    }
    if report.n_features >= 50 && report.pca_explained_variance > 0.70 {
        return Recommendation {
            classical: "mlp".to_string(),
            quantum: "aec_qnn".to_string(),
            reasons: vec![
                format!("{} features >= 50", report.n_features),
                format!(
                    "top components explain {:.2} > 0.70 of variance (compressible)",
                    report.pca_explained_variance
                ),
            ],
        };
    }
    if report.n_samples > 10_000 {
        return Recommendation {
            classical: "mlp_torch".to_string(),
            quantum: "vqc".to_string(),
            reasons: vec![format!("{} samples > 10000", report.n_samples)],
        };
    }
    Recommendation {
        classical: "logreg".to_string(),
        quantum: "qnn".to_string(),
        reasons: vec!["no specialized rule matched; balanced defaults".to_string()],
    }
}

/// Numeric view of the kept cells. Numeric columns keep their values
/// (missing becomes NaN); text columns are label-encoded in order of
/// first appearance, with missing text as its own category.
fn encode_columns(table: &RawTable, rows: &[usize], cols: &[usize]) -> Array2<f64> {
    let mut out = Array2::zeros((rows.len(), cols.len()));
    for (cj, &c) in cols.iter().enumerate() {
        match &table.column(c).data {
            ColumnData::Numeric(values) => {
                for (ri, &r) in rows.iter().enumerate() {
                    out[[ri, cj]] = values[r].unwrap_or(f64::NAN);
                }
            }
            ColumnData::Text(values) => {
                let mut codes: HashMap<Option<&str>, f64> = HashMap::new();
                for (ri, &r) in rows.iter().enumerate() {
                    let next = codes.len() as f64;
                    out[[ri, cj]] = *codes.entry(values[r].as_deref()).or_insert(next);
                }
            }
        }
    }
    out
}

fn drop_column(matrix: &Array2<f64>, skip: Option<usize>) -> Array2<f64> {
    let skip = match skip {
        Some(skip) => skip,
        None => return matrix.clone(),
    };
    let cols: Vec<usize> = (0..matrix.ncols()).filter(|&c| c != skip).collect();
    Array2::from_shape_fn((matrix.nrows(), cols.len()), |(r, c)| matrix[[r, cols[c]]])
}

/// Sum of explained-variance ratios over the top min(5, d) principal
/// components, by power iteration with deflation on the covariance
fn explained_variance_sum(x: &Array2<f64>) -> f64 {
    let n = x.nrows();
    let d = x.ncols();
    if n < 2 || d < 2 || x.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }

    let mut centered = x.clone();
    for j in 0..d {
        let mean = centered.column(j).sum() / n as f64;
        centered.column_mut(j).mapv_inplace(|v| v - mean);
    }
    let cov = centered.t().dot(&centered) / (n as f64 - 1.0);
    let trace: f64 = cov.diag().sum();
    if trace <= 0.0 {
        return 0.0;
    }

    let max_iter = 300;
    let tol = 1e-10;
    let mut work = cov;
    let mut explained = 0.0;
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);

    for _component in 0..d.min(PCA_COMPONENTS) {
        let mut v: Array1<f64> = Array1::from_shape_fn(d, |_| rng.gen_range(-1.0..1.0));
        let norm = v.dot(&v).sqrt().max(1e-12);
        v.mapv_inplace(|e| e / norm);

        let mut eigenvalue = 0.0;
        for _iter in 0..max_iter {
            let w = work.dot(&v);
            let next_eigenvalue = v.dot(&w);
            let w_norm = w.dot(&w).sqrt().max(1e-12);
            let next_v = w.mapv(|e| e / w_norm);
            let diff = (&v - &next_v).mapv(|e| e * e).sum().sqrt();
            v = next_v;
            eigenvalue = next_eigenvalue;
            if diff < tol {
                break;
            }
        }

        let eigenvalue = eigenvalue.max(0.0);
        explained += eigenvalue / trace;
        for i in 0..d {
            for j in 0..d {
                work[[i, j]] -= eigenvalue * v[i] * v[j];
            }
        }
    }
    explained.clamp(0.0, 1.0)
}

/// Mean binned mutual information between every non-target column and
/// the target column. Rows with non-finite cells are skipped per pair;
/// a pair left with under 2 rows contributes 0.
fn average_mutual_info(encoded: &Array2<f64>, target_col: usize) -> f64 {
    let d = encoded.ncols();
    if d < 2 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut count = 0usize;
    for j in 0..d {
        if j == target_col {
            continue;
        }
        let mut xs = Vec::with_capacity(encoded.nrows());
        let mut ys = Vec::with_capacity(encoded.nrows());
        for r in 0..encoded.nrows() {
            let x = encoded[[r, j]];
            let y = encoded[[r, target_col]];
            if x.is_finite() && y.is_finite() {
                xs.push(x);
                ys.push(y);
            }
        }
        if xs.len() >= 2 {
            sum += mutual_information(&xs, &ys);
        }
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Equal-width binned mutual information, sqrt(n) bins clamped to [2, 20]
fn mutual_information(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return 0.0;
    }
    let n_bins = ((n as f64).sqrt() as usize).clamp(2, 20);
    let x_bins = discretize(x, n_bins);
    let y_bins = discretize(y, n_bins);

    let mut joint: HashMap<(usize, usize), usize> = HashMap::new();
    let mut x_counts: HashMap<usize, usize> = HashMap::new();
    let mut y_counts: HashMap<usize, usize> = HashMap::new();
    for (&xb, &yb) in x_bins.iter().zip(&y_bins) {
        *joint.entry((xb, yb)).or_insert(0) += 1;
        *x_counts.entry(xb).or_insert(0) += 1;
        *y_counts.entry(yb).or_insert(0) += 1;
    }

    let total = n as f64;
    let mut mi = 0.0;
    for (&(xb, yb), &count) in &joint {
        let p_xy = count as f64 / total;
        let p_x = x_counts[&xb] as f64 / total;
        let p_y = y_counts[&yb] as f64 / total;
        if p_xy > 0.0 && p_x > 0.0 && p_y > 0.0 {
            mi += p_xy * (p_xy / (p_x * p_y)).ln();
        }
    }
    mi.max(0.0)
}

fn discretize(values: &[f64], n_bins: usize) -> Vec<usize> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        return vec![0; values.len()];
    }
    let width = range / n_bins as f64;
    values
        .iter()
        .map(|&v| (((v - min) / width) as usize).min(n_bins - 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::table::RawTable;

    fn table(csv: &str) -> RawTable {
        RawTable::parse(csv.as_bytes()).unwrap()
    }

    #[test]
    fn counts_drop_empty_rows_and_columns() {
        let t = table("a,b,label\n1,,x\n2,,y\n,,\n3,,x\n");
        let report = analyze(&t, None);
        // Column b is fully empty, the third data row is fully empty.
        assert_eq!(report.n_samples, 3);
        assert_eq!(report.n_features, 2);
        assert_eq!(report.n_categorical, 1);
        assert_eq!(report.n_numeric, 1);
    }

    #[test]
    fn identical_columns_have_high_mutual_info() {
        let mut csv = String::from("x,label\n");
        for i in 0..40 {
            let v = i % 2;
            csv.push_str(&format!("{v},{v}\n"));
        }
        let report = analyze(&table(&csv), Some("label"));
        // Two perfectly aligned binary columns: MI = ln 2.
        assert!((report.avg_mutual_info - (2.0f64).ln()).abs() < 1e-9);
    }

    #[test]
    fn correlated_columns_concentrate_variance() {
        let mut csv = String::from("x,y,z,label\n");
        for i in 0..30 {
            let v = i as f64;
            csv.push_str(&format!("{},{},{},{}\n", v, 2.0 * v, -v, i % 3));
        }
        let report = analyze(&table(&csv), Some("label"));
        assert!(report.pca_explained_variance > 0.95);
    }

    #[test]
    fn missing_numeric_cells_zero_out_pca() {
        let t = table("x,y,label\n1,2,a\n3,,b\n5,6,a\n");
        let report = analyze(&t, Some("label"));
        assert_eq!(report.pca_explained_variance, 0.0);
    }

    #[test]
    fn recommendation_branches() {
        let base = AnalysisReport {
            n_samples: 100,
            n_features: 10,
            n_categorical: 1,
            n_numeric: 9,
            pca_explained_variance: 0.5,
            avg_mutual_info: 0.2,
        };
        let r = recommend(&base);
        assert_eq!((r.classical.as_str(), r.quantum.as_str()), ("mlp", "qnn_simple"));

        let wide = AnalysisReport {
            n_features: 80,
            pca_explained_variance: 0.9,
            avg_mutual_info: 0.2,
            ..base.clone()
        };
        let r = recommend(&wide);
        assert_eq!((r.classical.as_str(), r.quantum.as_str()), ("mlp", "aec_qnn"));

        let big = AnalysisReport {
            n_samples: 20_000,
            avg_mutual_info: 0.0,
            ..base.clone()
        };
        let r = recommend(&big);
        assert_eq!((r.classical.as_str(), r.quantum.as_str()), ("mlp_torch", "vqc"));

        let plain = AnalysisReport {
            avg_mutual_info: 0.0,
            ..base
        };
        let r = recommend(&plain);
        assert_eq!((r.classical.as_str(), r.quantum.as_str()), ("logreg", "qnn"));
        assert!(!r.reasons.is_empty());
    }
}
