// src/dataset/prepare.rs
//! Data preparation pipeline
//!
//! Turns a parsed table into standardized train/test matrices:
//! identifier columns out, rows with missing values out, target encoded
//! to 0..K-1, numeric features only, stratified 80/20 split with a fixed
//! seed, per-feature standardization fit on the train fold alone.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::info;

use super::table::{format_numeric, ColumnData, RawTable};
use super::target::{infer_target, normalize_name};
use super::PrepareError;

/// Test share of the stratified split
pub const TEST_RATIO: f64 = 0.2;

/// Per-feature standardization parameters, fit on the train fold only
#[derive(Debug, Clone)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    /// Fit mean and scale per column; zero-variance columns scale by 1
    pub fn fit(x: ArrayView2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        for col in x.axis_iter(Axis(1)) {
            let m = col.sum() / n;
            let var = col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            let s = var.sqrt();
            mean.push(m);
            scale.push(if s > 0.0 { s } else { 1.0 });
        }
        Scaler { mean, scale }
    }

    /// Standardize a matrix in place
    pub fn transform(&self, x: &mut Array2<f64>) {
        for mut row in x.axis_iter_mut(Axis(0)) {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (*v - self.mean[j]) / self.scale[j];
            }
        }
    }
}

/// Standardized matrices and encoded labels for one benchmark run
#[derive(Debug, Clone)]
pub struct PreparedSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Vec<usize>,
    pub y_test: Vec<usize>,
    pub feature_names: Vec<String>,
    pub class_labels: Vec<String>,
    pub scaler: Scaler,
}

impl PreparedSplit {
    pub fn n_classes(&self) -> usize {
        self.class_labels.len()
    }
}

/// Shape of the cleaned dataset, reported alongside the comparison
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub target: String,
    pub n_samples: usize,
    pub n_features: usize,
    pub features: Vec<String>,
    pub classes: Vec<String>,
    #[serde(serialize_with = "serialize_counts")]
    pub class_counts: Vec<(String, u64)>,
}

fn serialize_counts<S: Serializer>(
    counts: &[(String, u64)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(counts.len()))?;
    for (name, count) in counts {
        map.serialize_entry(name, count)?;
    }
    map.end()
}

/// Everything `prepare` produces
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub split: PreparedSplit,
    pub summary: DatasetSummary,
    pub notes: Vec<String>,
}

/// Parse CSV bytes and run the full preparation pipeline
pub fn prepare(
    bytes: &[u8],
    requested_target: Option<&str>,
    seed: u64,
) -> Result<PreparedData, PrepareError> {
    let table = RawTable::parse(bytes)?;
    prepare_table(&table, requested_target, seed)
}

/// Run the preparation pipeline on an already-parsed table
pub fn prepare_table(
    table: &RawTable,
    requested_target: Option<&str>,
    seed: u64,
) -> Result<PreparedData, PrepareError> {
    let choice = infer_target(table, requested_target)?;
    let target_idx = choice.column;
    let mut notes = vec![choice.note];

    // Identifier columns by name never carry signal; dropping them first
    // keeps their gaps from costing rows in the missing-value scan.
    let mut id_dropped = Vec::new();
    let mut candidates: Vec<usize> = Vec::new();
    for (i, col) in table.columns().iter().enumerate() {
        if i == target_idx {
            continue;
        }
        let norm = normalize_name(&col.name);
        if norm == "id" || norm == "index" {
            id_dropped.push(col.name.clone());
        } else {
            candidates.push(i);
        }
    }

    // Drop rows missing the target or any remaining feature column.
    let kept: Vec<usize> = (0..table.n_rows())
        .filter(|&r| {
            !table.column(target_idx).is_missing(r)
                && candidates.iter().all(|&c| !table.column(c).is_missing(r))
        })
        .collect();
    let dropped_rows = table.n_rows() - kept.len();
    if dropped_rows > 0 {
        notes.push(format!("Dropped {} row(s) with missing values.", dropped_rows));
    }

    // Numeric columns where every surviving value is unique are
    // identifier-like regardless of name.
    let mut unique_dropped = Vec::new();
    candidates.retain(|&c| {
        let col = table.column(c);
        if !col.is_numeric() || kept.is_empty() {
            return true;
        }
        let distinct = match &col.data {
            ColumnData::Numeric(v) => kept
                .iter()
                .filter_map(|&r| v[r].map(f64::to_bits))
                .collect::<std::collections::HashSet<_>>()
                .len(),
            ColumnData::Text(_) => unreachable!(),
        };
        if distinct == kept.len() {
            unique_dropped.push(col.name.clone());
            false
        } else {
            true
        }
    });
    let all_dropped: Vec<String> = id_dropped.into_iter().chain(unique_dropped).collect();
    if !all_dropped.is_empty() {
        notes.push(format!(
            "Dropped identifier-like column(s): {}.",
            all_dropped.join(", ")
        ));
    }

    // Encode the target over its naturally ordered distinct values.
    let (y, class_labels) = encode_target(table, target_idx, &kept)?;
    let n_classes = class_labels.len();
    if n_classes < 2 {
        return Err(PrepareError::Split(format!(
            "target '{}' has {} distinct value(s); need at least 2",
            table.column(target_idx).name,
            n_classes
        )));
    }

    let mut class_counts: Vec<(String, u64)> =
        class_labels.iter().map(|c| (c.clone(), 0)).collect();
    for &c in &y {
        class_counts[c].1 += 1;
    }

    // Numeric features only.
    let feature_idx: Vec<usize> = candidates
        .into_iter()
        .filter(|&c| table.column(c).is_numeric())
        .collect();
    if feature_idx.is_empty() {
        return Err(PrepareError::NoFeatures);
    }
    let feature_names: Vec<String> = feature_idx
        .iter()
        .map(|&c| table.column(c).name.clone())
        .collect();

    let x = Array2::from_shape_fn((kept.len(), feature_idx.len()), |(r, j)| {
        match &table.column(feature_idx[j]).data {
            ColumnData::Numeric(v) => v[kept[r]].unwrap_or(f64::NAN),
            ColumnData::Text(_) => unreachable!(),
        }
    });

    let (train_rows, test_rows) = stratified_split(&y, &class_labels, TEST_RATIO, seed)?;
    info!(
        n_train = train_rows.len(),
        n_test = test_rows.len(),
        n_features = feature_idx.len(),
        n_classes,
        "prepared dataset"
    );

    let take = |rows: &[usize]| {
        Array2::from_shape_fn((rows.len(), feature_idx.len()), |(r, j)| x[[rows[r], j]])
    };
    let mut x_train = take(&train_rows);
    let mut x_test = take(&test_rows);
    let y_train: Vec<usize> = train_rows.iter().map(|&r| y[r]).collect();
    let y_test: Vec<usize> = test_rows.iter().map(|&r| y[r]).collect();

    let scaler = Scaler::fit(x_train.view());
    scaler.transform(&mut x_train);
    scaler.transform(&mut x_test);

    let summary = DatasetSummary {
        target: table.column(target_idx).name.clone(),
        n_samples: kept.len(),
        n_features: feature_names.len(),
        features: feature_names.clone(),
        classes: class_labels.clone(),
        class_counts,
    };

    Ok(PreparedData {
        split: PreparedSplit {
            x_train,
            x_test,
            y_train,
            y_test,
            feature_names,
            class_labels,
            scaler,
        },
        summary,
        notes,
    })
}

/// Map target cells to 0..K-1 over sorted distinct values; numeric
/// targets sort numerically, text targets lexicographically
fn encode_target(
    table: &RawTable,
    target_idx: usize,
    kept: &[usize],
) -> Result<(Vec<usize>, Vec<String>), PrepareError> {
    let missing = || PrepareError::Split("target value missing after row filtering".to_string());
    match &table.column(target_idx).data {
        ColumnData::Numeric(v) => {
            let mut vals = Vec::with_capacity(kept.len());
            for &r in kept {
                vals.push(v[r].ok_or_else(missing)?);
            }
            let mut distinct: Vec<f64> = Vec::new();
            for &val in &vals {
                if !distinct.iter().any(|d| d.to_bits() == val.to_bits()) {
                    distinct.push(val);
                }
            }
            distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let index: HashMap<u64, usize> = distinct
                .iter()
                .enumerate()
                .map(|(i, v)| (v.to_bits(), i))
                .collect();
            let y = vals.iter().map(|val| index[&val.to_bits()]).collect();
            Ok((y, distinct.into_iter().map(format_numeric).collect()))
        }
        ColumnData::Text(v) => {
            let mut vals = Vec::with_capacity(kept.len());
            for &r in kept {
                vals.push(v[r].clone().ok_or_else(missing)?);
            }
            let mut distinct: Vec<String> = Vec::new();
            for val in &vals {
                if !distinct.contains(val) {
                    distinct.push(val.clone());
                }
            }
            distinct.sort();
            let index: HashMap<&str, usize> = distinct
                .iter()
                .enumerate()
                .map(|(i, s)| (s.as_str(), i))
                .collect();
            let y = vals.iter().map(|val| index[val.as_str()]).collect();
            Ok((y, distinct))
        }
    }
}

/// Deterministic stratified split: every class lands at least one row on
/// each side
fn stratified_split(
    y: &[usize],
    class_labels: &[String],
    test_ratio: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), PrepareError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut per_class: Vec<Vec<usize>> = vec![Vec::new(); class_labels.len()];
    for (i, &c) in y.iter().enumerate() {
        per_class[c].push(i);
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (c, mut idx) in per_class.into_iter().enumerate() {
        if idx.len() < 2 {
            return Err(PrepareError::Split(format!(
                "class '{}' has only {} row(s); stratified split needs at least 2",
                class_labels[c],
                idx.len()
            )));
        }
        idx.shuffle(&mut rng);
        let n_test = ((idx.len() as f64 * test_ratio).round() as usize).clamp(1, idx.len() - 1);
        test.extend(idx.drain(..n_test));
        train.extend(idx);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Ok((train, test))
}
