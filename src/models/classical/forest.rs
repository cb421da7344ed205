// src/models/classical/forest.rs
//! Random forest (`rf`)
//!
//! Gini-criterion decision trees over bootstrap samples with sqrt-of-d
//! feature subsets per split. Trees fit on the rayon pool with per-tree
//! derived seeds, so the forest is reproducible. Probabilities average
//! the per-tree leaf distributions.

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::models::{time_ms, ConfigMap, RunnerConfig, RunnerError, RunnerOutput, RunnerTiming};
use crate::DEFAULT_SEED;

pub const DEFAULT_TREES: usize = 200;
pub const DEFAULT_MIN_SAMPLES_SPLIT: usize = 2;
pub const DEFAULT_MIN_SAMPLES_LEAF: usize = 1;

enum TreeNode {
    Leaf {
        probs: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict<'a>(&'a self, row: &[f64]) -> &'a [f64] {
        match self {
            TreeNode::Leaf { probs } => probs,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

struct TreeParams {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    n_classes: usize,
    features_per_split: usize,
}

fn class_counts(y: &[usize], rows: &[usize], k: usize) -> Vec<f64> {
    let mut counts = vec![0.0; k];
    for &r in rows {
        counts[y[r]] += 1.0;
    }
    counts
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

fn leaf(counts: &[f64]) -> TreeNode {
    let total: f64 = counts.iter().sum();
    let probs = if total > 0.0 {
        counts.iter().map(|c| c / total).collect()
    } else {
        vec![1.0 / counts.len() as f64; counts.len()]
    };
    TreeNode::Leaf { probs }
}

fn build_tree(
    x: ArrayView2<f64>,
    y: &[usize],
    rows: Vec<usize>,
    depth: usize,
    params: &TreeParams,
    rng: &mut StdRng,
) -> TreeNode {
    let counts = class_counts(y, &rows, params.n_classes);
    let total = rows.len() as f64;
    let node_gini = gini(&counts, total);

    let depth_reached = params.max_depth.map(|d| depth >= d).unwrap_or(false);
    if rows.len() < params.min_samples_split || node_gini == 0.0 || depth_reached {
        return leaf(&counts);
    }

    let mut features: Vec<usize> = (0..x.ncols()).collect();
    features.shuffle(rng);
    features.truncate(params.features_per_split.max(1));

    let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, impurity)
    for &f in &features {
        let mut ordered: Vec<usize> = rows.clone();
        ordered.sort_by(|&a, &b| {
            x[[a, f]]
                .partial_cmp(&x[[b, f]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_counts = vec![0.0; params.n_classes];
        let mut right_counts = counts.clone();
        for i in 0..ordered.len() - 1 {
            let r = ordered[i];
            left_counts[y[r]] += 1.0;
            right_counts[y[r]] -= 1.0;

            let v = x[[r, f]];
            let v_next = x[[ordered[i + 1], f]];
            if v == v_next {
                continue;
            }
            let n_left = (i + 1) as f64;
            let n_right = total - n_left;
            if (n_left as usize) < params.min_samples_leaf
                || (n_right as usize) < params.min_samples_leaf
            {
                continue;
            }

            let impurity = (n_left * gini(&left_counts, n_left)
                + n_right * gini(&right_counts, n_right))
                / total;
            if best.map(|(_, _, b)| impurity < b).unwrap_or(true) {
                best = Some((f, (v + v_next) / 2.0, impurity));
            }
        }
    }

    let (feature, threshold, impurity) = match best {
        Some(split) => split,
        None => return leaf(&counts),
    };
    if impurity >= node_gini {
        return leaf(&counts);
    }

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&r| x[[r, feature]] <= threshold);
    TreeNode::Split {
        feature,
        threshold,
        left: Box::new(build_tree(x, y, left_rows, depth + 1, params, rng)),
        right: Box::new(build_tree(x, y, right_rows, depth + 1, params, rng)),
    }
}

/// Bootstrap-aggregated forest of gini trees
pub struct RandomForest {
    trees: Vec<TreeNode>,
    n_classes: usize,
}

impl RandomForest {
    pub fn fit(
        x: ArrayView2<f64>,
        y: &[usize],
        n_classes: usize,
        n_estimators: usize,
        max_depth: Option<usize>,
        seed: u64,
    ) -> Self {
        let n = x.nrows();
        let params = TreeParams {
            max_depth,
            min_samples_split: DEFAULT_MIN_SAMPLES_SPLIT,
            min_samples_leaf: DEFAULT_MIN_SAMPLES_LEAF,
            n_classes,
            features_per_split: (x.ncols() as f64).sqrt().round() as usize,
        };

        let trees = (0..n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n.max(1))).collect();
                build_tree(x, y, rows, 0, &params, &mut rng)
            })
            .collect();

        RandomForest { trees, n_classes }
    }

    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((x.nrows(), self.n_classes));
        let scale = 1.0 / self.trees.len().max(1) as f64;
        for (r, row) in x.outer_iter().enumerate() {
            let row_vec: Vec<f64> = row.to_vec();
            for tree in &self.trees {
                for (c, p) in tree.predict(&row_vec).iter().enumerate() {
                    out[[r, c]] += p * scale;
                }
            }
        }
        out
    }
}

pub(crate) fn run(
    key: &str,
    x_train: ArrayView2<f64>,
    y_train: &[usize],
    x_test: ArrayView2<f64>,
    config: &RunnerConfig,
    class_labels: &[String],
) -> Result<RunnerOutput, RunnerError> {
    let n_estimators = config.usize_or("n_estimators", DEFAULT_TREES).max(1);
    let max_depth = match config.usize_or("max_depth", 0) {
        0 => None,
        d => Some(d),
    };
    debug!(key, n_estimators, ?max_depth, "training random forest");

    if x_train.nrows() == 0 || class_labels.is_empty() {
        return Err(RunnerError::training(key, "empty training fold"));
    }

    let (forest, train_ms) = time_ms(|| {
        RandomForest::fit(
            x_train,
            y_train,
            class_labels.len(),
            n_estimators,
            max_depth,
            DEFAULT_SEED,
        )
    });
    let (proba, infer_ms) = time_ms(|| forest.predict_proba(x_test));

    Ok(RunnerOutput {
        proba,
        timing: RunnerTiming { train_ms, infer_ms },
        extras: ConfigMap::new(),
    })
}
