// src/service/mod.rs
//! Comparison service
//!
//! The orchestration layer: prepare the dataset once, resolve one
//! runner per family, run classical then quantum on the identical
//! split, score both probability matrices and assemble the report the
//! transport layer (or a library caller) hands back.

use ndarray::Array2;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::analysis::{self, AnalysisReport, Recommendation};
use crate::dataset::{self, DatasetSummary, PreparedData, PreparedSplit, PrepareError, RawTable};
use crate::metrics::{self, ClassReport, MetricsReport};
use crate::models::{
    resolve, time_ms, ConfigMap, ModelFamily, Runner, RunnerConfig, RunnerError, RunnerOutput,
    RunnerTiming,
};
use crate::DEFAULT_SEED;

/// Cap on diagnostic rows shipped back to callers
pub const MAX_DIAGNOSTIC_POINTS: usize = 5000;

/// Anything that can abort a comparison. Metric degradation never
/// lands here; it degrades to NaN inside the report instead.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// One runner key and config per family
#[derive(Debug, Clone, Default)]
pub struct CompareRequest {
    pub classical_key: String,
    pub classical_config: ConfigMap,
    pub quantum_key: String,
    pub quantum_config: ConfigMap,
}

/// One value for each side of the comparison
#[derive(Debug, Clone, Serialize)]
pub struct FamilyPair<T> {
    pub classical: T,
    pub quantum: T,
}

/// Headline metrics plus the wall-clock cost of producing them
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetrics {
    #[serde(flatten)]
    pub metrics: MetricsReport,
    pub latency_ms: f64,
}

/// Everything beyond the headline numbers for one runner
#[derive(Debug, Clone, Serialize)]
pub struct ModelDetails {
    pub confusion_matrix: Vec<Vec<u64>>,
    pub per_class: Vec<ClassReport>,
    pub timings: RunnerTiming,
    pub extras: ConfigMap,
}

/// Raw per-row material for calibration plots, capped at
/// [`MAX_DIAGNOSTIC_POINTS`] rows
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub y_true: Vec<usize>,
    pub classical: FamilyProba,
    pub quantum: FamilyProba,
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyProba {
    pub proba: Vec<Vec<f64>>,
}

/// The full comparison response
#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub summary: DatasetSummary,
    pub metrics: FamilyPair<ModelMetrics>,
    pub details: FamilyPair<ModelDetails>,
    pub diagnostics: Diagnostics,
    pub notes: Vec<String>,
}

/// The quickcheck response
#[derive(Debug, Clone, Serialize)]
pub struct QuickcheckReport {
    pub analysis: AnalysisReport,
    pub recommendation: Recommendation,
}

/// Prepare CSV bytes with the crate's default split seed
pub fn prepare(bytes: &[u8], requested_target: Option<&str>) -> Result<PreparedData, PrepareError> {
    dataset::prepare(bytes, requested_target, DEFAULT_SEED)
}

/// Parse, prepare and compare in one call
pub fn compare_csv(
    bytes: &[u8],
    requested_target: Option<&str>,
    request: &CompareRequest,
) -> Result<CompareReport, CompareError> {
    let data = prepare(bytes, requested_target)?;
    compare_prepared(&data, request)
}

/// Run both runners on an already-prepared dataset and assemble the
/// report. Both keys resolve before either model trains, so an unknown
/// key aborts without wasted work.
pub fn compare_prepared(
    data: &PreparedData,
    request: &CompareRequest,
) -> Result<CompareReport, CompareError> {
    let classical = resolve(ModelFamily::Classical, &request.classical_key)?;
    let quantum = resolve(ModelFamily::Quantum, &request.quantum_key)?;

    info!(
        classical = %request.classical_key,
        quantum = %request.quantum_key,
        n_train = data.split.y_train.len(),
        n_test = data.split.y_test.len(),
        "running comparison"
    );

    let (classical_out, classical_latency) = run_side(
        classical.as_ref(),
        &data.split,
        &RunnerConfig::new(request.classical_config.clone()),
    )?;
    let (quantum_out, quantum_latency) = run_side(
        quantum.as_ref(),
        &data.split,
        &RunnerConfig::new(request.quantum_config.clone()),
    )?;

    let y_true = &data.split.y_test;
    let labels = &data.split.class_labels;
    let (classical_metrics, classical_details) =
        score_side(&classical_out, classical_latency, y_true, labels);
    let (quantum_metrics, quantum_details) =
        score_side(&quantum_out, quantum_latency, y_true, labels);

    info!(
        classical_accuracy = classical_metrics.metrics.accuracy,
        quantum_accuracy = quantum_metrics.metrics.accuracy,
        "comparison finished"
    );

    Ok(CompareReport {
        summary: data.summary.clone(),
        diagnostics: diagnostics(y_true, &classical_out.proba, &quantum_out.proba),
        metrics: FamilyPair {
            classical: classical_metrics,
            quantum: quantum_metrics,
        },
        details: FamilyPair {
            classical: classical_details,
            quantum: quantum_details,
        },
        notes: data.notes.clone(),
    })
}

/// Scan CSV bytes and recommend a runner per family
pub fn quickcheck(
    bytes: &[u8],
    requested_target: Option<&str>,
) -> Result<QuickcheckReport, PrepareError> {
    let table = RawTable::parse(bytes)?;
    let analysis = analysis::analyze(&table, requested_target);
    let recommendation = analysis::recommend(&analysis);
    Ok(QuickcheckReport {
        analysis,
        recommendation,
    })
}

fn run_side(
    runner: &(dyn Runner + Send + Sync),
    split: &PreparedSplit,
    config: &RunnerConfig,
) -> Result<(RunnerOutput, f64), RunnerError> {
    let (out, latency_ms) = time_ms(|| {
        runner.train_and_predict(
            split.x_train.view(),
            &split.y_train,
            split.x_test.view(),
            config,
            &split.class_labels,
        )
    });
    Ok((out?, latency_ms))
}

fn score_side(
    out: &RunnerOutput,
    latency_ms: f64,
    y_true: &[usize],
    class_labels: &[String],
) -> (ModelMetrics, ModelDetails) {
    let report = metrics::evaluate(y_true, &out.proba);
    let y_pred = metrics::argmax_rows(&out.proba);
    let details = ModelDetails {
        confusion_matrix: metrics::confusion_matrix(y_true, &y_pred, class_labels.len()),
        per_class: metrics::per_class_report(y_true, &y_pred, class_labels),
        timings: out.timing,
        extras: out.extras.clone(),
    };
    (
        ModelMetrics {
            metrics: report,
            latency_ms,
        },
        details,
    )
}

fn diagnostics(y_true: &[usize], classical: &Array2<f64>, quantum: &Array2<f64>) -> Diagnostics {
    let cap = y_true.len().min(MAX_DIAGNOSTIC_POINTS);
    Diagnostics {
        y_true: y_true[..cap].to_vec(),
        classical: FamilyProba {
            proba: proba_rows(classical, cap),
        },
        quantum: FamilyProba {
            proba: proba_rows(quantum, cap),
        },
    }
}

fn proba_rows(proba: &Array2<f64>, cap: usize) -> Vec<Vec<f64>> {
    (0..cap.min(proba.nrows()))
        .map(|i| proba.row(i).to_vec())
        .collect()
}

/// Re-export commonly used types
pub mod prelude {
    pub use super::{
        compare_csv, compare_prepared, quickcheck, CompareError, CompareReport, CompareRequest,
        Diagnostics, ModelDetails, ModelMetrics, QuickcheckReport, MAX_DIAGNOSTIC_POINTS,
    };
}
