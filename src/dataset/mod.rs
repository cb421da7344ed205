// src/dataset/mod.rs
//! CSV ingestion and data preparation
//!
//! Everything between raw uploaded bytes and the standardized matrices
//! the model runners consume: parsing, target inference, cleaning,
//! label encoding, the stratified split and the train-fold scaler.

pub mod prepare;
pub mod table;
pub mod target;

pub use prepare::{
    prepare, prepare_table, DatasetSummary, PreparedData, PreparedSplit, Scaler, TEST_RATIO,
};
pub use table::{Column, ColumnData, RawTable, TablePreview, DELIMITER_CANDIDATES, PREVIEW_ROWS};
pub use target::{infer_target, normalize_name, TargetChoice, TARGET_SYNONYMS};

use thiserror::Error;

/// Failures of the preparation pipeline. Each kind is recoverable by
/// fixing the input, so they surface verbatim to callers.
#[derive(Debug, Error)]
pub enum PrepareError {
    /// Bytes did not parse as a delimited table with at least 2 columns
    #[error("could not parse CSV: {0}")]
    Parse(String),

    /// No resolution rule produced a target column
    #[error("could not infer a target column; available columns: {}", available.join(", "))]
    TargetInference { available: Vec<String> },

    /// Cleaning removed every numeric feature column
    #[error("no numeric feature columns remain after cleaning")]
    NoFeatures,

    /// The target cannot support a stratified split
    #[error("cannot build stratified split: {0}")]
    Split(String),
}

/// Re-export commonly used types
pub mod prelude {
    pub use super::prepare::{prepare, DatasetSummary, PreparedData, PreparedSplit};
    pub use super::table::RawTable;
    pub use super::PrepareError;
}
