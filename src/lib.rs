//! Classical-vs-Quantum Tabular Benchmark
//!
//! This crate benchmarks a classical predictive model against a simulated
//! quantum-circuit model on the same tabular dataset. It ingests raw CSV
//! bytes, infers the label column, prepares a single stratified split,
//! trains one runner from each model family on identical data, and reports
//! comparable metrics (accuracy, macro F1, AUC, log loss, latency) together
//! with dataset diagnostics and a cheap model recommendation.
//!
//! Quantum runners are simulated circuit evaluations (statevector or
//! density matrix), not hardware backends.

pub mod analysis;
pub mod dataset;
pub mod metrics;
pub mod models;
pub mod quantum;
pub mod service;

#[cfg(feature = "neural")]
pub mod neural;

#[cfg(feature = "server")]
pub mod server;

// Create a prelude module for convenient imports
pub mod prelude {
    pub use crate::dataset::prelude::*;
    pub use crate::models::prelude::*;
    pub use crate::service::prelude::*;
}

// Version and crate information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

/// Default RNG seed used by the split and the always-on runners.
pub const DEFAULT_SEED: u64 = 7;
