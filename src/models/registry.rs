// src/models/registry.rs
//! Runner key resolution
//!
//! Two closed namespaces of runner keys. Resolution is cheap and never
//! touches an engine; keys whose engine is not compiled in (the `neural`
//! feature) resolve fine and fail at run time with a typed error, so
//! "key exists" and "engine available" stay separate concerns.

use std::fmt;

use ndarray::ArrayView2;
use thiserror::Error;

use super::{classical, quantum, Runner, RunnerConfig, RunnerOutput};

/// Valid classical runner keys
pub const CLASSICAL_KEYS: [&str; 5] = ["mlp", "svm", "rf", "logreg", "mlp_torch"];

/// Valid quantum runner keys (`vqc` aliases `qnn`)
pub const QUANTUM_KEYS: [&str; 5] = ["qnn", "vqc", "qnn_simple", "hybrid_torch", "aec_qnn"];

/// The two runner namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Classical,
    Quantum,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Classical => write!(f, "classical"),
            ModelFamily::Quantum => write!(f, "quantum"),
        }
    }
}

/// Failures raised by runner resolution and execution
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The key is not in the family's namespace
    #[error("Unknown {family} model '{key}'. Available: {}", valid.join(", "))]
    UnknownModel {
        family: ModelFamily,
        key: String,
        valid: Vec<&'static str>,
    },

    /// The key exists but its engine is not compiled in
    #[error("model '{key}' requires the '{feature}' compile-time feature")]
    MissingDependency { key: String, feature: &'static str },

    /// The runner itself failed while training or predicting
    #[error("training failed for '{key}': {detail}")]
    Training { key: String, detail: String },
}

impl RunnerError {
    pub(crate) fn training(key: &str, detail: impl Into<String>) -> Self {
        RunnerError::Training {
            key: key.to_string(),
            detail: detail.into(),
        }
    }
}

/// Classical runner keys as a closed set of tagged variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassicalRunner {
    Mlp,
    Svm,
    RandomForest,
    LogReg,
    DeepMlp,
}

impl ClassicalRunner {
    pub fn from_key(key: &str) -> Result<Self, RunnerError> {
        match key {
            "mlp" => Ok(ClassicalRunner::Mlp),
            "svm" => Ok(ClassicalRunner::Svm),
            "rf" => Ok(ClassicalRunner::RandomForest),
            "logreg" => Ok(ClassicalRunner::LogReg),
            "mlp_torch" => Ok(ClassicalRunner::DeepMlp),
            _ => Err(RunnerError::UnknownModel {
                family: ModelFamily::Classical,
                key: key.to_string(),
                valid: CLASSICAL_KEYS.to_vec(),
            }),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ClassicalRunner::Mlp => "mlp",
            ClassicalRunner::Svm => "svm",
            ClassicalRunner::RandomForest => "rf",
            ClassicalRunner::LogReg => "logreg",
            ClassicalRunner::DeepMlp => "mlp_torch",
        }
    }
}

impl Runner for ClassicalRunner {
    fn train_and_predict(
        &self,
        x_train: ArrayView2<f64>,
        y_train: &[usize],
        x_test: ArrayView2<f64>,
        config: &RunnerConfig,
        class_labels: &[String],
    ) -> Result<RunnerOutput, RunnerError> {
        match self {
            ClassicalRunner::Mlp => {
                classical::mlp::run(self.key(), x_train, y_train, x_test, config, class_labels)
            }
            ClassicalRunner::Svm => {
                classical::svm::run(self.key(), x_train, y_train, x_test, config, class_labels)
            }
            ClassicalRunner::RandomForest => {
                classical::forest::run(self.key(), x_train, y_train, x_test, config, class_labels)
            }
            ClassicalRunner::LogReg => {
                classical::logreg::run(self.key(), x_train, y_train, x_test, config, class_labels)
            }
            ClassicalRunner::DeepMlp => {
                #[cfg(feature = "neural")]
                {
                    classical::deep::run(self.key(), x_train, y_train, x_test, config, class_labels)
                }
                #[cfg(not(feature = "neural"))]
                {
                    let _ = (x_train, y_train, x_test, config, class_labels);
                    Err(RunnerError::MissingDependency {
                        key: self.key().to_string(),
                        feature: "neural",
                    })
                }
            }
        }
    }
}

/// Quantum runner keys as a closed set of tagged variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantumRunner {
    Vqc,
    Simple,
    Hybrid,
    Autoencoded,
}

impl QuantumRunner {
    pub fn from_key(key: &str) -> Result<Self, RunnerError> {
        match key {
            "qnn" | "vqc" => Ok(QuantumRunner::Vqc),
            "qnn_simple" => Ok(QuantumRunner::Simple),
            "hybrid_torch" => Ok(QuantumRunner::Hybrid),
            "aec_qnn" => Ok(QuantumRunner::Autoencoded),
            _ => Err(RunnerError::UnknownModel {
                family: ModelFamily::Quantum,
                key: key.to_string(),
                valid: QUANTUM_KEYS.to_vec(),
            }),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            QuantumRunner::Vqc => "qnn",
            QuantumRunner::Simple => "qnn_simple",
            QuantumRunner::Hybrid => "hybrid_torch",
            QuantumRunner::Autoencoded => "aec_qnn",
        }
    }
}

impl Runner for QuantumRunner {
    fn train_and_predict(
        &self,
        x_train: ArrayView2<f64>,
        y_train: &[usize],
        x_test: ArrayView2<f64>,
        config: &RunnerConfig,
        class_labels: &[String],
    ) -> Result<RunnerOutput, RunnerError> {
        match self {
            QuantumRunner::Vqc => {
                quantum::vqc::run(self.key(), x_train, y_train, x_test, config, class_labels)
            }
            QuantumRunner::Simple => {
                quantum::simple::run(self.key(), x_train, y_train, x_test, config, class_labels)
            }
            QuantumRunner::Hybrid => {
                #[cfg(feature = "neural")]
                {
                    quantum::hybrid::run(self.key(), x_train, y_train, x_test, config, class_labels)
                }
                #[cfg(not(feature = "neural"))]
                {
                    let _ = (x_train, y_train, x_test, config, class_labels);
                    Err(RunnerError::MissingDependency {
                        key: self.key().to_string(),
                        feature: "neural",
                    })
                }
            }
            QuantumRunner::Autoencoded => {
                #[cfg(feature = "neural")]
                {
                    quantum::autoenc::run(self.key(), x_train, y_train, x_test, config, class_labels)
                }
                #[cfg(not(feature = "neural"))]
                {
                    let _ = (x_train, y_train, x_test, config, class_labels);
                    Err(RunnerError::MissingDependency {
                        key: self.key().to_string(),
                        feature: "neural",
                    })
                }
            }
        }
    }
}

/// Resolve a key in a family to its runner
pub fn resolve(
    family: ModelFamily,
    key: &str,
) -> Result<Box<dyn Runner + Send + Sync>, RunnerError> {
    match family {
        ModelFamily::Classical => Ok(Box::new(ClassicalRunner::from_key(key)?)),
        ModelFamily::Quantum => Ok(Box::new(QuantumRunner::from_key(key)?)),
    }
}
