// src/models/classical/mod.rs
//! Classical-family runners
//!
//! The baseline side of every comparison: logistic regression, a
//! one-hidden-layer MLP, an RBF SVM and a random forest, plus the
//! deeper `mlp_torch` network behind the `neural` feature.

pub mod forest;
pub mod logreg;
pub mod mlp;
pub mod svm;

#[cfg(feature = "neural")]
pub mod deep;

pub use forest::RandomForest;
pub use logreg::LogisticRegression;
pub use mlp::MlpClassifier;
