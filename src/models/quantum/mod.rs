// src/models/quantum/mod.rs
//! Quantum-family runners
//!
//! Circuit-scored models: the layered variational ansatz (`qnn`/`vqc`),
//! the fixed two-qubit ansatz (`qnn_simple`), and behind the `neural`
//! feature the joint hybrid network (`hybrid_torch`) and the
//! autoencoder-compressed circuit (`aec_qnn`).

pub mod simple;
pub mod vqc;

#[cfg(feature = "neural")]
pub mod autoenc;
#[cfg(feature = "neural")]
pub mod hybrid;

pub use simple::TwoQubitAnsatz;
pub use vqc::{LayeredAnsatz, VqcParams};
