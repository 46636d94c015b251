//! # CoMP MIMO Decoding Core
//!
//! Formulates coordinated multipoint (CoMP) MIMO signal decoding as a
//! binary quadratic model that an annealer can minimise, and provides the
//! classical linear decoders it is measured against.
//!
//! ## Overview
//!
//! Transmitters send symbols `v` over a channel `H`; receivers observe
//! `y = H·v + n`. Maximum-likelihood decoding minimises `‖y − H·v‖²` over
//! the symbol alphabet, which for spin-encoded symbols is a quadratic
//! objective over `±1` variables:
//!
//! - **Transform**: channel and received signal → spin BQM
//! - **Filters**: matched filter, zero-forcing and MMSE baselines
//! - **Solvers**: exhaustive and simulated-annealing reference samplers
//! - **Compare**: success rates of every decoder against the ground truth
//!
//! ## Signal Flow
//!
//! ```text
//! (H, y) → ChannelToQubo → BQM → Sampler → spins → decode → symbols
//! (H, y) → linear filter W → sign(Re(W·y))              → symbols
//! ```
//!
//! ## Example
//!
//! ```rust
//! use comp_core::prelude::*;
//! use num_complex::Complex64;
//!
//! let h = ChannelMatrix::from_real(2, 2, &[1.0, 0.3, 0.2, 0.9]).unwrap();
//! let tx = vec![Complex64::new(1.0, 0.0), Complex64::new(-1.0, 0.0)];
//! let y = h.mul_vec(&tx).unwrap();
//!
//! let transformer = ChannelToQubo::default();
//! let bqm = transformer.transform(&h, &y).unwrap();
//! let best = ExactSolver::default().sample(&bqm).unwrap();
//! let decoded = transformer.decode(&best.first().unwrap().values, 2).unwrap();
//! assert_eq!(decoded, tx);
//! ```

pub mod bqm;
pub mod compare;
pub mod config;
pub mod error;
pub mod filters;
pub mod matrix;
pub mod modulation;
pub mod observe;
pub mod solver;
pub mod transform;

pub use bqm::{BinaryQuadraticModel, Interaction, Vartype};
pub use compare::{compare_signals, success_rate, Comparison, ComparisonReport, Instance};
pub use config::DecoderConfig;
pub use error::{Error, Result};
pub use filters::FilterMethod;
pub use matrix::ChannelMatrix;
pub use modulation::Modulation;
pub use solver::{ExactSolver, Sample, SampleSet, Sampler, SimulatedAnnealing};
pub use transform::{spin_encoded_mimo, ChannelToQubo, TransformConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bqm::{BinaryQuadraticModel, Vartype};
    pub use crate::filters::{apply_filter, linear_filter, FilterMethod};
    pub use crate::matrix::ChannelMatrix;
    pub use crate::modulation::Modulation;
    pub use crate::solver::{ExactSolver, Sampler, SimulatedAnnealing};
    pub use crate::transform::{ChannelToQubo, TransformConfig};
}
