//! dmkit Core - Datasets, policies, and shared functionality
//!
//! This crate provides the foundational types used across all dmkit components:
//! the observation table consumed by structure learning, the transition samples
//! consumed by the MDP solvers, and the policy files they all produce.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod csv;
pub mod error;
pub mod policy;
pub mod sample;
pub mod table;

pub use error::{DmError, Result};
pub use policy::{ActionId, Policy};
pub use sample::TransitionSample;
pub use table::ObservationTable;
