//! dmkit Bayes - Bayesian network structure learning
//!
//! This crate learns the topology of a Bayesian network from a table of
//! categorical observations: a Dirichlet-multinomial score ranks candidate
//! structures, and a K2 parent search plus edge-reversal local search
//! climbs that score while keeping the graph acyclic.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::float_cmp)]

pub mod dag;
pub mod score;
pub mod search;

pub use dag::{Dag, EdgeChange};
pub use score::{global_score, local_score, ScoreCache};
pub use search::{learn_structure, SearchConfig, SearchReport};
