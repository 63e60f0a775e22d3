//! dmkit RL - Policy solvers for Markov Decision Processes
//!
//! This crate provides three independent solvers:
//! - `GridWorld`: analytic noisy-navigation model solved by value iteration
//! - `MovingCar`: kernel estimated from logged transitions, solved by value iteration
//! - `QLearning`: tabular TD learning from a stream of transitions

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::float_cmp)]
#![allow(clippy::similar_names)]

pub mod algorithm;
pub mod empirical;
pub mod gridworld;
pub mod kernel;
pub mod qlearning;
pub mod state;

pub use algorithm::PolicySolver;
pub use empirical::{CarConfig, MovingCar};
pub use gridworld::{GridConfig, GridWorld};
pub use kernel::TransitionKernel;
pub use qlearning::{QLearning, QLearningConfig, TargetRule};
pub use state::{Acceleration, CarState, GridAction, Reward};
