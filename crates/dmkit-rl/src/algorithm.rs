//! Policy solver trait and shared helpers

use dmkit_core::{Policy, Result};

/// Trait for MDP policy solvers
pub trait PolicySolver: Send {
    /// Solver name
    fn name(&self) -> &str;

    /// Run the solver to completion and return the greedy policy
    fn solve(&mut self) -> Result<Policy>;

    /// Get solver parameters as JSON
    fn get_params(&self) -> serde_json::Value;
}

/// Index of the largest value; the first one wins on ties.
///
/// Returns 0 for an empty iterator.
pub fn argmax<I>(values: I) -> usize
where
    I: IntoIterator<Item = f64>,
{
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (idx, value) in values.into_iter().enumerate() {
        if value > best {
            best = value;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax([1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax([-5.0, -1.0]), 1);
        assert_eq!(argmax([0.0, 0.0]), 0);
    }

    #[test]
    fn test_argmax_empty() {
        assert_eq!(argmax(Vec::<f64>::new()), 0);
    }
}
