//! Grid-world navigation solved by synchronous value iteration
//!
//! The agent moves on an `N x N` grid. A chosen action succeeds with
//! probability `intended_probability`; the remaining mass is spread evenly
//! over the other actions that keep the agent inside the grid. Choosing an
//! action that would leave the grid has no outcomes at all.

use std::fmt::Write as _;
use std::time::Instant;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use dmkit_core::{DmError, Policy, Result, TransitionSample};

use crate::algorithm::{argmax, PolicySolver};
use crate::state::GridAction;

/// Grid-world configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Side length of the grid
    pub size: usize,

    /// Discount applied to the one-step lookahead
    pub discount: f64,

    /// Number of value-iteration sweeps
    pub sweeps: usize,

    /// Probability that the chosen action is executed as intended
    pub intended_probability: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 10,
            discount: 0.95,
            sweeps: 50,
            intended_probability: 0.6,
        }
    }
}

/// Grid world with reward, utility, and greedy-action tables indexed `[x, y]`
pub struct GridWorld {
    config: GridConfig,
    rewards: Array2<f64>,
    utilities: Array2<f64>,
    arrows: Array2<GridAction>,
    sweeps_done: usize,
}

impl GridWorld {
    /// Create a grid from a square reward table
    pub fn new(rewards: Array2<f64>, config: GridConfig) -> Result<Self> {
        let (w, h) = rewards.dim();
        if w != h || w != config.size {
            return Err(DmError::Config(format!(
                "reward table is {w}x{h}, expected {0}x{0}",
                config.size
            )));
        }
        if !(0.0..=1.0).contains(&config.intended_probability) {
            return Err(DmError::Config(format!(
                "intended_probability {} is not a probability",
                config.intended_probability
            )));
        }

        let n = config.size;
        Ok(Self {
            config,
            rewards,
            utilities: Array2::zeros((n, n)),
            arrows: Array2::from_elem((n, n), GridAction::Left),
            sweeps_done: 0,
        })
    }

    /// Build the reward table from logged transitions.
    ///
    /// State `s` (1-based) is cell `x = (s-1) mod N`, `y = (s-1) div N`; the
    /// first sample seen for a state supplies its reward.
    pub fn from_samples(samples: &[TransitionSample], config: GridConfig) -> Result<Self> {
        let n = config.size;
        let mut rewards = Array2::zeros((n, n));
        let mut seen = Array2::from_elem((n, n), false);

        for sample in samples {
            let idx = sample
                .state
                .checked_sub(1)
                .filter(|&idx| idx < n * n)
                .ok_or_else(|| {
                    DmError::Data(format!("state {} is outside the {n}x{n} grid", sample.state))
                })?;
            let cell = [idx % n, idx / n];
            if !seen[cell] {
                seen[cell] = true;
                rewards[cell] = sample.reward;
            }
        }

        let missing = seen.iter().filter(|s| !**s).count();
        if missing > 0 {
            warn!("{} grid cells have no samples; their reward is 0", missing);
        }

        Self::new(rewards, config)
    }

    pub fn size(&self) -> usize {
        self.config.size
    }

    pub fn utilities(&self) -> &Array2<f64> {
        &self.utilities
    }

    pub fn arrows(&self) -> &Array2<GridAction> {
        &self.arrows
    }

    pub fn sweeps_done(&self) -> usize {
        self.sweeps_done
    }

    /// Actions that keep the agent inside the grid from `(x, y)`
    pub fn valid_actions(&self, x: usize, y: usize) -> Vec<GridAction> {
        GridAction::ALL
            .into_iter()
            .filter(|a| a.step(x, y, self.config.size).is_some())
            .collect()
    }

    /// Outcome distribution `(probability, x2, y2)` of choosing `action` at `(x, y)`
    pub fn transitions(&self, x: usize, y: usize, action: GridAction) -> Vec<(f64, usize, usize)> {
        let n = self.config.size;
        let outcomes: Vec<(GridAction, (usize, usize))> = GridAction::ALL
            .into_iter()
            .filter_map(|b| b.step(x, y, n).map(|cell| (b, cell)))
            .collect();

        if !outcomes.iter().any(|(b, _)| *b == action) {
            return Vec::new();
        }

        let intended = self.config.intended_probability;
        let slip = if outcomes.len() > 1 {
            (1.0 - intended) / (outcomes.len() - 1) as f64
        } else {
            0.0
        };

        outcomes
            .into_iter()
            .map(|(b, (x2, y2))| (if b == action { intended } else { slip }, x2, y2))
            .collect()
    }

    fn lookahead(&self, utilities: &Array2<f64>, x: usize, y: usize, action: GridAction) -> f64 {
        self.transitions(x, y, action)
            .into_iter()
            .map(|(p, x2, y2)| p * utilities[[x2, y2]])
            .sum()
    }

    fn best_lookahead(&self, utilities: &Array2<f64>, x: usize, y: usize) -> f64 {
        GridAction::ALL
            .into_iter()
            .map(|a| self.lookahead(utilities, x, y, a))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// One synchronous sweep: every cell is backed up from the previous table
    pub fn sweep(&mut self) {
        let previous = self.utilities.clone();
        let n = self.config.size;
        for x in 0..n {
            for y in 0..n {
                let backed_up = self.rewards[[x, y]]
                    + self.config.discount * self.best_lookahead(&previous, x, y);
                self.utilities[[x, y]] = backed_up;
            }
        }
        self.sweeps_done += 1;
    }

    /// Run `sweeps` sweeps, then refresh the greedy policy
    pub fn run(&mut self, sweeps: usize) {
        let start = Instant::now();
        for _ in 0..sweeps {
            self.sweep();
        }
        self.update_policy();
        info!(
            "Grid value iteration: {} sweeps in {:.3}s",
            sweeps,
            start.elapsed().as_secs_f64()
        );
        debug!("Grid after {} sweeps:\n{}", self.sweeps_done, self.render());
    }

    /// Greedy action per cell under the current utilities
    pub fn update_policy(&mut self) {
        let n = self.config.size;
        for x in 0..n {
            for y in 0..n {
                let scores = GridAction::ALL
                    .into_iter()
                    .map(|a| self.lookahead(&self.utilities, x, y, a));
                let best = argmax(scores);
                self.arrows[[x, y]] = GridAction::ALL[best];
            }
        }
    }

    /// Largest Bellman residual of the current utilities
    pub fn bellman_residual(&self) -> f64 {
        let n = self.config.size;
        let mut worst: f64 = 0.0;
        for x in 0..n {
            for y in 0..n {
                let backed_up = self.rewards[[x, y]]
                    + self.config.discount * self.best_lookahead(&self.utilities, x, y);
                worst = worst.max((backed_up - self.utilities[[x, y]]).abs());
            }
        }
        worst
    }

    /// Policy with `x` varying fastest, i.e. state `x + y * N + 1`
    pub fn policy(&self) -> Policy {
        let n = self.config.size;
        let mut actions = Vec::with_capacity(n * n);
        for y in 0..n {
            for x in 0..n {
                actions.push(self.arrows[[x, y]].id());
            }
        }
        Policy::new(actions)
    }

    /// Text rendering, top row first
    pub fn render(&self) -> String {
        let n = self.config.size;
        let mut out = String::new();
        for y in (0..n).rev() {
            for x in 0..n {
                let _ = write!(
                    out,
                    " {}{:>9.1}",
                    self.arrows[[x, y]].arrow(),
                    self.utilities[[x, y]]
                );
            }
            out.push('\n');
        }
        out
    }
}

impl PolicySolver for GridWorld {
    fn name(&self) -> &str {
        "gridworld"
    }

    fn solve(&mut self) -> Result<Policy> {
        self.run(self.config.sweeps);
        Ok(self.policy())
    }

    fn get_params(&self) -> serde_json::Value {
        serde_json::json!({
            "size": self.config.size,
            "discount": self.config.discount,
            "sweeps": self.config.sweeps,
            "intended_probability": self.config.intended_probability,
            "sweeps_done": self.sweeps_done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn config(size: usize) -> GridConfig {
        GridConfig {
            size,
            ..GridConfig::default()
        }
    }

    fn flat(size: usize, reward: f64) -> GridWorld {
        GridWorld::new(Array2::from_elem((size, size), reward), config(size)).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = GridConfig::default();
        assert_eq!(config.size, 10);
        assert_eq!(config.discount, 0.95);
        assert_eq!(config.sweeps, 50);
        assert_eq!(config.intended_probability, 0.6);
    }

    #[test]
    fn test_valid_action_counts() {
        let grid = flat(5, 0.0);
        assert_eq!(grid.valid_actions(2, 2).len(), 4);
        assert_eq!(grid.valid_actions(0, 2).len(), 3);
        assert_eq!(grid.valid_actions(2, 4).len(), 3);
        assert_eq!(grid.valid_actions(0, 0).len(), 2);
        assert_eq!(grid.valid_actions(4, 4).len(), 2);
        // second row from the top can still move up
        assert!(grid.valid_actions(4, 3).contains(&GridAction::Up));
    }

    #[test]
    fn test_interior_transitions_sum_to_one() {
        let grid = flat(5, 0.0);
        for action in GridAction::ALL {
            let outcomes = grid.transitions(2, 2, action);
            assert_eq!(outcomes.len(), 4);
            let total: f64 = outcomes.iter().map(|(p, _, _)| p).sum();
            assert!((total - 1.0).abs() < 1e-12);

            let (dx, dy) = action.delta();
            let target = ((2 + dx) as usize, (2 + dy) as usize);
            let intended = outcomes
                .iter()
                .find(|(_, x, y)| (*x, *y) == target)
                .unwrap();
            assert_eq!(intended.0, 0.6);
        }
    }

    #[test]
    fn test_edge_and_corner_transitions() {
        let grid = flat(5, 0.0);
        let edge = grid.transitions(0, 2, GridAction::Up);
        assert_eq!(edge.len(), 3);
        assert!(edge.iter().any(|&(p, x, y)| p == 0.6 && (x, y) == (0, 3)));
        assert!(edge.iter().all(|&(p, _, _)| p == 0.6 || (p - 0.2).abs() < 1e-15));

        let corner = grid.transitions(0, 0, GridAction::Right);
        assert_eq!(corner, vec![(0.6, 1, 0), (0.4, 0, 1)]);
    }

    #[test]
    fn test_invalid_action_has_no_outcomes() {
        let grid = flat(5, 0.0);
        assert!(grid.transitions(0, 0, GridAction::Left).is_empty());
        assert!(grid.transitions(4, 4, GridAction::Up).is_empty());
    }

    #[test]
    fn test_first_sweep_copies_rewards() {
        let rewards = array![[1.0, -2.0], [0.5, 3.0]];
        let mut grid = GridWorld::new(rewards.clone(), config(2)).unwrap();
        grid.sweep();
        assert_eq!(grid.utilities(), &rewards);
    }

    #[test]
    fn test_two_sweeps_by_hand() {
        // rewards[[x, y]]: only the top-right cell pays
        let rewards = array![[0.0, 0.0], [0.0, 10.0]];
        let mut grid = GridWorld::new(rewards, config(2)).unwrap();
        grid.run(2);

        let u = grid.utilities();
        assert_eq!(u[[0, 0]], 0.0);
        assert!((u[[1, 0]] - 0.95 * 6.0).abs() < 1e-12);
        assert!((u[[0, 1]] - 0.95 * 6.0).abs() < 1e-12);
        assert_eq!(u[[1, 1]], 10.0);

        let arrows = grid.arrows();
        assert_eq!(arrows[[0, 0]], GridAction::Right);
        assert_eq!(arrows[[1, 0]], GridAction::Up);
        assert_eq!(arrows[[0, 1]], GridAction::Right);
        assert_eq!(arrows[[1, 1]], GridAction::Left);
    }

    #[test]
    fn test_uniform_reward_fixed_point() {
        // Every cell: u = 1 + 0.95 u  =>  u = 20
        let mut grid = flat(2, 1.0);
        grid.run(600);
        for u in grid.utilities() {
            assert!((u - 20.0).abs() < 1e-9, "utility {u}");
        }
        assert!(grid.bellman_residual() < 1e-9);
    }

    #[test]
    fn test_policy_is_x_fastest() {
        let mut grid = flat(2, 0.0);
        grid.arrows[[1, 0]] = GridAction::Up;
        grid.arrows[[0, 1]] = GridAction::Down;
        assert_eq!(grid.policy().actions(), &[1, 3, 4, 1]);
    }

    #[test]
    fn test_from_samples_uses_first_reward() {
        let samples = vec![
            TransitionSample::new(1, 1, 5.0, 2),
            TransitionSample::new(1, 2, 7.0, 2),
            TransitionSample::new(2, 1, -1.0, 1),
            TransitionSample::new(3, 1, 2.0, 1),
            TransitionSample::new(4, 1, 9.0, 1),
        ];
        let grid = GridWorld::from_samples(&samples, config(2)).unwrap();
        assert_eq!(grid.rewards[[0, 0]], 5.0);
        assert_eq!(grid.rewards[[1, 0]], -1.0);
        assert_eq!(grid.rewards[[0, 1]], 2.0);
        assert_eq!(grid.rewards[[1, 1]], 9.0);
    }

    #[test]
    fn test_from_samples_rejects_out_of_grid_state() {
        let samples = vec![TransitionSample::new(5, 1, 0.0, 1)];
        assert!(GridWorld::from_samples(&samples, config(2)).is_err());
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let result = GridWorld::new(Array2::zeros((2, 3)), config(2));
        assert!(result.is_err());
    }

    #[test]
    fn test_solve_returns_full_policy() {
        let mut grid = flat(3, 1.0);
        let policy = grid.solve().unwrap();
        assert_eq!(policy.len(), 9);
        assert_eq!(grid.sweeps_done(), 50);
        assert!(policy.actions().iter().all(|a| (1..=4).contains(a)));
    }
}
