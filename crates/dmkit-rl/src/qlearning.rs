//! Tabular Q-learning over a fixed flat state space

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dmkit_core::{DmError, Policy, Result, TransitionSample};

use crate::algorithm::{argmax, PolicySolver};

/// Which next-state action value the TD target bootstraps from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRule {
    /// `Q[s', a]`: the action taken in `s` (SARSA-like)
    #[default]
    SameAction,
    /// `max_a' Q[s', a']`
    MaxNext,
}

/// Q-learning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    pub num_states: usize,
    pub num_actions: usize,
    pub learning_rate: f64,
    pub discount: f64,
    pub target: TargetRule,

    /// Seed for the random actions given to unvisited states
    pub seed: Option<u64>,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            num_states: 10_101_010,
            num_actions: 125,
            learning_rate: 0.1,
            discount: 0.95,
            target: TargetRule::SameAction,
            seed: None,
        }
    }
}

/// Q-learning over a dense `num_states x num_actions` table
pub struct QLearning {
    config: QLearningConfig,
    q_table: Array2<f64>,
    samples: Vec<TransitionSample>,
    updates: usize,
}

impl QLearning {
    pub fn new(config: QLearningConfig) -> Self {
        info!(
            "Allocating Q-table with {} states x {} actions",
            config.num_states, config.num_actions
        );
        Self {
            q_table: Array2::zeros((config.num_states, config.num_actions)),
            samples: Vec::new(),
            updates: 0,
            config,
        }
    }

    /// Solver that trains on `samples` when solved
    pub fn with_samples(config: QLearningConfig, samples: Vec<TransitionSample>) -> Self {
        let mut learner = Self::new(config);
        learner.samples = samples;
        learner
    }

    pub fn q_table(&self) -> &Array2<f64> {
        &self.q_table
    }

    /// Q value for 0-based `(state, action)`
    pub fn q_value(&self, state: usize, action: usize) -> f64 {
        self.q_table[[state, action]]
    }

    fn check(&self, sample: &TransitionSample) -> Result<(usize, usize, usize)> {
        let in_range = |id: usize, limit: usize| id >= 1 && id <= limit;
        if !in_range(sample.state, self.config.num_states)
            || !in_range(sample.next_state, self.config.num_states)
        {
            return Err(DmError::Data(format!(
                "state ids {} -> {} outside 1..={}",
                sample.state, sample.next_state, self.config.num_states
            )));
        }
        if !in_range(sample.action, self.config.num_actions) {
            return Err(DmError::Data(format!(
                "action id {} outside 1..={}",
                sample.action, self.config.num_actions
            )));
        }
        Ok((sample.state - 1, sample.action - 1, sample.next_state - 1))
    }

    /// Apply one TD update from a 1-based sample; returns the TD error
    pub fn update(&mut self, sample: &TransitionSample) -> Result<f64> {
        let (s, a, sp) = self.check(sample)?;

        let next_q = match self.config.target {
            TargetRule::SameAction => self.q_table[[sp, a]],
            TargetRule::MaxNext => self
                .q_table
                .row(sp)
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
        };

        let current_q = self.q_table[[s, a]];
        let td_error = sample.reward + self.config.discount * next_q - current_q;
        self.q_table[[s, a]] = current_q + self.config.learning_rate * td_error;
        self.updates += 1;

        Ok(td_error)
    }

    /// Single pass over `samples`; returns the mean squared TD error
    pub fn train(&mut self, samples: &[TransitionSample]) -> Result<f64> {
        let mut total_loss = 0.0;
        for sample in samples {
            let td_error = self.update(sample)?;
            total_loss += td_error * td_error;
        }

        if samples.is_empty() {
            return Ok(0.0);
        }
        let loss = total_loss / samples.len() as f64;
        debug!("Trained on {} samples, mean squared TD error {}", samples.len(), loss);
        Ok(loss)
    }

    /// Greedy 1-based action per state; never-updated states get a random one
    pub fn policy(&self) -> Result<Policy> {
        if self.config.num_actions == 0 {
            return Err(DmError::Solver("Q-table has no actions".to_string()));
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut unvisited = 0usize;
        let actions = self
            .q_table
            .rows()
            .into_iter()
            .map(|row| {
                if row.iter().all(|&q| q == 0.0) {
                    unvisited += 1;
                    rng.gen_range(1..=self.config.num_actions)
                } else {
                    argmax(row.iter().copied()) + 1
                }
            })
            .collect::<Vec<_>>();

        debug!("{} of {} states received a random action", unvisited, actions.len());
        Ok(Policy::new(actions))
    }
}

impl PolicySolver for QLearning {
    fn name(&self) -> &str {
        "q_learning"
    }

    fn solve(&mut self) -> Result<Policy> {
        let samples = std::mem::take(&mut self.samples);
        let loss = self.train(&samples)?;
        info!("Q-learning pass over {} samples, loss {:.4}", samples.len(), loss);
        self.samples = samples;
        self.policy()
    }

    fn get_params(&self) -> serde_json::Value {
        serde_json::json!({
            "num_states": self.config.num_states,
            "num_actions": self.config.num_actions,
            "learning_rate": self.config.learning_rate,
            "discount": self.config.discount,
            "target": self.config.target,
            "updates": self.updates,
        })
    }
}
