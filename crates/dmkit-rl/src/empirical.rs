//! Moving-car MDP with a transition kernel estimated from logged data
//!
//! The state is a (position, velocity) pair flattened to `pos + 500 * vel`.
//! For each acceleration command the change in velocity is modelled as a
//! function of the position bucket, and the change in position as a
//! function of the velocity bucket; the two are treated as independent.

use std::collections::BTreeMap;
use std::time::Instant;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use dmkit_core::{DmError, Policy, Result, TransitionSample};

use crate::algorithm::{argmax, PolicySolver};
use crate::kernel::TransitionKernel;
use crate::state::{Acceleration, CarState, Reward};

/// Moving-car configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarConfig {
    pub positions: usize,
    pub velocities: usize,

    /// Width of the position and velocity buckets used for estimation
    pub bucket_width: usize,

    /// Samples whose position jumps by this much or more are dropped
    pub max_position_jump: i64,

    /// Destination of every wall-hitting state
    pub sink_state: usize,

    /// Reward for every action in an absorbing goal state
    pub goal_reward: Reward,

    pub discount: f64,

    /// Convergence tolerance on the largest utility change
    pub epsilon: f64,

    pub max_iterations: usize,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            positions: 500,
            velocities: 100,
            bucket_width: 10,
            max_position_jump: 20,
            sink_state: 25_000,
            goal_reward: 100_000.0,
            discount: 1.0,
            epsilon: 0.1,
            max_iterations: 10_000,
        }
    }
}

impl CarConfig {
    pub fn num_states(&self) -> usize {
        self.positions * self.velocities
    }
}

/// Empirical distribution of a delta, keyed by bucket
#[derive(Debug, Clone, Default)]
pub struct DeltaTable {
    buckets: BTreeMap<usize, Vec<(i64, f64)>>,
}

impl DeltaTable {
    /// Build from `(bucket, delta)` observations
    pub fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (usize, i64)>,
    {
        let mut counts: BTreeMap<usize, BTreeMap<i64, usize>> = BTreeMap::new();
        for (bucket, delta) in observations {
            *counts.entry(bucket).or_default().entry(delta).or_default() += 1;
        }

        let buckets = counts
            .into_iter()
            .map(|(bucket, deltas)| {
                let total: usize = deltas.values().sum();
                let dist = deltas
                    .into_iter()
                    .map(|(delta, n)| (delta, n as f64 / total as f64))
                    .collect();
                (bucket, dist)
            })
            .collect();

        Self { buckets }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Populated bucket used for `bucket`: clamp into the observed key range,
    /// then move up to the nearest populated key.
    pub fn resolve_bucket(&self, bucket: usize) -> Option<usize> {
        let (&lo, _) = self.buckets.first_key_value()?;
        let (&hi, _) = self.buckets.last_key_value()?;
        let clamped = bucket.clamp(lo, hi);
        self.buckets.range(clamped..).next().map(|(&key, _)| key)
    }

    /// Delta distribution for `bucket`
    pub fn lookup(&self, bucket: usize) -> Option<&[(i64, f64)]> {
        let key = self.resolve_bucket(bucket)?;
        self.buckets.get(&key).map(Vec::as_slice)
    }
}

/// Moving-car solver: per-action rewards and kernels plus the value table
pub struct MovingCar {
    config: CarConfig,
    rewards: Vec<Array1<f64>>,
    kernels: Vec<TransitionKernel>,
    utilities: Array1<f64>,
    policy: Vec<usize>,
    update_progress: Vec<f64>,
}

impl MovingCar {
    /// Estimate the model from logged `(s, a, r, sp)` samples
    pub fn from_samples(samples: &[TransitionSample], config: CarConfig) -> Result<Self> {
        let num_states = config.num_states();
        if config.sink_state >= num_states {
            return Err(DmError::Config(format!(
                "sink state {} is outside {num_states} states",
                config.sink_state
            )));
        }
        if config.bucket_width == 0 {
            return Err(DmError::Config("bucket_width must be positive".to_string()));
        }

        let mut per_action: Vec<Vec<(CarState, CarState)>> = vec![Vec::new(); Acceleration::ALL.len()];
        let mut dropped = 0usize;
        for sample in samples {
            let action = Acceleration::from_id(sample.action)
                .ok_or_else(|| DmError::Data(format!("unknown action id {}", sample.action)))?;
            let from = decode(sample.state, &config)?;
            let to = decode(sample.next_state, &config)?;
            if (to.pos as i64 - from.pos as i64).abs() >= config.max_position_jump {
                dropped += 1;
                continue;
            }
            per_action[action.to_index()].push((from, to));
        }
        if dropped > 0 {
            debug!("Dropped {} samples with outlying position jumps", dropped);
        }

        let rewards = Acceleration::ALL
            .iter()
            .map(|&action| reward_vector(action, &config))
            .collect();

        let kernels = Acceleration::ALL
            .iter()
            .map(|&action| {
                let observed = &per_action[action.to_index()];
                info!(
                    "Generating T_{} from {} samples...",
                    action.id(),
                    observed.len()
                );
                if observed.is_empty() {
                    warn!("No samples for action {}; only wall transitions remain", action.id());
                }
                estimate_kernel(observed, &config)
            })
            .collect();

        Ok(Self {
            utilities: Array1::zeros(num_states),
            policy: vec![1; num_states],
            update_progress: Vec::new(),
            config,
            rewards,
            kernels,
        })
    }

    pub fn utilities(&self) -> &Array1<f64> {
        &self.utilities
    }

    pub fn kernel(&self, action: Acceleration) -> &TransitionKernel {
        &self.kernels[action.to_index()]
    }

    pub fn rewards(&self, action: Acceleration) -> &Array1<f64> {
        &self.rewards[action.to_index()]
    }

    /// Largest utility change of each sweep so far
    pub fn update_progress(&self) -> &[f64] {
        &self.update_progress
    }

    /// `R_a + γ · T_a · U` for one action
    fn action_values(&self, action: usize, utilities: &Array1<f64>) -> Array1<f64> {
        &self.rewards[action] + &(self.kernels[action].expected_value(utilities) * self.config.discount)
    }

    /// Sweep until the largest change drops below `epsilon`.
    ///
    /// Returns whether the tolerance was reached within `max_iterations`.
    pub fn value_iteration(&mut self) -> bool {
        let start = Instant::now();
        let mut converged = false;

        for _ in 0..self.config.max_iterations {
            let mut next = Array1::from_elem(self.utilities.len(), f64::NEG_INFINITY);
            for action in 0..self.kernels.len() {
                let values = self.action_values(action, &self.utilities);
                next.zip_mut_with(&values, |best, &v| {
                    if v > *best {
                        *best = v;
                    }
                });
            }

            let diff = next
                .iter()
                .zip(self.utilities.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            self.update_progress.push(diff);
            self.utilities = next;
            debug!("Sweep {}: max change {}", self.update_progress.len(), diff);

            if diff < self.config.epsilon {
                converged = true;
                break;
            }
        }

        if converged {
            info!(
                "Converged after {} iterations in {:.3}s",
                self.update_progress.len(),
                start.elapsed().as_secs_f64()
            );
        } else {
            warn!(
                "Value iteration hit the {} iteration limit without converging",
                self.config.max_iterations
            );
        }

        self.update_policy();
        converged
    }

    /// Greedy 1-based action per state under the current utilities
    pub fn update_policy(&mut self) {
        let values: Vec<Array1<f64>> = (0..self.kernels.len())
            .map(|action| self.action_values(action, &self.utilities))
            .collect();
        for (s, slot) in self.policy.iter_mut().enumerate() {
            *slot = argmax(values.iter().map(|v| v[s])) + 1;
        }
    }

    pub fn policy(&self) -> Policy {
        Policy::new(self.policy.clone())
    }
}

impl PolicySolver for MovingCar {
    fn name(&self) -> &str {
        "moving_car"
    }

    fn solve(&mut self) -> Result<Policy> {
        self.value_iteration();
        Ok(self.policy())
    }

    fn get_params(&self) -> serde_json::Value {
        serde_json::json!({
            "num_states": self.config.num_states(),
            "discount": self.config.discount,
            "epsilon": self.config.epsilon,
            "max_iterations": self.config.max_iterations,
            "kernel_entries": self.kernels.iter().map(TransitionKernel::nnz).sum::<usize>(),
            "iterations": self.update_progress.len(),
        })
    }
}

fn decode(id: usize, config: &CarConfig) -> Result<CarState> {
    if id == 0 || id > config.num_states() {
        return Err(DmError::Data(format!(
            "state {id} is outside 1..={}",
            config.num_states()
        )));
    }
    Ok(CarState::from_index(id - 1, config.positions))
}

fn reward_vector(action: Acceleration, config: &CarConfig) -> Array1<f64> {
    Array1::from_shape_fn(config.num_states(), |s| {
        if CarState::from_index(s, config.positions).is_goal() {
            config.goal_reward
        } else {
            action.reward()
        }
    })
}

fn estimate_kernel(observed: &[(CarState, CarState)], config: &CarConfig) -> TransitionKernel {
    let w = config.bucket_width;
    let velocity_change = DeltaTable::from_observations(
        observed
            .iter()
            .map(|(from, to)| (from.pos / w, to.vel as i64 - from.vel as i64)),
    );
    let position_change = DeltaTable::from_observations(
        observed
            .iter()
            .map(|(from, to)| (from.vel / w, to.pos as i64 - from.pos as i64)),
    );

    let max_pos = config.positions as i64 - 1;
    let max_vel = config.velocities as i64 - 1;
    let mut kernel = TransitionKernel::new(config.num_states());

    for s in 0..config.num_states() {
        let state = CarState::from_index(s, config.positions);
        if state.is_goal() {
            continue;
        }
        if state.hits_wall() {
            kernel.add(s, config.sink_state, 1.0);
            continue;
        }

        let (Some(dv_table), Some(dp_table)) = (
            velocity_change.lookup(state.pos / w),
            position_change.lookup(state.vel / w),
        ) else {
            continue;
        };

        for &(dp, p_dp) in dp_table {
            for &(dv, p_dv) in dv_table {
                let pos = (state.pos as i64 + dp).clamp(0, max_pos) as usize;
                let vel = (state.vel as i64 + dv).clamp(0, max_vel) as usize;
                kernel.add(s, CarState::new(pos, vel).index(config.positions), p_dp * p_dv);
            }
        }
    }

    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(pos: usize, vel: usize) -> usize {
        CarState::new(pos, vel).index(500) + 1
    }

    #[test]
    fn test_default_config() {
        let config = CarConfig::default();
        assert_eq!(config.num_states(), 50_000);
        assert_eq!(config.sink_state, 25_000);
        assert_eq!(config.epsilon, 0.1);
    }

    #[test]
    fn test_delta_table_distribution() {
        let table = DeltaTable::from_observations(vec![(2, 1), (2, 1), (2, -1), (2, 0)]);
        assert_eq!(table.lookup(2).unwrap(), &[(-1, 0.25), (0, 0.25), (1, 0.5)]);
    }

    #[test]
    fn test_bucket_clamping_and_nudging() {
        let table = DeltaTable::from_observations(vec![(3, 0), (5, 1), (9, 2)]);
        assert_eq!(table.resolve_bucket(0), Some(3));
        assert_eq!(table.resolve_bucket(3), Some(3));
        assert_eq!(table.resolve_bucket(4), Some(5));
        assert_eq!(table.resolve_bucket(6), Some(9));
        assert_eq!(table.resolve_bucket(9), Some(9));
        assert_eq!(table.resolve_bucket(1_000), Some(9));
    }

    #[test]
    fn test_bucket_lookup_never_fails_over_state_space() {
        let table = DeltaTable::from_observations(vec![(12, 0), (20, 1), (33, 2)]);
        let config = CarConfig::default();
        for s in 0..config.num_states() {
            let state = CarState::from_index(s, config.positions);
            assert!(table.lookup(state.pos / config.bucket_width).is_some());
            assert!(table.lookup(state.vel / config.bucket_width).is_some());
        }
    }

    #[test]
    fn test_empty_table_lookup() {
        let table = DeltaTable::default();
        assert!(table.is_empty());
        assert!(table.lookup(4).is_none());
    }

    #[test]
    fn test_reward_vector() {
        let config = CarConfig::default();
        let rewards = reward_vector(Acceleration::Forward, &config);
        assert_eq!(rewards[CarState::new(100, 10).index(500)], -100.0);
        assert_eq!(rewards[CarState::new(480, 0).index(500)], 100_000.0);
    }

    #[test]
    fn test_kernel_estimation() {
        // Coasting at (100, 10) moves one position forward
        let samples = vec![
            TransitionSample::new(id(100, 10), 4, 0.0, id(101, 10)),
            TransitionSample::new(id(105, 12), 4, 0.0, id(106, 12)),
        ];
        let car = MovingCar::from_samples(&samples, CarConfig::default()).unwrap();
        let kernel = car.kernel(Acceleration::Coast);

        let s = CarState::new(200, 15).index(500);
        assert_eq!(kernel.row(s), &[(CarState::new(201, 15).index(500), 1.0)]);

        // Goal states have no outgoing transitions
        assert!(kernel.row(CarState::new(490, 0).index(500)).is_empty());

        // Wall states go to the sink
        assert_eq!(kernel.row(CarState::new(5, 0).index(500)), &[(25_000, 1.0)]);

        // Actions without samples keep only wall transitions
        let empty = car.kernel(Acceleration::FullForward);
        assert!(empty.row(s).is_empty());
        assert_eq!(empty.row(CarState::new(5, 0).index(500)), &[(25_000, 1.0)]);
    }

    #[test]
    fn test_destinations_are_clamped() {
        let samples = vec![TransitionSample::new(id(100, 98), 7, 0.0, id(103, 99))];
        let car = MovingCar::from_samples(&samples, CarConfig::default()).unwrap();
        let kernel = car.kernel(Acceleration::FullForward);

        // vel 99 + 1 clamps to 99
        let s = CarState::new(200, 99).index(500);
        assert_eq!(kernel.row(s), &[(CarState::new(203, 99).index(500), 1.0)]);
        for s in 0..kernel.num_states() {
            for &(to, _) in kernel.row(s) {
                assert!(to < 50_000);
            }
        }
    }

    #[test]
    fn test_outliers_dropped() {
        let samples = vec![TransitionSample::new(id(100, 10), 4, 0.0, id(130, 10))];
        let car = MovingCar::from_samples(&samples, CarConfig::default()).unwrap();
        assert_eq!(car.kernel(Acceleration::Coast).row(CarState::new(200, 15).index(500)).len(), 0);
    }

    #[test]
    fn test_rejects_bad_ids() {
        let config = CarConfig::default();
        let bad_action = vec![TransitionSample::new(1, 8, 0.0, 1)];
        assert!(MovingCar::from_samples(&bad_action, config.clone()).is_err());
        let bad_state = vec![TransitionSample::new(50_001, 1, 0.0, 1)];
        assert!(MovingCar::from_samples(&bad_state, config).is_err());
    }

    #[test]
    fn test_iteration_limit() {
        let samples = vec![TransitionSample::new(id(100, 10), 4, 0.0, id(101, 10))];
        let config = CarConfig {
            max_iterations: 2,
            ..CarConfig::default()
        };
        let mut car = MovingCar::from_samples(&samples, config).unwrap();
        assert!(!car.value_iteration());
        assert_eq!(car.update_progress().len(), 2);
        assert_eq!(car.policy().len(), 50_000);
    }
}
