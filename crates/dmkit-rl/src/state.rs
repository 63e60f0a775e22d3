//! State, Action, and Reward types for the MDP solvers

use serde::{Deserialize, Serialize};

use dmkit_core::ActionId;

/// Reward value from environment
pub type Reward = f64;

/// Grid navigation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridAction {
    Left,
    Right,
    Up,
    Down,
}

impl GridAction {
    /// All actions in id order
    pub const ALL: [GridAction; 4] = [
        GridAction::Left,
        GridAction::Right,
        GridAction::Up,
        GridAction::Down,
    ];

    /// Coordinate change `(dx, dy)`
    pub fn delta(self) -> (i64, i64) {
        match self {
            GridAction::Left => (-1, 0),
            GridAction::Right => (1, 0),
            GridAction::Up => (0, 1),
            GridAction::Down => (0, -1),
        }
    }

    /// Target cell from `(x, y)` in an `n x n` grid, if it stays inside
    pub fn step(self, x: usize, y: usize, n: usize) -> Option<(usize, usize)> {
        let (dx, dy) = self.delta();
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        let inside = |v: i64| v >= 0 && v < n as i64;
        (inside(nx) && inside(ny)).then_some((nx as usize, ny as usize))
    }

    /// Convert action to index for discrete action spaces
    pub fn to_index(self) -> usize {
        match self {
            GridAction::Left => 0,
            GridAction::Right => 1,
            GridAction::Up => 2,
            GridAction::Down => 3,
        }
    }

    /// Create action from index (for discrete action spaces)
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 1-based id used in policy files
    pub fn id(self) -> ActionId {
        self.to_index() + 1
    }

    pub fn arrow(self) -> char {
        match self {
            GridAction::Left => '←',
            GridAction::Right => '→',
            GridAction::Up => '↑',
            GridAction::Down => '↓',
        }
    }

    /// Number of discrete actions
    pub fn action_space_size() -> usize {
        Self::ALL.len()
    }
}

/// Discretized acceleration command for the moving-car problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Acceleration {
    FullReverse,
    Reverse,
    SoftReverse,
    Coast,
    SoftForward,
    Forward,
    FullForward,
}

impl Acceleration {
    pub const ALL: [Acceleration; 7] = [
        Acceleration::FullReverse,
        Acceleration::Reverse,
        Acceleration::SoftReverse,
        Acceleration::Coast,
        Acceleration::SoftForward,
        Acceleration::Forward,
        Acceleration::FullForward,
    ];

    /// Signed thrust level, -3..=3
    pub fn level(self) -> i32 {
        match self {
            Acceleration::FullReverse => -3,
            Acceleration::Reverse => -2,
            Acceleration::SoftReverse => -1,
            Acceleration::Coast => 0,
            Acceleration::SoftForward => 1,
            Acceleration::Forward => 2,
            Acceleration::FullForward => 3,
        }
    }

    /// Control cost: -25 per squared thrust level
    pub fn reward(self) -> Reward {
        -25.0 * f64::from(self.level() * self.level())
    }

    pub fn to_index(self) -> usize {
        (self.level() + 3) as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parse a 1-based action id
    pub fn from_id(id: ActionId) -> Option<Self> {
        id.checked_sub(1).and_then(Self::from_index)
    }

    pub fn id(self) -> ActionId {
        self.to_index() + 1
    }
}

/// Position and velocity of the car, both as non-negative grid indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CarState {
    pub pos: usize,
    pub vel: usize,
}

impl CarState {
    /// States with `pos + 0.3 * vel` above this are absorbing goal states
    pub const GOAL_THRESHOLD: f64 = 475.0;
    pub const GOAL_VELOCITY_WEIGHT: f64 = 0.3;
    /// States with `pos + 0.35 * vel` at or below this hit the wall
    pub const WALL_THRESHOLD: f64 = 16.0;
    pub const WALL_VELOCITY_WEIGHT: f64 = 0.35;

    pub fn new(pos: usize, vel: usize) -> Self {
        Self { pos, vel }
    }

    /// Decode a flat 0-based index `pos + positions * vel`
    pub fn from_index(index: usize, positions: usize) -> Self {
        Self {
            pos: index % positions,
            vel: index / positions,
        }
    }

    pub fn index(self, positions: usize) -> usize {
        self.pos + self.vel * positions
    }

    pub fn is_goal(self) -> bool {
        self.pos as f64 + Self::GOAL_VELOCITY_WEIGHT * self.vel as f64 > Self::GOAL_THRESHOLD
    }

    pub fn hits_wall(self) -> bool {
        self.pos as f64 + Self::WALL_VELOCITY_WEIGHT * self.vel as f64 <= Self::WALL_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_action_to_index() {
        assert_eq!(GridAction::Left.to_index(), 0);
        assert_eq!(GridAction::Right.to_index(), 1);
        assert_eq!(GridAction::Up.to_index(), 2);
        assert_eq!(GridAction::Down.to_index(), 3);
    }

    #[test]
    fn test_grid_action_from_index() {
        assert_eq!(GridAction::from_index(2), Some(GridAction::Up));
        assert!(GridAction::from_index(4).is_none());
        for action in GridAction::ALL {
            assert_eq!(GridAction::from_index(action.to_index()), Some(action));
        }
    }

    #[test]
    fn test_grid_step_stays_inside() {
        assert_eq!(GridAction::Left.step(0, 0, 3), None);
        assert_eq!(GridAction::Down.step(1, 0, 3), None);
        assert_eq!(GridAction::Right.step(2, 1, 3), None);
        assert_eq!(GridAction::Up.step(1, 2, 3), None);
        assert_eq!(GridAction::Up.step(1, 1, 3), Some((1, 2)));
        assert_eq!(GridAction::Left.step(1, 1, 3), Some((0, 1)));
    }

    #[test]
    fn test_grid_action_ids_are_one_based() {
        assert_eq!(GridAction::Left.id(), 1);
        assert_eq!(GridAction::Down.id(), 4);
        assert_eq!(GridAction::action_space_size(), 4);
    }

    #[test]
    fn test_acceleration_rewards() {
        let rewards: Vec<f64> = Acceleration::ALL.iter().map(|a| a.reward()).collect();
        assert_eq!(rewards, vec![-225.0, -100.0, -25.0, 0.0, -25.0, -100.0, -225.0]);
    }

    #[test]
    fn test_acceleration_ids() {
        assert_eq!(Acceleration::from_id(1), Some(Acceleration::FullReverse));
        assert_eq!(Acceleration::from_id(4), Some(Acceleration::Coast));
        assert_eq!(Acceleration::from_id(0), None);
        assert_eq!(Acceleration::from_id(8), None);
        assert_eq!(Acceleration::FullForward.id(), 7);
    }

    #[test]
    fn test_car_state_index_round_trip() {
        let state = CarState::new(123, 45);
        let index = state.index(500);
        assert_eq!(index, 123 + 45 * 500);
        assert_eq!(CarState::from_index(index, 500), state);
    }

    #[test]
    fn test_car_goal_and_wall_regions() {
        assert!(CarState::new(476, 0).is_goal());
        assert!(!CarState::new(475, 0).is_goal());
        assert!(CarState::new(450, 90).is_goal());
        assert!(CarState::new(16, 0).hits_wall());
        assert!(!CarState::new(17, 0).hits_wall());
        assert!(!CarState::new(0, 60).hits_wall());
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&GridAction::Up).unwrap();
        let parsed: GridAction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, GridAction::Up);
    }
}
