//! Reward shaping, state projection, and learning strategies
//!
//! - `RewardEngine`: shaping milestones, terminal constants, turn penalty
//! - `StateProjector`: observation derivation, discretization, features
//! - `Learner`: pluggable strategies from uniform-random to tabular
//!   Q-learning

pub mod learner;
pub mod learners;
pub mod projector;
pub mod reward;

pub use learner::{Learner, PolicySnapshot, SharedLearner};
pub use learners::{FixedScriptLearner, HeuristicLearner, LinearBandit, QLearner, RandomLearner};
pub use projector::{InteractionHistory, StateProjector, FEATURE_DIM};
pub use reward::{RewardEngine, RewardTracker, TerminalContext};
