//! Learning strategies

pub mod bandit;
pub mod fixed;
pub mod heuristic;
pub mod qlearning;
pub mod random;

pub use bandit::LinearBandit;
pub use fixed::FixedScriptLearner;
pub use heuristic::HeuristicLearner;
pub use qlearning::QLearner;
pub use random::RandomLearner;
