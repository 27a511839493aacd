//! Learner hyper-parameters

use serde::{Deserialize, Serialize};

/// Hyper-parameters shared by the learning strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerParams {
    /// Step size for the bandit's gradient update and Q-learning's alpha.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Q-learning discount factor.
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Initial exploration rate.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Multiplicative epsilon decay applied per finished episode.
    #[serde(default = "default_epsilon_decay")]
    pub epsilon_decay: f64,

    /// Exploration never decays below this.
    #[serde(default = "default_epsilon_floor")]
    pub epsilon_floor: f64,

    /// Value a Q-table entry starts at when first touched.
    #[serde(default)]
    pub initial_q: f64,
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_gamma() -> f64 {
    0.95
}

fn default_epsilon() -> f64 {
    0.2
}

fn default_epsilon_decay() -> f64 {
    0.995
}

fn default_epsilon_floor() -> f64 {
    0.05
}

impl Default for LearnerParams {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            gamma: default_gamma(),
            epsilon: default_epsilon(),
            epsilon_decay: default_epsilon_decay(),
            epsilon_floor: default_epsilon_floor(),
            initial_q: 0.0,
        }
    }
}
