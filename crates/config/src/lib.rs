//! Layered configuration for the collections agent trainer
//!
//! - `Settings`: main application settings (files + env overrides)
//! - `ComplianceConfig`: regulatory rule tables
//! - `RewardConfig`: shaping/terminal/penalty constants
//! - `LearnerParams`: learner hyper-parameters

pub mod compliance;
pub mod learning;
pub mod rewards;
pub mod settings;

pub use compliance::{ComplianceConfig, DISCLOSURE_STATEMENT};
pub use learning::LearnerParams;
pub use rewards::RewardConfig;
pub use settings::{load_settings, EpisodeSettings, RuntimeEnvironment, Settings, TrainingSettings};

/// Errors when loading configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
