//! Main settings module
//!
//! Layered configuration: defaults in code, overridden by
//! `config/default.yaml`, then `config/{env}.yaml`, then
//! `COLLECTIONS_AGENT_*` environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::compliance::ComplianceConfig;
use crate::learning::LearnerParams;
use crate::rewards::RewardConfig;
use crate::ConfigError;

/// Runtime environment enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Episode-level settings for the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeSettings {
    /// Episode truncation ceiling.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Base RNG seed; episode seeds are derived from it.
    #[serde(default = "default_base_seed")]
    pub base_seed: u64,
}

fn default_max_turns() -> u32 {
    30
}

fn default_base_seed() -> u64 {
    7
}

impl Default for EpisodeSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            base_seed: default_base_seed(),
        }
    }
}

/// Training-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Number of training episodes.
    #[serde(default = "default_episodes")]
    pub episodes: u32,

    /// Evaluate every N training episodes.
    #[serde(default = "default_eval_interval")]
    pub eval_interval: u32,

    /// Episodes per periodic evaluation.
    #[serde(default = "default_eval_episodes")]
    pub eval_episodes: u32,

    /// Episodes in the final evaluation.
    #[serde(default = "default_final_eval_episodes")]
    pub final_eval_episodes: u32,

    /// When false, training-episode metrics substitute for evaluations.
    #[serde(default = "default_true")]
    pub eval_enabled: bool,
}

fn default_episodes() -> u32 {
    1000
}

fn default_eval_interval() -> u32 {
    100
}

fn default_eval_episodes() -> u32 {
    50
}

fn default_final_eval_episodes() -> u32 {
    200
}

fn default_true() -> bool {
    true
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            episodes: default_episodes(),
            eval_interval: default_eval_interval(),
            eval_episodes: default_eval_episodes(),
            final_eval_episodes: default_final_eval_episodes(),
            eval_enabled: true,
        }
    }
}

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub episode: EpisodeSettings,

    #[serde(default)]
    pub training: TrainingSettings,

    #[serde(default)]
    pub learner: LearnerParams,

    #[serde(default)]
    pub rewards: RewardConfig,

    #[serde(default)]
    pub compliance: ComplianceConfig,

    /// Directory for learner snapshots, curves, and episode records.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    "runs".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            episode: EpisodeSettings::default(),
            training: TrainingSettings::default(),
            learner: LearnerParams::default(),
            rewards: RewardConfig::default(),
            compliance: ComplianceConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl Settings {
    /// Reject configurations that cannot drive a training run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.episode.max_turns == 0 {
            return Err(ConfigError::Parse("episode.max_turns must be > 0".into()));
        }
        if self.training.eval_enabled && self.training.eval_interval == 0 {
            return Err(ConfigError::Parse(
                "training.eval_interval must be > 0 when evaluation is enabled".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.learner.epsilon)
            || !(0.0..=1.0).contains(&self.learner.epsilon_floor)
        {
            return Err(ConfigError::Parse(
                "learner.epsilon and learner.epsilon_floor must be in [0, 1]".into(),
            ));
        }
        if self.learner.learning_rate <= 0.0 {
            return Err(ConfigError::Parse("learner.learning_rate must be > 0".into()));
        }
        Ok(())
    }
}

/// Load settings from files and environment.
///
/// Priority: env vars > `config/{env}.yaml` > `config/default.yaml` >
/// built-in defaults. Missing files are fine.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("COLLECTIONS_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    let settings: Settings = config
        .try_deserialize()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    settings.validate()?;

    Ok(settings)
}
