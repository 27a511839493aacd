//! Compliance rule configuration
//!
//! Config-driven rules consumed by the compliance engine: calling windows,
//! attempt caps, prohibited phrases, and per-state required templates.
//! Loadable from YAML so regulatory changes never require a code change.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use collections_agent_core::DialogueState;

use crate::ConfigError;

/// Root compliance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Earliest local hour (inclusive) a call may be placed.
    #[serde(default = "default_window_start")]
    pub call_window_start_hour: u8,

    /// Latest local hour (exclusive) a call may be placed.
    #[serde(default = "default_window_end")]
    pub call_window_end_hour: u8,

    /// Contact attempts allowed per day.
    #[serde(default = "default_daily_cap")]
    pub max_attempts_per_day: u32,

    /// Contact attempts allowed over the life of the case.
    #[serde(default = "default_lifetime_cap")]
    pub max_lifetime_attempts: u32,

    /// Phrases that must never appear in outbound text.
    #[serde(default = "default_prohibited_phrases")]
    pub prohibited_phrases: Vec<String>,

    /// Mandatory statements per dialogue state.
    #[serde(default = "default_required_templates")]
    pub required_templates: HashMap<DialogueState, Vec<String>>,

    /// Prior-attempt count at which risk is considered elevated.
    #[serde(default = "default_high_attempt_threshold")]
    pub high_attempt_threshold: u32,

    /// Days past due at which risk is considered elevated.
    #[serde(default = "default_old_debt_days")]
    pub old_debt_days: u32,
}

fn default_window_start() -> u8 {
    8
}

fn default_window_end() -> u8 {
    21
}

fn default_daily_cap() -> u32 {
    2
}

fn default_lifetime_cap() -> u32 {
    20
}

fn default_high_attempt_threshold() -> u32 {
    10
}

fn default_old_debt_days() -> u32 {
    120
}

fn default_prohibited_phrases() -> Vec<String> {
    [
        "arrest",
        "jail",
        "lawsuit",
        "sue you",
        "garnish your wages",
        "seize your property",
        "criminal charges",
        "tell your employer",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Standard debt-collection disclosure statement.
pub const DISCLOSURE_STATEMENT: &str = "This is an attempt to collect a debt. \
Any information obtained will be used for that purpose.";

fn default_required_templates() -> HashMap<DialogueState, Vec<String>> {
    let mut templates = HashMap::new();
    templates.insert(
        DialogueState::Disclosure,
        vec![DISCLOSURE_STATEMENT.to_string()],
    );
    templates
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            call_window_start_hour: default_window_start(),
            call_window_end_hour: default_window_end(),
            max_attempts_per_day: default_daily_cap(),
            max_lifetime_attempts: default_lifetime_cap(),
            prohibited_phrases: default_prohibited_phrases(),
            required_templates: default_required_templates(),
            high_attempt_threshold: default_high_attempt_threshold(),
            old_debt_days: default_old_debt_days(),
        }
    }
}

impl ComplianceConfig {
    /// Load from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.as_ref().display())))?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Mandatory statements for a state, empty when there are none.
    pub fn templates_for(&self, state: DialogueState) -> &[String] {
        self.required_templates
            .get(&state)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
