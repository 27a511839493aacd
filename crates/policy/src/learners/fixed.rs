//! Fixed-script baseline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use collections_agent_core::{Action, Error, ObservationState, Result};

use crate::learner::{greedy_by_state, Learner, PolicySnapshot};

const SAVE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SavedState {
    version: u32,
    learner: String,
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

/// Always takes the first legal action: the canonical happy-path script.
#[derive(Default)]
pub struct FixedScriptLearner {
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl FixedScriptLearner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Learner for FixedScriptLearner {
    fn name(&self) -> &'static str {
        "fixed_script"
    }

    fn select_action(&mut self, _observation: &ObservationState, legal: &[Action]) -> Action {
        legal[0]
    }

    fn update(
        &mut self,
        _state: &ObservationState,
        _action: Action,
        _reward: f64,
        _next_state: Option<&ObservationState>,
        done: bool,
    ) {
        if done {
            self.episodes_trained += 1;
            self.last_updated = Some(Utc::now());
        }
    }

    fn snapshot(&self) -> PolicySnapshot {
        // The script is exactly "first legal action everywhere".
        let greedy = greedy_by_state(|_, _| 0.0);
        PolicySnapshot {
            learner: self.name().to_string(),
            greedy_actions: greedy,
            parameters: json!({}),
            episodes_trained: self.episodes_trained,
            last_updated: self.last_updated,
        }
    }

    fn save(&self) -> Result<String> {
        let state = SavedState {
            version: SAVE_VERSION,
            learner: self.name().to_string(),
            episodes_trained: self.episodes_trained,
            last_updated: self.last_updated,
        };
        serde_json::to_string(&state).map_err(|e| Error::MalformedLearnerState(e.to_string()))
    }

    fn load(&mut self, payload: &str) -> Result<()> {
        let state: SavedState = serde_json::from_str(payload)
            .map_err(|e| Error::MalformedLearnerState(e.to_string()))?;
        if state.version != SAVE_VERSION || state.learner != self.name() {
            return Err(Error::MalformedLearnerState(format!(
                "expected {} v{SAVE_VERSION}, got {} v{}",
                self.name(),
                state.learner,
                state.version
            )));
        }
        self.episodes_trained = state.episodes_trained;
        self.last_updated = state.last_updated;
        Ok(())
    }

    fn reset(&mut self) {
        self.episodes_trained = 0;
        self.last_updated = None;
    }

    fn episodes_trained(&self) -> u64 {
        self.episodes_trained
    }
}
