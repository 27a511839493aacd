//! Uniform-random baseline

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use collections_agent_core::{Action, Error, ObservationState, Result};

use crate::learner::{Learner, PolicySnapshot};

const SAVE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SavedState {
    version: u32,
    learner: String,
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

/// Picks uniformly among the legal actions; learns nothing.
pub struct RandomLearner {
    seed: u64,
    rng: ChaCha8Rng,
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl RandomLearner {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            episodes_trained: 0,
            last_updated: None,
        }
    }
}

impl Learner for RandomLearner {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select_action(&mut self, _observation: &ObservationState, legal: &[Action]) -> Action {
        legal[self.rng.gen_range(0..legal.len())]
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
        PolicySnapshot {
            learner: self.name().to_string(),
            greedy_actions: BTreeMap::new(),
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
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.episodes_trained = 0;
        self.last_updated = None;
    }

    fn episodes_trained(&self) -> u64 {
        self.episodes_trained
    }
}
