//! Tabular Q-learning
//!
//! `Q[state key][action]`, lazily initialized. The legal-action set of a
//! hypothetical next state is derived from the dialogue-state token
//! embedded in its key, since bootstrapping must not depend on any live
//! session.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

use collections_agent_config::LearnerParams;
use collections_agent_core::{legal_actions, Action, Error, ObservationState, Result, StateKey};

use crate::learner::{Learner, PolicySnapshot};

const SAVE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SavedState {
    version: u32,
    learner: String,
    /// State key -> action token -> value, ordered for stable payloads.
    table: BTreeMap<String, BTreeMap<String, f64>>,
    epsilon: f64,
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

/// Epsilon-greedy tabular Q-learner.
pub struct QLearner {
    params: LearnerParams,
    seed: u64,
    rng: ChaCha8Rng,
    table: HashMap<String, HashMap<Action, f64>>,
    epsilon: f64,
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl QLearner {
    pub fn new(params: LearnerParams, seed: u64) -> Self {
        Self {
            epsilon: params.epsilon,
            params,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            table: HashMap::new(),
            episodes_trained: 0,
            last_updated: None,
        }
    }

    /// Current value of (state, action); the lazy-init constant when unseen.
    pub fn q_value(&self, key: &StateKey, action: Action) -> f64 {
        self.table
            .get(key.as_str())
            .and_then(|row| row.get(&action))
            .copied()
            .unwrap_or(self.params.initial_q)
    }

    /// Number of distinct state keys touched so far.
    pub fn states_seen(&self) -> usize {
        self.table.len()
    }

    fn greedy(&self, key: &StateKey, legal: &[Action]) -> Action {
        let mut best = legal[0];
        let mut best_value = self.q_value(key, best);
        for &action in &legal[1..] {
            let value = self.q_value(key, action);
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }

    /// Best attainable value from a hypothetical next state.
    ///
    /// The legal set comes from the dialogue state parsed out of the key,
    /// never from a live context: the bootstrap target may refer to states
    /// the session is not currently in.
    fn max_next_q(&self, next_key: &StateKey) -> f64 {
        let Some(state) = next_key.dialogue_state() else {
            tracing::warn!(key = %next_key, "state key missing dialogue-state token");
            return self.params.initial_q;
        };
        legal_actions(state)
            .iter()
            .map(|a| self.q_value(next_key, *a))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl Learner for QLearner {
    fn name(&self) -> &'static str {
        "q_learning"
    }

    fn select_action(&mut self, observation: &ObservationState, legal: &[Action]) -> Action {
        if self.rng.gen::<f64>() < self.epsilon {
            legal[self.rng.gen_range(0..legal.len())]
        } else {
            self.greedy(&observation.state_key(), legal)
        }
    }

    fn update(
        &mut self,
        state: &ObservationState,
        action: Action,
        reward: f64,
        next_state: Option<&ObservationState>,
        done: bool,
    ) {
        let key = state.state_key();

        let target = match (done, next_state) {
            // Terminal or truncated: nothing to bootstrap from.
            (true, _) | (_, None) => reward,
            (false, Some(next)) => {
                reward + self.params.gamma * self.max_next_q(&next.state_key())
            }
        };

        let initial_q = self.params.initial_q;
        let entry = self
            .table
            .entry(key.as_str().to_string())
            .or_default()
            .entry(action)
            .or_insert(initial_q);
        *entry += self.params.learning_rate * (target - *entry);
        self.last_updated = Some(Utc::now());

        if done {
            self.episodes_trained += 1;
            self.epsilon = (self.epsilon * self.params.epsilon_decay).max(self.params.epsilon_floor);
        }
    }

    fn snapshot(&self) -> PolicySnapshot {
        // Greedy action per seen state key.
        let mut greedy_actions = BTreeMap::new();
        for key_str in self.table.keys() {
            let key = StateKey::from_raw(key_str.clone());
            if let Some(state) = key.dialogue_state() {
                greedy_actions.insert(
                    key_str.clone(),
                    self.greedy(&key, legal_actions(state)),
                );
            }
        }

        let table: BTreeMap<String, BTreeMap<String, f64>> = self
            .table
            .iter()
            .map(|(key, row)| {
                let row = row
                    .iter()
                    .map(|(action, value)| (action.as_str().to_string(), *value))
                    .collect();
                (key.clone(), row)
            })
            .collect();

        PolicySnapshot {
            learner: self.name().to_string(),
            greedy_actions,
            parameters: json!({
                "epsilon": self.epsilon,
                "states": self.table.len(),
                "table": table,
            }),
            episodes_trained: self.episodes_trained,
            last_updated: self.last_updated,
        }
    }

    fn save(&self) -> Result<String> {
        let table = self
            .table
            .iter()
            .map(|(key, row)| {
                let row = row
                    .iter()
                    .map(|(action, value)| (action.as_str().to_string(), *value))
                    .collect();
                (key.clone(), row)
            })
            .collect();
        let state = SavedState {
            version: SAVE_VERSION,
            learner: self.name().to_string(),
            table,
            epsilon: self.epsilon,
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

        // Validate the whole payload before touching the live table.
        let mut table: HashMap<String, HashMap<Action, f64>> = HashMap::new();
        for (key, row) in state.table {
            if StateKey::from_raw(key.clone()).dialogue_state().is_none() {
                return Err(Error::MalformedLearnerState(format!(
                    "unparseable state key: {key}"
                )));
            }
            let mut actions = HashMap::new();
            for (token, value) in row {
                let action = Action::from_token(&token).ok_or_else(|| {
                    Error::MalformedLearnerState(format!("unknown action token: {token}"))
                })?;
                actions.insert(action, value);
            }
            table.insert(key, actions);
        }

        self.table = table;
        self.epsilon = state.epsilon;
        self.episodes_trained = state.episodes_trained;
        self.last_updated = state.last_updated;
        Ok(())
    }

    fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.table.clear();
        self.epsilon = self.params.epsilon;
        self.episodes_trained = 0;
        self.last_updated = None;
    }

    fn episodes_trained(&self) -> u64 {
        self.episodes_trained
    }
}
