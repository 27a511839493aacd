//! Learner trait
//!
//! Pluggable action-selection and update strategies. A learner owns all of
//! its mutable state; concurrent updates from multiple trajectories are not
//! safe and must be serialized by the caller (one update loop per learner).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use collections_agent_core::{legal_actions, Action, ObservationState, Result, MAIN_FLOW, SPECIAL_STATES};

use serde::{Deserialize, Serialize};

/// Read-only view of what a learner has learned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub learner: String,
    /// Greedy action per dialogue state, probed with a canonical
    /// observation for that state.
    pub greedy_actions: BTreeMap<String, Action>,
    /// Raw weights or table, learner-specific shape.
    pub parameters: Value,
    pub episodes_trained: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// An action-selection/update strategy.
pub trait Learner: Send {
    /// Stable name used in reports and persisted payloads.
    fn name(&self) -> &'static str;

    /// Choose one of the legal actions for this observation.
    ///
    /// `legal` is never empty; the returned action is always drawn from it.
    fn select_action(&mut self, observation: &ObservationState, legal: &[Action]) -> Action;

    /// Incorporate one step of experience.
    ///
    /// `next_state` is `None` on the terminal step; when `done` is true the
    /// update must not depend on `next_state`'s content.
    fn update(
        &mut self,
        state: &ObservationState,
        action: Action,
        reward: f64,
        next_state: Option<&ObservationState>,
        done: bool,
    );

    /// Read-only snapshot; never mutates the learner.
    fn snapshot(&self) -> PolicySnapshot;

    /// Serialize learned state to an opaque string.
    fn save(&self) -> Result<String>;

    /// Restore from a `save` payload.
    ///
    /// A malformed payload is fatal at load time and leaves the learner
    /// untouched.
    fn load(&mut self, payload: &str) -> Result<()>;

    /// Discard everything learned and start fresh.
    fn reset(&mut self);

    fn episodes_trained(&self) -> u64;
}

/// Single-writer handle to a learner shared across environments.
///
/// Every call locks the learner, so concurrent trajectories can never
/// interleave updates against the same table or weights. Clones share the
/// same underlying learner.
#[derive(Clone)]
pub struct SharedLearner {
    inner: Arc<Mutex<Box<dyn Learner>>>,
}

impl SharedLearner {
    pub fn new(learner: Box<dyn Learner>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(learner)),
        }
    }
}

impl Learner for SharedLearner {
    fn name(&self) -> &'static str {
        self.inner.lock().name()
    }

    fn select_action(&mut self, observation: &ObservationState, legal: &[Action]) -> Action {
        self.inner.lock().select_action(observation, legal)
    }

    fn update(
        &mut self,
        state: &ObservationState,
        action: Action,
        reward: f64,
        next_state: Option<&ObservationState>,
        done: bool,
    ) {
        self.inner.lock().update(state, action, reward, next_state, done)
    }

    fn snapshot(&self) -> PolicySnapshot {
        self.inner.lock().snapshot()
    }

    fn save(&self) -> Result<String> {
        self.inner.lock().save()
    }

    fn load(&mut self, payload: &str) -> Result<()> {
        self.inner.lock().load(payload)
    }

    fn reset(&mut self) {
        self.inner.lock().reset()
    }

    fn episodes_trained(&self) -> u64 {
        self.inner.lock().episodes_trained()
    }
}

/// Canonical probe observation for one dialogue state.
///
/// Used to report a per-state greedy action in snapshots.
pub(crate) fn probe_observation(
    state: collections_agent_core::DialogueState,
) -> ObservationState {
    use collections_agent_core::{DaysPastDueBucket, DebtBucket, Sentiment};
    ObservationState {
        dialogue_state: state,
        turn_count: 0,
        time_in_state: 0,
        debt_bucket: DebtBucket::Medium,
        days_past_due_bucket: DaysPastDueBucket::D60,
        prior_attempts: 0,
        identity_verified: false,
        disclosure_complete: false,
        last_signal: None,
        sentiment: Sentiment::Neutral,
        objections_raised: 0,
        offers_made: 0,
    }
}

/// Greedy action per dialogue state for any value function.
pub(crate) fn greedy_by_state(
    mut value: impl FnMut(&ObservationState, Action) -> f64,
) -> BTreeMap<String, Action> {
    let mut map = BTreeMap::new();
    for state in MAIN_FLOW.iter().chain(SPECIAL_STATES.iter()) {
        let obs = probe_observation(*state);
        let legal = legal_actions(*state);
        let mut best = legal[0];
        let mut best_value = value(&obs, best);
        for &action in &legal[1..] {
            let v = value(&obs, action);
            if v > best_value {
                best = action;
                best_value = v;
            }
        }
        map.insert(state.as_str().to_string(), best);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learners::RandomLearner;
    use collections_agent_core::DialogueState;

    #[test]
    fn test_greedy_by_state_covers_every_state() {
        let map = greedy_by_state(|_, action| action.index() as f64);
        assert_eq!(map.len(), 14);
        // Highest-index legal action wins under this value function.
        assert_eq!(map["do_not_contact"], Action::EndCall);
    }

    #[test]
    fn test_shared_learner_serializes_access() {
        let mut shared = SharedLearner::new(Box::new(RandomLearner::new(5)));
        let obs = probe_observation(DialogueState::Opening);
        let legal = legal_actions(DialogueState::Opening);

        let mut clone = shared.clone();
        clone.update(&obs, Action::Greet, 1.0, None, true);
        // The clone mutated the same underlying learner.
        assert_eq!(shared.episodes_trained(), 1);
        assert!(legal.contains(&shared.select_action(&obs, legal)));
    }
}
