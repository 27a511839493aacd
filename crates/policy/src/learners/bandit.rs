//! Linear contextual bandit
//!
//! One weight vector per action over the fixed feature encoding of the
//! observation. Selection is epsilon-greedy over dot products restricted to
//! the legal set; the update is a one-step stochastic gradient toward the
//! observed reward. There is no bootstrapping from the next state; the dense
//! shaping makes immediate reward a usable target.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use collections_agent_config::LearnerParams;
use collections_agent_core::{Action, Error, ObservationState, Result, ALL_ACTIONS};

use crate::learner::{greedy_by_state, Learner, PolicySnapshot};
use crate::projector::{StateProjector, FEATURE_DIM};

const SAVE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SavedState {
    version: u32,
    learner: String,
    feature_dim: usize,
    weights: Vec<Vec<f64>>,
    epsilon: f64,
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

/// Per-action linear value model.
pub struct LinearBandit {
    params: LearnerParams,
    seed: u64,
    rng: ChaCha8Rng,
    /// Indexed by `Action::index()`, each `FEATURE_DIM` long.
    weights: Vec<Vec<f64>>,
    epsilon: f64,
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl LinearBandit {
    pub fn new(params: LearnerParams, seed: u64) -> Self {
        Self {
            epsilon: params.epsilon,
            params,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            weights: vec![vec![0.0; FEATURE_DIM]; ALL_ACTIONS.len()],
            episodes_trained: 0,
            last_updated: None,
        }
    }

    /// Predicted reward for taking `action` in `observation`.
    pub fn predict(&self, observation: &ObservationState, action: Action) -> f64 {
        let features = StateProjector::feature_vector(observation);
        dot(&self.weights[action.index()], &features)
    }

    fn greedy(&self, observation: &ObservationState, legal: &[Action]) -> Action {
        let features = StateProjector::feature_vector(observation);
        let mut best = legal[0];
        let mut best_value = dot(&self.weights[best.index()], &features);
        for &action in &legal[1..] {
            let value = dot(&self.weights[action.index()], &features);
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }
}

fn dot(weights: &[f64], features: &[f64]) -> f64 {
    weights.iter().zip(features).map(|(w, x)| w * x).sum()
}

impl Learner for LinearBandit {
    fn name(&self) -> &'static str {
        "linear_bandit"
    }

    fn select_action(&mut self, observation: &ObservationState, legal: &[Action]) -> Action {
        if self.rng.gen::<f64>() < self.epsilon {
            legal[self.rng.gen_range(0..legal.len())]
        } else {
            self.greedy(observation, legal)
        }
    }

    fn update(
        &mut self,
        state: &ObservationState,
        action: Action,
        reward: f64,
        _next_state: Option<&ObservationState>,
        done: bool,
    ) {
        let features = StateProjector::feature_vector(state);
        let prediction = dot(&self.weights[action.index()], &features);
        let error = reward - prediction;
        let lr = self.params.learning_rate;
        for (w, x) in self.weights[action.index()].iter_mut().zip(&features) {
            *w += lr * error * x;
        }
        self.last_updated = Some(Utc::now());

        if done {
            self.episodes_trained += 1;
            self.epsilon = (self.epsilon * self.params.epsilon_decay).max(self.params.epsilon_floor);
        }
    }

    fn snapshot(&self) -> PolicySnapshot {
        let greedy = greedy_by_state(|obs, action| self.predict(obs, action));
        PolicySnapshot {
            learner: self.name().to_string(),
            greedy_actions: greedy,
            parameters: json!({
                "feature_dim": FEATURE_DIM,
                "epsilon": self.epsilon,
                "weights": self.weights,
            }),
            episodes_trained: self.episodes_trained,
            last_updated: self.last_updated,
        }
    }

    fn save(&self) -> Result<String> {
        let state = SavedState {
            version: SAVE_VERSION,
            learner: self.name().to_string(),
            feature_dim: FEATURE_DIM,
            weights: self.weights.clone(),
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
        if state.feature_dim != FEATURE_DIM
            || state.weights.len() != ALL_ACTIONS.len()
            || state.weights.iter().any(|w| w.len() != FEATURE_DIM)
        {
            return Err(Error::MalformedLearnerState(format!(
                "weight shape mismatch: {} actions x {} features expected",
                ALL_ACTIONS.len(),
                FEATURE_DIM
            )));
        }
        self.weights = state.weights;
        self.epsilon = state.epsilon;
        self.episodes_trained = state.episodes_trained;
        self.last_updated = state.last_updated;
        Ok(())
    }

    fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.weights = vec![vec![0.0; FEATURE_DIM]; ALL_ACTIONS.len()];
        self.epsilon = self.params.epsilon;
        self.episodes_trained = 0;
        self.last_updated = None;
    }

    fn episodes_trained(&self) -> u64 {
        self.episodes_trained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collections_agent_core::{legal_actions, DialogueState};

    fn observation() -> ObservationState {
        crate::learner::probe_observation(DialogueState::Negotiation)
    }

    #[test]
    fn test_update_moves_prediction_toward_reward() {
        let mut bandit = LinearBandit::new(LearnerParams::default(), 3);
        let obs = observation();
        let before = bandit.predict(&obs, Action::OfferPaymentPlan);
        bandit.update(&obs, Action::OfferPaymentPlan, 5.0, None, false);
        let after = bandit.predict(&obs, Action::OfferPaymentPlan);
        assert!((5.0 - after).abs() < (5.0 - before).abs());
    }

    #[test]
    fn test_update_touches_only_taken_action() {
        let mut bandit = LinearBandit::new(LearnerParams::default(), 3);
        let obs = observation();
        bandit.update(&obs, Action::OfferPaymentPlan, 5.0, None, false);
        assert_eq!(bandit.predict(&obs, Action::OfferSettlement), 0.0);
    }

    #[test]
    fn test_save_load_round_trip_identical_predictions() {
        let mut bandit = LinearBandit::new(LearnerParams::default(), 3);
        let obs = observation();
        for i in 0..25 {
            bandit.update(&obs, Action::OfferPaymentPlan, (i % 5) as f64, None, i % 7 == 0);
            bandit.update(&obs, Action::Empathize, -1.0, None, false);
        }
        let payload = bandit.save().unwrap();

        let mut restored = LinearBandit::new(LearnerParams::default(), 99);
        restored.load(&payload).unwrap();
        for &action in legal_actions(DialogueState::Negotiation) {
            assert_eq!(
                bandit.predict(&obs, action).to_bits(),
                restored.predict(&obs, action).to_bits()
            );
        }
        assert_eq!(restored.episodes_trained(), bandit.episodes_trained());
    }

    #[test]
    fn test_load_rejects_malformed_payload() {
        let mut bandit = LinearBandit::new(LearnerParams::default(), 3);
        bandit.update(&observation(), Action::Empathize, 1.0, None, false);
        let before = bandit.predict(&observation(), Action::Empathize);

        assert!(bandit.load("not json").is_err());
        assert!(bandit.load("{\"version\":99}").is_err());
        // Failed loads leave the learner untouched.
        assert_eq!(before.to_bits(), bandit.predict(&observation(), Action::Empathize).to_bits());
    }

    #[test]
    fn test_epsilon_decays_to_floor() {
        let params = LearnerParams {
            epsilon: 0.5,
            epsilon_decay: 0.5,
            epsilon_floor: 0.1,
            ..LearnerParams::default()
        };
        let mut bandit = LinearBandit::new(params, 3);
        let obs = observation();
        for _ in 0..20 {
            bandit.update(&obs, Action::Empathize, 0.0, None, true);
        }
        assert!((bandit.epsilon - 0.1).abs() < 1e-12);
    }
}
