//! Hand-written heuristic baseline
//!
//! Fixed if/else rules over observation fields. No learning: the rules are
//! the policy a reasonable collector would follow by hand, and they give
//! the learned strategies a non-trivial bar to clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use collections_agent_core::{Action, DialogueState, Error, ObservationState, Result, Sentiment, Signal};

use crate::learner::{Learner, PolicySnapshot};

const SAVE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SavedState {
    version: u32,
    learner: String,
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct HeuristicLearner {
    episodes_trained: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl HeuristicLearner {
    pub fn new() -> Self {
        Self::default()
    }

    fn preferred(observation: &ObservationState) -> Vec<Action> {
        use Action::*;

        // React to the counterparty before following the script.
        match observation.last_signal {
            Some(Signal::Objection) | Some(Signal::Frustration) => {
                return vec![HandleObjection, Empathize, Clarify];
            }
            Some(Signal::Hardship) => {
                return vec![Empathize, OfferDeferral, OfferSettlement];
            }
            Some(Signal::AsksQuestion) => {
                return vec![Clarify];
            }
            _ => {}
        }

        match observation.dialogue_state {
            DialogueState::Opening => vec![Greet],
            DialogueState::IdentityCheck => vec![VerifyIdentity],
            DialogueState::Disclosure => vec![GiveDisclosure],
            DialogueState::DebtDiscussion => {
                if observation.sentiment == Sentiment::Negative {
                    vec![Empathize, StateDebtDetails]
                } else if observation.time_in_state <= 1 {
                    vec![StateDebtDetails]
                } else {
                    vec![AskReasonForNonpayment, StateDebtDetails]
                }
            }
            DialogueState::Negotiation => {
                if observation.sentiment == Sentiment::Negative {
                    vec![Empathize, OfferDeferral]
                } else if observation.offers_made == 0 {
                    vec![OfferPaymentPlan]
                } else if observation.last_signal == Some(Signal::Refusal) {
                    vec![OfferSettlement, OfferDeferral]
                } else {
                    vec![OfferSettlement, OfferPaymentPlan]
                }
            }
            DialogueState::PaymentSetup => vec![CollectPaymentDetails],
            DialogueState::Confirmation => vec![ConfirmAgreement],
            DialogueState::WrapUp => vec![EndCall],
            DialogueState::ObjectionHandling => vec![HandleObjection, Empathize],
            _ => vec![EndCall],
        }
    }
}

impl Learner for HeuristicLearner {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn select_action(&mut self, observation: &ObservationState, legal: &[Action]) -> Action {
        Self::preferred(observation)
            .into_iter()
            .find(|a| legal.contains(a))
            .unwrap_or(legal[0])
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
        let mut greedy = std::collections::BTreeMap::new();
        for state in collections_agent_core::MAIN_FLOW
            .iter()
            .chain(collections_agent_core::SPECIAL_STATES.iter())
        {
            let obs = crate::learner::probe_observation(*state);
            let legal = collections_agent_core::legal_actions(*state);
            let action = Self::preferred(&obs)
                .into_iter()
                .find(|a| legal.contains(a))
                .unwrap_or(legal[0]);
            greedy.insert(state.as_str().to_string(), action);
        }
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
