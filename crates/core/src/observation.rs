//! Observation state and discretization key
//!
//! `ObservationState` is the bounded feature record the learners see; a
//! fresh instance is derived every turn and never mutated in place.
//! `StateKey` is its deterministic string encoding with every unbounded
//! counter clamped, keeping the tabular state space finite.

use serde::{Deserialize, Serialize};

use crate::dialogue::{DialogueState, Signal};

/// Clamp ceilings applied when encoding a `StateKey`.
///
/// Changing any ceiling changes the effective tabular state space and must
/// be versioned together with any persisted Q-table.
pub mod clamps {
    pub const TURN_COUNT: u32 = 20;
    pub const TIME_IN_STATE: u32 = 5;
    pub const PRIOR_ATTEMPTS: u32 = 5;
    pub const OBJECTIONS_RAISED: u32 = 3;
    pub const OFFERS_MADE: u32 = 3;
}

/// Debt amount bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtBucket {
    Low,
    Medium,
    High,
}

impl DebtBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

/// Days-past-due bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaysPastDueBucket {
    D30,
    D60,
    D90,
    D120Plus,
}

impl DaysPastDueBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::D30 => "d30",
            Self::D60 => "d60",
            Self::D90 => "d90",
            Self::D120Plus => "d120plus",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::D30 => 0,
            Self::D60 => 1,
            Self::D90 => 2,
            Self::D120Plus => 3,
        }
    }
}

/// Coarse sentiment of the latest counterparty message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Positive => 0,
            Self::Neutral => 1,
            Self::Negative => 2,
        }
    }
}

/// Bounded feature record derived from the dialogue context, case facts,
/// and interaction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationState {
    pub dialogue_state: DialogueState,
    pub turn_count: u32,
    pub time_in_state: u32,
    pub debt_bucket: DebtBucket,
    pub days_past_due_bucket: DaysPastDueBucket,
    pub prior_attempts: u32,
    pub identity_verified: bool,
    pub disclosure_complete: bool,
    pub last_signal: Option<Signal>,
    pub sentiment: Sentiment,
    pub objections_raised: u32,
    pub offers_made: u32,
}

impl ObservationState {
    /// Deterministic hashable key with all counters clamped.
    ///
    /// Equal observations (post-clamp) always produce identical keys.
    pub fn state_key(&self) -> StateKey {
        StateKey::from_observation(self)
    }
}

/// Canonical string key for tabular storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey(String);

impl StateKey {
    pub fn from_observation(obs: &ObservationState) -> Self {
        let key = format!(
            "s={}|t={}|ts={}|db={}|dpd={}|pa={}|iv={}|dc={}|ls={}|sn={}|ob={}|of={}",
            obs.dialogue_state.as_str(),
            obs.turn_count.min(clamps::TURN_COUNT),
            obs.time_in_state.min(clamps::TIME_IN_STATE),
            obs.debt_bucket.as_str(),
            obs.days_past_due_bucket.as_str(),
            obs.prior_attempts.min(clamps::PRIOR_ATTEMPTS),
            u8::from(obs.identity_verified),
            u8::from(obs.disclosure_complete),
            obs.last_signal.map(|s| s.as_str()).unwrap_or("none"),
            obs.sentiment.as_str(),
            obs.objections_raised.min(clamps::OBJECTIONS_RAISED),
            obs.offers_made.min(clamps::OFFERS_MADE),
        );
        Self(key)
    }

    /// Rehydrate a key from its persisted string form.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dialogue state embedded in the key.
    ///
    /// Lets a learner recover the legal-action set of a hypothetical state
    /// without any live session.
    pub fn dialogue_state(&self) -> Option<DialogueState> {
        self.0
            .split('|')
            .find_map(|token| token.strip_prefix("s="))
            .and_then(DialogueState::from_token)
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> ObservationState {
        ObservationState {
            dialogue_state: DialogueState::Negotiation,
            turn_count: 7,
            time_in_state: 2,
            debt_bucket: DebtBucket::Medium,
            days_past_due_bucket: DaysPastDueBucket::D90,
            prior_attempts: 1,
            identity_verified: true,
            disclosure_complete: true,
            last_signal: Some(Signal::Objection),
            sentiment: Sentiment::Negative,
            objections_raised: 1,
            offers_made: 2,
        }
    }

    #[test]
    fn test_state_key_is_pure() {
        let obs = observation();
        assert_eq!(obs.state_key(), obs.state_key());
    }

    #[test]
    fn test_state_key_clamps_turn_count() {
        let mut high = observation();
        high.turn_count = 37;
        let mut at_ceiling = observation();
        at_ceiling.turn_count = clamps::TURN_COUNT;
        assert_eq!(high.state_key(), at_ceiling.state_key());

        let mut below = observation();
        below.turn_count = clamps::TURN_COUNT - 1;
        assert_ne!(below.state_key(), at_ceiling.state_key());
    }

    #[test]
    fn test_state_key_clamps_all_counters() {
        let mut a = observation();
        a.time_in_state = 99;
        a.prior_attempts = 99;
        a.objections_raised = 99;
        a.offers_made = 99;
        let mut b = observation();
        b.time_in_state = clamps::TIME_IN_STATE;
        b.prior_attempts = clamps::PRIOR_ATTEMPTS;
        b.objections_raised = clamps::OBJECTIONS_RAISED;
        b.offers_made = clamps::OFFERS_MADE;
        assert_eq!(a.state_key(), b.state_key());
    }

    #[test]
    fn test_dialogue_state_recoverable_from_key() {
        let key = observation().state_key();
        assert_eq!(key.dialogue_state(), Some(DialogueState::Negotiation));
    }

    #[test]
    fn test_distinct_states_distinct_keys() {
        let a = observation();
        let mut b = observation();
        b.dialogue_state = DialogueState::PaymentSetup;
        assert_ne!(a.state_key(), b.state_key());
    }
}
