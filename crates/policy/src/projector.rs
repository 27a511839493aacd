//! State projector
//!
//! Pure derivation of the bounded observation record from raw session
//! state, plus the two encodings the learners consume: the clamped
//! tabular `StateKey` and a flat numeric feature vector for the linear
//! bandit.

use collections_agent_core::{
    clamps, slot_keys, Action, CaseFacts, DaysPastDueBucket, DebtBucket, DialogueContext,
    ObservationState, Sentiment, Signal, StateKey, ALL_SIGNALS, MAIN_FLOW, SPECIAL_STATES,
};

/// Number of values in the bandit feature encoding:
/// one-hot dialogue state (14), normalized counters (5), one-hot debt
/// bucket (3), one-hot days-past-due bucket (4), identity/disclosure flags
/// (2), one-hot sentiment (3), one-hot last signal incl. none (11), bias.
pub const FEATURE_DIM: usize = 14 + 5 + 3 + 4 + 2 + 3 + 11 + 1;

const POSITIVE_KEYWORDS: &[&str] = &[
    "yes", "sure", "okay", "ok", "thanks", "thank", "great", "good", "help", "agree", "fine",
    "understand", "appreciate", "can do", "works",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "no", "not", "can't", "cannot", "won't", "never", "stop", "angry", "ridiculous", "harass",
    "refuse", "wrong", "dispute", "unfair", "leave me alone",
];

/// Raw per-episode history the projector reads.
#[derive(Debug, Clone, Default)]
pub struct InteractionHistory {
    /// Latest counterparty message, if any.
    pub last_reply: Option<String>,
    /// Every detected signal so far, in order.
    pub signals: Vec<Signal>,
    /// Every action taken so far, in order.
    pub actions: Vec<Action>,
}

fn hot(on: bool) -> f64 {
    if on {
        1.0
    } else {
        0.0
    }
}

/// Stateless projection of session state into observations.
pub struct StateProjector;

impl StateProjector {
    /// Derive a fresh observation for the current turn.
    pub fn project(
        context: &DialogueContext,
        case: &CaseFacts,
        history: &InteractionHistory,
        turn_count: u32,
    ) -> ObservationState {
        ObservationState {
            dialogue_state: context.current_state(),
            turn_count,
            time_in_state: context.time_in_state(),
            debt_bucket: Self::debt_bucket(case.debt_amount),
            days_past_due_bucket: Self::days_past_due_bucket(case.days_past_due),
            prior_attempts: case.prior_attempts,
            identity_verified: context.slot_bool(slot_keys::IDENTITY_VERIFIED),
            disclosure_complete: context.slot_bool(slot_keys::DISCLOSURE_COMPLETE),
            last_signal: history.signals.last().copied(),
            sentiment: history
                .last_reply
                .as_deref()
                .map(Self::sentiment)
                .unwrap_or_default(),
            objections_raised: history
                .signals
                .iter()
                .filter(|s| matches!(s, Signal::Objection | Signal::DisputesDebt))
                .count() as u32,
            offers_made: history.actions.iter().filter(|a| a.is_offer()).count() as u32,
        }
    }

    /// Fixed-threshold debt amount bucket.
    pub fn debt_bucket(amount: f64) -> DebtBucket {
        if amount < 500.0 {
            DebtBucket::Low
        } else if amount < 2500.0 {
            DebtBucket::Medium
        } else {
            DebtBucket::High
        }
    }

    /// Fixed-threshold delinquency bucket.
    pub fn days_past_due_bucket(days: u32) -> DaysPastDueBucket {
        if days < 60 {
            DaysPastDueBucket::D30
        } else if days < 90 {
            DaysPastDueBucket::D60
        } else if days < 120 {
            DaysPastDueBucket::D90
        } else {
            DaysPastDueBucket::D120Plus
        }
    }

    /// Keyword-count majority vote over one message.
    ///
    /// The margin between positive and negative hits must exceed one to
    /// leave neutral.
    pub fn sentiment(text: &str) -> Sentiment {
        let lower = text.to_lowercase();
        let positive = POSITIVE_KEYWORDS
            .iter()
            .filter(|k| lower.contains(*k))
            .count() as i32;
        let negative = NEGATIVE_KEYWORDS
            .iter()
            .filter(|k| lower.contains(*k))
            .count() as i32;

        if positive - negative > 1 {
            Sentiment::Positive
        } else if negative - positive > 1 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    /// Deterministic clamped key for tabular storage.
    pub fn discretize(obs: &ObservationState) -> StateKey {
        obs.state_key()
    }

    /// Flat numeric encoding for the linear bandit.
    pub fn feature_vector(obs: &ObservationState) -> Vec<f64> {
        let mut features = Vec::with_capacity(FEATURE_DIM);

        // One-hot dialogue state, main flow then specials.
        for state in MAIN_FLOW.iter().chain(SPECIAL_STATES.iter()) {
            features.push(hot(obs.dialogue_state == *state));
        }

        // Clamped, normalized counters.
        features.push(f64::from(obs.turn_count.min(clamps::TURN_COUNT)) / clamps::TURN_COUNT as f64);
        features.push(
            f64::from(obs.time_in_state.min(clamps::TIME_IN_STATE)) / clamps::TIME_IN_STATE as f64,
        );
        features.push(
            f64::from(obs.prior_attempts.min(clamps::PRIOR_ATTEMPTS))
                / clamps::PRIOR_ATTEMPTS as f64,
        );
        features.push(
            f64::from(obs.objections_raised.min(clamps::OBJECTIONS_RAISED))
                / clamps::OBJECTIONS_RAISED as f64,
        );
        features
            .push(f64::from(obs.offers_made.min(clamps::OFFERS_MADE)) / clamps::OFFERS_MADE as f64);

        // One-hot buckets.
        for i in 0..3 {
            features.push(hot(obs.debt_bucket.index() == i));
        }
        for i in 0..4 {
            features.push(hot(obs.days_past_due_bucket.index() == i));
        }

        features.push(hot(obs.identity_verified));
        features.push(hot(obs.disclosure_complete));

        for i in 0..3 {
            features.push(hot(obs.sentiment.index() == i));
        }

        // One-hot last signal, with a trailing "none" slot.
        for signal in ALL_SIGNALS.iter() {
            features.push(hot(obs.last_signal == Some(*signal)));
        }
        features.push(hot(obs.last_signal.is_none()));

        // Bias term.
        features.push(1.0);

        debug_assert_eq!(features.len(), FEATURE_DIM);
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collections_agent_core::{DialogueState, SlotValue};

    #[test]
    fn test_debt_buckets() {
        assert_eq!(StateProjector::debt_bucket(499.0), DebtBucket::Low);
        assert_eq!(StateProjector::debt_bucket(500.0), DebtBucket::Medium);
        assert_eq!(StateProjector::debt_bucket(2499.0), DebtBucket::Medium);
        assert_eq!(StateProjector::debt_bucket(2500.0), DebtBucket::High);
    }

    #[test]
    fn test_days_past_due_buckets() {
        assert_eq!(StateProjector::days_past_due_bucket(30), DaysPastDueBucket::D30);
        assert_eq!(StateProjector::days_past_due_bucket(60), DaysPastDueBucket::D60);
        assert_eq!(StateProjector::days_past_due_bucket(95), DaysPastDueBucket::D90);
        assert_eq!(
            StateProjector::days_past_due_bucket(400),
            DaysPastDueBucket::D120Plus
        );
    }

    #[test]
    fn test_sentiment_needs_margin_above_one() {
        // Two positive hits, zero negative: margin 2, positive.
        assert_eq!(
            StateProjector::sentiment("Yes, thanks for explaining"),
            Sentiment::Positive
        );
        // One negative hit only: margin 1, stays neutral.
        assert_eq!(StateProjector::sentiment("that is wrong"), Sentiment::Neutral);
        // Several negative hits: negative.
        assert_eq!(
            StateProjector::sentiment("No, I refuse, stop calling, this is unfair"),
            Sentiment::Negative
        );
        assert_eq!(StateProjector::sentiment(""), Sentiment::Neutral);
    }

    #[test]
    fn test_project_reads_slots_and_history() {
        let mut ctx = DialogueContext::new();
        ctx.force_transition(DialogueState::Negotiation, "test");
        ctx.set_slot(slot_keys::IDENTITY_VERIFIED, SlotValue::Bool(true));

        let history = InteractionHistory {
            last_reply: Some("okay sure, that works".to_string()),
            signals: vec![Signal::Objection, Signal::Agreement],
            actions: vec![Action::Greet, Action::OfferPaymentPlan, Action::OfferSettlement],
        };

        let obs = StateProjector::project(&ctx, &CaseFacts::sample(), &history, 5);
        assert_eq!(obs.dialogue_state, DialogueState::Negotiation);
        assert!(obs.identity_verified);
        assert!(!obs.disclosure_complete);
        assert_eq!(obs.last_signal, Some(Signal::Agreement));
        assert_eq!(obs.objections_raised, 1);
        assert_eq!(obs.offers_made, 2);
        assert_eq!(obs.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_feature_vector_dimension_and_bias() {
        let ctx = DialogueContext::new();
        let obs =
            StateProjector::project(&ctx, &CaseFacts::sample(), &InteractionHistory::default(), 0);
        let features = StateProjector::feature_vector(&obs);
        assert_eq!(features.len(), FEATURE_DIM);
        assert_eq!(features[FEATURE_DIM - 1], 1.0);
        // Exactly one dialogue-state slot is hot.
        let state_hot: f64 = features[..14].iter().sum();
        assert_eq!(state_hot, 1.0);
    }

    #[test]
    fn test_feature_vector_normalizes_and_clamps() {
        let ctx = DialogueContext::new();
        let mut obs =
            StateProjector::project(&ctx, &CaseFacts::sample(), &InteractionHistory::default(), 50);
        obs.time_in_state = 99;
        let features = StateProjector::feature_vector(&obs);
        // Clamped counters never exceed 1.0.
        assert_eq!(features[14], 1.0); // turn_count
        assert_eq!(features[15], 1.0); // time_in_state
    }
}
