//! Reward engine
//!
//! Dense shaping bonuses for measurable progress, granted at most once per
//! episode each; a lump terminal constant keyed by why the episode ended;
//! and a fixed per-turn penalty. The milestone tracker is reset at episode
//! start and never read across episodes.

use collections_agent_config::RewardConfig;
use collections_agent_core::{
    Action, DialogueState, ObservationState, RewardBreakdown, Signal, TerminalReason,
};

/// Per-episode milestone flags plus the previous action.
#[derive(Debug, Clone, Default)]
pub struct RewardTracker {
    granted_identity: bool,
    granted_disclosure: bool,
    granted_negotiation: bool,
    granted_willingness: bool,
    granted_offer_accepted: bool,
    last_action: Option<Action>,
}

impl RewardTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all flags for a new episode.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn last_action(&self) -> Option<Action> {
        self.last_action
    }
}

/// Inputs for terminal-reason resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalContext {
    pub max_turns_reached: bool,
    pub hung_up: bool,
    pub payment_agreed: bool,
    pub callback_scheduled: bool,
}

/// Stateless reward computation over a per-episode tracker.
pub struct RewardEngine {
    config: RewardConfig,
}

impl RewardEngine {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Shaping component for one step.
    ///
    /// Each milestone pays out exactly once per episode, gated by the
    /// tracker flags set on first grant. The repetition penalty applies on
    /// every repeat. `tracker.last_action` is always updated.
    pub fn calculate_shaping(
        &self,
        prev: &ObservationState,
        action: Action,
        next: &ObservationState,
        signals: &[Signal],
        tracker: &mut RewardTracker,
    ) -> f64 {
        let mut shaping = 0.0;

        if !tracker.granted_identity && !prev.identity_verified && next.identity_verified {
            tracker.granted_identity = true;
            shaping += self.config.milestone_identity_verified;
        }

        if !tracker.granted_disclosure && !prev.disclosure_complete && next.disclosure_complete {
            tracker.granted_disclosure = true;
            shaping += self.config.milestone_disclosure_complete;
        }

        if !tracker.granted_negotiation
            && prev.dialogue_state != DialogueState::Negotiation
            && next.dialogue_state == DialogueState::Negotiation
        {
            tracker.granted_negotiation = true;
            shaping += self.config.milestone_entered_negotiation;
        }

        if !tracker.granted_willingness && signals.contains(&Signal::WillingToPay) {
            tracker.granted_willingness = true;
            shaping += self.config.milestone_first_willingness;
        }

        if !tracker.granted_offer_accepted
            && action.is_offer()
            && signals.contains(&Signal::Agreement)
        {
            tracker.granted_offer_accepted = true;
            shaping += self.config.milestone_offer_accepted;
        }

        if tracker.last_action == Some(action) {
            shaping += self.config.repetition_penalty;
        }
        tracker.last_action = Some(action);

        shaping
    }

    /// Terminal constant lookup.
    pub fn calculate_terminal(&self, reason: TerminalReason, disclosure_complete: bool) -> f64 {
        self.config.terminal_value(reason, disclosure_complete)
    }

    /// Fixed per-step penalty.
    pub fn calculate_turn_penalty(&self) -> f64 {
        self.config.turn_penalty
    }

    /// Resolve why the episode ended.
    ///
    /// Single ordered precedence: max-turns truncation, then an explicit
    /// stop-contact signal, then the success short-circuit (an agreement is
    /// already in hand even if the flow never reached its nominal terminal
    /// state), then a hangup, then the per-state mapping.
    pub fn determine_terminal_reason(
        &self,
        state: DialogueState,
        signals: &[Signal],
        ctx: TerminalContext,
    ) -> TerminalReason {
        if ctx.max_turns_reached {
            return TerminalReason::MaxTurnsExceeded;
        }
        if signals.contains(&Signal::StopContact) {
            return TerminalReason::StopContactRequested;
        }
        if state.is_success_state() || ctx.payment_agreed {
            return TerminalReason::PaymentSecured;
        }
        if ctx.hung_up {
            return TerminalReason::Hangup;
        }
        match state {
            DialogueState::CallEnd => {
                if ctx.callback_scheduled {
                    TerminalReason::CallbackScheduled
                } else {
                    TerminalReason::CompletedNoAgreement
                }
            }
            DialogueState::DisputeHandling => TerminalReason::DisputeOpened,
            DialogueState::WrongParty => TerminalReason::WrongPartyIdentified,
            DialogueState::DoNotContact => TerminalReason::DoNotContactRecorded,
            DialogueState::Escalation => TerminalReason::Escalated,
            _ => TerminalReason::CompletedNoAgreement,
        }
    }

    /// Combined reward for one step.
    ///
    /// The terminal component is zero unless the step ended the episode.
    #[allow(clippy::too_many_arguments)]
    pub fn calculate_reward(
        &self,
        prev: &ObservationState,
        action: Action,
        next: &ObservationState,
        signals: &[Signal],
        tracker: &mut RewardTracker,
        terminal_reason: Option<TerminalReason>,
    ) -> RewardBreakdown {
        let shaping = self.calculate_shaping(prev, action, next, signals, tracker);
        let terminal = terminal_reason
            .map(|reason| self.calculate_terminal(reason, next.disclosure_complete))
            .unwrap_or(0.0);
        RewardBreakdown::new(shaping, terminal, self.calculate_turn_penalty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collections_agent_core::{DaysPastDueBucket, DebtBucket, Sentiment};

    fn engine() -> RewardEngine {
        RewardEngine::new(RewardConfig::default())
    }

    fn obs(state: DialogueState) -> ObservationState {
        ObservationState {
            dialogue_state: state,
            turn_count: 3,
            time_in_state: 1,
            debt_bucket: DebtBucket::Medium,
            days_past_due_bucket: DaysPastDueBucket::D60,
            prior_attempts: 1,
            identity_verified: false,
            disclosure_complete: false,
            last_signal: None,
            sentiment: Sentiment::Neutral,
            objections_raised: 0,
            offers_made: 0,
        }
    }

    #[test]
    fn test_milestone_granted_once_per_episode() {
        let engine = engine();
        let mut tracker = RewardTracker::new();
        let prev = obs(DialogueState::IdentityCheck);
        let mut next = obs(DialogueState::Disclosure);
        next.identity_verified = true;

        let first = engine.calculate_shaping(&prev, Action::VerifyIdentity, &next, &[], &mut tracker);
        assert!(first >= engine.config().milestone_identity_verified);

        // Same milestone replayed: no second grant, and the repeated action
        // now draws the repetition penalty.
        let second =
            engine.calculate_shaping(&prev, Action::VerifyIdentity, &next, &[], &mut tracker);
        assert!((second - engine.config().repetition_penalty).abs() < 1e-12);

        // A fresh episode grants it again.
        tracker.reset();
        let third = engine.calculate_shaping(&prev, Action::Greet, &next, &[], &mut tracker);
        assert!(third >= engine.config().milestone_identity_verified);
    }

    #[test]
    fn test_offer_accepted_bonus_granted_exactly_once() {
        let engine = engine();
        let mut tracker = RewardTracker::new();
        let prev = obs(DialogueState::Negotiation);
        let next = obs(DialogueState::PaymentSetup);

        let first = engine.calculate_shaping(
            &prev,
            Action::OfferPaymentPlan,
            &next,
            &[Signal::Agreement],
            &mut tracker,
        );
        assert!(first >= engine.config().milestone_offer_accepted);

        // Identical scenario later in the same episode: no re-grant. Use a
        // different action so the repetition penalty stays out of the way.
        let again = engine.calculate_shaping(
            &prev,
            Action::OfferSettlement,
            &next,
            &[Signal::Agreement],
            &mut tracker,
        );
        assert!(again.abs() < 1e-12);
    }

    #[test]
    fn test_repetition_penalty_follows_last_action() {
        let engine = engine();
        let mut tracker = RewardTracker::new();
        let prev = obs(DialogueState::Negotiation);
        let next = obs(DialogueState::Negotiation);

        engine.calculate_shaping(&prev, Action::Clarify, &next, &[], &mut tracker);
        assert_eq!(tracker.last_action(), Some(Action::Clarify));
        let repeated = engine.calculate_shaping(&prev, Action::Clarify, &next, &[], &mut tracker);
        assert!((repeated - engine.config().repetition_penalty).abs() < 1e-12);
    }

    #[test]
    fn test_terminal_precedence_max_turns_first() {
        let engine = engine();
        let reason = engine.determine_terminal_reason(
            DialogueState::Negotiation,
            &[Signal::StopContact],
            TerminalContext {
                max_turns_reached: true,
                hung_up: true,
                ..Default::default()
            },
        );
        assert_eq!(reason, TerminalReason::MaxTurnsExceeded);
    }

    #[test]
    fn test_terminal_stop_contact_beats_state_map() {
        let engine = engine();
        let reason = engine.determine_terminal_reason(
            DialogueState::DoNotContact,
            &[Signal::StopContact],
            TerminalContext::default(),
        );
        assert_eq!(reason, TerminalReason::StopContactRequested);
    }

    #[test]
    fn test_success_short_circuit_beats_hangup() {
        let engine = engine();
        let reason = engine.determine_terminal_reason(
            DialogueState::PaymentSetup,
            &[],
            TerminalContext {
                hung_up: true,
                ..Default::default()
            },
        );
        assert_eq!(reason, TerminalReason::PaymentSecured);
    }

    #[test]
    fn test_terminal_state_map() {
        let engine = engine();
        assert_eq!(
            engine.determine_terminal_reason(
                DialogueState::Escalation,
                &[],
                TerminalContext::default()
            ),
            TerminalReason::Escalated
        );
        assert_eq!(
            engine.determine_terminal_reason(
                DialogueState::CallEnd,
                &[],
                TerminalContext {
                    callback_scheduled: true,
                    ..Default::default()
                }
            ),
            TerminalReason::CallbackScheduled
        );
        assert_eq!(
            engine.determine_terminal_reason(
                DialogueState::CallEnd,
                &[],
                TerminalContext::default()
            ),
            TerminalReason::CompletedNoAgreement
        );
    }

    #[test]
    fn test_reward_terminal_component_zero_when_not_done() {
        let engine = engine();
        let mut tracker = RewardTracker::new();
        let prev = obs(DialogueState::DebtDiscussion);
        let next = obs(DialogueState::DebtDiscussion);
        let breakdown =
            engine.calculate_reward(&prev, Action::Empathize, &next, &[], &mut tracker, None);
        assert_eq!(breakdown.terminal, 0.0);
        assert!((breakdown.turn_penalty - engine.config().turn_penalty).abs() < 1e-12);
        assert!(
            (breakdown.total - (breakdown.shaping + breakdown.turn_penalty)).abs() < 1e-12
        );
    }
}
