//! Episode trajectory types
//!
//! A trajectory is built incrementally during one episode and is immutable
//! once the episode ends. Records are plain-serializable so external tooling
//! can persist and replay them.

use serde::{Deserialize, Serialize};

use crate::dialogue::{Action, DialogueState, Signal};
use crate::observation::ObservationState;
use crate::persona::Persona;

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// Truncated at the configured turn ceiling.
    MaxTurnsExceeded,
    /// Counterparty asked for contact to stop.
    StopContactRequested,
    /// A payment or plan was secured.
    PaymentSecured,
    /// A follow-up call was scheduled.
    CallbackScheduled,
    /// Counterparty hung up.
    Hangup,
    /// Handed off to a human agent.
    Escalated,
    /// Debt disputed; collection paused pending validation.
    DisputeOpened,
    /// Contact was not the debtor.
    WrongPartyIdentified,
    /// Do-not-contact recorded from case flags.
    DoNotContactRecorded,
    /// A compliance check blocked the call outright.
    ComplianceHalt,
    /// Call ran its course without an agreement.
    CompletedNoAgreement,
}

impl TerminalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxTurnsExceeded => "max_turns_exceeded",
            Self::StopContactRequested => "stop_contact_requested",
            Self::PaymentSecured => "payment_secured",
            Self::CallbackScheduled => "callback_scheduled",
            Self::Hangup => "hangup",
            Self::Escalated => "escalated",
            Self::DisputeOpened => "dispute_opened",
            Self::WrongPartyIdentified => "wrong_party_identified",
            Self::DoNotContactRecorded => "do_not_contact_recorded",
            Self::ComplianceHalt => "compliance_halt",
            Self::CompletedNoAgreement => "completed_no_agreement",
        }
    }
}

/// Final episode outcome, derived from the terminal reason only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    PartialSuccess,
    Hangup,
    Escalated,
    Failure,
}

impl From<TerminalReason> for Outcome {
    fn from(reason: TerminalReason) -> Self {
        match reason {
            TerminalReason::PaymentSecured => Self::Success,
            TerminalReason::CallbackScheduled => Self::PartialSuccess,
            TerminalReason::Hangup => Self::Hangup,
            TerminalReason::Escalated => Self::Escalated,
            TerminalReason::MaxTurnsExceeded
            | TerminalReason::StopContactRequested
            | TerminalReason::DisputeOpened
            | TerminalReason::WrongPartyIdentified
            | TerminalReason::DoNotContactRecorded
            | TerminalReason::ComplianceHalt
            | TerminalReason::CompletedNoAgreement => Self::Failure,
        }
    }
}

/// Decomposed reward for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RewardBreakdown {
    pub shaping: f64,
    pub terminal: f64,
    pub turn_penalty: f64,
    pub total: f64,
}

impl RewardBreakdown {
    pub fn new(shaping: f64, terminal: f64, turn_penalty: f64) -> Self {
        Self {
            shaping,
            terminal,
            turn_penalty,
            total: shaping + terminal + turn_penalty,
        }
    }
}

/// Diagnostic information attached to every step.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StepInfo {
    pub turn: u32,
    pub from_state: Option<DialogueState>,
    pub to_state: Option<DialogueState>,
    /// True when the transition was forced (hangup, signal, or compliance).
    pub forced: bool,
    pub transition_reason: Option<String>,
    pub agent_text: String,
    pub reply_text: String,
    pub signal: Option<Signal>,
    pub terminal_reason: Option<TerminalReason>,
    pub reward_breakdown: RewardBreakdown,
    pub compliance_risk: Option<String>,
}

/// One (s, a, r, s') step of an episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub state: ObservationState,
    pub action: Action,
    pub reward: f64,
    pub next_state: ObservationState,
    pub done: bool,
    pub info: StepInfo,
}

/// Ordered transitions of one finished or in-flight episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub transitions: Vec<Transition>,
    pub total_return: f64,
    pub outcome: Option<Outcome>,
    pub persona: Persona,
}

impl Trajectory {
    pub fn new(persona: Persona) -> Self {
        Self {
            transitions: Vec::new(),
            total_return: 0.0,
            outcome: None,
            persona,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        self.total_return += transition.reward;
        self.transitions.push(transition);
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_total_is_sum() {
        let b = RewardBreakdown::new(2.0, -5.0, -0.1);
        assert!((b.total - (-3.1)).abs() < 1e-12);
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(Outcome::from(TerminalReason::PaymentSecured), Outcome::Success);
        assert_eq!(
            Outcome::from(TerminalReason::CallbackScheduled),
            Outcome::PartialSuccess
        );
        assert_eq!(Outcome::from(TerminalReason::Hangup), Outcome::Hangup);
        assert_eq!(Outcome::from(TerminalReason::MaxTurnsExceeded), Outcome::Failure);
    }
}
