//! Reward constants
//!
//! Single source of truth for every shaping bonus, terminal constant, and
//! penalty. Values are small and hand-tuned; the terminal constants dominate
//! the shaping bonuses so milestone chasing never beats resolving the call.

use serde::{Deserialize, Serialize};

use collections_agent_core::TerminalReason;

/// Reward configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    // Once-per-episode shaping milestones.
    #[serde(default = "default_milestone_identity")]
    pub milestone_identity_verified: f64,
    #[serde(default = "default_milestone_disclosure")]
    pub milestone_disclosure_complete: f64,
    #[serde(default = "default_milestone_negotiation")]
    pub milestone_entered_negotiation: f64,
    #[serde(default = "default_milestone_willingness")]
    pub milestone_first_willingness: f64,
    #[serde(default = "default_milestone_offer_accepted")]
    pub milestone_offer_accepted: f64,

    /// Applied whenever the action repeats the previous one.
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f64,

    /// Applied every step.
    #[serde(default = "default_turn_penalty")]
    pub turn_penalty: f64,

    // Terminal constants, by reason.
    #[serde(default = "default_terminal_payment_secured")]
    pub terminal_payment_secured: f64,
    #[serde(default = "default_terminal_callback_scheduled")]
    pub terminal_callback_scheduled: f64,
    #[serde(default = "default_terminal_hangup_before_disclosure")]
    pub terminal_hangup_before_disclosure: f64,
    #[serde(default = "default_terminal_hangup_after_disclosure")]
    pub terminal_hangup_after_disclosure: f64,
    #[serde(default = "default_terminal_stop_contact")]
    pub terminal_stop_contact: f64,
    #[serde(default = "default_terminal_escalated")]
    pub terminal_escalated: f64,
    #[serde(default = "default_terminal_dispute_opened")]
    pub terminal_dispute_opened: f64,
    #[serde(default = "default_terminal_wrong_party")]
    pub terminal_wrong_party: f64,
    #[serde(default = "default_terminal_do_not_contact")]
    pub terminal_do_not_contact: f64,
    #[serde(default = "default_terminal_compliance_halt")]
    pub terminal_compliance_halt: f64,
    #[serde(default = "default_terminal_max_turns")]
    pub terminal_max_turns: f64,
    #[serde(default = "default_terminal_no_agreement")]
    pub terminal_no_agreement: f64,
}

fn default_milestone_identity() -> f64 {
    2.0
}
fn default_milestone_disclosure() -> f64 {
    2.0
}
fn default_milestone_negotiation() -> f64 {
    3.0
}
fn default_milestone_willingness() -> f64 {
    2.0
}
fn default_milestone_offer_accepted() -> f64 {
    5.0
}
fn default_repetition_penalty() -> f64 {
    -1.0
}
fn default_turn_penalty() -> f64 {
    -0.1
}
fn default_terminal_payment_secured() -> f64 {
    20.0
}
fn default_terminal_callback_scheduled() -> f64 {
    8.0
}
fn default_terminal_hangup_before_disclosure() -> f64 {
    -10.0
}
fn default_terminal_hangup_after_disclosure() -> f64 {
    -5.0
}
fn default_terminal_stop_contact() -> f64 {
    -8.0
}
fn default_terminal_escalated() -> f64 {
    -6.0
}
fn default_terminal_dispute_opened() -> f64 {
    -1.0
}
fn default_terminal_wrong_party() -> f64 {
    -1.0
}
fn default_terminal_do_not_contact() -> f64 {
    -8.0
}
fn default_terminal_compliance_halt() -> f64 {
    -10.0
}
fn default_terminal_max_turns() -> f64 {
    -5.0
}
fn default_terminal_no_agreement() -> f64 {
    -2.0
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            milestone_identity_verified: default_milestone_identity(),
            milestone_disclosure_complete: default_milestone_disclosure(),
            milestone_entered_negotiation: default_milestone_negotiation(),
            milestone_first_willingness: default_milestone_willingness(),
            milestone_offer_accepted: default_milestone_offer_accepted(),
            repetition_penalty: default_repetition_penalty(),
            turn_penalty: default_turn_penalty(),
            terminal_payment_secured: default_terminal_payment_secured(),
            terminal_callback_scheduled: default_terminal_callback_scheduled(),
            terminal_hangup_before_disclosure: default_terminal_hangup_before_disclosure(),
            terminal_hangup_after_disclosure: default_terminal_hangup_after_disclosure(),
            terminal_stop_contact: default_terminal_stop_contact(),
            terminal_escalated: default_terminal_escalated(),
            terminal_dispute_opened: default_terminal_dispute_opened(),
            terminal_wrong_party: default_terminal_wrong_party(),
            terminal_do_not_contact: default_terminal_do_not_contact(),
            terminal_compliance_halt: default_terminal_compliance_halt(),
            terminal_max_turns: default_terminal_max_turns(),
            terminal_no_agreement: default_terminal_no_agreement(),
        }
    }
}

impl RewardConfig {
    /// Terminal constant for a reason.
    ///
    /// Hangup is split on whether the mandatory disclosure had completed:
    /// losing the debtor before the disclosure is the worse outcome.
    pub fn terminal_value(&self, reason: TerminalReason, disclosure_complete: bool) -> f64 {
        match reason {
            TerminalReason::PaymentSecured => self.terminal_payment_secured,
            TerminalReason::CallbackScheduled => self.terminal_callback_scheduled,
            TerminalReason::Hangup => {
                if disclosure_complete {
                    self.terminal_hangup_after_disclosure
                } else {
                    self.terminal_hangup_before_disclosure
                }
            }
            TerminalReason::StopContactRequested => self.terminal_stop_contact,
            TerminalReason::Escalated => self.terminal_escalated,
            TerminalReason::DisputeOpened => self.terminal_dispute_opened,
            TerminalReason::WrongPartyIdentified => self.terminal_wrong_party,
            TerminalReason::DoNotContactRecorded => self.terminal_do_not_contact,
            TerminalReason::ComplianceHalt => self.terminal_compliance_halt,
            TerminalReason::MaxTurnsExceeded => self.terminal_max_turns,
            TerminalReason::CompletedNoAgreement => self.terminal_no_agreement,
        }
    }
}
