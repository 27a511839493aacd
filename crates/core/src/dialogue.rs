//! Dialogue state contract
//!
//! Enumerates the dialogue states of a collection call, the actions the
//! agent may take in each state, and the counterparty signals that force
//! branch transitions. The main flow is a strict linear order; branch
//! states are reachable from anywhere.

use serde::{Deserialize, Serialize};

/// Dialogue state of a collection call.
///
/// The main flow runs `Opening` through `CallEnd` one step at a time.
/// Branch states handle objections, disputes, wrong-party contacts,
/// do-not-contact requests, and escalation, and can be entered from any
/// state via a forced transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    /// Greeting and right-party contact attempt
    #[default]
    Opening,
    /// Verifying the debtor's identity
    IdentityCheck,
    /// Mandatory debt-collection disclosure
    Disclosure,
    /// Discussing the debt and reason for non-payment
    DebtDiscussion,
    /// Negotiating a resolution
    Negotiation,
    /// Collecting payment or plan details
    PaymentSetup,
    /// Confirming the agreed terms
    Confirmation,
    /// Wrapping up the call
    WrapUp,
    /// Terminal end of call
    CallEnd,
    /// Handling an objection before returning to the flow
    ObjectionHandling,
    /// Debtor disputes the debt; collection stops pending validation
    DisputeHandling,
    /// Contact is not the debtor
    WrongParty,
    /// Debtor requested no further contact
    DoNotContact,
    /// Handing off to a human agent
    Escalation,
}

/// Ordered main flow, first to last.
pub const MAIN_FLOW: [DialogueState; 9] = [
    DialogueState::Opening,
    DialogueState::IdentityCheck,
    DialogueState::Disclosure,
    DialogueState::DebtDiscussion,
    DialogueState::Negotiation,
    DialogueState::PaymentSetup,
    DialogueState::Confirmation,
    DialogueState::WrapUp,
    DialogueState::CallEnd,
];

/// Branch states reachable from any state.
pub const SPECIAL_STATES: [DialogueState; 5] = [
    DialogueState::ObjectionHandling,
    DialogueState::DisputeHandling,
    DialogueState::WrongParty,
    DialogueState::DoNotContact,
    DialogueState::Escalation,
];

impl DialogueState {
    /// Position in the main flow, `None` for branch states.
    pub fn main_flow_index(&self) -> Option<usize> {
        MAIN_FLOW.iter().position(|s| s == self)
    }

    /// Whether this is a branch state.
    pub fn is_special(&self) -> bool {
        SPECIAL_STATES.contains(self)
    }

    /// Whether reaching this state ends the episode.
    ///
    /// All branch states except `ObjectionHandling` legally end the call:
    /// a dispute pauses collection, a wrong party or DNC request stops it,
    /// and escalation hands the call to a human.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CallEnd
                | Self::DisputeHandling
                | Self::WrongParty
                | Self::DoNotContact
                | Self::Escalation
        )
    }

    /// States in which a secured agreement is already implied.
    pub fn is_success_state(&self) -> bool {
        matches!(self, Self::PaymentSetup | Self::Confirmation)
    }

    /// Stable token used in state keys and persisted tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::IdentityCheck => "identity_check",
            Self::Disclosure => "disclosure",
            Self::DebtDiscussion => "debt_discussion",
            Self::Negotiation => "negotiation",
            Self::PaymentSetup => "payment_setup",
            Self::Confirmation => "confirmation",
            Self::WrapUp => "wrap_up",
            Self::CallEnd => "call_end",
            Self::ObjectionHandling => "objection_handling",
            Self::DisputeHandling => "dispute_handling",
            Self::WrongParty => "wrong_party",
            Self::DoNotContact => "do_not_contact",
            Self::Escalation => "escalation",
        }
    }

    /// Parse a state-key token back into a state.
    pub fn from_token(token: &str) -> Option<Self> {
        let all = MAIN_FLOW.iter().chain(SPECIAL_STATES.iter());
        all.copied().find(|s| s.as_str() == token)
    }
}

/// An action the policy may take on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Greet,
    VerifyIdentity,
    GiveDisclosure,
    StateDebtDetails,
    AskReasonForNonpayment,
    OfferPaymentPlan,
    OfferSettlement,
    OfferDeferral,
    RequestPaymentInFull,
    HandleObjection,
    Empathize,
    Clarify,
    CollectPaymentDetails,
    ConfirmAgreement,
    ScheduleCallback,
    TransferToHuman,
    EndCall,
}

/// Every action, in declaration order.
pub const ALL_ACTIONS: [Action; 17] = [
    Action::Greet,
    Action::VerifyIdentity,
    Action::GiveDisclosure,
    Action::StateDebtDetails,
    Action::AskReasonForNonpayment,
    Action::OfferPaymentPlan,
    Action::OfferSettlement,
    Action::OfferDeferral,
    Action::RequestPaymentInFull,
    Action::HandleObjection,
    Action::Empathize,
    Action::Clarify,
    Action::CollectPaymentDetails,
    Action::ConfirmAgreement,
    Action::ScheduleCallback,
    Action::TransferToHuman,
    Action::EndCall,
];

impl Action {
    /// Stable token used in persisted learner tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greet => "greet",
            Self::VerifyIdentity => "verify_identity",
            Self::GiveDisclosure => "give_disclosure",
            Self::StateDebtDetails => "state_debt_details",
            Self::AskReasonForNonpayment => "ask_reason_for_nonpayment",
            Self::OfferPaymentPlan => "offer_payment_plan",
            Self::OfferSettlement => "offer_settlement",
            Self::OfferDeferral => "offer_deferral",
            Self::RequestPaymentInFull => "request_payment_in_full",
            Self::HandleObjection => "handle_objection",
            Self::Empathize => "empathize",
            Self::Clarify => "clarify",
            Self::CollectPaymentDetails => "collect_payment_details",
            Self::ConfirmAgreement => "confirm_agreement",
            Self::ScheduleCallback => "schedule_callback",
            Self::TransferToHuman => "transfer_to_human",
            Self::EndCall => "end_call",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        ALL_ACTIONS.iter().copied().find(|a| a.as_str() == token)
    }

    /// Actions that put a concrete resolution on the table.
    pub fn is_offer(&self) -> bool {
        matches!(
            self,
            Self::OfferPaymentPlan
                | Self::OfferSettlement
                | Self::OfferDeferral
                | Self::RequestPaymentInFull
        )
    }

    /// Index into `ALL_ACTIONS`, used by feature encodings.
    pub fn index(&self) -> usize {
        ALL_ACTIONS
            .iter()
            .position(|a| a == self)
            .expect("action listed in ALL_ACTIONS")
    }
}

/// A detected categorical reaction from the counterparty.
///
/// At most one signal is attached to any single reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Agreement,
    Refusal,
    Objection,
    DisputesDebt,
    WrongPerson,
    Hardship,
    StopContact,
    WillingToPay,
    AsksQuestion,
    Frustration,
}

/// Every signal, in declaration order.
pub const ALL_SIGNALS: [Signal; 10] = [
    Signal::Agreement,
    Signal::Refusal,
    Signal::Objection,
    Signal::DisputesDebt,
    Signal::WrongPerson,
    Signal::Hardship,
    Signal::StopContact,
    Signal::WillingToPay,
    Signal::AsksQuestion,
    Signal::Frustration,
];

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agreement => "agreement",
            Self::Refusal => "refusal",
            Self::Objection => "objection",
            Self::DisputesDebt => "disputes_debt",
            Self::WrongPerson => "wrong_person",
            Self::Hardship => "hardship",
            Self::StopContact => "stop_contact",
            Self::WillingToPay => "willing_to_pay",
            Self::AsksQuestion => "asks_question",
            Self::Frustration => "frustration",
        }
    }

    /// Branch state this signal forces the dialogue into, if any.
    pub fn forced_target(&self) -> Option<DialogueState> {
        match self {
            Self::DisputesDebt => Some(DialogueState::DisputeHandling),
            Self::WrongPerson => Some(DialogueState::WrongParty),
            Self::StopContact => Some(DialogueState::DoNotContact),
            Self::Objection => Some(DialogueState::ObjectionHandling),
            Self::Frustration => Some(DialogueState::Escalation),
            _ => None,
        }
    }

    /// Index into `ALL_SIGNALS`, used by feature encodings.
    pub fn index(&self) -> usize {
        ALL_SIGNALS
            .iter()
            .position(|s| s == self)
            .expect("signal listed in ALL_SIGNALS")
    }
}

/// Legal actions for a state. Never empty.
pub fn legal_actions(state: DialogueState) -> &'static [Action] {
    use Action::*;
    match state {
        DialogueState::Opening => &[Greet, VerifyIdentity, Clarify, EndCall],
        DialogueState::IdentityCheck => &[VerifyIdentity, Clarify, Greet, EndCall],
        DialogueState::Disclosure => &[GiveDisclosure, Clarify, EndCall],
        DialogueState::DebtDiscussion => &[
            StateDebtDetails,
            AskReasonForNonpayment,
            Empathize,
            Clarify,
            EndCall,
        ],
        DialogueState::Negotiation => &[
            OfferPaymentPlan,
            OfferSettlement,
            OfferDeferral,
            RequestPaymentInFull,
            Empathize,
            AskReasonForNonpayment,
            Clarify,
            EndCall,
        ],
        DialogueState::PaymentSetup => &[CollectPaymentDetails, Clarify, Empathize, EndCall],
        DialogueState::Confirmation => &[ConfirmAgreement, Clarify, EndCall],
        DialogueState::WrapUp => &[EndCall, ScheduleCallback, Clarify],
        DialogueState::CallEnd => &[EndCall],
        DialogueState::ObjectionHandling => {
            &[HandleObjection, Empathize, Clarify, TransferToHuman, EndCall]
        }
        DialogueState::DisputeHandling => &[EndCall, Clarify],
        DialogueState::WrongParty => &[EndCall, Clarify],
        DialogueState::DoNotContact => &[EndCall],
        DialogueState::Escalation => &[TransferToHuman, EndCall],
    }
}

/// Transition legality.
///
/// A transition is valid when the target is a branch state, a self-loop,
/// the source is a branch state, or the target is exactly one main-flow
/// step ahead. Skipping main-flow steps is never valid.
pub fn is_valid_transition(from: DialogueState, to: DialogueState) -> bool {
    if to.is_special() || from.is_special() || to == from {
        return true;
    }
    match (from.main_flow_index(), to.main_flow_index()) {
        (Some(f), Some(t)) => t == f + 1,
        _ => false,
    }
}

/// Forward-only successor in the main flow.
///
/// `None` for branch states and for the terminal state.
pub fn standard_next(state: DialogueState) -> Option<DialogueState> {
    let idx = state.main_flow_index()?;
    MAIN_FLOW.get(idx + 1).copied()
}
