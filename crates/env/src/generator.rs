//! Template utterance generator
//!
//! Static per-action lines standing in for the language-model generation
//! layer. The disclosure line carries the mandatory statement; the rest are
//! plain, compliant collector phrasing.

use async_trait::async_trait;

use collections_agent_config::DISCLOSURE_STATEMENT;
use collections_agent_core::{
    Action, DialogueContext, DialogueState, Result, UtteranceGenerator,
};

/// Fixed template lines per action.
pub struct TemplateUtteranceGenerator;

impl TemplateUtteranceGenerator {
    pub fn new() -> Self {
        Self
    }

    fn line(action: Action) -> String {
        match action {
            Action::Greet => {
                "Hello, good day. This is Morgan calling from Meridian Recovery Services."
                    .to_string()
            }
            Action::VerifyIdentity => {
                "Before we continue, could you confirm your identity with your date of birth?"
                    .to_string()
            }
            Action::GiveDisclosure => format!(
                "{DISCLOSURE_STATEMENT} I'm required to share that before we continue."
            ),
            Action::StateDebtDetails => {
                "Our records show an outstanding balance on your account that is past due."
                    .to_string()
            }
            Action::AskReasonForNonpayment => {
                "May I ask why you have fallen behind on this account?".to_string()
            }
            Action::OfferPaymentPlan => {
                "We can set up a monthly payment plan that spreads this out comfortably."
                    .to_string()
            }
            Action::OfferSettlement => {
                "We could settle the account today for a reduced amount.".to_string()
            }
            Action::OfferDeferral => {
                "We could postpone payments for thirty days while things stabilize.".to_string()
            }
            Action::RequestPaymentInFull => {
                "Would you be able to clear the full balance today?".to_string()
            }
            Action::HandleObjection => {
                "That's a fair point. Let me address that concern directly.".to_string()
            }
            Action::Empathize => {
                "I understand, that sounds difficult. We'll find something that works.".to_string()
            }
            Action::Clarify => "Let me make sure I have the details right.".to_string(),
            Action::CollectPaymentDetails => {
                "Great. I'll take your payment details to set this up now.".to_string()
            }
            Action::ConfirmAgreement => {
                "Just to confirm, we've agreed on the arrangement we discussed.".to_string()
            }
            Action::ScheduleCallback => {
                "I can call you back at a better time to finish this up.".to_string()
            }
            Action::TransferToHuman => {
                "Let me bring in my supervisor to assist you further.".to_string()
            }
            Action::EndCall => "Thank you for your time. Goodbye.".to_string(),
        }
    }
}

impl Default for TemplateUtteranceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UtteranceGenerator for TemplateUtteranceGenerator {
    async fn generate(
        &self,
        action: Action,
        _state: DialogueState,
        _context: &DialogueContext,
    ) -> Result<String> {
        Ok(Self::line(action))
    }
}
