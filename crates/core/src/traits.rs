//! Collaborator traits
//!
//! The language layer is injected: one collaborator turns an action into
//! agent speech, another turns agent speech into a simulated counterparty
//! reply. Both are network-bound in production, so the methods are async.
//! Failures are recovered by the caller with deterministic fallbacks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::contract::DialogueContext;
use crate::dialogue::{Action, DialogueState, Signal};
use crate::error::Result;
use crate::persona::Persona;

/// One counterparty reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterpartyReply {
    pub text: String,
    pub should_hangup: bool,
    /// At most one detected reaction category.
    pub detected_signal: Option<Signal>,
    /// Remaining goodwill, on the persona's 1..=10 patience scale.
    pub patience_remaining: u8,
}

impl CounterpartyReply {
    /// Deterministic fallback used when the simulator fails.
    pub fn fallback() -> Self {
        Self {
            text: "Sorry, could you say that again?".to_string(),
            should_hangup: false,
            detected_signal: None,
            patience_remaining: 1,
        }
    }
}

/// Turns a chosen action into outbound agent speech.
#[async_trait]
pub trait UtteranceGenerator: Send + Sync {
    async fn generate(
        &self,
        action: Action,
        state: DialogueState,
        context: &DialogueContext,
    ) -> Result<String>;
}

/// Simulates the counterparty for training and evaluation.
#[async_trait]
pub trait CounterpartySimulator: Send + Sync {
    /// Respond to one agent utterance.
    async fn respond(&mut self, agent_utterance: &str) -> Result<CounterpartyReply>;

    /// Reinitialize for a new episode with the given persona and seed.
    fn reset(&mut self, persona: &Persona, seed: u64);
}
