//! Dialogue context and transition operations
//!
//! `DialogueContext` is owned by a single running episode and mutated only
//! through the operations here. The state history gains exactly one entry
//! per resolved turn (the transition target, or the unchanged state when
//! the turn stayed put), so the trailing run length is the number of turns
//! spent in the current state. The history is append-only and never
//! truncated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dialogue::{is_valid_transition, standard_next, DialogueState, Signal};

/// Well-known slot keys set by the episode orchestration.
pub mod slot_keys {
    pub const IDENTITY_VERIFIED: &str = "identity_verified";
    pub const DISCLOSURE_COMPLETE: &str = "disclosure_complete";
    pub const PAYMENT_AGREED: &str = "payment_agreed";
    pub const CALLBACK_SCHEDULED: &str = "callback_scheduled";
    pub const AGREED_PLAN: &str = "agreed_plan";
}

/// Scalar value stored in the context slot map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SlotValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// One applied transition, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedTransition {
    pub from: DialogueState,
    pub to: DialogueState,
    /// True when the transition bypassed legality validation.
    pub forced: bool,
    pub reason: String,
}

/// Mutable state of one running dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueContext {
    current_state: DialogueState,
    state_history: Vec<DialogueState>,
    slots: HashMap<String, SlotValue>,
}

impl DialogueContext {
    pub fn new() -> Self {
        Self {
            current_state: DialogueState::Opening,
            state_history: Vec::new(),
            slots: HashMap::new(),
        }
    }

    pub fn current_state(&self) -> DialogueState {
        self.current_state
    }

    /// One entry per resolved turn, append-only.
    pub fn state_history(&self) -> &[DialogueState] {
        &self.state_history
    }

    /// Turns spent in the current state: trailing run length of the history.
    pub fn time_in_state(&self) -> u32 {
        self.state_history
            .iter()
            .rev()
            .take_while(|s| **s == self.current_state)
            .count() as u32
    }

    pub fn slot(&self, key: &str) -> Option<&SlotValue> {
        self.slots.get(key)
    }

    pub fn slot_bool(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .and_then(SlotValue::as_bool)
            .unwrap_or(false)
    }

    pub fn set_slot(&mut self, key: impl Into<String>, value: SlotValue) {
        self.slots.insert(key.into(), value);
    }

    pub fn slots(&self) -> &HashMap<String, SlotValue> {
        &self.slots
    }

    /// Unconditionally move to `target`, recording the jump.
    ///
    /// This intentionally bypasses `is_valid_transition`: forced transitions
    /// originate from detected signals or compliance decisions, which must
    /// be able to jump to any branch state. Do not re-add validation here.
    pub fn force_transition(
        &mut self,
        target: DialogueState,
        reason: impl Into<String>,
    ) -> AppliedTransition {
        let from = self.current_state;
        if !is_valid_transition(from, target) {
            tracing::debug!(?from, to = ?target, "forced transition outside standard legality");
        }
        self.current_state = target;
        self.state_history.push(target);
        AppliedTransition {
            from,
            to: target,
            forced: true,
            reason: reason.into(),
        }
    }

    /// Apply the standard transition for this turn.
    ///
    /// The first signal with a forced target wins; otherwise the main flow
    /// advances one step; otherwise the turn stays put. Returns the applied
    /// transition, `None` when the state did not change.
    pub fn standard_transition(&mut self, signals: &[Signal]) -> Option<AppliedTransition> {
        if let Some((signal, target)) = signals
            .iter()
            .find_map(|s| s.forced_target().map(|t| (*s, t)))
        {
            return Some(self.force_transition(target, format!("signal:{}", signal.as_str())));
        }

        match standard_next(self.current_state) {
            Some(next) => {
                let applied = AppliedTransition {
                    from: self.current_state,
                    to: next,
                    forced: false,
                    reason: "advance".to_string(),
                };
                self.current_state = next;
                self.state_history.push(next);
                Some(applied)
            }
            None => {
                self.stay();
                None
            }
        }
    }

    /// Record a turn that resolved without a state change.
    pub fn stay(&mut self) {
        self.state_history.push(self.current_state);
    }

    /// Last main-flow state visited, for resuming after a branch.
    pub fn last_main_flow_state(&self) -> DialogueState {
        self.state_history
            .iter()
            .rev()
            .find(|s| !s.is_special())
            .copied()
            .unwrap_or(DialogueState::Opening)
    }

    /// Clear back to the initial state with empty history and slots.
    pub fn reset(&mut self) {
        self.current_state = DialogueState::Opening;
        self.state_history.clear();
        self.slots.clear();
    }
}

impl Default for DialogueContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_transition_advances_one_step() {
        let mut ctx = DialogueContext::new();
        let applied = ctx.standard_transition(&[]).unwrap();
        assert_eq!(applied.from, DialogueState::Opening);
        assert_eq!(applied.to, DialogueState::IdentityCheck);
        assert!(!applied.forced);
        assert_eq!(ctx.current_state(), DialogueState::IdentityCheck);
    }

    #[test]
    fn test_forced_signal_wins_over_advance() {
        let mut ctx = DialogueContext::new();
        let applied = ctx
            .standard_transition(&[Signal::DisputesDebt, Signal::Agreement])
            .unwrap();
        assert!(applied.forced);
        assert_eq!(ctx.current_state(), DialogueState::DisputeHandling);
    }

    #[test]
    fn test_standard_transition_stays_in_branch_state() {
        let mut ctx = DialogueContext::new();
        ctx.force_transition(DialogueState::ObjectionHandling, "test");
        assert!(ctx.standard_transition(&[]).is_none());
        assert_eq!(ctx.current_state(), DialogueState::ObjectionHandling);
        // The no-op turn is still recorded.
        assert_eq!(ctx.time_in_state(), 2);
    }

    #[test]
    fn test_force_transition_bypasses_validation() {
        let mut ctx = DialogueContext::new();
        // Opening -> Negotiation skips three main-flow steps.
        let applied = ctx.force_transition(DialogueState::Negotiation, "compliance");
        assert_eq!(ctx.current_state(), DialogueState::Negotiation);
        assert!(applied.forced);
        assert_eq!(ctx.state_history(), &[DialogueState::Negotiation]);
    }

    #[test]
    fn test_time_in_state_counts_trailing_run() {
        let mut ctx = DialogueContext::new();
        assert_eq!(ctx.time_in_state(), 0);
        ctx.stay();
        ctx.stay();
        assert_eq!(ctx.time_in_state(), 2);
        ctx.standard_transition(&[]);
        assert_eq!(ctx.time_in_state(), 1);
        ctx.stay();
        assert_eq!(ctx.time_in_state(), 2);
    }

    #[test]
    fn test_last_main_flow_state_after_branch() {
        let mut ctx = DialogueContext::new();
        ctx.standard_transition(&[]); // IdentityCheck
        ctx.standard_transition(&[]); // Disclosure
        ctx.force_transition(DialogueState::ObjectionHandling, "signal:objection");
        assert_eq!(ctx.last_main_flow_state(), DialogueState::Disclosure);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = DialogueContext::new();
        ctx.standard_transition(&[]);
        ctx.set_slot(slot_keys::IDENTITY_VERIFIED, SlotValue::Bool(true));
        ctx.reset();
        assert_eq!(ctx.current_state(), DialogueState::Opening);
        assert!(ctx.state_history().is_empty());
        assert!(ctx.slots().is_empty());
    }
}
