//! Core dialogue contract and types for the collections agent
//!
//! This crate provides the foundational pieces shared by every other crate:
//! - The finite-state dialogue contract (states, legal actions, transitions)
//! - The dialogue context owned by a running episode
//! - Observation state and its clamped discretization key
//! - Trajectory, reward-breakdown, and terminal-reason types
//! - Personas and case facts
//! - Collaborator traits for the injected language layer
//! - Error types

pub mod case;
pub mod contract;
pub mod dialogue;
pub mod error;
pub mod observation;
pub mod persona;
pub mod trajectory;
pub mod traits;

pub use case::CaseFacts;
pub use contract::{slot_keys, AppliedTransition, DialogueContext, SlotValue};
pub use dialogue::{
    is_valid_transition, legal_actions, standard_next, Action, DialogueState, Signal, ALL_ACTIONS,
    ALL_SIGNALS, MAIN_FLOW, SPECIAL_STATES,
};
pub use error::{Error, Result};
pub use observation::{
    clamps, DaysPastDueBucket, DebtBucket, ObservationState, Sentiment, StateKey,
};
pub use persona::Persona;
pub use trajectory::{
    Outcome, RewardBreakdown, StepInfo, TerminalReason, Trajectory, Transition,
};
pub use traits::{CounterpartyReply, CounterpartySimulator, UtteranceGenerator};
