//! Error types shared across the workspace

use crate::dialogue::{Action, DialogueState};

/// Errors raised by the dialogue environment and learners.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The chosen action is not in the current legal-action set. Fatal;
    /// never coerced into a legal action.
    #[error("action {action:?} is not legal in state {state:?}")]
    IllegalAction {
        action: Action,
        state: DialogueState,
    },

    /// A finished episode was stepped again. Fatal; reset first.
    #[error("episode already finished; reset the environment before stepping")]
    EpisodeFinished,

    /// A persisted learner payload could not be restored. The learner is
    /// left untouched.
    #[error("malformed learner state: {0}")]
    MalformedLearnerState(String),

    /// A collaborator call failed. Recovered locally with a fallback.
    #[error("collaborator failure: {0}")]
    Collaborator(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
