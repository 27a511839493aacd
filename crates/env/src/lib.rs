//! Episode environment, scripted counterparty, and training loop
//!
//! - `Environment`: gym-style reset/step over the dialogue contract,
//!   compliance engine, reward engine, and injected collaborators
//! - `ScriptedCounterparty` / `TemplateUtteranceGenerator`: deterministic
//!   stand-ins for the language layer
//! - Runner: episodes, evaluation sweeps, learning curves, comparisons

pub mod environment;
pub mod generator;
pub mod runner;
pub mod simulator;

pub use environment::{Environment, StepResult, FALLBACK_UTTERANCE};
pub use generator::TemplateUtteranceGenerator;
pub use runner::{
    compare_learners, run_episode, run_evaluation, train_and_evaluate, ComparisonEntry,
    EpisodeMetrics, EpisodeRecord, EvalSummary, LearningCurvePoint, TrainerConfig, TrainingReport,
};
pub use simulator::ScriptedCounterparty;
