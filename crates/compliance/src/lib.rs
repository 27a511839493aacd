//! Stateless compliance engine for collection calls
//!
//! Every check is evaluated fresh each turn from case facts, configured
//! rules, and the current dialogue state. The engine can block the call,
//! force a branch transition, demand mandatory statements, and classify
//! call risk. It does nothing else.

pub mod engine;

pub use engine::{ComplianceEngine, ComplianceOutput, RiskLevel};
