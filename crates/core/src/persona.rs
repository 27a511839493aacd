//! Counterparty persona
//!
//! Configuration consumed by the counterparty simulator. All traits are
//! 1..=10 scales; the simulator owns how they shape behavior.

use serde::{Deserialize, Serialize};

/// Behavioral profile of a simulated counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Label used in reports and round-robin evaluation pools.
    pub id: String,
    /// Baseline willingness to resolve the debt.
    pub willingness: u8,
    /// Ability to pay.
    pub financial_situation: u8,
    /// How quickly frustration builds.
    pub temperament: u8,
    /// Familiarity with their rights and the process.
    pub knowledge: u8,
    /// Turns of goodwill before hanging up.
    pub patience: u8,
}

impl Persona {
    pub fn new(
        id: impl Into<String>,
        willingness: u8,
        financial_situation: u8,
        temperament: u8,
        knowledge: u8,
        patience: u8,
    ) -> Self {
        Self {
            id: id.into(),
            willingness: clamp_trait(willingness),
            financial_situation: clamp_trait(financial_situation),
            temperament: clamp_trait(temperament),
            knowledge: clamp_trait(knowledge),
            patience: clamp_trait(patience),
        }
    }

    /// Default pool used for evaluation when none is supplied.
    pub fn default_pool() -> Vec<Persona> {
        vec![
            Persona::new("cooperative", 8, 7, 3, 4, 8),
            Persona::new("hardship", 6, 2, 4, 5, 7),
            Persona::new("reluctant", 3, 5, 6, 6, 5),
            Persona::new("hostile", 2, 4, 9, 7, 3),
            Persona::new("informed", 5, 6, 5, 9, 6),
        ]
    }
}

impl Default for Persona {
    fn default() -> Self {
        Persona::new("default", 5, 5, 5, 5, 6)
    }
}

fn clamp_trait(value: u8) -> u8 {
    value.clamp(1, 10)
}
