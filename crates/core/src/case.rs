//! Case facts
//!
//! Immutable facts about the collection case being worked. Consumed by the
//! compliance engine and the state projector; never mutated by an episode.

use serde::{Deserialize, Serialize};

/// Facts about one collection case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFacts {
    /// Opaque reference to the account.
    pub case_ref: String,
    /// Outstanding amount, in whole currency units.
    pub debt_amount: f64,
    pub days_past_due: u32,
    /// Completed contact attempts before this call.
    pub prior_attempts: u32,
    /// Attempts already made today, this call excluded.
    pub attempts_today: u32,
    /// Debtor's local offset from UTC, in hours.
    pub timezone_offset_hours: i8,
    /// Debt is formally disputed.
    pub disputed: bool,
    /// Number is known to reach someone other than the debtor.
    pub wrong_party: bool,
    /// Debtor has a standing do-not-contact request.
    pub do_not_contact: bool,
    /// Contact consent is on file.
    pub consent_given: bool,
}

impl CaseFacts {
    /// A clean, contactable case.
    pub fn sample() -> Self {
        Self {
            case_ref: "CASE-0001".to_string(),
            debt_amount: 1800.0,
            days_past_due: 75,
            prior_attempts: 2,
            attempts_today: 0,
            timezone_offset_hours: 0,
            disputed: false,
            wrong_party: false,
            do_not_contact: false,
            consent_given: true,
        }
    }
}

impl Default for CaseFacts {
    fn default() -> Self {
        Self::sample()
    }
}
