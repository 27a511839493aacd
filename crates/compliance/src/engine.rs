//! Rule-based compliance engine
//!
//! A pure evaluation of (case facts, rules, dialogue context) run every turn
//! before the policy acts. The output is computed fresh each time and never
//! cached; nothing here has side effects. A forced transition in the output
//! pre-empts whatever action the policy chose for that turn.

use chrono::{DateTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use collections_agent_config::ComplianceConfig;
use collections_agent_core::{CaseFacts, DialogueContext, DialogueState};

/// Coarse risk classification of the current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Result of one compliance evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceOutput {
    /// False when any check failed; the call must not proceed normally.
    pub allowed: bool,
    /// Branch state the dialogue must jump to before the policy acts.
    pub forced_transition: Option<DialogueState>,
    /// Mandatory statements for the current state.
    pub required_templates: Vec<String>,
    /// One human-readable reason per failed check.
    pub blocked_reasons: Vec<String>,
    pub risk_level: RiskLevel,
}

struct CompiledPhrase {
    pattern: Regex,
    phrase: String,
}

/// Stateless compliance engine with rules compiled once at construction.
pub struct ComplianceEngine {
    config: ComplianceConfig,
    prohibited: Vec<CompiledPhrase>,
}

impl ComplianceEngine {
    pub fn new(config: ComplianceConfig) -> Self {
        let prohibited = config
            .prohibited_phrases
            .iter()
            .filter_map(|phrase| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(phrase)))
                    .ok()
                    .map(|pattern| CompiledPhrase {
                        pattern,
                        phrase: phrase.clone(),
                    })
            })
            .collect();

        Self { config, prohibited }
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// Evaluate every check for the current turn.
    pub fn evaluate(
        &self,
        case: &CaseFacts,
        context: &DialogueContext,
        now: DateTime<Utc>,
    ) -> ComplianceOutput {
        let current = context.current_state();
        let mut blocked_reasons = Vec::new();

        // Call window in the debtor's local time.
        let local_hour =
            (now.hour() as i32 + case.timezone_offset_hours as i32).rem_euclid(24) as u8;
        if local_hour < self.config.call_window_start_hour
            || local_hour >= self.config.call_window_end_hour
        {
            blocked_reasons.push(format!(
                "outside calling window: local hour {local_hour} not in {}..{}",
                self.config.call_window_start_hour, self.config.call_window_end_hour
            ));
        }

        if case.attempts_today >= self.config.max_attempts_per_day {
            blocked_reasons.push(format!(
                "daily attempt cap reached: {} of {}",
                case.attempts_today, self.config.max_attempts_per_day
            ));
        }

        if case.prior_attempts >= self.config.max_lifetime_attempts {
            blocked_reasons.push(format!(
                "lifetime attempt cap reached: {} of {}",
                case.prior_attempts, self.config.max_lifetime_attempts
            ));
        }

        if case.do_not_contact {
            blocked_reasons.push("do-not-contact request on file".to_string());
        }

        // Consent matters only once the dialogue has moved past disclosure.
        let past_disclosure = matches!(
            (
                current.main_flow_index(),
                DialogueState::Disclosure.main_flow_index()
            ),
            (Some(current_idx), Some(disclosure_idx)) if current_idx > disclosure_idx
        );
        if past_disclosure && !case.consent_given {
            blocked_reasons.push("no contact consent on file past disclosure".to_string());
        }

        let forced_transition = self.forced_branch(case, current);
        let required_templates = self.config.templates_for(current).to_vec();
        let risk_level = self.risk_level(case);

        ComplianceOutput {
            allowed: blocked_reasons.is_empty(),
            forced_transition,
            required_templates,
            blocked_reasons,
            risk_level,
        }
    }

    /// Scan proposed outbound text; returns every prohibited phrase found.
    pub fn scan_outbound(&self, text: &str) -> Vec<String> {
        self.prohibited
            .iter()
            .filter(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.phrase.clone())
            .collect()
    }

    /// Branch the case flags force the dialogue into, unless already there.
    fn forced_branch(&self, case: &CaseFacts, current: DialogueState) -> Option<DialogueState> {
        if case.do_not_contact && current != DialogueState::DoNotContact {
            return Some(DialogueState::DoNotContact);
        }
        if case.disputed && current != DialogueState::DisputeHandling {
            return Some(DialogueState::DisputeHandling);
        }
        if case.wrong_party && current != DialogueState::WrongParty {
            return Some(DialogueState::WrongParty);
        }
        None
    }

    fn risk_level(&self, case: &CaseFacts) -> RiskLevel {
        if case.disputed || case.do_not_contact || case.wrong_party {
            return RiskLevel::High;
        }
        if case.prior_attempts >= self.config.high_attempt_threshold
            || case.days_past_due >= self.config.old_debt_days
        {
            return RiskLevel::Medium;
        }
        RiskLevel::Low
    }
}
