//! Episode environment
//!
//! Composes the dialogue contract, compliance engine, reward engine, state
//! projector, and the two injected collaborators into a gym-style
//! reset/step interface. One environment instance processes one episode at
//! a time; `step` takes `&mut self`, so two steps of the same episode can
//! never run concurrently. The two collaborator calls inside a step are
//! strictly sequential, since the reply depends on the utterance.

use chrono::{DateTime, TimeZone, Utc};

use collections_agent_compliance::ComplianceEngine;
use collections_agent_core::{
    legal_actions, slot_keys, Action, CaseFacts, CounterpartyReply, CounterpartySimulator,
    DialogueContext, DialogueState, Error, ObservationState, Persona, Result, Signal, SlotValue,
    StepInfo, TerminalReason, Trajectory, Transition, UtteranceGenerator,
};
use collections_agent_policy::{
    InteractionHistory, RewardEngine, RewardTracker, StateProjector, TerminalContext,
};

/// Deterministic line substituted when utterance generation fails or the
/// generated text fails the prohibited-phrase scan.
pub const FALLBACK_UTTERANCE: &str = "Let me make sure I have the details right.";

/// Result of a single environment step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The observation after taking the action.
    pub observation: ObservationState,
    /// The reward for this step.
    pub reward: f64,
    /// Whether the episode has terminated.
    pub done: bool,
    /// Diagnostics for this step.
    pub info: StepInfo,
}

/// Whether an action moves the main flow forward from a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdvanceRule {
    Always,
    OnAgreement,
    Never,
}

fn advance_rule(state: DialogueState, action: Action) -> AdvanceRule {
    use Action::*;
    use AdvanceRule::*;
    match (state, action) {
        (DialogueState::Opening, Greet) => Always,
        (DialogueState::IdentityCheck, VerifyIdentity) => OnAgreement,
        (DialogueState::Disclosure, GiveDisclosure) => Always,
        (DialogueState::DebtDiscussion, StateDebtDetails) => Always,
        (DialogueState::Negotiation, action) if action.is_offer() => OnAgreement,
        (DialogueState::PaymentSetup, CollectPaymentDetails) => Always,
        (DialogueState::Confirmation, ConfirmAgreement) => Always,
        (DialogueState::WrapUp, EndCall) | (DialogueState::WrapUp, ScheduleCallback) => Always,
        _ => Never,
    }
}

/// Gym-style dialogue environment.
pub struct Environment {
    context: DialogueContext,
    case: CaseFacts,
    compliance: ComplianceEngine,
    rewards: RewardEngine,
    tracker: RewardTracker,
    generator: Box<dyn UtteranceGenerator>,
    simulator: Box<dyn CounterpartySimulator>,
    history: InteractionHistory,
    trajectory: Trajectory,
    observation: ObservationState,
    /// Fixed wall-clock instant for compliance checks, so training runs are
    /// reproducible regardless of when they execute.
    call_time: DateTime<Utc>,
    max_turns: u32,
    turn_count: u32,
    last_patience: u8,
    done: bool,
}

impl Environment {
    pub fn new(
        case: CaseFacts,
        compliance: ComplianceEngine,
        rewards: RewardEngine,
        generator: Box<dyn UtteranceGenerator>,
        simulator: Box<dyn CounterpartySimulator>,
        max_turns: u32,
    ) -> Self {
        let context = DialogueContext::new();
        let history = InteractionHistory::default();
        let observation = StateProjector::project(&context, &case, &history, 0);
        Self {
            context,
            case,
            compliance,
            rewards,
            tracker: RewardTracker::new(),
            generator,
            simulator,
            history,
            trajectory: Trajectory::new(Persona::default()),
            observation,
            call_time: Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap(),
            max_turns,
            turn_count: 0,
            last_patience: 5,
            done: true,
        }
    }

    /// Override the wall-clock instant used for compliance checks.
    pub fn with_call_time(mut self, call_time: DateTime<Utc>) -> Self {
        self.call_time = call_time;
        self
    }

    pub fn case(&self) -> &CaseFacts {
        &self.case
    }

    pub fn context(&self) -> &DialogueContext {
        &self.context
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn observation(&self) -> &ObservationState {
        &self.observation
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Start a fresh episode against `persona`.
    pub fn reset(&mut self, persona: Persona, seed: u64) -> ObservationState {
        self.context.reset();
        self.tracker.reset();
        self.simulator.reset(&persona, seed);
        self.history = InteractionHistory::default();
        self.trajectory = Trajectory::new(persona.clone());
        self.turn_count = 0;
        self.last_patience = persona.patience;
        self.done = false;
        self.observation =
            StateProjector::project(&self.context, &self.case, &self.history, self.turn_count);
        self.observation.clone()
    }

    /// Advance the episode by one agent turn.
    ///
    /// Fatal if the episode is already done or the action is illegal in the
    /// current state; neither is ever coerced or retried.
    pub async fn step(&mut self, action: Action) -> Result<StepResult> {
        if self.done {
            return Err(Error::EpisodeFinished);
        }
        let state = self.context.current_state();
        if !legal_actions(state).contains(&action) {
            return Err(Error::IllegalAction { action, state });
        }

        // Compliance runs before the policy's choice takes effect; a forced
        // transition or hard block pre-empts the turn entirely.
        let compliance = self
            .compliance
            .evaluate(&self.case, &self.context, self.call_time);
        if compliance.forced_transition.is_some() || !compliance.allowed {
            return Ok(self.preempted_step(action, compliance));
        }

        let prev = self.observation.clone();

        // (1) Generate the outbound utterance, scrubbing failures and
        // prohibited phrasing down to the deterministic fallback line.
        let agent_text = match self
            .generator
            .generate(action, state, &self.context)
            .await
        {
            Ok(text) => {
                let hits = self.compliance.scan_outbound(&text);
                if hits.is_empty() {
                    text
                } else {
                    tracing::warn!(?action, ?hits, "prohibited phrasing scrubbed from utterance");
                    FALLBACK_UTTERANCE.to_string()
                }
            }
            Err(e) => {
                tracing::warn!(?action, error = %e, "utterance generation failed, using fallback");
                FALLBACK_UTTERANCE.to_string()
            }
        };

        // (2) Counterparty reply; failures degrade to a neutral line.
        let reply = match self.simulator.respond(&agent_text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "counterparty simulation failed, using fallback");
                let mut fallback = CounterpartyReply::fallback();
                fallback.patience_remaining = self.last_patience;
                fallback
            }
        };
        self.last_patience = reply.patience_remaining;
        let signals: Vec<Signal> = reply.detected_signal.into_iter().collect();

        // (3) Business slots, before the transition is resolved.
        self.update_slots(action, &signals);

        // (4) Histories feeding the next observation.
        self.history.last_reply = Some(reply.text.clone());
        self.history.signals.extend(&signals);
        self.history.actions.push(action);

        // (5) Resolve the transition: hangup wins, then forced signals,
        // then agent-driven jumps, then the advance table.
        let applied = self.resolve_transition(state, action, &signals, reply.should_hangup);

        self.turn_count += 1;
        let next =
            StateProjector::project(&self.context, &self.case, &self.history, self.turn_count);

        // (6) Episode end conditions.
        let current = self.context.current_state();
        let max_turns_reached = self.turn_count >= self.max_turns && !current.is_terminal();
        let done = current.is_terminal() || reply.should_hangup || self.turn_count >= self.max_turns;

        // (7) Terminal reason only for terminal steps.
        let terminal_reason = done.then(|| {
            self.rewards.determine_terminal_reason(
                current,
                &signals,
                TerminalContext {
                    max_turns_reached,
                    hung_up: reply.should_hangup,
                    payment_agreed: self.context.slot_bool(slot_keys::PAYMENT_AGREED),
                    callback_scheduled: self.context.slot_bool(slot_keys::CALLBACK_SCHEDULED),
                },
            )
        });

        // (8) Reward.
        let breakdown = self.rewards.calculate_reward(
            &prev,
            action,
            &next,
            &signals,
            &mut self.tracker,
            terminal_reason,
        );

        let info = StepInfo {
            turn: self.turn_count,
            from_state: Some(state),
            to_state: Some(current),
            forced: applied.as_ref().map(|t| t.forced).unwrap_or(false),
            transition_reason: applied.map(|t| t.reason),
            agent_text,
            reply_text: reply.text,
            signal: signals.first().copied(),
            terminal_reason,
            reward_breakdown: breakdown,
            compliance_risk: Some(compliance.risk_level.as_str().to_string()),
        };

        // (9) Append to the trajectory.
        self.trajectory.push(Transition {
            state: prev,
            action,
            reward: breakdown.total,
            next_state: next.clone(),
            done,
            info: info.clone(),
        });
        if done {
            self.trajectory.outcome = terminal_reason.map(Into::into);
        }

        self.observation = next.clone();
        self.done = done;

        // (10)
        Ok(StepResult {
            observation: next,
            reward: breakdown.total,
            done,
            info,
        })
    }

    /// A turn taken over by the compliance engine: the policy's action is
    /// pre-empted, no collaborator is called, and the episode ends in the
    /// forced branch (or a hard halt).
    fn preempted_step(
        &mut self,
        action: Action,
        compliance: collections_agent_compliance::ComplianceOutput,
    ) -> StepResult {
        let prev = self.observation.clone();
        let state = self.context.current_state();

        let (applied, terminal_reason) = match compliance.forced_transition {
            Some(target) => {
                let applied = self.context.force_transition(
                    target,
                    format!("compliance:{}", compliance.blocked_reasons.join("; ")),
                );
                let reason = self.rewards.determine_terminal_reason(
                    target,
                    &[],
                    TerminalContext::default(),
                );
                (applied, reason)
            }
            None => {
                let applied = self.context.force_transition(
                    DialogueState::CallEnd,
                    format!("compliance:{}", compliance.blocked_reasons.join("; ")),
                );
                (applied, TerminalReason::ComplianceHalt)
            }
        };

        self.turn_count += 1;
        let next =
            StateProjector::project(&self.context, &self.case, &self.history, self.turn_count);
        let breakdown = self.rewards.calculate_reward(
            &prev,
            action,
            &next,
            &[],
            &mut self.tracker,
            Some(terminal_reason),
        );

        let info = StepInfo {
            turn: self.turn_count,
            from_state: Some(state),
            to_state: Some(self.context.current_state()),
            forced: true,
            transition_reason: Some(applied.reason),
            agent_text: String::new(),
            reply_text: String::new(),
            signal: None,
            terminal_reason: Some(terminal_reason),
            reward_breakdown: breakdown,
            compliance_risk: Some(compliance.risk_level.as_str().to_string()),
        };

        self.trajectory.push(Transition {
            state: prev,
            action,
            reward: breakdown.total,
            next_state: next.clone(),
            done: true,
            info: info.clone(),
        });
        self.trajectory.outcome = Some(terminal_reason.into());
        self.observation = next.clone();
        self.done = true;

        StepResult {
            observation: next,
            reward: breakdown.total,
            done: true,
            info,
        }
    }

    fn update_slots(&mut self, action: Action, signals: &[Signal]) {
        let agreed = signals.contains(&Signal::Agreement);
        match action {
            Action::VerifyIdentity if agreed => {
                self.context
                    .set_slot(slot_keys::IDENTITY_VERIFIED, SlotValue::Bool(true));
            }
            Action::GiveDisclosure => {
                self.context
                    .set_slot(slot_keys::DISCLOSURE_COMPLETE, SlotValue::Bool(true));
            }
            action if action.is_offer() && agreed => {
                self.context
                    .set_slot(slot_keys::PAYMENT_AGREED, SlotValue::Bool(true));
                self.context.set_slot(
                    slot_keys::AGREED_PLAN,
                    SlotValue::Text(action.as_str().to_string()),
                );
            }
            Action::ScheduleCallback => {
                self.context
                    .set_slot(slot_keys::CALLBACK_SCHEDULED, SlotValue::Bool(true));
            }
            _ => {}
        }
    }

    fn resolve_transition(
        &mut self,
        state: DialogueState,
        action: Action,
        signals: &[Signal],
        hangup: bool,
    ) -> Option<collections_agent_core::AppliedTransition> {
        if hangup {
            return Some(self.context.force_transition(DialogueState::CallEnd, "hangup"));
        }
        if signals.iter().any(|s| s.forced_target().is_some()) {
            return self.context.standard_transition(signals);
        }
        if action == Action::EndCall && state != DialogueState::WrapUp {
            return Some(
                self.context
                    .force_transition(DialogueState::CallEnd, "agent_ended"),
            );
        }
        if action == Action::TransferToHuman {
            return Some(
                self.context
                    .force_transition(DialogueState::Escalation, "transfer"),
            );
        }
        if state == DialogueState::ObjectionHandling
            && matches!(action, Action::HandleObjection | Action::Empathize)
        {
            let resume = self.context.last_main_flow_state();
            return Some(self.context.force_transition(resume, "objection_resolved"));
        }

        let advances = match advance_rule(state, action) {
            AdvanceRule::Always => true,
            AdvanceRule::OnAgreement => signals.contains(&Signal::Agreement),
            AdvanceRule::Never => false,
        };
        if advances {
            self.context.standard_transition(&[])
        } else {
            self.context.stay();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use collections_agent_config::{ComplianceConfig, RewardConfig};

    struct EchoGenerator;

    #[async_trait]
    impl UtteranceGenerator for EchoGenerator {
        async fn generate(
            &self,
            action: Action,
            _state: DialogueState,
            _context: &DialogueContext,
        ) -> Result<String> {
            Ok(format!("[{}]", action.as_str()))
        }
    }

    struct ThreateningGenerator;

    #[async_trait]
    impl UtteranceGenerator for ThreateningGenerator {
        async fn generate(
            &self,
            _action: Action,
            _state: DialogueState,
            _context: &DialogueContext,
        ) -> Result<String> {
            Ok("Pay today or we will garnish your wages.".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl UtteranceGenerator for FailingGenerator {
        async fn generate(
            &self,
            _action: Action,
            _state: DialogueState,
            _context: &DialogueContext,
        ) -> Result<String> {
            Err(Error::Collaborator("generation backend down".to_string()))
        }
    }

    /// Plays back a fixed list of replies, then repeats the last one.
    struct ScriptedReplies {
        replies: Vec<CounterpartyReply>,
        cursor: usize,
    }

    impl ScriptedReplies {
        fn new(replies: Vec<CounterpartyReply>) -> Self {
            Self { replies, cursor: 0 }
        }
    }

    #[async_trait]
    impl CounterpartySimulator for ScriptedReplies {
        async fn respond(&mut self, _agent_utterance: &str) -> Result<CounterpartyReply> {
            let reply = self
                .replies
                .get(self.cursor)
                .or_else(|| self.replies.last())
                .cloned()
                .expect("at least one scripted reply");
            self.cursor += 1;
            Ok(reply)
        }

        fn reset(&mut self, _persona: &Persona, _seed: u64) {
            self.cursor = 0;
        }
    }

    fn reply(signal: Option<Signal>) -> CounterpartyReply {
        CounterpartyReply {
            text: "alright".to_string(),
            should_hangup: false,
            detected_signal: signal,
            patience_remaining: 5,
        }
    }

    fn hangup_reply() -> CounterpartyReply {
        CounterpartyReply {
            text: "I'm done with this call.".to_string(),
            should_hangup: true,
            detected_signal: None,
            patience_remaining: 0,
        }
    }

    fn environment(replies: Vec<CounterpartyReply>) -> Environment {
        Environment::new(
            CaseFacts::sample(),
            ComplianceEngine::new(ComplianceConfig::default()),
            RewardEngine::new(RewardConfig::default()),
            Box::new(EchoGenerator),
            Box::new(ScriptedReplies::new(replies)),
            30,
        )
    }

    #[tokio::test]
    async fn test_step_before_reset_is_fatal() {
        let mut env = environment(vec![reply(None)]);
        assert!(matches!(
            env.step(Action::Greet).await,
            Err(Error::EpisodeFinished)
        ));
    }

    #[tokio::test]
    async fn test_illegal_action_is_fatal() {
        let mut env = environment(vec![reply(None)]);
        env.reset(Persona::default(), 0);
        let result = env.step(Action::CollectPaymentDetails).await;
        assert!(matches!(result, Err(Error::IllegalAction { .. })));
        // The episode is still alive; a legal action works.
        assert!(env.step(Action::Greet).await.is_ok());
    }

    #[tokio::test]
    async fn test_greet_advances_to_identity_check() {
        let mut env = environment(vec![reply(None)]);
        env.reset(Persona::default(), 0);
        let step = env.step(Action::Greet).await.unwrap();
        assert_eq!(step.observation.dialogue_state, DialogueState::IdentityCheck);
        assert!(!step.done);
        assert_eq!(step.observation.turn_count, 1);
    }

    #[tokio::test]
    async fn test_identity_advances_only_on_agreement() {
        let mut env = environment(vec![
            reply(None),
            reply(None),
            reply(Some(Signal::Agreement)),
        ]);
        env.reset(Persona::default(), 0);
        env.step(Action::Greet).await.unwrap();

        let step = env.step(Action::VerifyIdentity).await.unwrap();
        assert_eq!(step.observation.dialogue_state, DialogueState::IdentityCheck);

        let step = env.step(Action::VerifyIdentity).await.unwrap();
        assert_eq!(step.observation.dialogue_state, DialogueState::Disclosure);
        assert!(step.observation.identity_verified);
    }

    #[tokio::test]
    async fn test_hangup_forces_call_end() {
        let mut env = environment(vec![hangup_reply()]);
        env.reset(Persona::default(), 0);
        let step = env.step(Action::Greet).await.unwrap();
        assert!(step.done);
        assert_eq!(step.observation.dialogue_state, DialogueState::CallEnd);
        assert_eq!(step.info.terminal_reason, Some(TerminalReason::Hangup));
        assert!(step.info.forced);
    }

    #[tokio::test]
    async fn test_stop_contact_signal_ends_episode() {
        let mut env = environment(vec![CounterpartyReply {
            text: "stop calling me".to_string(),
            should_hangup: false,
            detected_signal: Some(Signal::StopContact),
            patience_remaining: 3,
        }]);
        env.reset(Persona::default(), 0);
        let step = env.step(Action::Greet).await.unwrap();
        assert!(step.done);
        assert_eq!(step.observation.dialogue_state, DialogueState::DoNotContact);
        assert_eq!(
            step.info.terminal_reason,
            Some(TerminalReason::StopContactRequested)
        );
    }

    #[tokio::test]
    async fn test_max_turns_truncation() {
        let mut env = Environment::new(
            CaseFacts::sample(),
            ComplianceEngine::new(ComplianceConfig::default()),
            RewardEngine::new(RewardConfig::default()),
            Box::new(EchoGenerator),
            Box::new(ScriptedReplies::new(vec![reply(None)])),
            3,
        );
        env.reset(Persona::default(), 0);
        env.step(Action::Greet).await.unwrap();
        env.step(Action::VerifyIdentity).await.unwrap();
        let step = env.step(Action::VerifyIdentity).await.unwrap();
        assert!(step.done);
        assert_eq!(
            step.info.terminal_reason,
            Some(TerminalReason::MaxTurnsExceeded)
        );
        let expected = RewardConfig::default().terminal_max_turns;
        assert!((step.info.reward_breakdown.terminal - expected).abs() < 1e-12);
        // Stepping again is fatal.
        assert!(matches!(
            env.step(Action::VerifyIdentity).await,
            Err(Error::EpisodeFinished)
        ));
    }

    #[tokio::test]
    async fn test_disputed_case_preempts_first_turn() {
        let mut case = CaseFacts::sample();
        case.disputed = true;
        let mut env = Environment::new(
            case,
            ComplianceEngine::new(ComplianceConfig::default()),
            RewardEngine::new(RewardConfig::default()),
            Box::new(EchoGenerator),
            Box::new(ScriptedReplies::new(vec![reply(None)])),
            30,
        );
        env.reset(Persona::default(), 0);
        let step = env.step(Action::Greet).await.unwrap();
        assert!(step.done);
        assert_eq!(
            step.observation.dialogue_state,
            DialogueState::DisputeHandling
        );
        assert_eq!(step.info.terminal_reason, Some(TerminalReason::DisputeOpened));
        // The collaborators were never called.
        assert!(step.info.agent_text.is_empty());
    }

    #[tokio::test]
    async fn test_prohibited_utterance_scrubbed_to_fallback() {
        let mut env = Environment::new(
            CaseFacts::sample(),
            ComplianceEngine::new(ComplianceConfig::default()),
            RewardEngine::new(RewardConfig::default()),
            Box::new(ThreateningGenerator),
            Box::new(ScriptedReplies::new(vec![reply(None)])),
            30,
        );
        env.reset(Persona::default(), 0);
        let step = env.step(Action::Greet).await.unwrap();
        assert_eq!(step.info.agent_text, FALLBACK_UTTERANCE);
    }

    #[tokio::test]
    async fn test_generator_failure_recovers_with_fallback() {
        let mut env = Environment::new(
            CaseFacts::sample(),
            ComplianceEngine::new(ComplianceConfig::default()),
            RewardEngine::new(RewardConfig::default()),
            Box::new(FailingGenerator),
            Box::new(ScriptedReplies::new(vec![reply(None)])),
            30,
        );
        env.reset(Persona::default(), 0);
        let step = env.step(Action::Greet).await.unwrap();
        assert_eq!(step.info.agent_text, FALLBACK_UTTERANCE);
        assert!(!step.done);
    }

    #[tokio::test]
    async fn test_objection_branch_and_return() {
        let mut env = environment(vec![
            reply(Some(Signal::Objection)),
            reply(None),
            reply(None),
        ]);
        env.reset(Persona::default(), 0);
        let step = env.step(Action::Greet).await.unwrap();
        assert_eq!(
            step.observation.dialogue_state,
            DialogueState::ObjectionHandling
        );
        assert_eq!(step.observation.objections_raised, 1);

        // Handling the objection resumes the interrupted flow.
        let step = env.step(Action::HandleObjection).await.unwrap();
        assert_eq!(step.observation.dialogue_state, DialogueState::Opening);
        assert_eq!(step.info.transition_reason.as_deref(), Some("objection_resolved"));
    }

    #[tokio::test]
    async fn test_offer_accepted_marks_agreement_and_advances() {
        let mut env = environment(vec![
            reply(None),                          // Greet -> IdentityCheck
            reply(Some(Signal::Agreement)),       // VerifyIdentity -> Disclosure
            reply(None),                          // GiveDisclosure -> DebtDiscussion
            reply(None),                          // StateDebtDetails -> Negotiation
            reply(Some(Signal::Agreement)),       // OfferPaymentPlan -> PaymentSetup
        ]);
        env.reset(Persona::default(), 0);
        env.step(Action::Greet).await.unwrap();
        env.step(Action::VerifyIdentity).await.unwrap();
        env.step(Action::GiveDisclosure).await.unwrap();
        env.step(Action::StateDebtDetails).await.unwrap();
        let step = env.step(Action::OfferPaymentPlan).await.unwrap();
        assert_eq!(step.observation.dialogue_state, DialogueState::PaymentSetup);
        assert!(env.context().slot_bool(slot_keys::PAYMENT_AGREED));
        // The accepted-offer milestone is part of this step's shaping.
        assert!(
            step.info.reward_breakdown.shaping
                >= RewardConfig::default().milestone_offer_accepted
        );
    }

    #[tokio::test]
    async fn test_trajectory_records_every_step() {
        let mut env = environment(vec![reply(None), hangup_reply()]);
        env.reset(Persona::default(), 0);
        env.step(Action::Greet).await.unwrap();
        env.step(Action::VerifyIdentity).await.unwrap();
        let trajectory = env.trajectory();
        assert_eq!(trajectory.len(), 2);
        assert!(trajectory.outcome.is_some());
        let expected: f64 = trajectory.transitions.iter().map(|t| t.reward).sum();
        assert!((trajectory.total_return - expected).abs() < 1e-9);
    }
}
