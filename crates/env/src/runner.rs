//! Episode runner and training loop
//!
//! Drives the environment with a learner: single episodes, evaluation
//! sweeps with personas drawn round-robin, interleaved train/eval runs
//! producing a learning curve, and multi-learner comparisons over one
//! shared environment.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use collections_agent_config::Settings;
use collections_agent_core::{
    legal_actions, Outcome, Persona, Result, TerminalReason, Trajectory, Transition,
};
use collections_agent_policy::Learner;

use crate::environment::Environment;

/// Metrics for one finished episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeMetrics {
    pub episode_id: String,
    pub total_return: f64,
    pub length: u32,
    pub outcome: Outcome,
    pub terminal_reason: TerminalReason,
    pub persona: Persona,
    pub trajectory: Trajectory,
}

/// Plain-serializable episode record for external persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode_id: String,
    pub total_return: f64,
    pub length: u32,
    pub outcome: Outcome,
    pub persona: Persona,
    pub transitions: Vec<Transition>,
}

impl From<&EpisodeMetrics> for EpisodeRecord {
    fn from(metrics: &EpisodeMetrics) -> Self {
        Self {
            episode_id: metrics.episode_id.clone(),
            total_return: metrics.total_return,
            length: metrics.length,
            outcome: metrics.outcome,
            persona: metrics.persona.clone(),
            transitions: metrics.trajectory.transitions.clone(),
        }
    }
}

/// Aggregate metrics over an evaluation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub episodes: u32,
    pub mean_return: f64,
    pub stddev_return: f64,
    pub mean_length: f64,
    pub success_rate: f64,
    pub partial_success_rate: f64,
    pub hangup_rate: f64,
    pub escalation_rate: f64,
}

impl EvalSummary {
    fn from_episodes(episodes: &[EpisodeMetrics]) -> Self {
        let n = episodes.len().max(1) as f64;
        let mean_return = episodes.iter().map(|e| e.total_return).sum::<f64>() / n;
        let variance = episodes
            .iter()
            .map(|e| (e.total_return - mean_return).powi(2))
            .sum::<f64>()
            / n;
        let rate = |f: fn(&EpisodeMetrics) -> bool| {
            episodes.iter().filter(|e| f(e)).count() as f64 / n
        };
        Self {
            episodes: episodes.len() as u32,
            mean_return,
            stddev_return: variance.sqrt(),
            mean_length: episodes.iter().map(|e| e.length as f64).sum::<f64>() / n,
            success_rate: rate(|e| e.outcome == Outcome::Success),
            partial_success_rate: rate(|e| e.outcome == Outcome::PartialSuccess),
            hangup_rate: rate(|e| e.outcome == Outcome::Hangup),
            escalation_rate: rate(|e| e.outcome == Outcome::Escalated),
        }
    }
}

/// One point on a learning curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningCurvePoint {
    pub episode: u32,
    pub train_return: f64,
    pub eval_return: Option<f64>,
    pub eval_success_rate: Option<f64>,
}

/// Result of one `train_and_evaluate` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub learner: String,
    pub curve: Vec<LearningCurvePoint>,
    pub final_eval: EvalSummary,
    pub episodes_trained: u64,
}

/// One learner's result in a comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub learner: String,
    pub report: TrainingReport,
}

/// Training-loop configuration.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub episodes: u32,
    pub eval_interval: u32,
    pub eval_episodes: u32,
    pub final_eval_episodes: u32,
    pub eval_enabled: bool,
    pub base_seed: u64,
    pub personas: Vec<Persona>,
}

impl TrainerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            episodes: settings.training.episodes,
            eval_interval: settings.training.eval_interval,
            eval_episodes: settings.training.eval_episodes,
            final_eval_episodes: settings.training.final_eval_episodes,
            eval_enabled: settings.training.eval_enabled,
            base_seed: settings.episode.base_seed,
            personas: Persona::default_pool(),
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Run one episode to completion.
///
/// With `train` set, the learner is updated after every step; otherwise it
/// only selects actions.
pub async fn run_episode(
    env: &mut Environment,
    learner: &mut dyn Learner,
    train: bool,
    persona: Persona,
    seed: u64,
) -> Result<EpisodeMetrics> {
    let mut observation = env.reset(persona.clone(), seed);
    let mut terminal_reason = TerminalReason::CompletedNoAgreement;

    loop {
        let legal = legal_actions(observation.dialogue_state);
        let action = learner.select_action(&observation, legal);
        let step = env.step(action).await?;

        if train {
            let next = if step.done {
                None
            } else {
                Some(&step.observation)
            };
            learner.update(&observation, action, step.reward, next, step.done);
        }

        if let Some(reason) = step.info.terminal_reason {
            terminal_reason = reason;
        }
        let done = step.done;
        observation = step.observation;
        if done {
            break;
        }
    }

    let trajectory = env.trajectory().clone();
    Ok(EpisodeMetrics {
        episode_id: Uuid::new_v4().to_string(),
        total_return: trajectory.total_return,
        length: trajectory.len() as u32,
        outcome: trajectory
            .outcome
            .unwrap_or_else(|| terminal_reason.into()),
        terminal_reason,
        persona,
        trajectory,
    })
}

/// Evaluate without learning, personas drawn round-robin.
pub async fn run_evaluation(
    env: &mut Environment,
    learner: &mut dyn Learner,
    episodes: u32,
    personas: &[Persona],
    seed_base: u64,
) -> Result<EvalSummary> {
    let pool: Vec<Persona> = if personas.is_empty() {
        Persona::default_pool()
    } else {
        personas.to_vec()
    };

    let mut results = Vec::with_capacity(episodes as usize);
    for i in 0..episodes {
        let persona = pool[i as usize % pool.len()].clone();
        let metrics =
            run_episode(env, learner, false, persona, seed_base.wrapping_add(i as u64)).await?;
        results.push(metrics);
    }
    Ok(EvalSummary::from_episodes(&results))
}

/// Interleave training with periodic evaluation snapshots.
///
/// Evaluation episodes use a seed range disjoint from training so the two
/// never replay each other's traffic. When evaluation is disabled, the
/// final summary is built from the trailing training episodes instead.
pub async fn train_and_evaluate(
    env: &mut Environment,
    learner: &mut dyn Learner,
    config: &TrainerConfig,
) -> Result<TrainingReport> {
    let mut curve = Vec::with_capacity(config.episodes as usize);
    let mut train_metrics: Vec<EpisodeMetrics> = Vec::new();

    for episode in 0..config.episodes {
        let persona = config.personas[episode as usize % config.personas.len()].clone();
        let seed = config.base_seed.wrapping_add(episode as u64);
        let metrics = run_episode(env, learner, true, persona, seed).await?;

        let mut point = LearningCurvePoint {
            episode,
            train_return: metrics.total_return,
            eval_return: None,
            eval_success_rate: None,
        };

        if config.eval_enabled
            && config.eval_interval > 0
            && (episode + 1) % config.eval_interval == 0
        {
            let summary = run_evaluation(
                env,
                learner,
                config.eval_episodes,
                &config.personas,
                eval_seed_base(config.base_seed, episode),
            )
            .await?;
            tracing::info!(
                episode,
                mean_return = summary.mean_return,
                success_rate = summary.success_rate,
                "evaluation snapshot"
            );
            point.eval_return = Some(summary.mean_return);
            point.eval_success_rate = Some(summary.success_rate);
        }

        curve.push(point);
        train_metrics.push(metrics);
    }

    let final_eval = if config.eval_enabled {
        run_evaluation(
            env,
            learner,
            config.final_eval_episodes,
            &config.personas,
            eval_seed_base(config.base_seed, config.episodes),
        )
        .await?
    } else {
        // Substitute the trailing training episodes.
        let tail = config.final_eval_episodes.min(train_metrics.len() as u32) as usize;
        EvalSummary::from_episodes(&train_metrics[train_metrics.len() - tail..])
    };

    Ok(TrainingReport {
        learner: learner.name().to_string(),
        curve,
        final_eval,
        episodes_trained: learner.episodes_trained(),
    })
}

/// Train and evaluate several learners against one shared environment.
///
/// Each learner is reset first, so comparisons start from a clean slate.
pub async fn compare_learners(
    env: &mut Environment,
    learners: &mut [Box<dyn Learner>],
    config: &TrainerConfig,
) -> Result<Vec<ComparisonEntry>> {
    let mut entries = Vec::with_capacity(learners.len());
    for learner in learners.iter_mut() {
        learner.reset();
        let report = train_and_evaluate(env, learner.as_mut(), config).await?;
        tracing::info!(
            learner = report.learner,
            mean_return = report.final_eval.mean_return,
            "comparison run finished"
        );
        entries.push(ComparisonEntry {
            learner: learner.name().to_string(),
            report,
        });
    }
    Ok(entries)
}

/// Evaluation seeds disjoint from the training range.
fn eval_seed_base(base_seed: u64, episode: u32) -> u64 {
    base_seed
        .wrapping_add(1_000_003)
        .wrapping_add(episode as u64 * 7919)
}
