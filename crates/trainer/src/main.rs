//! Training entry point
//!
//! Thin CLI over the environment and runner: train a learner, resume from a
//! saved state, evaluate a saved policy, or compare every strategy over one
//! shared environment. Results land in the output directory as JSON.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use collections_agent_compliance::ComplianceEngine;
use collections_agent_config::{load_settings, Settings};
use collections_agent_core::{CaseFacts, Persona};
use collections_agent_env::{
    compare_learners, run_episode, run_evaluation, train_and_evaluate, Environment, EpisodeRecord,
    ScriptedCounterparty, TemplateUtteranceGenerator, TrainerConfig,
};
use collections_agent_policy::{
    FixedScriptLearner, HeuristicLearner, Learner, LinearBandit, QLearner, RandomLearner,
};

#[derive(Debug, Parser)]
#[command(name = "collections-trainer", about = "Train collection-call dialogue policies")]
struct Cli {
    /// Configuration environment (loads config/{env}.yaml over defaults).
    #[arg(long, global = true)]
    config_env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LearnerKind {
    Random,
    FixedScript,
    Heuristic,
    Bandit,
    QLearning,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train a learner, optionally resuming from a saved state.
    Train {
        #[arg(long, value_enum, default_value = "q-learning")]
        learner: LearnerKind,

        /// Number of training episodes.
        #[arg(long)]
        episodes: Option<u32>,

        /// Step size override.
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Initial exploration rate override.
        #[arg(long)]
        exploration: Option<f64>,

        /// Discount factor override.
        #[arg(long)]
        gamma: Option<f64>,

        /// Base RNG seed override.
        #[arg(long)]
        seed: Option<u64>,

        /// Saved learner state to resume from.
        #[arg(long)]
        resume_from: Option<PathBuf>,

        /// Output directory override.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Evaluate a saved learner without training.
    Evaluate {
        #[arg(long, value_enum)]
        learner: LearnerKind,

        /// Saved learner state to evaluate.
        #[arg(long)]
        state: PathBuf,

        #[arg(long, default_value_t = 200)]
        episodes: u32,
    },

    /// Train and evaluate every strategy over one shared environment.
    Compare {
        #[arg(long)]
        episodes: Option<u32>,

        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_environment(settings: &Settings) -> Environment {
    Environment::new(
        CaseFacts::sample(),
        ComplianceEngine::new(settings.compliance.clone()),
        collections_agent_policy::RewardEngine::new(settings.rewards.clone()),
        Box::new(TemplateUtteranceGenerator::new()),
        Box::new(ScriptedCounterparty::new(settings.episode.base_seed)),
        settings.episode.max_turns,
    )
}

fn build_learner(kind: LearnerKind, settings: &Settings) -> Box<dyn Learner> {
    let params = settings.learner.clone();
    let seed = settings.episode.base_seed;
    match kind {
        LearnerKind::Random => Box::new(RandomLearner::new(seed)),
        LearnerKind::FixedScript => Box::new(FixedScriptLearner::new()),
        LearnerKind::Heuristic => Box::new(HeuristicLearner::new()),
        LearnerKind::Bandit => Box::new(LinearBandit::new(params, seed)),
        LearnerKind::QLearning => Box::new(QLearner::new(params, seed)),
    }
}

fn write_json<T: serde::Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

async fn write_sample_records(
    env: &mut Environment,
    learner: &mut dyn Learner,
    dir: &Path,
    base_seed: u64,
) -> Result<PathBuf> {
    let path = dir.join("episodes.jsonl");
    let mut file = fs::File::create(&path)?;
    let personas = Persona::default_pool();
    for (i, persona) in personas.into_iter().enumerate() {
        let metrics = run_episode(
            env,
            learner,
            false,
            persona,
            base_seed.wrapping_add(9_000_000 + i as u64),
        )
        .await?;
        let record = EpisodeRecord::from(&metrics);
        writeln!(file, "{}", serde_json::to_string(&record)?)?;
    }
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut settings = match load_settings(cli.config_env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config files, using defaults");
            Settings::default()
        }
    };

    match cli.command {
        Command::Train {
            learner,
            episodes,
            learning_rate,
            exploration,
            gamma,
            seed,
            resume_from,
            output_dir,
        } => {
            if let Some(episodes) = episodes {
                settings.training.episodes = episodes;
            }
            if let Some(lr) = learning_rate {
                settings.learner.learning_rate = lr;
            }
            if let Some(eps) = exploration {
                settings.learner.epsilon = eps;
            }
            if let Some(gamma) = gamma {
                settings.learner.gamma = gamma;
            }
            if let Some(seed) = seed {
                settings.episode.base_seed = seed;
            }
            let out_dir = output_dir.unwrap_or_else(|| PathBuf::from(&settings.output_dir));

            let mut env = build_environment(&settings);
            let mut agent = build_learner(learner, &settings);
            if let Some(path) = resume_from {
                let payload = fs::read_to_string(&path)
                    .with_context(|| format!("reading learner state {}", path.display()))?;
                agent
                    .load(&payload)
                    .with_context(|| format!("restoring learner state {}", path.display()))?;
                tracing::info!(
                    path = %path.display(),
                    episodes_trained = agent.episodes_trained(),
                    "resumed learner state"
                );
            }

            let config = TrainerConfig::from_settings(&settings);
            tracing::info!(
                learner = agent.name(),
                episodes = config.episodes,
                "starting training"
            );
            let report = train_and_evaluate(&mut env, agent.as_mut(), &config).await?;

            fs::create_dir_all(&out_dir)?;
            let state_path = out_dir.join("learner.json");
            fs::write(&state_path, agent.save()?)?;
            write_json(&out_dir, "curve.json", &report.curve)?;
            write_json(&out_dir, "report.json", &report)?;
            write_json(&out_dir, "policy.json", &agent.snapshot())?;
            let records_path =
                write_sample_records(&mut env, agent.as_mut(), &out_dir, settings.episode.base_seed)
                    .await?;

            tracing::info!(
                mean_return = report.final_eval.mean_return,
                success_rate = report.final_eval.success_rate,
                state = %state_path.display(),
                records = %records_path.display(),
                "training finished"
            );
        }

        Command::Evaluate {
            learner,
            state,
            episodes,
        } => {
            let mut env = build_environment(&settings);
            let mut agent = build_learner(learner, &settings);
            let payload = fs::read_to_string(&state)
                .with_context(|| format!("reading learner state {}", state.display()))?;
            agent.load(&payload)?;

            let summary = run_evaluation(
                &mut env,
                agent.as_mut(),
                episodes,
                &Persona::default_pool(),
                settings.episode.base_seed.wrapping_add(500_000),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Compare { episodes, output_dir } => {
            if let Some(episodes) = episodes {
                settings.training.episodes = episodes;
            }
            let out_dir = output_dir.unwrap_or_else(|| PathBuf::from(&settings.output_dir));

            let mut env = build_environment(&settings);
            let mut learners: Vec<Box<dyn Learner>> = vec![
                Box::new(RandomLearner::new(settings.episode.base_seed)),
                Box::new(FixedScriptLearner::new()),
                Box::new(HeuristicLearner::new()),
                Box::new(LinearBandit::new(
                    settings.learner.clone(),
                    settings.episode.base_seed,
                )),
                Box::new(QLearner::new(
                    settings.learner.clone(),
                    settings.episode.base_seed,
                )),
            ];

            let config = TrainerConfig::from_settings(&settings);
            let entries = compare_learners(&mut env, &mut learners, &config).await?;
            for entry in &entries {
                println!(
                    "{:<14} mean_return={:+.2} success={:.0}% hangups={:.0}%",
                    entry.learner,
                    entry.report.final_eval.mean_return,
                    entry.report.final_eval.success_rate * 100.0,
                    entry.report.final_eval.hangup_rate * 100.0,
                );
            }
            let path = write_json(&out_dir, "comparison.json", &entries)?;
            tracing::info!(path = %path.display(), "comparison written");
        }
    }

    Ok(())
}
