use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::estimator::InferBackend;
use crate::ai::networks::QNetwork;
use crate::ai::optim::{LrSchedule, SchedulerConfig};
use crate::ai::DqnAgent;
use crate::checkpoint::{
    model_id, CheckpointManager, CheckpointManagerConfig, CheckpointMetadata, CheckpointMetrics,
};
use crate::error::{CheckpointError, TrainingError};
use crate::game::ConnectFourEnv;
use crate::training::cancel::CancellationToken;
use crate::training::episode::{play_episode, shape_rewards};
use crate::training::evaluator::{EvaluationRecord, Evaluator};
use crate::training::metrics::TrainingHistory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Checkpoint every N episodes; `None` disables periodic checkpoints.
    pub save_every: Option<usize>,
    pub save_on_exit: bool,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        CheckpointConfig {
            save_every: Some(20_000),
            save_on_exit: true,
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// Trainer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub episodes: usize,
    pub display_period: usize,
    pub enforce_valid_action: bool,
    pub checkpoint_dir: PathBuf,
    pub policies_dir: PathBuf,
    pub checkpoint: CheckpointConfig,
    pub scheduler: Option<SchedulerConfig>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            episodes: 50_000,
            display_period: 1000,
            enforce_valid_action: false,
            checkpoint_dir: PathBuf::from("checkpoints"),
            policies_dir: PathBuf::from("policies"),
            checkpoint: CheckpointConfig::default(),
            scheduler: Some(SchedulerConfig::default()),
        }
    }
}

/// An evaluation and the (zero-based) episode after which it ran.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationEntry {
    pub episode: usize,
    pub record: EvaluationRecord,
}

/// Everything a training run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model_id: String,
    pub history: TrainingHistory,
    pub evaluations: Vec<EvaluationEntry>,
    /// Stopped through the cancellation token before all episodes ran.
    pub cancelled: bool,
    pub checkpoint: Option<PathBuf>,
}

impl TrainingReport {
    pub fn write_json(&self, path: &Path) -> Result<(), TrainingError> {
        let json = serde_json::to_string_pretty(self).map_err(CheckpointError::from)?;
        fs::write(path, json).map_err(CheckpointError::from)?;
        Ok(())
    }
}

/// Episode loop: play, reshape, cache, optimize, evaluate, checkpoint.
pub struct Trainer {
    config: TrainerConfig,
    checkpoints: CheckpointManager,
    schedule: LrSchedule,
    start_episode: usize,
    base_steps: usize,
}

impl Trainer {
    /// `base_learning_rate` is the optimizer's configured rate, before any decay.
    pub fn new(config: TrainerConfig, base_learning_rate: f64) -> Result<Self, TrainingError> {
        let checkpoints = CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: config.checkpoint_dir.clone(),
            keep_last_n: config.checkpoint.keep_last_n,
            keep_best_n: config.checkpoint.keep_best_n,
        })?;
        let schedule = match config.scheduler.clone() {
            Some(scheduler) => LrSchedule::new(base_learning_rate, scheduler),
            None => LrSchedule::constant(base_learning_rate),
        };
        Ok(Trainer {
            config,
            checkpoints,
            schedule,
            start_episode: 0,
            base_steps: 0,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Continue episode numbering, step count and LR schedule from a checkpoint.
    pub fn resume_from(&mut self, metadata: &CheckpointMetadata) {
        self.start_episode = metadata.episode;
        self.base_steps = metadata.total_steps;
        self.schedule.set_steps(metadata.scheduler_steps);
        info!(
            episode = metadata.episode,
            total_steps = metadata.total_steps,
            "resuming training"
        );
    }

    /// Run the configured number of episodes, or until `cancel` fires.
    ///
    /// Completion and cancellation share the same finalization: one save when
    /// `save_on_exit` is set, then the report with whatever history exists.
    pub fn train(
        &mut self,
        agent: &mut DqnAgent,
        env: &mut ConnectFourEnv,
        evaluator: &mut Evaluator,
        cancel: &CancellationToken,
    ) -> Result<TrainingReport, TrainingError> {
        let mut history = TrainingHistory::new();
        let mut evaluations: Vec<EvaluationEntry> = Vec::new();
        let mut cancelled = false;

        agent.set_learning_rate(self.schedule.learning_rate());
        let last_episode = (self.start_episode + self.config.episodes).saturating_sub(1);
        let eval_period = evaluator.config().period;

        info!(
            network = QNetwork::<InferBackend>::NAME,
            episodes = self.config.episodes,
            start_episode = self.start_episode,
            checkpoint_dir = %self.checkpoints.checkpoint_dir().display(),
            "starting training"
        );

        for episode in self.start_episode..self.start_episode + self.config.episodes {
            if cancel.is_cancelled() {
                warn!(episode, "training cancelled");
                cancelled = true;
                break;
            }
            let started = Instant::now();
            let total_steps = self.base_steps + history.total_steps();

            let mut trace = play_episode(
                agent,
                env,
                total_steps,
                self.config.enforce_valid_action,
            )?;
            shape_rewards(&mut trace.transitions, trace.outcome, env.rewards());

            let mut reward = 0.0f32;
            for transition in &trace.transitions {
                agent.cache(*transition);
                reward += transition.reward;
            }

            let warmed_up = agent.memory_len() >= agent.batch_size();
            if warmed_up {
                let loss = agent.optimize()?;
                history.record_loss(loss);
                agent.update_target(episode);
            }

            history.record_episode(
                trace.transitions.len(),
                reward,
                started.elapsed().as_secs_f64(),
                agent.learning_rate(),
            );

            if warmed_up && (episode + 1) % eval_period == 0 {
                let record = evaluator.evaluate(agent, env)?;
                if (episode + 1) % self.config.display_period == 0 {
                    self.log_metrics(agent, &history, &record, episode, eval_period);
                }
                evaluations.push(EvaluationEntry { episode, record });
            }

            if let Some(every) = self.config.checkpoint.save_every {
                let exit_save_pending =
                    episode == last_episode && self.config.checkpoint.save_on_exit;
                if episode != 0 && (episode + 1) % every == 0 && !exit_save_pending {
                    self.save_checkpoint(agent, episode + 1, &history, &evaluations)?;
                }
            }

            if warmed_up {
                agent.set_learning_rate(self.schedule.step());
            }
        }

        self.finish(agent, history, evaluations, cancelled)
    }

    fn finish(
        &self,
        agent: &DqnAgent,
        history: TrainingHistory,
        evaluations: Vec<EvaluationEntry>,
        cancelled: bool,
    ) -> Result<TrainingReport, TrainingError> {
        let episodes_done = self.start_episode + history.episodes();
        let (model_id, checkpoint) = if self.config.checkpoint.save_on_exit {
            let (id, path) = self.save_checkpoint(agent, episodes_done, &history, &evaluations)?;
            (id, Some(path))
        } else {
            (model_id(QNetwork::<InferBackend>::NAME), None)
        };

        info!(
            model_id = %model_id,
            episodes = history.episodes(),
            total_steps = self.base_steps + history.total_steps(),
            cancelled,
            "training finished"
        );

        Ok(TrainingReport {
            model_id,
            history,
            evaluations,
            cancelled,
            checkpoint,
        })
    }

    fn save_checkpoint(
        &self,
        agent: &DqnAgent,
        episodes_done: usize,
        history: &TrainingHistory,
        evaluations: &[EvaluationEntry],
    ) -> Result<(String, PathBuf), TrainingError> {
        let network = QNetwork::<InferBackend>::NAME;
        let model_id = model_id(network);
        let running_loss = history.running_loss.last().copied().unwrap_or(0.0);
        let metadata = CheckpointMetadata {
            episode: episodes_done,
            timestamp: chrono::Utc::now().timestamp(),
            model_id: model_id.clone(),
            network: network.to_string(),
            total_steps: self.base_steps + history.total_steps(),
            scheduler_steps: self.schedule.steps(),
            metrics: CheckpointMetrics::from_evaluation(
                evaluations.last().map(|e| &e.record),
                running_loss,
            ),
            hyperparameters: agent.config().clone(),
        };
        let path = self.checkpoints.save(agent, &metadata)?;
        Ok((model_id, path))
    }

    fn log_metrics(
        &self,
        agent: &DqnAgent,
        history: &TrainingHistory,
        record: &EvaluationRecord,
        episode: usize,
        window: usize,
    ) {
        info!(
            episode,
            step = self.base_steps + history.total_steps(),
            train_reward = history.rewards.last().copied().unwrap_or(0.0),
            train_reward_avg = history.average_reward(window),
            steps = history.steps.last().copied().unwrap_or(0),
            steps_avg = history.average_steps(window),
            loss = history.running_loss.last().copied().unwrap_or(0.0),
            loss_avg = history.average_loss(window),
            eval_reward_mean = record.rewards_mean,
            eval_reward_std = record.rewards_std,
            win_rate_pct = record.win_rate * 100.0,
            finish_pct = record.finish_pct,
            block_pct = record.block_pct,
            epsilon = agent.epsilon(),
            lr = agent.learning_rate(),
            episode_secs = history.time_secs.last().copied().unwrap_or(0.0),
            "training progress"
        );
    }
}
