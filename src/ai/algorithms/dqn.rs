use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use burn::optim::GradientsParams;
use burn::prelude::*;
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::estimator::{Device, InferBackend, TrainBackend, ValueEstimator};
use crate::ai::networks::QNetworkConfig;
use crate::ai::optim::{CriterionConfig, GradClipConfig, OptimizerConfig, QOptimizer};
use crate::ai::state_encoding::{encode_board, encode_boards};
use crate::checkpoint::AgentTrainingState;
use crate::error::{CheckpointError, TrainingError};
use crate::game::{Board, COLS};
use crate::training::replay_buffer::{ReplayBuffer, Transition};

const TRAINING_STATE_FILE: &str = "training_state.json";

/// Exponential epsilon decay, parameterized by environment steps taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpsilonConfig {
    pub start: f64,
    pub end: f64,
    pub decay: f64,
}

impl Default for EpsilonConfig {
    fn default() -> Self {
        EpsilonConfig {
            start: 0.9,
            end: 0.05,
            decay: 50_000.0 * 25.0 / 7.5,
        }
    }
}

impl EpsilonConfig {
    /// `end + (start - end) * exp(-steps / decay)`
    pub fn threshold(&self, steps: usize) -> f64 {
        self.end + (self.start - self.end) * (-(steps as f64) / self.decay).exp()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetUpdateMode {
    /// Blend with `tau` after every optimization step.
    Soft,
    /// Copy verbatim every `period` episodes.
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetUpdateConfig {
    pub mode: TargetUpdateMode,
    pub tau: f64,
    pub period: usize,
}

impl Default for TargetUpdateConfig {
    fn default() -> Self {
        TargetUpdateConfig {
            mode: TargetUpdateMode::Soft,
            tau: 0.005,
            period: 100,
        }
    }
}

/// DQN hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub batch_size: usize,
    pub memory_capacity: usize,
    pub gamma: f32,
    /// Select next actions with the policy and read their value from the target.
    pub double: bool,
    pub epsilon: EpsilonConfig,
    pub optimizer: OptimizerConfig,
    pub criterion: CriterionConfig,
    pub clip_grads: Option<GradClipConfig>,
    pub target_update: TargetUpdateConfig,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            batch_size: 512,
            memory_capacity: 50_000 * 25,
            gamma: 0.99,
            double: true,
            epsilon: EpsilonConfig::default(),
            optimizer: OptimizerConfig::default(),
            criterion: CriterionConfig::default(),
            clip_grads: None,
            target_update: TargetUpdateConfig::default(),
        }
    }
}

/// Double DQN agent: policy + target estimator, replay memory and optimizer.
pub struct DqnAgent {
    estimator: ValueEstimator,
    optimizer: QOptimizer,
    memory: ReplayBuffer,
    config: DqnConfig,
    learning_rate: f64,
    epsilon: f64,
    steps: usize,
    updates: usize,
    rng: StdRng,
}

impl DqnAgent {
    /// `rng` drives exploration; `memory_rng` drives replay sampling.
    pub fn new(config: DqnConfig, rng: StdRng, memory_rng: StdRng) -> Self {
        let device: Device = Default::default();
        let estimator = ValueEstimator::new(QNetworkConfig::new(), device);
        let optimizer = QOptimizer::new(&config.optimizer, config.clip_grads.as_ref());
        let memory = ReplayBuffer::new(config.memory_capacity, memory_rng);

        DqnAgent {
            estimator,
            optimizer,
            memory,
            learning_rate: config.optimizer.learning_rate,
            epsilon: config.epsilon.start,
            config,
            steps: 0,
            updates: 0,
            rng,
        }
    }

    /// Epsilon-greedy action selection.
    ///
    /// The threshold is recomputed from `steps_so_far` and kept as the current
    /// epsilon. When exploiting without `enforce_valid` the returned column may
    /// be outside `valid_actions`.
    pub fn act(
        &mut self,
        state: &Board,
        valid_actions: &[usize],
        steps_so_far: usize,
        enforce_valid: bool,
    ) -> Result<usize, TrainingError> {
        self.epsilon = self.config.epsilon.threshold(steps_so_far);
        self.steps = steps_so_far;

        if self.rng.random::<f64>() > self.epsilon {
            return self.exploit(state, valid_actions, enforce_valid);
        }
        if valid_actions.is_empty() {
            return Err(TrainingError::NoValidActions);
        }
        let idx = self.rng.random_range(0..valid_actions.len());
        Ok(valid_actions[idx])
    }

    /// Arg-max of the policy estimator, optionally restricted to `valid_actions`.
    pub fn exploit(
        &self,
        state: &Board,
        valid_actions: &[usize],
        enforce_valid: bool,
    ) -> Result<usize, TrainingError> {
        let q_values = self.q_values(state)?;
        let allowed = enforce_valid.then_some(valid_actions);
        greedy_action(&q_values, allowed).ok_or(TrainingError::NoValidActions)
    }

    /// Policy Q-values for a single board.
    pub fn q_values(&self, state: &Board) -> Result<Vec<f32>, TrainingError> {
        let input = encode_board::<InferBackend>(state, self.estimator.device());
        tensor_to_vec(self.estimator.infer_policy(input))
    }

    /// Store one transition in replay memory.
    pub fn cache(&mut self, transition: Transition) {
        self.memory.push(transition);
    }

    /// One gradient step on a batch recalled from memory. Returns the loss.
    pub fn optimize(&mut self) -> Result<f32, TrainingError> {
        let batch = self.memory.recall(self.config.batch_size)?;
        let batch_size = batch.len();
        let device = self.estimator.device().clone();

        let next_values = self.next_values(&batch)?;
        let target_data: Vec<f32> = batch
            .iter()
            .zip(&next_values)
            .map(|(t, &next)| bootstrap_target(t.reward, next, self.config.gamma))
            .collect();

        let states: Vec<Board> = batch.iter().map(|t| t.state).collect();
        let q_all = self
            .estimator
            .evaluate_policy(encode_boards::<TrainBackend>(&states, &device));

        // One-hot action mask [B, 7] to extract Q(s, a)
        let mut action_mask_data = vec![0.0f32; batch_size * COLS];
        for (i, t) in batch.iter().enumerate() {
            action_mask_data[i * COLS + t.action] = 1.0;
        }
        let action_mask = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(action_mask_data.as_slice()),
            &device,
        )
        .reshape([batch_size, COLS]);
        let q_taken = (q_all * action_mask).sum_dim(1);

        let targets =
            Tensor::<TrainBackend, 1>::from_data(TensorData::from(target_data.as_slice()), &device)
                .reshape([batch_size, 1]);

        let loss = self.config.criterion.loss(q_taken, targets);
        let loss_val = tensor_to_vec(loss.clone())?
            .first()
            .copied()
            .ok_or_else(|| TrainingError::Tensor("empty loss tensor".into()))?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, self.estimator.policy());
        let policy = self
            .optimizer
            .step(self.learning_rate, self.estimator.policy().clone(), grads);
        self.estimator.set_policy(policy);
        self.updates += 1;

        Ok(loss_val)
    }

    /// Next-state values per transition; `None` for terminal transitions.
    pub fn next_values(&self, batch: &[Transition]) -> Result<Vec<Option<f32>>, TrainingError> {
        let mut values = vec![None; batch.len()];
        let live: Vec<(usize, Board)> = batch
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.next_state.map(|board| (i, board)))
            .collect();
        if live.is_empty() {
            return Ok(values);
        }

        let device = self.estimator.device();
        let boards: Vec<Board> = live.iter().map(|&(_, board)| board).collect();
        let target_q = tensor_to_vec(
            self.estimator
                .evaluate_target(encode_boards::<InferBackend>(&boards, device)),
        )?;
        let policy_q = if self.config.double {
            Some(tensor_to_vec(
                self.estimator
                    .infer_policy(encode_boards::<InferBackend>(&boards, device)),
            )?)
        } else {
            None
        };

        for (row, &(i, _)) in live.iter().enumerate() {
            let span = row * COLS..(row + 1) * COLS;
            let policy_row = policy_q.as_ref().map(|q| &q[span.clone()]);
            values[i] = Some(next_value(&target_q[span], policy_row));
        }
        Ok(values)
    }

    /// Synchronize the target weights after an optimization step.
    ///
    /// Hard updates fire when `(episode + 1) % period == 0`.
    pub fn update_target(&mut self, episode: usize) {
        let update = &self.config.target_update;
        match update.mode {
            TargetUpdateMode::Soft => self.estimator.soft_update(update.tau),
            TargetUpdateMode::Hard => {
                if (episode + 1) % update.period == 0 {
                    debug!(episode, "hard target update");
                    self.estimator.hard_update();
                }
            }
        }
    }

    /// Hold the estimator in inference mode until the guard drops.
    pub fn inference_mode(&mut self) -> InferenceGuard<'_> {
        self.estimator.enter_inference();
        InferenceGuard { agent: self }
    }

    /// Persist estimator weights and training state into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), CheckpointError> {
        fs::create_dir_all(dir)?;
        self.estimator.save(dir)?;
        let json = serde_json::to_string_pretty(&self.training_state())?;
        fs::write(dir.join(TRAINING_STATE_FILE), json)?;
        Ok(())
    }

    /// Restore weights and training state from `dir`. On any failure the agent
    /// is left untouched.
    pub fn load(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::NotFound(dir.to_path_buf()));
        }
        let state_path = dir.join(TRAINING_STATE_FILE);
        let json = fs::read_to_string(&state_path).map_err(|e| CheckpointError::MetadataRead {
            path: state_path.clone(),
            source: e,
        })?;
        let state: AgentTrainingState =
            serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
                path: state_path,
                source: e,
            })?;

        self.estimator.load(dir)?;
        self.restore_training_state(&state);
        Ok(())
    }

    pub fn training_state(&self) -> AgentTrainingState {
        AgentTrainingState {
            epsilon: self.epsilon,
            steps: self.steps,
            updates: self.updates,
            learning_rate: self.learning_rate,
        }
    }

    pub fn restore_training_state(&mut self, state: &AgentTrainingState) {
        self.epsilon = state.epsilon;
        self.steps = state.steps;
        self.updates = state.updates;
        self.learning_rate = state.learning_rate;
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Environment steps seen by the last `act` call.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Optimization steps taken.
    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn estimator(&self) -> &ValueEstimator {
        &self.estimator
    }
}

/// Scoped inference mode: the policy is frozen for the guard's lifetime and
/// training mode is restored on drop, whichever way the scope is left.
pub struct InferenceGuard<'a> {
    agent: &'a mut DqnAgent,
}

impl Deref for InferenceGuard<'_> {
    type Target = DqnAgent;

    fn deref(&self) -> &DqnAgent {
        self.agent
    }
}

impl DerefMut for InferenceGuard<'_> {
    fn deref_mut(&mut self) -> &mut DqnAgent {
        self.agent
    }
}

impl Drop for InferenceGuard<'_> {
    fn drop(&mut self) {
        self.agent.estimator.exit_inference();
    }
}

/// Arg-max over `q_values`, over `allowed` columns only when given.
/// Ties go to the lowest column.
pub fn greedy_action(q_values: &[f32], allowed: Option<&[usize]>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    let mut consider = |col: usize| {
        if let Some(&q) = q_values.get(col) {
            match best {
                Some((_, best_q)) if q <= best_q => {}
                _ => best = Some((col, q)),
            }
        }
    };
    match allowed {
        Some(cols) => {
            let mut cols = cols.to_vec();
            cols.sort_unstable();
            cols.into_iter().for_each(&mut consider);
        }
        None => (0..q_values.len()).for_each(&mut consider),
    }
    best.map(|(col, _)| col)
}

/// Value of a non-terminal next state.
///
/// With `policy_row` (Double-Q) the action is the policy's unrestricted
/// arg-max and its value is read from the target row; otherwise the target
/// row's maximum is used.
pub fn next_value(target_row: &[f32], policy_row: Option<&[f32]>) -> f32 {
    match policy_row.and_then(|row| greedy_action(row, None)) {
        Some(action) => target_row[action],
        None => target_row.iter().copied().fold(f32::NEG_INFINITY, f32::max),
    }
}

/// `reward - gamma * next_value`; terminal transitions contribute no next value.
pub fn bootstrap_target(reward: f32, next_value: Option<f32>, gamma: f32) -> f32 {
    reward - gamma * next_value.unwrap_or(0.0)
}

fn tensor_to_vec<const D: usize>(
    tensor: Tensor<impl Backend, D>,
) -> Result<Vec<f32>, TrainingError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| TrainingError::Tensor(format!("{e:?}")))
}
