use burn::grad_clipping::GradientClippingConfig;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{AdamConfig, AdamWConfig, GradientsParams, Optimizer, SgdConfig};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::estimator::TrainBackend;
use crate::ai::networks::QNetwork;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam,
    AdamW,
    Sgd,
}

/// Optimizer choice. `momentum` only applies to SGD; a `weight_decay` of zero
/// disables decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub kind: OptimizerKind,
    pub learning_rate: f64,
    pub momentum: f64,
    pub weight_decay: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            kind: OptimizerKind::Sgd,
            learning_rate: 1e-2,
            momentum: 0.9,
            weight_decay: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    Norm,
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradClipConfig {
    pub kind: ClipKind,
    pub threshold: f32,
}

impl Default for GradClipConfig {
    fn default() -> Self {
        GradClipConfig {
            kind: ClipKind::Norm,
            threshold: 1.0,
        }
    }
}

impl GradClipConfig {
    fn to_burn(&self) -> GradientClippingConfig {
        match self.kind {
            ClipKind::Norm => GradientClippingConfig::Norm(self.threshold),
            ClipKind::Value => GradientClippingConfig::Value(self.threshold),
        }
    }
}

type StepFn = Box<
    dyn FnMut(f64, QNetwork<TrainBackend>, GradientsParams) -> QNetwork<TrainBackend> + Send,
>;

/// Type-erased optimizer over the Q-network, so the agent does not carry the
/// concrete optimizer type in its signature.
pub struct QOptimizer {
    step: StepFn,
}

impl QOptimizer {
    pub fn new(config: &OptimizerConfig, clip: Option<&GradClipConfig>) -> Self {
        let clipping = clip.map(GradClipConfig::to_burn);
        let decay =
            (config.weight_decay > 0.0).then(|| WeightDecayConfig::new(config.weight_decay));
        let step = match config.kind {
            OptimizerKind::Adam => boxed(
                AdamConfig::new()
                    .with_weight_decay(decay)
                    .with_grad_clipping(clipping)
                    .init::<TrainBackend, QNetwork<TrainBackend>>(),
            ),
            OptimizerKind::AdamW => boxed(
                AdamWConfig::new()
                    .with_weight_decay(config.weight_decay)
                    .with_grad_clipping(clipping)
                    .init::<TrainBackend, QNetwork<TrainBackend>>(),
            ),
            OptimizerKind::Sgd => {
                let momentum = (config.momentum > 0.0).then(|| {
                    MomentumConfig::new()
                        .with_momentum(config.momentum)
                        .with_dampening(0.0)
                });
                boxed(
                    SgdConfig::new()
                        .with_momentum(momentum)
                        .with_weight_decay(decay)
                        .with_gradient_clipping(clipping)
                        .init::<TrainBackend, QNetwork<TrainBackend>>(),
                )
            }
        };
        QOptimizer { step }
    }

    /// Apply one update; gradient clipping happens inside the optimizer.
    pub fn step(
        &mut self,
        learning_rate: f64,
        network: QNetwork<TrainBackend>,
        grads: GradientsParams,
    ) -> QNetwork<TrainBackend> {
        (self.step)(learning_rate, network, grads)
    }
}

fn boxed<O>(mut optimizer: O) -> StepFn
where
    O: Optimizer<QNetwork<TrainBackend>, TrainBackend> + 'static,
{
    Box::new(move |lr, network, grads| optimizer.step(lr, network, grads))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    Mse,
    L1,
    Huber,
    SmoothL1,
}

/// Regression loss between predicted and bootstrapped Q-values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriterionConfig {
    pub kind: CriterionKind,
    /// Huber threshold between the quadratic and linear regimes.
    pub delta: f32,
    /// Smooth-L1 threshold; the loss is Huber(beta) / beta.
    pub beta: f32,
}

impl Default for CriterionConfig {
    fn default() -> Self {
        CriterionConfig {
            kind: CriterionKind::Huber,
            delta: 1.0,
            beta: 1.0,
        }
    }
}

impl CriterionConfig {
    /// Mean loss over all elements, as a single-element tensor.
    pub fn loss<B: Backend>(&self, predicted: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
        let diff = predicted - target;
        match self.kind {
            CriterionKind::Mse => (diff.clone() * diff).mean(),
            CriterionKind::L1 => diff.abs().mean(),
            CriterionKind::Huber => huber(diff, self.delta).mean(),
            CriterionKind::SmoothL1 if self.beta > 0.0 => {
                huber(diff, self.beta).div_scalar(self.beta).mean()
            }
            CriterionKind::SmoothL1 => diff.abs().mean(),
        }
    }
}

/// Elementwise Huber: `0.5 x^2` inside `delta`, `delta (|x| - 0.5 delta)` outside.
fn huber<B: Backend>(diff: Tensor<B, 2>, delta: f32) -> Tensor<B, 2> {
    let abs = diff.abs();
    let quadratic = abs.clone().clamp_max(delta);
    let linear = abs - quadratic.clone();
    (quadratic.clone() * quadratic).mul_scalar(0.5) + linear.mul_scalar(delta)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    Constant,
    MultiStep,
}

/// Learning-rate schedule, stepped once per episode after warm-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub kind: SchedulerKind,
    pub milestones: Vec<usize>,
    pub gamma: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            kind: SchedulerKind::MultiStep,
            milestones: vec![40_000],
            gamma: 0.2,
        }
    }
}

/// Multi-step decay: the base rate is multiplied by `gamma` once for every
/// milestone already reached.
#[derive(Debug, Clone)]
pub struct LrSchedule {
    base: f64,
    config: SchedulerConfig,
    steps: usize,
}

impl LrSchedule {
    pub fn new(base: f64, config: SchedulerConfig) -> Self {
        LrSchedule {
            base,
            config,
            steps: 0,
        }
    }

    pub fn constant(base: f64) -> Self {
        Self::new(
            base,
            SchedulerConfig {
                kind: SchedulerKind::Constant,
                milestones: Vec::new(),
                gamma: 1.0,
            },
        )
    }

    pub fn learning_rate(&self) -> f64 {
        match self.config.kind {
            SchedulerKind::Constant => self.base,
            SchedulerKind::MultiStep => {
                let reached = self
                    .config
                    .milestones
                    .iter()
                    .filter(|&&milestone| milestone <= self.steps)
                    .count();
                self.base * self.config.gamma.powi(reached as i32)
            }
        }
    }

    pub fn step(&mut self) -> f64 {
        self.steps += 1;
        self.learning_rate()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Fast-forward after a resume.
    pub fn set_steps(&mut self, steps: usize) {
        self.steps = steps;
    }
}
