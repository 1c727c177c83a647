use std::marker::PhantomData;
use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, ModuleMapper, ModuleVisitor, ParamId};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use burn::tensor::TensorData;

use crate::ai::networks::{QNetwork, QNetworkConfig};
use crate::error::CheckpointError;

pub type InferBackend = NdArray<f32>;
pub type TrainBackend = Autodiff<InferBackend>;
pub type Device = <InferBackend as Backend>::Device;

const POLICY_FILE: &str = "policy";
const TARGET_FILE: &str = "target";

/// Value estimator with two independently addressable weight sets.
///
/// The policy weights live on the autodiff backend and are trained every
/// optimization step. The target weights live on the inference backend and
/// only change through [`soft_update`](Self::soft_update) or
/// [`hard_update`](Self::hard_update).
pub struct ValueEstimator {
    policy: QNetwork<TrainBackend>,
    target: QNetwork<InferBackend>,
    config: QNetworkConfig,
    device: Device,
    /// Frozen policy snapshot, present only while in inference mode.
    frozen: Option<QNetwork<InferBackend>>,
}

impl ValueEstimator {
    pub fn new(config: QNetworkConfig, device: Device) -> Self {
        let policy: QNetwork<TrainBackend> = config.init(&device);
        let target = policy.valid();
        ValueEstimator {
            policy,
            target,
            config,
            device,
            frozen: None,
        }
    }

    /// Policy forward pass with gradient tracking.
    pub fn evaluate_policy(&self, input: Tensor<TrainBackend, 4>) -> Tensor<TrainBackend, 2> {
        self.policy.forward(input)
    }

    /// Policy forward pass without gradient tracking.
    pub fn infer_policy(&self, input: Tensor<InferBackend, 4>) -> Tensor<InferBackend, 2> {
        match &self.frozen {
            Some(frozen) => frozen.forward(input),
            None => self.policy.valid().forward(input),
        }
    }

    pub fn evaluate_target(&self, input: Tensor<InferBackend, 4>) -> Tensor<InferBackend, 2> {
        self.target.forward(input)
    }

    pub fn policy(&self) -> &QNetwork<TrainBackend> {
        &self.policy
    }

    pub fn target(&self) -> &QNetwork<InferBackend> {
        &self.target
    }

    /// Replace the policy weights, typically with the output of an optimizer step.
    pub fn set_policy(&mut self, policy: QNetwork<TrainBackend>) {
        self.policy = policy;
        if self.frozen.is_some() {
            self.frozen = Some(self.policy.valid());
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn config(&self) -> &QNetworkConfig {
        &self.config
    }

    /// `target <- tau * policy + (1 - tau) * target`, parameter by parameter.
    pub fn soft_update(&mut self, tau: f64) {
        let mut collector = ParamCollector::<InferBackend>::new();
        self.policy.valid().visit(&mut collector);

        let mut blend = SoftBlend::<InferBackend> {
            source: collector.tensors.into_iter(),
            tau,
            _backend: PhantomData,
        };
        self.target = self.target.clone().map(&mut blend);
    }

    /// Copy the policy weights into the target verbatim.
    pub fn hard_update(&mut self) {
        self.target = self.policy.valid();
    }

    pub fn is_inference(&self) -> bool {
        self.frozen.is_some()
    }

    pub(crate) fn enter_inference(&mut self) {
        self.frozen = Some(self.policy.valid());
    }

    pub(crate) fn exit_inference(&mut self) {
        self.frozen = None;
    }

    /// Write `policy.mpk` and `target.mpk` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), CheckpointError> {
        let recorder = DefaultRecorder::default();
        self.policy
            .valid()
            .save_file(dir.join(POLICY_FILE), &recorder)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
        self.target
            .clone()
            .save_file(dir.join(TARGET_FILE), &recorder)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
        Ok(())
    }

    /// Write only the policy weights to `path` (extension added by the recorder).
    pub fn save_policy(&self, path: &Path) -> Result<(), CheckpointError> {
        let recorder = DefaultRecorder::default();
        self.policy
            .valid()
            .save_file(path.to_path_buf(), &recorder)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))
    }

    /// Load both weight sets from `dir`. Nothing is replaced unless both load.
    pub fn load(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::NotFound(dir.to_path_buf()));
        }
        let recorder = DefaultRecorder::default();

        let policy: QNetwork<TrainBackend> = self
            .config
            .init(&self.device)
            .load_file(dir.join(POLICY_FILE), &recorder, &self.device)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
        let target: QNetwork<InferBackend> = self
            .config
            .init(&self.device)
            .load_file(dir.join(TARGET_FILE), &recorder, &self.device)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;

        self.set_policy(policy);
        self.target = target;
        Ok(())
    }
}

/// Collects every float parameter of a module in visiting order.
struct ParamCollector<B: Backend> {
    tensors: Vec<TensorData>,
    _backend: PhantomData<B>,
}

impl<B: Backend> ParamCollector<B> {
    fn new() -> Self {
        ParamCollector {
            tensors: Vec::new(),
            _backend: PhantomData,
        }
    }
}

impl<B: Backend> ModuleVisitor<B> for ParamCollector<B> {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.tensors.push(tensor.to_data());
    }
}

/// Blends collected source parameters into a module of the same architecture.
/// Parameters are paired by visiting order.
struct SoftBlend<B: Backend> {
    source: std::vec::IntoIter<TensorData>,
    tau: f64,
    _backend: PhantomData<B>,
}

impl<B: Backend> ModuleMapper<B> for SoftBlend<B> {
    fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        match self.source.next() {
            Some(data) => {
                let source = Tensor::<B, D>::from_data(data, &tensor.device());
                source.mul_scalar(self.tau) + tensor.mul_scalar(1.0 - self.tau)
            }
            None => tensor,
        }
    }
}

/// Flattened parameters of a module, in visiting order.
pub fn flat_params<B: Backend, M: Module<B>>(module: &M) -> Vec<Vec<f32>> {
    let mut collector = ParamCollector::<B>::new();
    module.visit(&mut collector);
    collector
        .tensors
        .into_iter()
        .filter_map(|data| data.to_vec::<f32>().ok())
        .collect()
}
