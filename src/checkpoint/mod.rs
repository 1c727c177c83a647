mod export;
mod manager;
mod metadata;

pub use export::{export_policy, model_id, model_id_at, PolicyManifest};
pub use manager::{CheckpointManager, CheckpointManagerConfig};
pub use metadata::{AgentTrainingState, CheckpointMetadata, CheckpointMetrics};
