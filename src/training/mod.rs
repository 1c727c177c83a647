//! Training infrastructure: episode loop, replay buffer, evaluation against a
//! random opponent, tactical probes and metrics collection.

pub mod cancel;
pub mod episode;
pub mod evaluator;
pub mod metrics;
pub mod probes;
pub mod replay_buffer;
pub mod trainer;

pub use cancel::CancellationToken;
pub use episode::{derive_seed, play_episode, seeded_rng, shape_rewards, EpisodeOutcome};
pub use evaluator::{EvalConfig, EvaluationRecord, Evaluator};
pub use metrics::TrainingHistory;
pub use replay_buffer::{ReplayBuffer, Transition};
pub use trainer::{CheckpointConfig, Trainer, TrainerConfig, TrainingReport};
