use serde::{Deserialize, Serialize};

use crate::ai::algorithms::DqnConfig;
use crate::training::evaluator::EvaluationRecord;

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub win_rate: f32,
    pub draw_rate: f32,
    pub finish_pct: f32,
    pub block_pct: f32,
    pub running_loss: f32,
}

impl CheckpointMetrics {
    /// Snapshot from the latest evaluation, if any has run yet.
    pub fn from_evaluation(record: Option<&EvaluationRecord>, running_loss: f32) -> Self {
        match record {
            Some(r) => CheckpointMetrics {
                win_rate: r.win_rate as f32,
                draw_rate: r.draw_rate as f32,
                finish_pct: r.finish_pct,
                block_pct: r.block_pct,
                running_loss,
            },
            None => CheckpointMetrics {
                running_loss,
                ..Default::default()
            },
        }
    }
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Episodes completed when the checkpoint was taken.
    pub episode: usize,
    pub timestamp: i64,
    pub model_id: String,
    pub network: String,
    pub total_steps: usize,
    #[serde(default)]
    pub scheduler_steps: usize,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: DqnConfig,
}

/// Agent counters written to training_state.json.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentTrainingState {
    pub epsilon: f64,
    pub steps: usize,
    pub updates: usize,
    pub learning_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_evaluation() {
        let metrics = CheckpointMetrics::from_evaluation(None, 0.25);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.running_loss, 0.25);
    }

    #[test]
    fn test_metadata_serde() {
        let meta = CheckpointMetadata {
            episode: 5000,
            timestamp: 1_700_000_000,
            model_id: "QNetwork_2024_01_01_T_00_00_00".to_string(),
            network: "QNetwork".to_string(),
            total_steps: 90_000,
            scheduler_steps: 4990,
            metrics: CheckpointMetrics {
                win_rate: 0.65,
                ..Default::default()
            },
            hyperparameters: DqnConfig::default(),
        };

        let json = serde_json::to_string_pretty(&meta).unwrap();
        let deserialized: CheckpointMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.episode, 5000);
        assert_eq!(deserialized.model_id, meta.model_id);
        assert!((deserialized.metrics.win_rate - 0.65).abs() < 1e-6);
        assert_eq!(deserialized.hyperparameters, DqnConfig::default());
    }
}
