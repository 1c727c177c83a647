use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai::state_encoding::CHANNELS;
use crate::ai::DqnAgent;
use crate::error::CheckpointError;
use crate::game::{COLS, ROWS};

/// Identifier of a trained model: network name plus local wall-clock time.
pub fn model_id(network: &str) -> String {
    model_id_at(network, &Local::now())
}

pub fn model_id_at(network: &str, at: &DateTime<Local>) -> String {
    format!("{}_{}", network, at.format("%Y_%m_%d_T_%H_%M_%S"))
}

/// Describes an exported policy so it can be loaded without the training config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyManifest {
    pub model_id: String,
    pub network: String,
    pub input_shape: [usize; 4],
    pub output_size: usize,
}

/// Write the policy weights as `{model_id}.mpk` and a manifest as
/// `{model_id}.json` into `policies_dir`. Returns the weights path.
pub fn export_policy(
    agent: &DqnAgent,
    policies_dir: &Path,
    model_id: &str,
    network: &str,
) -> Result<PathBuf, CheckpointError> {
    fs::create_dir_all(policies_dir)?;

    agent.estimator().save_policy(&policies_dir.join(model_id))?;

    let manifest = PolicyManifest {
        model_id: model_id.to_string(),
        network: network.to_string(),
        input_shape: [1, CHANNELS, ROWS, COLS],
        output_size: COLS,
    };
    let manifest_path = policies_dir.join(format!("{model_id}.json"));
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    let weights_path = policies_dir.join(format!("{model_id}.mpk"));
    info!(path = %weights_path.display(), "policy exported");
    Ok(weights_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::algorithms::DqnConfig;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_model_id_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(model_id_at("QNetwork", &at), "QNetwork_2024_03_09_T_07_05_01");
        assert!(model_id("QNetwork").starts_with("QNetwork_"));
    }

    #[test]
    fn test_export_writes_weights_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let agent = DqnAgent::new(
            DqnConfig {
                memory_capacity: 8,
                ..Default::default()
            },
            StdRng::seed_from_u64(1),
            StdRng::seed_from_u64(2),
        );
        let policies = dir.path().join("policies");
        let path = export_policy(&agent, &policies, "QNetwork_test", "QNetwork").unwrap();
        assert!(path.exists());

        let json = fs::read_to_string(policies.join("QNetwork_test.json")).unwrap();
        let manifest: PolicyManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(manifest.input_shape, [1, 2, 6, 7]);
        assert_eq!(manifest.output_size, 7);
        assert_eq!(manifest.network, "QNetwork");
    }
}
