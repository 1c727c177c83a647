use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::ai::DqnAgent;
use crate::checkpoint::metadata::CheckpointMetadata;
use crate::error::CheckpointError;

const METADATA_FILE: &str = "metadata.json";
const LATEST_LINK: &str = "latest";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// Manages saving, restoring, listing, and pruning checkpoints.
///
/// Each checkpoint is a directory `checkpoint_{episode:07}` holding the
/// estimator weights, `training_state.json` and `metadata.json`. A `latest`
/// symlink points at the most recent one.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(CheckpointManager { config })
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Write a checkpoint into a temporary directory, then rename it into place.
    pub fn save(
        &self,
        agent: &DqnAgent,
        metadata: &CheckpointMetadata,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", metadata.episode);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        if tmp_dir.exists() {
            fs::remove_dir_all(&tmp_dir)?;
        }
        agent.save(&tmp_dir)?;
        let meta_json = serde_json::to_string_pretty(metadata)?;
        fs::write(tmp_dir.join(METADATA_FILE), meta_json)?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(&dir_name)?;
        self.prune_old_checkpoints()?;

        info!(
            path = %final_dir.display(),
            model_id = %metadata.model_id,
            "checkpoint saved"
        );
        Ok(final_dir)
    }

    /// Read the metadata of the checkpoint in `dir`.
    pub fn read_metadata(&self, dir: &Path) -> Result<CheckpointMetadata, CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::NotFound(dir.to_path_buf()));
        }
        let meta_path = dir.join(METADATA_FILE);
        let meta_json =
            fs::read_to_string(&meta_path).map_err(|e| CheckpointError::MetadataRead {
                path: meta_path.clone(),
                source: e,
            })?;
        serde_json::from_str(&meta_json).map_err(|e| CheckpointError::MetadataParse {
            path: meta_path,
            source: e,
        })
    }

    /// Restore `agent` from the checkpoint in `dir`. The agent is untouched
    /// unless the metadata, the training state and both weight sets all load.
    pub fn restore(
        &self,
        agent: &mut DqnAgent,
        dir: &Path,
    ) -> Result<CheckpointMetadata, CheckpointError> {
        let metadata = self.read_metadata(dir)?;
        agent.load(dir)?;
        info!(
            path = %dir.display(),
            episode = metadata.episode,
            epsilon = agent.epsilon(),
            "checkpoint restored"
        );
        Ok(metadata)
    }

    /// Restore `agent` from whatever `latest` points at.
    pub fn restore_latest(
        &self,
        agent: &mut DqnAgent,
    ) -> Result<CheckpointMetadata, CheckpointError> {
        let target = self.latest_path()?;
        self.restore(agent, &target)
    }

    /// Resolve the `latest` symlink.
    pub fn latest_path(&self) -> Result<PathBuf, CheckpointError> {
        let latest_link = self.config.checkpoint_dir.join(LATEST_LINK);
        if latest_link.symlink_metadata().is_err() {
            return Err(CheckpointError::NoLatestSymlink(
                self.config.checkpoint_dir.clone(),
            ));
        }
        let resolved = fs::read_link(&latest_link)?;
        Ok(if resolved.is_relative() {
            self.config.checkpoint_dir.join(resolved)
        } else {
            resolved
        })
    }

    /// List all checkpoints sorted by episode (ascending).
    pub fn list_checkpoints(
        &self,
    ) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            if path.join(METADATA_FILE).exists() {
                let metadata = self.read_metadata(&path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.episode);
        Ok(results)
    }

    /// Prune old checkpoints, keeping the union of the last N and best N by win_rate.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: HashSet<usize> =
            (total.saturating_sub(self.config.keep_last_n)..total).collect();

        let mut by_win_rate: Vec<(usize, f32)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, (_, m))| (i, m.metrics.win_rate))
            .collect();
        by_win_rate.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        for (i, _) in by_win_rate.iter().take(self.config.keep_best_n) {
            keep.insert(*i);
        }

        for (i, (path, _)) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                debug!(path = %path.display(), "pruning checkpoint");
                fs::remove_dir_all(path)?;
            }
        }

        Ok(())
    }

    /// Point the `latest` symlink at the given checkpoint directory name.
    fn update_latest_symlink(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.config.checkpoint_dir.join(LATEST_LINK);
        if link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::algorithms::DqnConfig;
    use crate::checkpoint::CheckpointMetrics;
    use crate::game::Board;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn agent() -> DqnAgent {
        let config = DqnConfig {
            batch_size: 4,
            memory_capacity: 16,
            ..Default::default()
        };
        DqnAgent::new(config, StdRng::seed_from_u64(1), StdRng::seed_from_u64(2))
    }

    fn metadata(episode: usize, win_rate: f32) -> CheckpointMetadata {
        CheckpointMetadata {
            episode,
            timestamp: 1_700_000_000,
            model_id: format!("QNetwork_{episode}"),
            network: "QNetwork".to_string(),
            total_steps: episode * 20,
            scheduler_steps: episode,
            metrics: CheckpointMetrics {
                win_rate,
                ..Default::default()
            },
            hyperparameters: DqnConfig::default(),
        }
    }

    fn manager(dir: &Path, keep_last_n: usize, keep_best_n: usize) -> CheckpointManager {
        CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.to_path_buf(),
            keep_last_n,
            keep_best_n,
        })
        .unwrap()
    }

    #[test]
    fn test_save_and_restore_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let mut agent = agent();
        agent.act(&Board::new(), &[0, 1], 5_000, true).unwrap();

        let path = manager.save(&agent, &metadata(1000, 0.5)).unwrap();
        assert!(path.ends_with("checkpoint_0001000"));
        assert!(path.join("metadata.json").exists());
        assert!(path.join("training_state.json").exists());
        assert!(path.join("policy.mpk").exists());
        assert!(path.join("target.mpk").exists());
        assert!(!dir.path().join("checkpoint_0001000.tmp").exists());

        let mut restored = self::agent();
        let meta = manager.restore(&mut restored, &path).unwrap();
        assert_eq!(meta.episode, 1000);
        assert_eq!(restored.steps(), 5_000);
        assert!((restored.epsilon() - agent.epsilon()).abs() < 1e-12);
    }

    #[test]
    fn test_restore_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let mut agent = agent();
        let err = manager
            .restore(&mut agent, &dir.path().join("checkpoint_0000042"))
            .unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[test]
    fn test_latest_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let agent = agent();

        manager.save(&agent, &metadata(1000, 0.5)).unwrap();
        manager.save(&agent, &metadata(2000, 0.5)).unwrap();

        assert!(manager.latest_path().unwrap().ends_with("checkpoint_0002000"));
        let mut restored = self::agent();
        let latest = manager.restore_latest(&mut restored).unwrap();
        assert_eq!(latest.episode, 2000);
    }

    #[test]
    fn test_list_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10, 10);
        let agent = agent();

        for ep in [3000, 1000, 2000] {
            manager.save(&agent, &metadata(ep, 0.5)).unwrap();
        }

        let list = manager.list_checkpoints().unwrap();
        let episodes: Vec<usize> = list.iter().map(|(_, m)| m.episode).collect();
        assert_eq!(episodes, vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 2, 1);
        let agent = agent();

        // Save 5 checkpoints with varying win rates
        let win_rates = [0.5, 0.9, 0.3, 0.6, 0.7];
        for (i, &wr) in win_rates.iter().enumerate() {
            manager.save(&agent, &metadata((i + 1) * 1000, wr)).unwrap();
        }

        // Keeps the last 2 (4000, 5000) and the best 1 (2000, wr=0.9)
        let list = manager.list_checkpoints().unwrap();
        let episodes: Vec<usize> = list.iter().map(|(_, m)| m.episode).collect();
        assert_eq!(episodes, vec![2000, 4000, 5000]);
    }

    #[test]
    fn test_load_latest_no_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let mut agent = agent();

        let err = manager.restore_latest(&mut agent).unwrap_err();
        assert!(
            matches!(err, CheckpointError::NoLatestSymlink(_)),
            "expected NoLatestSymlink, got: {err}"
        );
    }
}
