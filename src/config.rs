use std::path::Path;

use tracing::warn;

use crate::ai::algorithms::{DqnConfig, TargetUpdateMode};
use crate::ai::optim::SchedulerKind;
use crate::error::ConfigError;
use crate::game::EnvConfig;
use crate::training::evaluator::EvalConfig;
use crate::training::trainer::TrainerConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base seed for every random stream; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub env: EnvConfig,
    pub agent: DqnConfig,
    pub training: TrainerConfig,
    pub eval: EvalConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            seed: Some(29),
            env: EnvConfig::default(),
            agent: DqnConfig::default(),
            training: TrainerConfig::default(),
            eval: EvalConfig::default(),
        }
    }
}

fn invalid(msg: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(msg.into()))
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let agent = &self.agent;
        if agent.optimizer.learning_rate <= 0.0 {
            return invalid("agent.optimizer.learning_rate must be > 0");
        }
        if agent.batch_size == 0 {
            return invalid("agent.batch_size must be > 0");
        }
        if agent.memory_capacity < agent.batch_size {
            return invalid("agent.memory_capacity must be >= agent.batch_size");
        }
        if !(0.0..=1.0).contains(&agent.gamma) {
            return invalid("agent.gamma must be in [0, 1]");
        }

        // Epsilon schedule
        let eps = &agent.epsilon;
        if !(0.0..=1.0).contains(&eps.start) {
            return invalid("agent.epsilon.start must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&eps.end) {
            return invalid("agent.epsilon.end must be in [0, 1]");
        }
        if eps.end > eps.start {
            return invalid("agent.epsilon.end must be <= agent.epsilon.start");
        }
        if eps.decay <= 0.0 {
            return invalid("agent.epsilon.decay must be > 0");
        }

        let target = &agent.target_update;
        match target.mode {
            TargetUpdateMode::Soft if target.tau <= 0.0 || target.tau > 1.0 => {
                return invalid("agent.target_update.tau must be in (0, 1]");
            }
            TargetUpdateMode::Hard if target.period == 0 => {
                return invalid("agent.target_update.period must be > 0");
            }
            _ => {}
        }
        if let Some(clip) = &agent.clip_grads {
            if clip.threshold <= 0.0 {
                return invalid("agent.clip_grads.threshold must be > 0");
            }
        }

        let training = &self.training;
        if training.episodes == 0 {
            return invalid("training.episodes must be > 0");
        }
        if training.display_period == 0 {
            return invalid("training.display_period must be > 0");
        }
        if training.checkpoint.save_every == Some(0) {
            return invalid("training.checkpoint.save_every must be > 0");
        }
        if let Some(scheduler) = &training.scheduler {
            if scheduler.kind == SchedulerKind::MultiStep && scheduler.gamma <= 0.0 {
                return invalid("training.scheduler.gamma must be > 0");
            }
        }

        if self.eval.period == 0 {
            return invalid("eval.period must be > 0");
        }
        if self.eval.episodes == 0 {
            return invalid("eval.episodes must be > 0");
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::optim::{CriterionKind, OptimizerKind};
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_defaults_match_reference_run() {
        let config = AppConfig::default();
        assert_eq!(config.seed, Some(29));
        assert_eq!(config.agent.batch_size, 512);
        assert_eq!(config.agent.memory_capacity, 1_250_000);
        assert!(config.agent.double);
        assert_eq!(config.agent.optimizer.kind, OptimizerKind::Sgd);
        assert_eq!(config.agent.criterion.kind, CriterionKind::Huber);
        assert_eq!(config.training.checkpoint.save_every, Some(20_000));
        assert_eq!(config.eval.period, 25);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[agent.optimizer]
kind = "adam"
learning_rate = 0.001
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.agent.optimizer.learning_rate - 0.001).abs() < 1e-9);
        assert_eq!(config.agent.optimizer.kind, OptimizerKind::Adam);
        // Other fields should be defaults
        assert!((config.agent.gamma - 0.99).abs() < 1e-6);
        assert_eq!(config.training.episodes, 50_000);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_hard_update_section() {
        let toml_str = r#"
[agent.target_update]
mode = "hard"
period = 10

[agent.clip_grads]
kind = "value"
threshold = 0.5
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.target_update.mode, TargetUpdateMode::Hard);
        assert_eq!(config.agent.target_update.period, 10);
        assert!(config.agent.clip_grads.is_some());
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_zero_episodes() {
        let mut config = AppConfig::default();
        config.training.episodes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_lr() {
        let mut config = AppConfig::default();
        config.agent.optimizer.learning_rate = -0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_invalid_gamma() {
        let mut config = AppConfig::default();
        config.agent.gamma = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_epsilon_end_gt_start() {
        let mut config = AppConfig::default();
        config.agent.epsilon.start = 0.1;
        config.agent.epsilon.end = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_epsilon_out_of_range() {
        let mut config = AppConfig::default();
        config.agent.epsilon.start = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.epsilon.decay = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_capacity_lt_batch() {
        let mut config = AppConfig::default();
        config.agent.memory_capacity = 10;
        config.agent.batch_size = 64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_tau() {
        let mut config = AppConfig::default();
        config.agent.target_update.tau = 0.0;
        assert!(config.validate().is_err());
        config.agent.target_update.tau = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_periods() {
        let mut config = AppConfig::default();
        config.eval.period = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.target_update.mode = TargetUpdateMode::Hard;
        config.agent.target_update.period = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.training.checkpoint.save_every = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.training.episodes, 50_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
seed = 7

[training]
episodes = 500

[env.rewards]
prolongation = -0.05
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.training.episodes, 500);
        assert!((config.env.rewards.prolongation + 0.05).abs() < 1e-6);
        // Others are defaults
        assert!((config.agent.optimizer.learning_rate - 1e-2).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[eval]\nperiod = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml().unwrap();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
        assert_eq!(config.agent, AppConfig::default().agent);
    }
}
