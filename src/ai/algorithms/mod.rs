mod dqn;

pub use dqn::{
    bootstrap_target, greedy_action, next_value, DqnAgent, DqnConfig, EpsilonConfig,
    InferenceGuard, TargetUpdateConfig, TargetUpdateMode,
};
