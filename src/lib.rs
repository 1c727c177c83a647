//! # Connect Four DQN
//!
//! Trains a Connect Four agent with (Double) Deep Q-Learning on the Burn ML
//! framework and exports the learned policy.
//!
//! ## Modules
//!
//! - [`game`]: Board, players and the training environment
//! - [`ai`]: DQN agent, value estimator, networks, optimizers, state encoding
//! - [`training`]: Episode loop, replay buffer, evaluator, tactical probes
//! - [`checkpoint`]: Checkpoints, resume and policy export
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
