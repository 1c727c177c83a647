//! Agents and the value estimator behind them.

mod agent;
pub mod algorithms;
pub mod estimator;
pub mod networks;
pub mod optim;
mod random;
pub mod state_encoding;

pub use agent::Agent;
pub use algorithms::{DqnAgent, DqnConfig};
pub use estimator::ValueEstimator;
pub use random::RandomAgent;
