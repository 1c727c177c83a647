//! Core Connect Four game logic: board representation, players and the
//! training environment with its reward policy.

mod board;
mod env;
mod player;

pub use board::{Board, Cell, COLS, ROWS};
pub use env::{ConnectFourEnv, EnvConfig, RewardConfig, StepOutcome, PROLONGATION_THRESHOLD};
pub use player::Player;
