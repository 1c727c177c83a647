use tracing::debug;

use super::board::Board;
use super::player::Player;
use crate::error::MoveError;

/// Counters that must be on the board before the prolongation penalty applies.
pub const PROLONGATION_THRESHOLD: usize = 8;

/// Reward constants shared by the environment, reward shaping and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub win: f32,
    pub loss: f32,
    pub draw: f32,
    pub prolongation: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            win: 1.0,
            loss: -1.0,
            draw: 0.0,
            prolongation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub rewards: RewardConfig,
}

/// Result of one accepted move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub board: Board,
    pub reward: f32,
    pub done: bool,
}

/// Connect Four environment.
///
/// Turns are never switched automatically: callers invoke [`switch_turn`]
/// after a non-terminal step when the other side should move.
///
/// [`switch_turn`]: ConnectFourEnv::switch_turn
#[derive(Debug, Clone)]
pub struct ConnectFourEnv {
    board: Board,
    turn: Player,
    done: bool,
    winner: Option<Player>,
    rewards: RewardConfig,
}

impl ConnectFourEnv {
    pub fn new(config: EnvConfig) -> Self {
        ConnectFourEnv {
            board: Board::new(),
            turn: Player::One,
            done: false,
            winner: None,
            rewards: config.rewards,
        }
    }

    /// Clear the board and hand the move to player one.
    pub fn reset(&mut self) -> Board {
        self.board = Board::new();
        self.turn = Player::One;
        self.done = false;
        self.winner = None;
        self.board
    }

    pub fn valid_actions(&self) -> Vec<usize> {
        self.board.valid_actions()
    }

    /// Drop the current player's counter into `action`.
    ///
    /// The whole board is rescanned for a four-in-a-row after every move; a
    /// found line always belongs to the mover.
    pub fn step(&mut self, action: usize) -> Result<StepOutcome, MoveError> {
        if self.done {
            return Err(MoveError::GameOver);
        }
        self.board.drop_piece(action, self.turn.to_cell())?;

        if self.board.has_connect_four() {
            self.done = true;
            self.winner = Some(self.turn);
            debug!(winner = self.turn.mark(), "game won");
        } else if self.board.is_full() {
            self.done = true;
            debug!("game drawn");
        }

        Ok(StepOutcome {
            board: self.board,
            reward: self.reward(),
            done: self.done,
        })
    }

    pub fn switch_turn(&mut self) {
        self.turn = self.turn.other();
    }

    fn reward(&self) -> f32 {
        match (self.done, self.winner) {
            (true, Some(_)) => self.rewards.win,
            (true, None) => self.rewards.draw,
            (false, _) if self.board.piece_count() > PROLONGATION_THRESHOLD => {
                self.rewards.prolongation
            }
            (false, _) => 0.0,
        }
    }

    pub fn board(&self) -> Board {
        self.board
    }

    pub fn turn(&self) -> Player {
        self.turn
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Cell, COLS, ROWS};

    fn shaped_env() -> ConnectFourEnv {
        ConnectFourEnv::new(EnvConfig {
            rewards: RewardConfig {
                win: 1.0,
                loss: -1.0,
                draw: 0.5,
                prolongation: -0.01,
            },
        })
    }

    /// Play `moves` alternating turns; returns the last outcome.
    fn play(env: &mut ConnectFourEnv, moves: &[usize]) -> StepOutcome {
        let mut last = None;
        for &col in moves {
            let outcome = env.step(col).unwrap();
            if !outcome.done {
                env.switch_turn();
            }
            last = Some(outcome);
        }
        last.unwrap()
    }

    #[test]
    fn test_reset_returns_empty_board() {
        let mut env = shaped_env();
        env.step(0).unwrap();
        let board = env.reset();
        assert_eq!(board, Board::new());
        assert_eq!(env.turn(), Player::One);
        assert!(!env.is_done());
        assert_eq!(env.winner(), None);
    }

    #[test]
    fn test_step_changes_exactly_one_cell() {
        let mut env = shaped_env();
        play(&mut env, &[2, 2, 5]);
        let before = env.board();
        let turn = env.turn();
        let outcome = env.step(2).unwrap();

        let mut changed = Vec::new();
        for row in 0..ROWS {
            for col in 0..COLS {
                if before.get(row, col) != outcome.board.get(row, col) {
                    changed.push((row, col));
                }
            }
        }
        assert_eq!(changed, vec![(3, 2)]);
        assert_eq!(before.get(3, 2), Cell::Empty);
        assert_eq!(outcome.board.get(3, 2), turn.to_cell());
    }

    #[test]
    fn test_step_does_not_switch_turn() {
        let mut env = shaped_env();
        env.step(0).unwrap();
        assert_eq!(env.turn(), Player::One);
        env.switch_turn();
        assert_eq!(env.turn(), Player::Two);
    }

    #[test]
    fn test_returned_board_is_a_snapshot() {
        let mut env = shaped_env();
        let first = env.step(0).unwrap().board;
        env.switch_turn();
        env.step(0).unwrap();
        assert_eq!(first.piece_count(), 1);
        assert_eq!(env.board().piece_count(), 2);
    }

    #[test]
    fn test_horizontal_win_sets_winner_to_mover() {
        let mut env = shaped_env();
        let outcome = play(&mut env, &[0, 0, 1, 1, 2, 2, 3]);
        assert!(outcome.done);
        assert_eq!(outcome.reward, 1.0);
        assert_eq!(env.winner(), Some(Player::One));
    }

    #[test]
    fn test_vertical_win_for_second_player() {
        let mut env = shaped_env();
        let outcome = play(&mut env, &[0, 6, 1, 6, 0, 6, 1, 6]);
        assert!(outcome.done);
        assert_eq!(env.winner(), Some(Player::Two));
    }

    #[test]
    fn test_diagonal_win() {
        let mut env = shaped_env();
        // One builds / from (5,0) to (2,3)
        let outcome = play(&mut env, &[0, 1, 1, 2, 2, 3, 2, 3, 3, 6, 3]);
        assert!(outcome.done);
        assert_eq!(env.winner(), Some(Player::One));
    }

    #[test]
    fn test_anti_diagonal_win() {
        let mut env = shaped_env();
        // One builds \ from (2,3) to (5,6)
        let outcome = play(&mut env, &[6, 5, 5, 4, 4, 3, 4, 3, 3, 0, 3]);
        assert!(outcome.done);
        assert_eq!(env.winner(), Some(Player::One));
    }

    #[test]
    fn test_no_four_leaves_game_running() {
        let mut env = shaped_env();
        let outcome = play(&mut env, &[0, 1, 2]);
        assert!(!outcome.done);
        assert_eq!(env.winner(), None);
    }

    #[test]
    fn test_draw_on_full_board() {
        let mut env = shaped_env();
        // Column pairs (0,1), (2,3), (4,5) filled in a pattern that never lines
        // up four, then column 6.
        let mut moves = Vec::new();
        for pair in [(0, 1), (2, 3), (4, 5)] {
            for _ in 0..3 {
                moves.push(pair.0);
                moves.push(pair.1);
            }
            for _ in 0..3 {
                moves.push(pair.1);
                moves.push(pair.0);
            }
        }
        moves.extend([6; 6]);
        let outcome = play(&mut env, &moves);
        assert!(outcome.done);
        assert!(outcome.board.is_full());
        assert_eq!(env.winner(), None);
        assert_eq!(outcome.reward, 0.5);
    }

    #[test]
    fn test_prolongation_penalty_after_eight_counters() {
        let mut env = shaped_env();
        let eighth = play(&mut env, &[0, 1, 2, 3, 4, 5, 6, 0]);
        assert_eq!(eighth.reward, 0.0);
        let ninth = env.step(1).unwrap();
        assert!(!ninth.done);
        assert_eq!(ninth.reward, -0.01);
    }

    #[test]
    fn test_invalid_moves_are_rejected() {
        let mut env = shaped_env();
        assert_eq!(env.step(COLS), Err(MoveError::InvalidColumn(COLS)));
        for _ in 0..ROWS {
            env.step(3).unwrap();
            env.switch_turn();
        }
        assert_eq!(env.step(3), Err(MoveError::ColumnFull(3)));
        assert!(!env.valid_actions().contains(&3));
    }

    #[test]
    fn test_step_after_game_over_fails() {
        let mut env = shaped_env();
        play(&mut env, &[0, 1, 0, 1, 0, 1, 0]);
        assert!(env.is_done());
        assert_eq!(env.step(4), Err(MoveError::GameOver));
        assert_eq!(env.winner(), Some(Player::One));
    }
}
