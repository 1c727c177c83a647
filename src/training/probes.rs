//! Fixed tactical positions used to probe a policy during evaluation.
//!
//! A "finish" position has exactly one column that wins immediately for the
//! side to move. A "block" position has exactly one column that stops the
//! opponent from winning on their next move.

use crate::error::TrainingError;
use crate::game::{Board, Player, COLS, ROWS};

/// A position with a single correct reply.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// Rows from top to bottom.
    pub rows: [[u8; COLS]; ROWS],
    /// Side to move.
    pub mover: Player,
    /// The correct column.
    pub answer: usize,
}

impl Probe {
    pub fn board(&self) -> Board {
        Board::from_rows(&self.rows)
    }
}

const EMPTY: [u8; COLS] = [0; COLS];

pub const FINISH_PROBES: [Probe; 6] = [
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            EMPTY,
            [2, 2, 2, 0, 0, 0, 0],
            [1, 1, 1, 0, 0, 0, 0],
        ],
        mover: Player::One,
        answer: 3,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            [0, 0, 0, 0, 1, 0, 0],
            [2, 0, 0, 0, 1, 0, 0],
            [2, 2, 0, 0, 1, 0, 0],
        ],
        mover: Player::One,
        answer: 4,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            [0, 0, 1, 2, 0, 0, 0],
            [0, 1, 2, 2, 0, 0, 0],
            [1, 2, 2, 1, 0, 0, 1],
        ],
        mover: Player::One,
        answer: 3,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            EMPTY,
            [2, 2, 0, 0, 0, 0, 0],
            [1, 1, 0, 1, 0, 0, 2],
        ],
        mover: Player::One,
        answer: 2,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            [1, 0, 0, 0, 0, 0, 0],
            [2, 1, 0, 0, 0, 0, 0],
            [1, 2, 1, 0, 0, 0, 0],
            [2, 1, 2, 0, 0, 0, 2],
        ],
        mover: Player::One,
        answer: 3,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            [0, 0, 0, 0, 0, 2, 0],
            [0, 0, 0, 0, 0, 2, 1],
            [1, 1, 0, 0, 0, 2, 1],
        ],
        mover: Player::Two,
        answer: 5,
    },
];

pub const BLOCK_PROBES: [Probe; 6] = [
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            EMPTY,
            [0, 0, 0, 0, 0, 0, 1],
            [2, 2, 2, 0, 0, 1, 1],
        ],
        mover: Player::One,
        answer: 3,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            [0, 0, 1, 0, 0, 0, 0],
            [0, 0, 1, 0, 0, 0, 0],
            [0, 0, 1, 2, 2, 0, 0],
        ],
        mover: Player::Two,
        answer: 2,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            [0, 0, 0, 0, 0, 1, 1],
            [0, 0, 0, 0, 1, 2, 2],
            [0, 0, 0, 1, 2, 2, 1],
        ],
        mover: Player::Two,
        answer: 6,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            EMPTY,
            [0, 1, 1, 0, 0, 0, 0],
            [0, 2, 2, 0, 2, 0, 1],
        ],
        mover: Player::One,
        answer: 3,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            [1, 0, 0, 0, 0, 0, 0],
            [2, 1, 0, 0, 0, 0, 0],
            [1, 2, 1, 0, 0, 0, 0],
            [2, 1, 2, 0, 0, 0, 0],
        ],
        mover: Player::Two,
        answer: 3,
    },
    Probe {
        rows: [
            EMPTY,
            EMPTY,
            EMPTY,
            [2, 0, 0, 0, 0, 0, 0],
            [2, 0, 0, 0, 0, 0, 1],
            [2, 1, 0, 0, 0, 0, 1],
        ],
        mover: Player::One,
        answer: 0,
    },
];

/// Percentage (0..=100) of probes where `choose` returns the correct column.
///
/// `choose` receives the probe board and its valid columns.
pub fn score_probes<F>(probes: &[Probe], mut choose: F) -> Result<f32, TrainingError>
where
    F: FnMut(&Board, &[usize]) -> Result<usize, TrainingError>,
{
    if probes.is_empty() {
        return Ok(0.0);
    }
    let mut hits = 0;
    for probe in probes {
        let board = probe.board();
        let valid = board.valid_actions();
        if choose(&board, &valid)? == probe.answer {
            hits += 1;
        }
    }
    Ok(hits as f32 / probes.len() as f32 * 100.0)
}
