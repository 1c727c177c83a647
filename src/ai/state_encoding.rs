use burn::prelude::*;
use burn::tensor::TensorData;

use crate::game::{Board, Cell, COLS, ROWS};

/// Input channels fed to the value estimator.
pub const CHANNELS: usize = 2;

const PLANE: usize = ROWS * COLS;

/// Encode a board as a tensor of shape [1, 2, 6, 7].
///
/// Channels are absolute, not relative to the player to move:
/// channel 0 marks player one's counters and channel 1 player two's.
pub fn encode_board<B: Backend>(board: &Board, device: &B::Device) -> Tensor<B, 4> {
    encode_boards(std::slice::from_ref(board), device)
}

/// Encode multiple boards as a batched tensor of shape [batch, 2, 6, 7].
pub fn encode_boards<B: Backend>(boards: &[Board], device: &B::Device) -> Tensor<B, 4> {
    let batch_size = boards.len();
    let mut flat = Vec::with_capacity(batch_size * CHANNELS * PLANE);
    for board in boards {
        flat.extend_from_slice(&encode_board_flat(board));
    }
    Tensor::<B, 1>::from_data(TensorData::from(flat.as_slice()), device).reshape([
        batch_size,
        CHANNELS,
        ROWS,
        COLS,
    ])
}

/// Produce the flat [84] f32 array for a single board.
fn encode_board_flat(board: &Board) -> [f32; CHANNELS * PLANE] {
    let mut data = [0.0f32; CHANNELS * PLANE];
    for row in 0..ROWS {
        for col in 0..COLS {
            let idx = row * COLS + col;
            match board.get(row, col) {
                Cell::One => data[idx] = 1.0,
                Cell::Two => data[PLANE + idx] = 1.0,
                Cell::Empty => {}
            }
        }
    }
    data
}
