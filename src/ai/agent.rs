use crate::error::TrainingError;
use crate::game::Board;

/// A move-picking opponent. Implementations choose a column for the side to
/// move on `board`; `valid_actions` lists the columns that still have room.
pub trait Agent {
    fn select_action(
        &mut self,
        board: &Board,
        valid_actions: &[usize],
    ) -> Result<usize, TrainingError>;

    /// Display name used in logs.
    fn name(&self) -> &str;
}
