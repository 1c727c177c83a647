use crate::error::MoveError;

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// Number of aligned counters that wins the game.
const CONNECT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    One,
    Two,
}

impl Cell {
    /// Raw cell value: 0 empty, 1 first player, 2 second player.
    pub fn value(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::One => 1,
            Cell::Two => 2,
        }
    }

    /// Any value other than 1 or 2 reads as empty.
    pub fn from_value(value: u8) -> Cell {
        match value {
            1 => Cell::One,
            2 => Cell::Two,
            _ => Cell::Empty,
        }
    }
}

/// A 6x7 Connect Four grid. Row 0 is the top, row 5 the bottom.
///
/// `Board` is `Copy`: every board handed out by the environment or stored in a
/// transition is an independent snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [[Cell; COLS]; ROWS],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Board {
            cells: [[Cell::Empty; COLS]; ROWS],
        }
    }

    /// Build a board from raw 0/1/2 rows, top row first.
    pub fn from_rows(rows: &[[u8; COLS]; ROWS]) -> Self {
        let mut board = Board::new();
        for (row, values) in rows.iter().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                board.cells[row][col] = Cell::from_value(value);
            }
        }
        board
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    /// Check if a column is full. Out-of-range columns count as full.
    pub fn is_column_full(&self, col: usize) -> bool {
        if col >= COLS {
            return true;
        }
        self.cells[0][col] != Cell::Empty
    }

    /// Columns with an empty top cell, in ascending order.
    pub fn valid_actions(&self) -> Vec<usize> {
        (0..COLS).filter(|&col| !self.is_column_full(col)).collect()
    }

    /// Drop a piece in a column, returns the row where it landed
    pub fn drop_piece(&mut self, col: usize, cell: Cell) -> Result<usize, MoveError> {
        if col >= COLS {
            return Err(MoveError::InvalidColumn(col));
        }
        if self.is_column_full(col) {
            return Err(MoveError::ColumnFull(col));
        }

        let row = (0..ROWS)
            .rev()
            .find(|&row| self.cells[row][col] == Cell::Empty)
            .ok_or(MoveError::ColumnFull(col))?;
        self.cells[row][col] = cell;
        Ok(row)
    }

    pub fn is_full(&self) -> bool {
        (0..COLS).all(|col| self.is_column_full(col))
    }

    /// Number of counters on the board.
    pub fn piece_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell != Cell::Empty)
            .count()
    }

    /// Scan every window origin for four aligned, equal, non-empty cells.
    ///
    /// Directions are checked horizontally, vertically, diagonally (`/`) and
    /// anti-diagonally (`\`).
    pub fn has_connect_four(&self) -> bool {
        const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (-1, 1), (1, 1)];

        for row in 0..ROWS {
            for col in 0..COLS {
                let cell = self.cells[row][col];
                if cell == Cell::Empty {
                    continue;
                }
                for &(dr, dc) in &DIRECTIONS {
                    if self.line_matches(row, col, dr, dc, cell) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn line_matches(&self, row: usize, col: usize, dr: isize, dc: isize, cell: Cell) -> bool {
        (1..CONNECT).all(|step| {
            let r = row as isize + dr * step as isize;
            let c = col as isize + dc * step as isize;
            r >= 0
                && c >= 0
                && (r as usize) < ROWS
                && (c as usize) < COLS
                && self.cells[r as usize][c as usize] == cell
        })
    }
}
