//! Four-in-a-row board engine.
//!
//! Pure state machine: no I/O, no locking. Columns fill from the bottom, so
//! row 0 is the bottom row and a column's occupied cells are always
//! `0..height(column)`.

use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::player::{Player, PLAYER1};

pub const ROWS: usize = 6;
pub const COLUMNS: usize = 7;

/// Pieces in a line needed to win.
const WIN_LENGTH: usize = 4;

/// Horizontal, vertical and the two diagonals. The opposite direction of each
/// is walked by negating the step.
const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// An applied move. The row is always derived by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub player: Player,
    pub column: usize,
    pub row: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    /// `grid[column][row]`, row 0 at the bottom.
    grid: [[Option<Player>; ROWS]; COLUMNS],
    heights: [usize; COLUMNS],
    moves: Vec<Move>,
    next: Player,
    winner: Option<Player>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self {
            grid: [[None; ROWS]; COLUMNS],
            heights: [0; COLUMNS],
            moves: Vec::new(),
            next: PLAYER1,
            winner: None,
        }
    }

    /// Rebuild a game by playing a move log in order.
    ///
    /// Fails if any move is illegal or lands on a different row than logged.
    pub fn replay(moves: &[Move]) -> Result<Self, GameError> {
        let mut game = Self::new();
        for (index, mv) in moves.iter().enumerate() {
            let row = game.play(mv.player, mv.column)?;
            if row != mv.row {
                return Err(GameError::ReplayDiverged { index });
            }
        }
        Ok(game)
    }

    /// Drop a piece for `player` into `column` and return the row it landed on.
    ///
    /// A failed call leaves the game untouched.
    pub fn play(&mut self, player: Player, column: usize) -> Result<usize, GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        if column >= COLUMNS {
            return Err(GameError::InvalidColumn(
                i64::try_from(column).unwrap_or(i64::MAX),
            ));
        }
        if player != self.next {
            return Err(GameError::OutOfTurn);
        }
        let row = self.heights[column];
        if row >= ROWS {
            return Err(GameError::ColumnFull);
        }

        self.grid[column][row] = Some(player);
        self.heights[column] = row + 1;
        self.moves.push(Move { player, column, row });
        self.next = player.opponent();

        if self.wins_through(column, row, player) {
            self.winner = Some(player);
        }
        Ok(row)
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<Player> {
        self.grid.get(column)?.get(row).copied().flatten()
    }

    /// Number of pieces in `column` (0 for out-of-range columns).
    pub fn height(&self, column: usize) -> usize {
        self.heights.get(column).copied().unwrap_or(0)
    }

    /// The append-only move log, oldest first.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn next_player(&self) -> Player {
        self.next
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn is_full(&self) -> bool {
        self.moves.len() == ROWS * COLUMNS
    }

    /// Won or drawn. No further moves are accepted.
    pub fn is_over(&self) -> bool {
        self.winner.is_some() || self.is_full()
    }

    /// Whether `player`'s piece at (`column`, `row`) completes a line.
    /// Only lines through that cell are inspected.
    fn wins_through(&self, column: usize, row: usize, player: Player) -> bool {
        DIRECTIONS.iter().any(|&(dc, dr)| {
            let forward = self.run_length(column, row, dc, dr, player);
            let backward = self.run_length(column, row, -dc, -dr, player);
            1 + forward + backward >= WIN_LENGTH
        })
    }

    /// Consecutive `player` pieces from the cell next to the origin along (dc, dr).
    fn run_length(&self, column: usize, row: usize, dc: isize, dr: isize, player: Player) -> usize {
        let mut count = 0;
        let mut c = column as isize + dc;
        let mut r = row as isize + dr;
        while count < WIN_LENGTH - 1 && self.owner(c, r) == Some(player) {
            count += 1;
            c += dc;
            r += dr;
        }
        count
    }

    fn owner(&self, column: isize, row: isize) -> Option<Player> {
        let column = usize::try_from(column).ok()?;
        let row = usize::try_from(row).ok()?;
        self.cell(column, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PLAYER2;
    use proptest::prelude::*;

    fn play_all(game: &mut Game, columns: &[usize]) {
        for &column in columns {
            let player = game.next_player();
            game.play(player, column).unwrap();
        }
    }

    fn assert_gravity(game: &Game) {
        for column in 0..COLUMNS {
            let height = game.height(column);
            assert!(height <= ROWS);
            for row in 0..ROWS {
                assert_eq!(game.cell(column, row).is_some(), row < height, "gap at {column},{row}");
            }
        }
    }

    #[test]
    fn new_game_is_empty() {
        let game = Game::new();
        assert!(game.moves().is_empty());
        assert_eq!(game.next_player(), PLAYER1);
        assert_eq!(game.winner(), None);
        assert!(!game.is_over());
    }

    #[test]
    fn pieces_stack_from_the_bottom() {
        let mut game = Game::new();
        assert_eq!(game.play(PLAYER1, 0), Ok(0));
        assert_eq!(game.play(PLAYER2, 0), Ok(1));
        assert_eq!(game.play(PLAYER1, 0), Ok(2));
        assert_eq!(game.cell(0, 0), Some(PLAYER1));
        assert_eq!(game.cell(0, 1), Some(PLAYER2));
        assert_eq!(game.height(0), 3);
    }

    #[test]
    fn turns_alternate() {
        let mut game = Game::new();
        game.play(PLAYER1, 3).unwrap();
        assert_eq!(game.next_player(), PLAYER2);
        game.play(PLAYER2, 3).unwrap();
        assert_eq!(game.next_player(), PLAYER1);
    }

    #[test]
    fn out_of_turn_leaves_state_unchanged() {
        let mut game = Game::new();
        let before = game.clone();
        assert_eq!(game.play(PLAYER2, 0), Err(GameError::OutOfTurn));
        assert_eq!(game, before);

        game.play(PLAYER1, 0).unwrap();
        let before = game.clone();
        assert_eq!(game.play(PLAYER1, 1), Err(GameError::OutOfTurn));
        assert_eq!(game, before);
    }

    #[test]
    fn invalid_column_rejected() {
        let mut game = Game::new();
        assert_eq!(game.play(PLAYER1, COLUMNS), Err(GameError::InvalidColumn(7)));
        assert_eq!(game.play(PLAYER1, 100), Err(GameError::InvalidColumn(100)));
        assert!(game.moves().is_empty());
    }

    #[test]
    fn huge_column_saturates_in_error() {
        let mut game = Game::new();
        let before = game.clone();
        assert_eq!(
            game.play(PLAYER1, usize::MAX),
            Err(GameError::InvalidColumn(i64::MAX))
        );
        assert_eq!(game, before);
    }

    #[test]
    fn full_column_rejected() {
        let mut game = Game::new();
        play_all(&mut game, &[2, 2, 2, 2, 2, 2]);
        let before = game.clone();
        let next = game.next_player();
        assert_eq!(game.play(next, 2), Err(GameError::ColumnFull));
        assert_eq!(game, before);
    }

    #[test]
    fn vertical_win() {
        let mut game = Game::new();
        // red stacks column 0, yellow answers in column 1
        play_all(&mut game, &[0, 1, 0, 1, 0, 1]);
        assert_eq!(game.winner(), None);
        assert_eq!(game.play(PLAYER1, 0), Ok(3));
        assert_eq!(game.winner(), Some(PLAYER1));
    }

    #[test]
    fn horizontal_win_filled_from_the_middle() {
        let mut game = Game::new();
        // red: 0, 1, 3 then 2 closes the gap
        play_all(&mut game, &[0, 0, 1, 1, 3, 3]);
        assert_eq!(game.winner(), None);
        game.play(PLAYER1, 2).unwrap();
        assert_eq!(game.winner(), Some(PLAYER1));
    }

    #[test]
    fn rising_diagonal_win() {
        let mut game = Game::new();
        play_all(&mut game, &[0, 1, 1, 2, 2, 3, 2, 3, 3, 6]);
        assert_eq!(game.winner(), None);
        game.play(PLAYER1, 3).unwrap();
        assert_eq!(game.cell(3, 3), Some(PLAYER1));
        assert_eq!(game.winner(), Some(PLAYER1));
    }

    #[test]
    fn falling_diagonal_win() {
        let mut game = Game::new();
        play_all(&mut game, &[6, 5, 5, 4, 4, 3, 4, 3, 3, 0]);
        assert_eq!(game.winner(), None);
        game.play(PLAYER1, 3).unwrap();
        assert_eq!(game.winner(), Some(PLAYER1));
    }

    #[test]
    fn yellow_can_win() {
        let mut game = Game::new();
        play_all(&mut game, &[0, 6, 1, 6, 0, 6, 1]);
        game.play(PLAYER2, 6).unwrap();
        assert_eq!(game.winner(), Some(PLAYER2));
    }

    #[test]
    fn three_in_a_row_is_not_a_win() {
        let mut game = Game::new();
        play_all(&mut game, &[0, 6, 1, 6, 2]);
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn play_after_win_is_game_over() {
        let mut game = Game::new();
        play_all(&mut game, &[0, 1, 0, 1, 0, 1, 0]);
        assert_eq!(game.winner(), Some(PLAYER1));
        let before = game.clone();
        assert_eq!(game.play(PLAYER2, 4), Err(GameError::GameOver));
        assert_eq!(game.play(PLAYER1, 4), Err(GameError::GameOver));
        assert_eq!(game, before);
    }

    #[test]
    fn full_board_without_winner_is_over() {
        // Column pairs filled in an order that never lines up four.
        let order = [0, 1, 0, 1, 0, 1, 1, 0, 1, 0, 1, 0, 2, 3, 2, 3, 2, 3, 3, 2, 3, 2, 3, 2, 4, 5, 4, 5, 4, 5, 5, 4, 5, 4, 5, 4, 6, 6, 6, 6, 6, 6];
        let mut game = Game::new();
        play_all(&mut game, &order);
        assert!(game.is_full());
        assert_eq!(game.winner(), None);
        assert!(game.is_over());
        let next = game.next_player();
        assert_eq!(game.play(next, 0), Err(GameError::GameOver));
    }

    #[test]
    fn replay_reproduces_board() {
        let mut game = Game::new();
        play_all(&mut game, &[3, 3, 4, 2, 5, 5, 1]);
        let rebuilt = Game::replay(game.moves()).unwrap();
        assert_eq!(rebuilt, game);
    }

    #[test]
    fn replay_detects_diverging_row() {
        let moves = [Move { player: PLAYER1, column: 0, row: 2 }];
        assert_eq!(Game::replay(&moves), Err(GameError::ReplayDiverged { index: 0 }));
    }

    #[test]
    fn cell_out_of_range_is_empty() {
        let game = Game::new();
        assert_eq!(game.cell(COLUMNS, 0), None);
        assert_eq!(game.cell(0, ROWS), None);
        assert_eq!(game.height(COLUMNS), 0);
    }

    proptest! {
        #[test]
        fn gravity_holds_for_any_move_sequence(columns in prop::collection::vec(0..COLUMNS + 1, 0..80)) {
            let mut game = Game::new();
            for column in columns {
                let player = game.next_player();
                let before = game.clone();
                match game.play(player, column) {
                    Ok(row) => {
                        prop_assert_eq!(game.cell(column, row), Some(player));
                        prop_assert_eq!(game.height(column), row + 1);
                    }
                    Err(_) => {
                        prop_assert_eq!(&game, &before);
                    }
                }
                assert_gravity(&game);
            }
        }

        #[test]
        fn replaying_the_log_reproduces_the_grid(columns in prop::collection::vec(0..COLUMNS, 0..60)) {
            let mut game = Game::new();
            for column in columns {
                let player = game.next_player();
                let _ = game.play(player, column);
            }
            let rebuilt = Game::replay(game.moves()).unwrap();
            prop_assert_eq!(rebuilt, game);
        }
    }
}
