//! Authoritative tile board for the capture game
//!
//! This module owns the grid and every rule that changes it:
//! - Two-phase claiming: a tile must be drawn before it can be captured
//! - Release of drawing claims on explicit end-draw or disconnect
//! - Per-player capture scores and end-of-game detection
//!
//! The board has no knowledge of networking or locking. Callers serialize
//! access through the session guard, which makes every check-and-set here
//! atomic with respect to all other board operations.

use shared::PlayerId;

/// State of a single tile. The owner is part of the variant, so a free tile
/// can never carry an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileState {
    #[default]
    Free,
    Drawing(PlayerId),
    Captured(PlayerId),
}

impl TileState {
    pub fn owner(&self) -> Option<PlayerId> {
        match *self {
            TileState::Free => None,
            TileState::Drawing(player) | TileState::Captured(player) => Some(player),
        }
    }
}

/// Grid of tiles plus the running capture score of every player
#[derive(Debug, Clone)]
pub struct TileBoard {
    rows: usize,
    cols: usize,
    /// Row-major, indexed by `y * cols + x`
    tiles: Vec<TileState>,
    /// Captured tile count indexed by player identifier
    scores: Vec<u32>,
}

impl TileBoard {
    /// Creates an all-free board with a score slot for each possible player
    pub fn new(rows: usize, cols: usize, max_players: usize) -> Self {
        Self {
            rows,
            cols,
            tiles: vec![TileState::Free; rows * cols],
            scores: vec![0; max_players],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns true if `x` is a valid column and `y` a valid row
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.cols && y < self.rows
    }

    /// Returns the state of a tile, or None when out of bounds
    pub fn tile(&self, x: usize, y: usize) -> Option<TileState> {
        self.index(x, y).map(|i| self.tiles[i])
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        self.in_bounds(x, y).then(|| y * self.cols + x)
    }

    /// Claims a free tile for drawing
    ///
    /// Succeeds only if the tile is currently free. A tile that is being
    /// drawn or is captured by anyone, the caller included, is left untouched.
    pub fn attempt_draw_tile(&mut self, x: usize, y: usize, player: PlayerId) -> bool {
        if player >= self.scores.len() {
            return false;
        }
        match self.index(x, y) {
            Some(i) if self.tiles[i] == TileState::Free => {
                self.tiles[i] = TileState::Drawing(player);
                true
            }
            _ => false,
        }
    }

    /// Converts the caller's own drawing claim into a capture
    ///
    /// Fails if the tile is free, captured, or being drawn by someone else.
    /// On success the capturer's score goes up. A captured tile can never be
    /// drawn again, so a capture never takes a point from a previous owner.
    pub fn attempt_capture_tile(&mut self, x: usize, y: usize, player: PlayerId) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        if self.tiles[i] != TileState::Drawing(player) {
            return false;
        }

        self.tiles[i] = TileState::Captured(player);
        self.scores[player] += 1;
        true
    }

    /// Returns a tile drawn by `player` to free
    ///
    /// No-op for tiles that are free, captured, out of bounds, or drawn by
    /// another player. Returns whether anything changed.
    pub fn release_tile(&mut self, x: usize, y: usize, player: PlayerId) -> bool {
        match self.index(x, y) {
            Some(i) if self.tiles[i] == TileState::Drawing(player) => {
                self.tiles[i] = TileState::Free;
                true
            }
            _ => false,
        }
    }

    /// Releases every drawing claim held by `player`
    ///
    /// Captured tiles keep their owner. Returns the number of tiles freed.
    pub fn release_player(&mut self, player: PlayerId) -> usize {
        let mut released = 0;
        for y in 0..self.rows {
            for x in 0..self.cols {
                if self.release_tile(x, y, player) {
                    released += 1;
                }
            }
        }
        released
    }

    /// Returns true when no tile is free or being drawn
    pub fn all_tiles_captured(&self) -> bool {
        self.tiles
            .iter()
            .all(|tile| matches!(tile, TileState::Captured(_)))
    }

    /// Current capture counts, indexed by player identifier
    pub fn player_scores(&self) -> Vec<u32> {
        self.scores.clone()
    }

    pub fn captured_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|tile| matches!(tile, TileState::Captured(_)))
            .count()
    }

    /// Frees every tile and zeroes every score
    pub fn reset(&mut self) {
        self.tiles.fill(TileState::Free);
        self.scores.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_sum(board: &TileBoard) -> usize {
        board.player_scores().iter().map(|s| *s as usize).sum()
    }

    #[test]
    fn test_board_creation() {
        let board = TileBoard::new(8, 8, 4);
        assert_eq!(board.rows(), 8);
        assert_eq!(board.cols(), 8);
        assert_eq!(board.tile(0, 0), Some(TileState::Free));
        assert_eq!(board.tile(7, 7), Some(TileState::Free));
        assert_eq!(board.tile(8, 0), None);
        assert_eq!(board.player_scores(), vec![0, 0, 0, 0]);
        assert!(!board.all_tiles_captured());
    }

    #[test]
    fn test_bounds_use_columns_for_x() {
        let board = TileBoard::new(2, 5, 2);
        assert!(board.in_bounds(4, 1));
        assert!(!board.in_bounds(1, 4));
    }

    #[test]
    fn test_second_draw_fails_and_keeps_owner() {
        let mut board = TileBoard::new(4, 4, 2);

        assert!(board.attempt_draw_tile(1, 1, 0));
        assert!(!board.attempt_draw_tile(1, 1, 1));
        assert!(!board.attempt_draw_tile(1, 1, 0));
        assert_eq!(board.tile(1, 1), Some(TileState::Drawing(0)));
    }

    #[test]
    fn test_draw_rejects_captured_tile() {
        let mut board = TileBoard::new(4, 4, 2);
        assert!(board.attempt_draw_tile(0, 0, 0));
        assert!(board.attempt_capture_tile(0, 0, 0));

        assert!(!board.attempt_draw_tile(0, 0, 1));
        assert!(!board.attempt_draw_tile(0, 0, 0));
        assert_eq!(board.tile(0, 0), Some(TileState::Captured(0)));
    }

    #[test]
    fn test_draw_rejects_out_of_bounds_and_unknown_player() {
        let mut board = TileBoard::new(4, 4, 2);
        assert!(!board.attempt_draw_tile(4, 0, 0));
        assert!(!board.attempt_draw_tile(0, 4, 0));
        assert!(!board.attempt_draw_tile(0, 0, 2));
        assert_eq!(board.tile(0, 0), Some(TileState::Free));
    }

    #[test]
    fn test_capture_requires_own_draw() {
        let mut board = TileBoard::new(4, 4, 2);

        assert!(!board.attempt_capture_tile(2, 2, 0));
        assert_eq!(board.tile(2, 2), Some(TileState::Free));

        assert!(board.attempt_draw_tile(2, 2, 1));
        assert!(!board.attempt_capture_tile(2, 2, 0));
        assert_eq!(board.tile(2, 2), Some(TileState::Drawing(1)));

        assert!(board.attempt_capture_tile(2, 2, 1));
        assert_eq!(board.tile(2, 2), Some(TileState::Captured(1)));
        assert_eq!(board.tile(2, 2).and_then(|t| t.owner()), Some(1));
        assert_eq!(board.player_scores(), vec![0, 1]);

        // Already captured
        assert!(!board.attempt_capture_tile(2, 2, 1));
        assert_eq!(board.player_scores(), vec![0, 1]);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut board = TileBoard::new(4, 4, 2);
        assert!(board.attempt_draw_tile(3, 0, 0));

        // Not the owner
        assert!(!board.release_tile(3, 0, 1));
        assert_eq!(board.tile(3, 0), Some(TileState::Drawing(0)));

        assert!(board.release_tile(3, 0, 0));
        assert!(!board.release_tile(3, 0, 0));
        assert_eq!(board.tile(3, 0), Some(TileState::Free));

        // Never owned, out of bounds
        assert!(!board.release_tile(1, 1, 0));
        assert!(!board.release_tile(9, 9, 0));
    }

    #[test]
    fn test_release_does_not_touch_captured_tiles() {
        let mut board = TileBoard::new(4, 4, 2);
        assert!(board.attempt_draw_tile(0, 0, 0));
        assert!(board.attempt_capture_tile(0, 0, 0));

        assert!(!board.release_tile(0, 0, 0));
        assert_eq!(board.tile(0, 0), Some(TileState::Captured(0)));
        assert_eq!(board.player_scores(), vec![1, 0]);
    }

    #[test]
    fn test_release_player_frees_only_drawing_claims() {
        let mut board = TileBoard::new(4, 4, 2);
        assert!(board.attempt_draw_tile(0, 0, 0));
        assert!(board.attempt_draw_tile(1, 0, 0));
        assert!(board.attempt_draw_tile(2, 0, 0));
        assert!(board.attempt_capture_tile(2, 0, 0));
        assert!(board.attempt_draw_tile(3, 0, 1));

        assert_eq!(board.release_player(0), 2);
        assert_eq!(board.tile(0, 0), Some(TileState::Free));
        assert_eq!(board.tile(1, 0), Some(TileState::Free));
        assert_eq!(board.tile(2, 0), Some(TileState::Captured(0)));
        assert_eq!(board.tile(3, 0), Some(TileState::Drawing(1)));
        assert_eq!(board.release_player(0), 0);
    }

    #[test]
    fn test_score_sum_matches_captured_tiles() {
        let mut board = TileBoard::new(3, 3, 3);
        let mut player = 0;
        for y in 0..3 {
            for x in 0..3 {
                assert!(board.attempt_draw_tile(x, y, player));
                if (x + y) % 2 == 0 {
                    assert!(board.attempt_capture_tile(x, y, player));
                }
                assert_eq!(score_sum(&board), board.captured_count());
                player = (player + 1) % 3;
            }
        }
        assert_eq!(board.captured_count(), 5);
    }

    #[test]
    fn test_all_captured_flips_on_last_capture() {
        let mut board = TileBoard::new(2, 2, 2);
        let tiles = [(0, 0), (1, 0), (0, 1), (1, 1)];

        for (n, &(x, y)) in tiles.iter().enumerate() {
            let player = n % 2;
            assert!(board.attempt_draw_tile(x, y, player));
            assert!(!board.all_tiles_captured());
            assert!(board.attempt_capture_tile(x, y, player));
            assert_eq!(board.all_tiles_captured(), n == tiles.len() - 1);
        }

        assert_eq!(board.player_scores(), vec![2, 2]);
    }

    #[test]
    fn test_drawing_tile_blocks_completion() {
        let mut board = TileBoard::new(1, 2, 1);
        assert!(board.attempt_draw_tile(0, 0, 0));
        assert!(board.attempt_capture_tile(0, 0, 0));
        assert!(board.attempt_draw_tile(1, 0, 0));
        assert!(!board.all_tiles_captured());
    }

    #[test]
    fn test_reset() {
        let mut board = TileBoard::new(2, 2, 2);
        assert!(board.attempt_draw_tile(0, 0, 0));
        assert!(board.attempt_capture_tile(0, 0, 0));
        assert!(board.attempt_draw_tile(1, 1, 1));

        board.reset();

        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(board.tile(x, y), Some(TileState::Free));
            }
        }
        assert_eq!(board.player_scores(), vec![0, 0]);
        assert_eq!(board.captured_count(), 0);
    }
}
