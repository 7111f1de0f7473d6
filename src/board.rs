use crate::fog::Fog;
use crate::piece::{Alliance, BOARD_SIZE, Kind, Piece, Position};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Index of a piece in the board's arena. Stable for the lifetime of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(usize);

impl PieceId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("Position {0} is off the board")]
    OutOfBounds(Position),
    #[error("Position {0} is already occupied")]
    Occupied(Position),
    #[error("A piece in hand cannot be promoted")]
    PromotedInHand,
    #[error("{0} cannot be promoted")]
    NotPromotable(Kind),
}

/// Owner of every piece in the game, on the board or in hand.
///
/// The board only answers queries; pieces change exclusively through
/// [`crate::action::Action`]s, which borrow them via [`Board::piece_mut`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pieces: Vec<Piece>,
}

impl Board {
    /// Create a board with the standard 40-piece opening layout
    pub fn new() -> Self {
        let mut board = Board::empty();
        for alliance in Alliance::BOTH {
            board.setup_pawns(alliance);
            board.setup_minor_pieces(alliance);
            board.setup_major_pieces(alliance);
        }
        board
    }

    /// Create a board with no pieces at all, for custom positions
    pub fn empty() -> Self {
        Board {
            pieces: Vec::with_capacity(40),
        }
    }

    fn setup_pawns(&mut self, alliance: Alliance) {
        for x in 0..BOARD_SIZE {
            self.place_starting(Kind::Pawn, alliance, x, 6);
        }
    }

    /// Lance, Knight, Silver and Gold pairs mirrored around the King's file
    fn setup_minor_pieces(&mut self, alliance: Alliance) {
        let back_rank = [Kind::Lance, Kind::Knight, Kind::Silver, Kind::Gold];
        for (x, &kind) in back_rank.iter().enumerate() {
            self.place_starting(kind, alliance, x, 8);
            self.place_starting(kind, alliance, BOARD_SIZE - 1 - x, 8);
        }
    }

    fn setup_major_pieces(&mut self, alliance: Alliance) {
        self.place_starting(Kind::King, alliance, 4, 8);
        self.place_starting(Kind::Rook, alliance, 7, 7);
        self.place_starting(Kind::Bishop, alliance, 1, 7);
    }

    /// Coordinates are given from Sente's side and rotated for Gote.
    fn place_starting(&mut self, kind: Kind, alliance: Alliance, x: usize, y: usize) {
        let position = match alliance {
            Alliance::Sente => Position::new(x, y),
            Alliance::Gote => Position::new(BOARD_SIZE - 1 - x, BOARD_SIZE - 1 - y),
        };
        self.pieces.push(Piece::new(kind, alliance, Some(position)));
    }

    /// Add a piece to a custom setup. `None` puts it straight into the hand.
    pub fn add_piece(
        &mut self,
        kind: Kind,
        alliance: Alliance,
        position: Option<Position>,
    ) -> Result<PieceId, SetupError> {
        if let Some(pos) = position {
            if !self.contains(pos) {
                return Err(SetupError::OutOfBounds(pos));
            }
            if self.is_occupied(pos) {
                return Err(SetupError::Occupied(pos));
            }
        }
        self.pieces.push(Piece::new(kind, alliance, position));
        Ok(PieceId(self.pieces.len() - 1))
    }

    /// Add an already promoted piece to a custom setup.
    pub fn add_promoted_piece(
        &mut self,
        kind: Kind,
        alliance: Alliance,
        position: Option<Position>,
    ) -> Result<PieceId, SetupError> {
        if !kind.is_promotable() {
            return Err(SetupError::NotPromotable(kind));
        }
        if position.is_none() {
            return Err(SetupError::PromotedInHand);
        }
        let id = self.add_piece(kind, alliance, position)?;
        self.pieces[id.0].promote();
        Ok(id)
    }

    /// Bounds check on both axes
    pub fn is_valid(x: i32, y: i32) -> bool {
        (0..BOARD_SIZE as i32).contains(&x) && (0..BOARD_SIZE as i32).contains(&y)
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < BOARD_SIZE && pos.y < BOARD_SIZE
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this board.
    pub fn piece(&self, id: PieceId) -> &Piece {
        &self.pieces[id.0]
    }

    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.0)
    }

    pub(crate) fn piece_mut(&mut self, id: PieceId) -> &mut Piece {
        &mut self.pieces[id.0]
    }

    pub fn pieces(&self) -> impl Iterator<Item = (PieceId, &Piece)> {
        self.pieces
            .iter()
            .enumerate()
            .map(|(i, piece)| (PieceId(i), piece))
    }

    /// Pieces owned by `alliance`, on the board or in hand.
    pub fn pieces_of(&self, alliance: Alliance) -> impl Iterator<Item = (PieceId, &Piece)> {
        self.pieces()
            .filter(move |(_, piece)| piece.alliance() == alliance)
    }

    /// Pieces `alliance` holds in hand, ready to drop.
    pub fn hand(&self, alliance: Alliance) -> impl Iterator<Item = (PieceId, &Piece)> {
        self.pieces_of(alliance).filter(|(_, piece)| !piece.on_board())
    }

    /// The on-board piece standing on `pos`, if any
    pub fn piece_at(&self, pos: Position) -> Option<PieceId> {
        self.pieces()
            .find(|(_, piece)| piece.position() == Some(pos))
            .map(|(id, _)| id)
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.pieces.iter().any(|piece| piece.position() == Some(pos))
    }

    /// Number of `kind` pieces held in hand by `alliance`
    pub fn captured_pieces_count(&self, kind: Kind, alliance: Alliance) -> usize {
        self.hand(alliance)
            .filter(|(_, piece)| piece.kind() == kind)
            .count()
    }

    /// Get a string representation of the board
    pub fn display_board(&self) -> String {
        self.render(|_| true)
    }

    /// Board as seen by `fog`'s alliance: foggy cells render as `~`.
    pub fn display_for(&self, fog: &Fog) -> String {
        self.render(|pos| !fog.is_fog(pos.x, pos.y))
    }

    fn render(&self, visible: impl Fn(Position) -> bool) -> String {
        let mut result = String::new();
        result.push_str(&self.display_hand(Alliance::Gote));
        result.push_str("   ");
        for x in 0..BOARD_SIZE {
            result.push_str(&format!("{:>3}", x));
        }
        result.push('\n');

        for y in 0..BOARD_SIZE {
            result.push_str(&format!("{:2} ", y));
            for x in 0..BOARD_SIZE {
                let pos = Position::new(x, y);
                let cell = if !visible(pos) {
                    "~".to_string()
                } else {
                    match self.piece_at(pos).map(|id| self.piece(id)) {
                        Some(piece) => piece_label(piece),
                        None => ".".to_string(),
                    }
                };
                result.push_str(&format!("{:>3}", cell));
            }
            result.push('\n');
        }

        result.push_str(&self.display_hand(Alliance::Sente));
        result
    }

    fn display_hand(&self, alliance: Alliance) -> String {
        let mut line = format!("{} hand:", alliance);
        for kind in Kind::ALL {
            let count = self.captured_pieces_count(kind, alliance);
            if count > 0 {
                line.push_str(&format!(" {}x{}", kind.symbol(), count));
            }
        }
        line.push('\n');
        line
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Upper case for Sente, lower case for Gote, `+` marks promotion.
fn piece_label(piece: &Piece) -> String {
    let symbol = match piece.alliance() {
        Alliance::Sente => piece.kind().symbol(),
        Alliance::Gote => piece.kind().symbol().to_ascii_lowercase(),
    };
    if piece.is_promoted() {
        format!("+{}", symbol)
    } else {
        symbol.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_at(board: &Board, x: usize, y: usize) -> Option<(Kind, Alliance)> {
        board
            .piece_at(Position::new(x, y))
            .map(|id| (board.piece(id).kind(), board.piece(id).alliance()))
    }

    #[test]
    fn test_initial_setup() {
        let board = Board::new();
        assert_eq!(board.len(), 40);

        assert_eq!(kind_at(&board, 4, 8), Some((Kind::King, Alliance::Sente)));
        assert_eq!(kind_at(&board, 7, 7), Some((Kind::Rook, Alliance::Sente)));
        assert_eq!(kind_at(&board, 1, 7), Some((Kind::Bishop, Alliance::Sente)));
        assert_eq!(kind_at(&board, 0, 8), Some((Kind::Lance, Alliance::Sente)));
        assert_eq!(kind_at(&board, 7, 8), Some((Kind::Knight, Alliance::Sente)));
        assert_eq!(kind_at(&board, 2, 8), Some((Kind::Silver, Alliance::Sente)));
        assert_eq!(kind_at(&board, 5, 8), Some((Kind::Gold, Alliance::Sente)));

        // Gote is the 180 degree rotation
        assert_eq!(kind_at(&board, 4, 0), Some((Kind::King, Alliance::Gote)));
        assert_eq!(kind_at(&board, 1, 1), Some((Kind::Rook, Alliance::Gote)));
        assert_eq!(kind_at(&board, 7, 1), Some((Kind::Bishop, Alliance::Gote)));

        for x in 0..BOARD_SIZE {
            assert_eq!(kind_at(&board, x, 6), Some((Kind::Pawn, Alliance::Sente)));
            assert_eq!(kind_at(&board, x, 2), Some((Kind::Pawn, Alliance::Gote)));
            assert_eq!(kind_at(&board, x, 4), None);
        }
    }

    #[test]
    fn test_at_most_one_piece_per_cell() {
        let board = Board::new();
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                let pos = Position::new(x, y);
                let count = board
                    .pieces()
                    .filter(|(_, piece)| piece.position() == Some(pos))
                    .count();
                assert!(count <= 1, "{} holds {} pieces", pos, count);
            }
        }
    }

    #[test]
    fn test_is_valid_bounds() {
        assert!(Board::is_valid(0, 0));
        assert!(Board::is_valid(8, 8));
        assert!(!Board::is_valid(-1, 4));
        assert!(!Board::is_valid(4, 9));
        assert!(!Board::is_valid(9, 0));
    }

    #[test]
    fn test_add_piece_rejects_occupied_and_out_of_bounds() {
        let mut board = Board::empty();
        board
            .add_piece(Kind::Pawn, Alliance::Sente, Some(Position::new(4, 4)))
            .unwrap();

        assert_eq!(
            board.add_piece(Kind::Gold, Alliance::Gote, Some(Position::new(4, 4))),
            Err(SetupError::Occupied(Position::new(4, 4)))
        );
        assert_eq!(
            board.add_piece(Kind::Gold, Alliance::Gote, Some(Position::new(9, 4))),
            Err(SetupError::OutOfBounds(Position::new(9, 4)))
        );
        assert_eq!(
            board.add_promoted_piece(Kind::Gold, Alliance::Gote, Some(Position::new(1, 1))),
            Err(SetupError::NotPromotable(Kind::Gold))
        );
        assert_eq!(
            board.add_promoted_piece(Kind::Pawn, Alliance::Gote, None),
            Err(SetupError::PromotedInHand)
        );
    }

    #[test]
    fn test_captured_pieces_count() {
        let mut board = Board::empty();
        board.add_piece(Kind::Pawn, Alliance::Sente, None).unwrap();
        board.add_piece(Kind::Pawn, Alliance::Sente, None).unwrap();
        board.add_piece(Kind::Pawn, Alliance::Gote, None).unwrap();
        board
            .add_piece(Kind::Pawn, Alliance::Sente, Some(Position::new(0, 6)))
            .unwrap();

        assert_eq!(board.captured_pieces_count(Kind::Pawn, Alliance::Sente), 2);
        assert_eq!(board.captured_pieces_count(Kind::Pawn, Alliance::Gote), 1);
        assert_eq!(board.captured_pieces_count(Kind::Rook, Alliance::Sente), 0);
    }

    #[test]
    fn test_king_is_hemmed_in_by_golds_at_start() {
        let board = Board::new();
        let king = board.piece_at(Position::new(4, 8)).unwrap();
        let range = board.piece(king).movement_range(&board);

        // The back rank is full, only the empty second row is open
        assert_eq!(range.len(), 3);
        for x in 3..=5 {
            assert!(range.contains(&Position::new(x, 7)));
        }
    }

    #[test]
    fn test_movement_range_excludes_only_friendly_cells() {
        let mut board = Board::empty();
        let rook = board
            .add_piece(Kind::Rook, Alliance::Sente, Some(Position::new(4, 4)))
            .unwrap();
        board
            .add_piece(Kind::Pawn, Alliance::Sente, Some(Position::new(4, 2)))
            .unwrap();
        board
            .add_piece(Kind::Pawn, Alliance::Gote, Some(Position::new(6, 4)))
            .unwrap();

        let piece = board.piece(rook);
        let base = piece.base_movement_range(&board);
        let range = piece.movement_range(&board);

        assert!(range.iter().all(|pos| base.contains(pos)));
        let removed: Vec<_> = base.iter().filter(|pos| !range.contains(pos)).collect();
        assert_eq!(removed, vec![&Position::new(4, 2)]);
        assert!(range.contains(&Position::new(6, 4)));
        assert!(!range.contains(&Position::new(7, 4)));
    }

    #[test]
    fn test_display_board_marks_alliances() {
        let board = Board::new();
        let text = board.display_board();
        assert!(text.contains('K'));
        assert!(text.contains('k'));
        assert!(text.starts_with("Gote hand:"));
    }
}
