use crate::board::{Board, PieceId};
use crate::piece::{Alliance, Piece, Position};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// One reversible mutation of a single piece. Each variant carries the
/// pre-state it needs for an exact undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Move {
        piece: PieceId,
        from: Position,
        to: Position,
    },
    Drop {
        piece: PieceId,
        to: Position,
    },
    Capture {
        piece: PieceId,
        from: Position,
        alliance: Alliance,
    },
    Promote {
        piece: PieceId,
    },
    Demote {
        piece: PieceId,
    },
}

impl Action {
    pub fn piece(&self) -> PieceId {
        match *self {
            Action::Move { piece, .. }
            | Action::Drop { piece, .. }
            | Action::Capture { piece, .. }
            | Action::Promote { piece }
            | Action::Demote { piece } => piece,
        }
    }

    pub fn execute(&self, board: &mut Board) {
        match *self {
            Action::Move { piece, to, .. } | Action::Drop { piece, to } => {
                board.piece_mut(piece).move_to(Some(to))
            }
            Action::Capture { piece, .. } => board.piece_mut(piece).capture(),
            Action::Promote { piece } => board.piece_mut(piece).promote(),
            Action::Demote { piece } => board.piece_mut(piece).demote(),
        }
    }

    pub fn undo(&self, board: &mut Board) {
        match *self {
            Action::Move { piece, from, .. } => board.piece_mut(piece).move_to(Some(from)),
            Action::Drop { piece, .. } => board.piece_mut(piece).move_to(None),
            Action::Capture {
                piece,
                from,
                alliance,
            } => board.piece_mut(piece).decapture(from, alliance),
            Action::Promote { piece } => board.piece_mut(piece).demote(),
            Action::Demote { piece } => board.piece_mut(piece).promote(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { piece, from, to } => write!(f, "move {} {} -> {}", piece, from, to),
            Action::Drop { piece, to } => write!(f, "drop {} at {}", piece, to),
            Action::Capture { piece, from, .. } => write!(f, "capture {} at {}", piece, from),
            Action::Promote { piece } => write!(f, "promote {}", piece),
            Action::Demote { piece } => write!(f, "demote {}", piece),
        }
    }
}

/// The full effect of one turn, applied and reverted as a unit.
///
/// Built against a board snapshot: the move (or drop) comes first, followed by
/// any capture and forced promotion. An empty list is invalid and must not be
/// submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionList {
    piece: PieceId,
    destination: Option<Position>,
    actions: Vec<Action>,
}

impl ActionList {
    /// Build the list for moving or dropping `piece` onto `destination`.
    pub fn new(board: &Board, piece: PieceId, destination: Position) -> Self {
        let mut list = ActionList {
            piece,
            destination: None,
            actions: Vec::new(),
        };

        let Some(mover) = board.get(piece) else {
            return list;
        };
        match mover.position() {
            Some(origin) => list.prepare(board, mover, origin, destination),
            None => list.create_drop(board, destination),
        }
        list
    }

    /// Build the plain list and, when promotion is optional at the
    /// destination, a second one that promotes. The promoting one comes first.
    pub fn candidates(board: &Board, piece: PieceId, destination: Position) -> Vec<ActionList> {
        let list = ActionList::new(board, piece, destination);
        if !list.is_valid() {
            return Vec::new();
        }
        let mut candidates = Vec::with_capacity(2);
        if let Some(promoting) = list.with_promotion(board) {
            candidates.push(promoting);
        }
        candidates.push(list);
        candidates
    }

    fn create_drop(&mut self, board: &Board, destination: Position) {
        if !board.contains(destination) || board.is_occupied(destination) {
            return;
        }
        self.actions.push(Action::Drop {
            piece: self.piece,
            to: destination,
        });
        self.destination = Some(destination);
    }

    /// Ray clamp, range check, then capture and forced promotion.
    fn prepare(&mut self, board: &Board, mover: &Piece, origin: Position, requested: Position) {
        if !board.contains(requested) {
            return;
        }
        let destination = clamp_ray(board, mover, origin, requested);
        if !mover.can_move(board, destination) {
            return;
        }

        self.actions.push(Action::Move {
            piece: self.piece,
            from: origin,
            to: destination,
        });

        // can_move already ruled out a friendly occupant
        if let Some(target) = board.piece_at(destination) {
            let captured = board.piece(target);
            if captured.is_promoted() {
                self.actions.push(Action::Demote { piece: target });
            }
            self.actions.push(Action::Capture {
                piece: target,
                from: destination,
                alliance: captured.alliance(),
            });
        }

        if mover.must_promote(board, destination) {
            self.actions.push(Action::Promote { piece: self.piece });
        }
        self.destination = Some(destination);
    }

    pub fn is_valid(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn piece(&self) -> PieceId {
        self.piece
    }

    /// Where the piece ends up, after any ray clamp. `None` when invalid.
    pub fn destination(&self) -> Option<Position> {
        self.destination
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub(crate) fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn is_drop(&self) -> bool {
        matches!(self.actions.first(), Some(Action::Drop { .. }))
    }

    pub fn promotes(&self) -> bool {
        self.actions
            .iter()
            .any(|action| matches!(action, Action::Promote { piece } if *piece == self.piece))
    }

    pub fn captures(&self) -> Option<PieceId> {
        self.actions.iter().find_map(|action| match action {
            Action::Capture { piece, .. } => Some(*piece),
            _ => None,
        })
    }

    /// The same move with a voluntary promotion appended, when the mover may
    /// but need not promote at the destination.
    pub fn with_promotion(&self, board: &Board) -> Option<ActionList> {
        let destination = self.destination?;
        if self.is_drop() || self.promotes() {
            return None;
        }
        let mover = board.get(self.piece)?;
        if !mover.can_promote(destination.y) {
            return None;
        }
        let mut promoting = self.clone();
        promoting.add_action(Action::Promote { piece: self.piece });
        Some(promoting)
    }

    /// Whether building this move on `board` would produce exactly this list.
    ///
    /// Rebuilding catches every change the list depends on: a slider's path,
    /// the promotion state of mover and target, and what sits on the
    /// destination.
    pub fn is_current(&self, board: &Board) -> bool {
        let Some(destination) = self.destination else {
            return false;
        };
        ActionList::candidates(board, self.piece, destination).contains(self)
    }

    pub fn execute(&self, board: &mut Board) {
        for action in &self.actions {
            action.execute(board);
        }
        debug!(list = %self, "executed");
    }

    pub fn undo(&self, board: &mut Board) {
        for action in self.actions.iter().rev() {
            action.undo(board);
        }
        debug!(list = %self, "undone");
    }
}

impl fmt::Display for ActionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.actions.is_empty() {
            return f.write_str("<invalid>");
        }
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", action)?;
        }
        Ok(())
    }
}

/// Pull an overshooting slide back to the last square the piece can reach.
///
/// Applies only when `requested` lies beyond the first step along one of the
/// mover's ray directions. A blocking enemy becomes the destination (a
/// capture); a blocking friend moves it one square back. Anything else is
/// returned unchanged for the range check to judge.
fn clamp_ray(board: &Board, mover: &Piece, origin: Position, requested: Position) -> Position {
    let dx = requested.x as i32 - origin.x as i32;
    let dy = requested.y as i32 - origin.y as i32;
    let aligned = dx == 0 || dy == 0 || dx.abs() == dy.abs();
    if !aligned || dx.abs().max(dy.abs()) < 2 {
        return requested;
    }
    let direction = (dx.signum(), dy.signum());
    if !mover.kind().ray_directions(mover.alliance()).contains(&direction) {
        return requested;
    }

    let mut last = origin;
    let mut current = origin;
    while let Some(next) = current.offset(direction.0, direction.1) {
        if next == requested {
            break;
        }
        if let Some(id) = board.piece_at(next) {
            if board.piece(id).alliance() != mover.alliance() {
                return next;
            }
            return if last == origin { requested } else { last };
        }
        last = next;
        current = next;
    }
    requested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Kind;

    fn place(board: &mut Board, kind: Kind, alliance: Alliance, x: usize, y: usize) -> PieceId {
        board
            .add_piece(kind, alliance, Some(Position::new(x, y)))
            .unwrap()
    }

    #[test]
    fn test_pawn_advance_execute_and_undo() {
        let mut board = Board::new();
        let pawn = board.piece_at(Position::new(4, 6)).unwrap();

        let list = ActionList::new(&board, pawn, Position::new(4, 5));
        assert!(list.is_valid());
        assert_eq!(list.actions().len(), 1);
        assert!(!list.promotes());

        list.execute(&mut board);
        assert_eq!(board.piece(pawn).position(), Some(Position::new(4, 5)));
        assert!(!board.piece(pawn).is_promoted());

        list.undo(&mut board);
        assert_eq!(board.piece(pawn).position(), Some(Position::new(4, 6)));
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_unreachable_and_self_blocked_destinations_are_invalid() {
        let board = Board::new();
        let pawn = board.piece_at(Position::new(4, 6)).unwrap();
        let king = board.piece_at(Position::new(4, 8)).unwrap();

        assert!(!ActionList::new(&board, pawn, Position::new(4, 4)).is_valid());
        assert!(!ActionList::new(&board, pawn, Position::new(4, 9)).is_valid());
        assert!(!ActionList::new(&board, king, Position::new(3, 8)).is_valid());
        assert_eq!(ActionList::new(&board, king, Position::new(3, 8)).destination(), None);
    }

    #[test]
    fn test_capture_round_trip_restores_promoted_enemy() {
        let mut board = Board::empty();
        let rook = place(&mut board, Kind::Rook, Alliance::Sente, 4, 6);
        let enemy = board
            .add_promoted_piece(Kind::Silver, Alliance::Gote, Some(Position::new(4, 3)))
            .unwrap();
        let before = board.clone();

        let list = ActionList::new(&board, rook, Position::new(4, 3));
        assert!(list.is_valid());
        assert_eq!(list.captures(), Some(enemy));
        assert!(matches!(list.actions()[1], Action::Demote { piece } if piece == enemy));
        assert!(matches!(list.actions()[2], Action::Capture { piece, .. } if piece == enemy));

        list.execute(&mut board);
        let captured = board.piece(enemy);
        assert_eq!(captured.position(), None);
        assert_eq!(captured.alliance(), Alliance::Sente);
        assert!(!captured.is_promoted());
        assert_eq!(board.captured_pieces_count(Kind::Silver, Alliance::Sente), 1);
        assert_eq!(board.piece(rook).position(), Some(Position::new(4, 3)));

        list.undo(&mut board);
        assert_eq!(board, before);
    }

    #[test]
    fn test_ray_clamp_stops_at_hidden_enemy() {
        let mut board = Board::empty();
        let lance = place(&mut board, Kind::Lance, Alliance::Sente, 0, 8);
        let enemy = place(&mut board, Kind::Pawn, Alliance::Gote, 0, 5);

        let list = ActionList::new(&board, lance, Position::new(0, 2));
        assert!(list.is_valid());
        assert_eq!(list.destination(), Some(Position::new(0, 5)));
        assert_eq!(list.captures(), Some(enemy));
    }

    #[test]
    fn test_ray_clamp_stops_short_of_friend() {
        let mut board = Board::empty();
        let rook = place(&mut board, Kind::Rook, Alliance::Sente, 0, 4);
        place(&mut board, Kind::Gold, Alliance::Sente, 5, 4);

        let list = ActionList::new(&board, rook, Position::new(8, 4));
        assert_eq!(list.destination(), Some(Position::new(4, 4)));
        assert_eq!(list.captures(), None);

        // Adjacent friend leaves nowhere to stop
        place(&mut board, Kind::Gold, Alliance::Sente, 0, 3);
        assert!(!ActionList::new(&board, rook, Position::new(0, 0)).is_valid());
    }

    #[test]
    fn test_clamp_ignores_directions_the_piece_cannot_slide() {
        let mut board = Board::empty();
        let lance = place(&mut board, Kind::Lance, Alliance::Sente, 4, 4);
        // Backwards is not a Lance ray
        assert!(!ActionList::new(&board, lance, Position::new(4, 7)).is_valid());
    }

    #[test]
    fn test_forced_promotion_on_last_row() {
        let mut board = Board::empty();
        let pawn = place(&mut board, Kind::Pawn, Alliance::Sente, 4, 1);

        assert!(board.piece(pawn).must_promote(&board, Position::new(4, 0)));
        assert_eq!(board.piece(pawn).position(), Some(Position::new(4, 1)));

        let list = ActionList::new(&board, pawn, Position::new(4, 0));
        assert!(list.promotes());
        assert!(list.with_promotion(&board).is_none());
        assert_eq!(ActionList::candidates(&board, pawn, Position::new(4, 0)).len(), 1);

        list.execute(&mut board);
        let promoted = board.piece(pawn);
        assert!(promoted.is_promoted());
        let mut range = promoted.base_movement_range(&board);
        range.sort_by_key(|pos| (pos.y, pos.x));
        // Gold geometry from (4, 0): forward is off the board
        assert_eq!(
            range,
            vec![Position::new(3, 0), Position::new(5, 0), Position::new(4, 1)]
        );
    }

    #[test]
    fn test_knight_must_promote_on_last_two_rows() {
        let mut board = Board::empty();
        let knight = place(&mut board, Kind::Knight, Alliance::Gote, 3, 4);
        let piece = board.piece(knight);

        assert!(!piece.must_promote(&board, Position::new(4, 6)));
        assert!(piece.must_promote(&board, Position::new(4, 7)));
        assert!(piece.must_promote(&board, Position::new(2, 8)));
    }

    #[test]
    fn test_must_promote_treats_origin_as_vacated() {
        let mut board = Board::empty();
        // A Gote lance sliding down its own file
        let lance = place(&mut board, Kind::Lance, Alliance::Gote, 2, 6);
        let piece = board.piece(lance);
        assert!(!piece.must_promote(&board, Position::new(2, 7)));
        assert!(piece.must_promote(&board, Position::new(2, 8)));
    }

    #[test]
    fn test_optional_promotion_builds_two_candidates() {
        let mut board = Board::empty();
        let silver = place(&mut board, Kind::Silver, Alliance::Sente, 4, 3);

        let candidates = ActionList::candidates(&board, silver, Position::new(4, 2));
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].promotes());
        assert!(!candidates[1].promotes());

        // Outside the zone there is only one
        let candidates = ActionList::candidates(&board, silver, Position::new(3, 4));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_drop_from_hand() {
        let mut board = Board::empty();
        let pawn = board.add_piece(Kind::Pawn, Alliance::Sente, None).unwrap();
        place(&mut board, Kind::Gold, Alliance::Gote, 4, 4);

        assert!(!ActionList::new(&board, pawn, Position::new(4, 4)).is_valid());
        assert!(!ActionList::new(&board, pawn, Position::new(9, 4)).is_valid());

        let list = ActionList::new(&board, pawn, Position::new(4, 5));
        assert!(list.is_drop());
        assert!(list.with_promotion(&board).is_none());

        list.execute(&mut board);
        assert_eq!(board.piece(pawn).position(), Some(Position::new(4, 5)));
        assert_eq!(board.captured_pieces_count(Kind::Pawn, Alliance::Sente), 0);

        list.undo(&mut board);
        assert_eq!(board.piece(pawn).position(), None);
    }

    #[test]
    fn test_stale_list_is_detected() {
        let mut board = Board::new();
        let pawn = board.piece_at(Position::new(4, 6)).unwrap();
        let list = ActionList::new(&board, pawn, Position::new(4, 5));
        assert!(list.is_current(&board));

        list.execute(&mut board);
        assert!(!list.is_current(&board));
    }

    #[test]
    fn test_list_is_stale_once_its_path_is_blocked() {
        let mut board = Board::empty();
        let rook = place(&mut board, Kind::Rook, Alliance::Sente, 0, 4);
        let list = ActionList::new(&board, rook, Position::new(0, 0));
        assert!(list.is_current(&board));

        place(&mut board, Kind::Gold, Alliance::Sente, 0, 2);
        assert!(!list.is_current(&board));
    }

    #[test]
    fn test_list_is_stale_once_its_target_promotes() {
        let mut board = Board::empty();
        let rook = place(&mut board, Kind::Rook, Alliance::Sente, 4, 6);
        let enemy = place(&mut board, Kind::Silver, Alliance::Gote, 4, 4);
        let list = ActionList::new(&board, rook, Position::new(4, 4));
        assert_eq!(list.actions().len(), 2);

        board.piece_mut(enemy).promote();
        assert!(!list.is_current(&board));
        assert_eq!(ActionList::new(&board, rook, Position::new(4, 4)).actions().len(), 3);
    }

    #[test]
    fn test_promoting_variant_stays_current() {
        let mut board = Board::empty();
        let silver = place(&mut board, Kind::Silver, Alliance::Sente, 4, 3);
        let candidates = ActionList::candidates(&board, silver, Position::new(4, 2));
        assert!(candidates.iter().all(|list| list.is_current(&board)));

        // Already promoted: the plain step still holds, promoting again does not
        board.piece_mut(silver).promote();
        assert!(!candidates[0].is_current(&board));
        assert!(candidates[1].is_current(&board));
    }
}
