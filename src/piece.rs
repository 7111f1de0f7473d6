use crate::board::Board;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Board size constants
pub const BOARD_SIZE: usize = 9;
pub const PROMOTION_ROWS: usize = 3;

/// Offsets expressed in "forward units": a positive `dy` points towards the
/// opponent and is flipped per alliance by [`Alliance::forward`].
const KING_STEPS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
const GOLD_STEPS: [(i32, i32); 6] = [(-1, 1), (0, 1), (1, 1), (-1, 0), (1, 0), (0, -1)];
const SILVER_STEPS: [(i32, i32); 5] = [(-1, 1), (0, 1), (1, 1), (-1, -1), (1, -1)];
const KNIGHT_STEPS: [(i32, i32); 2] = [(-1, 2), (1, 2)];
const PAWN_STEPS: [(i32, i32); 1] = [(0, 1)];
const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];
const LANCE_RAY: [(i32, i32); 1] = [(0, 1)];

const PAWN_SIGHT: [(i32, i32); 4] = [(-1, 1), (0, 1), (1, 1), (0, 2)];
const DRAGON_SIGHT: [(i32, i32); 4] = [(0, -4), (-4, 0), (4, 0), (0, 4)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    King,
    Rook,
    Bishop,
    Gold,
    Silver,
    Knight,
    Lance,
    Pawn,
}

impl Kind {
    pub const ALL: [Kind; 8] = [
        Kind::King,
        Kind::Rook,
        Kind::Bishop,
        Kind::Gold,
        Kind::Silver,
        Kind::Knight,
        Kind::Lance,
        Kind::Pawn,
    ];

    /// King and Gold never promote.
    pub fn is_promotable(&self) -> bool {
        !matches!(self, Kind::King | Kind::Gold)
    }

    pub fn symbol(&self) -> char {
        match self {
            Kind::King => 'K',
            Kind::Rook => 'R',
            Kind::Bishop => 'B',
            Kind::Gold => 'G',
            Kind::Silver => 'S',
            Kind::Knight => 'N',
            Kind::Lance => 'L',
            Kind::Pawn => 'P',
        }
    }

    /// Unit directions this kind slides along, relative to `alliance`.
    pub fn ray_directions(&self, alliance: Alliance) -> Vec<(i32, i32)> {
        match self {
            Kind::Rook => ORTHOGONAL.to_vec(),
            Kind::Bishop => DIAGONAL.to_vec(),
            Kind::Lance => relative(&LANCE_RAY, alliance),
            _ => Vec::new(),
        }
    }

    /// Destination cells reachable from `from` by geometry alone.
    ///
    /// Rays stop at, and include, the first cell for which `occupied` holds.
    /// Friendly occupancy is not excluded here.
    pub fn base_range(
        &self,
        from: Position,
        alliance: Alliance,
        promoted: bool,
        occupied: &dyn Fn(Position) -> bool,
    ) -> Vec<Position> {
        match (self, promoted) {
            (Kind::King, _) => steps(from, &KING_STEPS),
            (Kind::Rook, _) => {
                let mut range = rays(from, &ORTHOGONAL, occupied);
                if promoted {
                    range.extend(steps(from, &DIAGONAL));
                }
                range
            }
            (Kind::Bishop, _) => {
                let mut range = rays(from, &DIAGONAL, occupied);
                if promoted {
                    range.extend(steps(from, &ORTHOGONAL));
                }
                range
            }
            (Kind::Gold, _) | (Kind::Silver | Kind::Knight | Kind::Lance | Kind::Pawn, true) => {
                steps(from, &relative(&GOLD_STEPS, alliance))
            }
            (Kind::Silver, false) => steps(from, &relative(&SILVER_STEPS, alliance)),
            (Kind::Knight, false) => steps(from, &relative(&KNIGHT_STEPS, alliance)),
            (Kind::Lance, false) => rays(from, &relative(&LANCE_RAY, alliance), occupied),
            (Kind::Pawn, false) => steps(from, &relative(&PAWN_STEPS, alliance)),
        }
    }

    /// The part of the vision footprint that does not depend on occupancy.
    /// Always contains `from` itself.
    pub fn area_vision(&self, from: Position, alliance: Alliance, promoted: bool) -> Vec<Position> {
        match (self, promoted) {
            (Kind::King, _) | (Kind::Knight, false) => diamond(from, 3),
            (Kind::Rook, _) => {
                let mut cells = diamond(from, 3);
                if promoted {
                    cells.extend(steps(from, &DRAGON_SIGHT));
                }
                cells
            }
            (Kind::Bishop, true) => diamond(from, 1),
            (Kind::Bishop, false) | (Kind::Lance, false) => vec![from],
            (Kind::Gold, _)
            | (Kind::Silver, _)
            | (Kind::Knight | Kind::Lance | Kind::Pawn, true) => diamond(from, 2),
            (Kind::Pawn, false) => {
                let mut cells = vec![from];
                cells.extend(steps(from, &relative(&PAWN_SIGHT, alliance)));
                cells
            }
        }
    }

    /// The ray part of the vision footprint. A ray stops at, and includes,
    /// the first cell for which `blocks` holds.
    pub fn ray_vision(
        &self,
        from: Position,
        alliance: Alliance,
        promoted: bool,
        blocks: &dyn Fn(Position) -> bool,
    ) -> Vec<Position> {
        match (self, promoted) {
            (Kind::Bishop, _) => rays(from, &DIAGONAL, blocks),
            (Kind::Lance, false) => rays(from, &relative(&LANCE_RAY, alliance), blocks),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::King => "King",
            Kind::Rook => "Rook",
            Kind::Bishop => "Bishop",
            Kind::Gold => "Gold",
            Kind::Silver => "Silver",
            Kind::Knight => "Knight",
            Kind::Lance => "Lance",
            Kind::Pawn => "Pawn",
        };
        f.write_str(name)
    }
}

/// Alliance 0 (`Sente`) starts on rows 6-8 and moves towards row 0.
/// Alliance 1 (`Gote`) starts on rows 0-2 and moves towards row 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alliance {
    Sente,
    Gote,
}

impl Alliance {
    pub const BOTH: [Alliance; 2] = [Alliance::Sente, Alliance::Gote];

    pub fn opponent(&self) -> Alliance {
        match self {
            Alliance::Sente => Alliance::Gote,
            Alliance::Gote => Alliance::Sente,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Alliance::Sente => 0,
            Alliance::Gote => 1,
        }
    }

    /// Row delta of one step forward.
    pub fn forward(&self) -> i32 {
        match self {
            Alliance::Sente => -1,
            Alliance::Gote => 1,
        }
    }

    /// Whether row `y` is one of this alliance's far three rows.
    pub fn in_promotion_zone(&self, y: usize) -> bool {
        match self {
            Alliance::Sente => y < PROMOTION_ROWS,
            Alliance::Gote => y >= BOARD_SIZE - PROMOTION_ROWS && y < BOARD_SIZE,
        }
    }
}

impl fmt::Display for Alliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alliance::Sente => f.write_str("Sente"),
            Alliance::Gote => f.write_str("Gote"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// The cell `(dx, dy)` away, if it is still on the board.
    pub fn offset(&self, dx: i32, dy: i32) -> Option<Position> {
        let x = self.x as i32 + dx;
        let y = self.y as i32 + dy;
        if Board::is_valid(x, y) {
            Some(Position::new(x as usize, y as usize))
        } else {
            None
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single unit. Pieces are never destroyed: a captured piece changes
/// alliance and moves to its captor's hand (`position == None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    kind: Kind,
    alliance: Alliance,
    position: Option<Position>,
    promoted: bool,
}

impl Piece {
    pub fn new(kind: Kind, alliance: Alliance, position: Option<Position>) -> Self {
        Piece {
            kind,
            alliance,
            position,
            promoted: false,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn alliance(&self) -> Alliance {
        self.alliance
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn is_promoted(&self) -> bool {
        self.promoted
    }

    pub fn on_board(&self) -> bool {
        self.position.is_some()
    }

    /// Geometric destinations, occupancy by friends not yet excluded.
    /// Empty for a piece in hand.
    pub fn base_movement_range(&self, board: &Board) -> Vec<Position> {
        match self.position {
            Some(from) => self.kind.base_range(from, self.alliance, self.promoted, &|pos| {
                board.is_occupied(pos)
            }),
            None => Vec::new(),
        }
    }

    /// Base range minus cells held by a friendly piece.
    pub fn movement_range(&self, board: &Board) -> Vec<Position> {
        self.base_movement_range(board)
            .into_iter()
            .filter(|&pos| {
                board
                    .piece_at(pos)
                    .is_none_or(|id| board.piece(id).alliance() != self.alliance)
            })
            .collect()
    }

    pub fn can_move(&self, board: &Board, to: Position) -> bool {
        self.movement_range(board).contains(&to)
    }

    pub fn can_promote(&self, y: usize) -> bool {
        if self.promoted || !self.kind.is_promotable() {
            return false;
        }
        self.alliance.in_promotion_zone(y)
    }

    /// Whether the piece would have no moves left after landing on `to`
    /// unpromoted. The current position is treated as vacated.
    pub fn must_promote(&self, board: &Board, to: Position) -> bool {
        if !self.can_promote(to.y) {
            return false;
        }
        let origin = self.position;
        self.kind
            .base_range(to, self.alliance, false, &|pos| {
                Some(pos) != origin && board.is_occupied(pos)
            })
            .is_empty()
    }

    /// Cells seen without regard to occupancy. Empty for a piece in hand.
    pub fn area_vision(&self) -> Vec<Position> {
        match self.position {
            Some(from) => self.kind.area_vision(from, self.alliance, self.promoted),
            None => Vec::new(),
        }
    }

    /// Cells seen along rays. A ray stops at the first occupied cell that is
    /// `seen` by this piece's alliance.
    pub fn ray_vision(&self, board: &Board, seen: &dyn Fn(Position) -> bool) -> Vec<Position> {
        match self.position {
            Some(from) => self.kind.ray_vision(from, self.alliance, self.promoted, &|pos| {
                board.is_occupied(pos) && seen(pos)
            }),
            None => Vec::new(),
        }
    }

    /// Full vision footprint used for fog.
    pub fn vision(&self, board: &Board, seen: &dyn Fn(Position) -> bool) -> Vec<Position> {
        let mut cells = self.area_vision();
        cells.extend(self.ray_vision(board, seen));
        cells
    }

    pub(crate) fn move_to(&mut self, position: Option<Position>) {
        self.position = position;
    }

    pub(crate) fn capture(&mut self) {
        self.position = None;
        self.alliance = self.alliance.opponent();
    }

    pub(crate) fn decapture(&mut self, position: Position, alliance: Alliance) {
        self.position = Some(position);
        self.alliance = alliance;
    }

    pub(crate) fn promote(&mut self) {
        self.promoted = true;
    }

    pub(crate) fn demote(&mut self) {
        self.promoted = false;
    }
}

fn relative(table: &[(i32, i32)], alliance: Alliance) -> Vec<(i32, i32)> {
    let forward = alliance.forward();
    table.iter().map(|&(dx, dy)| (dx, dy * forward)).collect()
}

fn steps(from: Position, offsets: &[(i32, i32)]) -> Vec<Position> {
    offsets
        .iter()
        .filter_map(|&(dx, dy)| from.offset(dx, dy))
        .collect()
}

fn rays(from: Position, directions: &[(i32, i32)], stop: &dyn Fn(Position) -> bool) -> Vec<Position> {
    let mut cells = Vec::new();
    for &(dx, dy) in directions {
        let mut current = from;
        while let Some(next) = current.offset(dx, dy) {
            cells.push(next);
            if stop(next) {
                break;
            }
            current = next;
        }
    }
    cells
}

fn diamond(center: Position, radius: usize) -> Vec<Position> {
    let r = radius as i32;
    let mut cells = Vec::new();
    for dy in -r..=r {
        let span = r - dy.abs();
        for dx in -span..=span {
            if let Some(pos) = center.offset(dx, dy) {
                cells.push(pos);
            }
        }
    }
    cells
}
