use crate::board::Board;
use crate::piece::{Alliance, BOARD_SIZE, Position};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What one alliance can see. Recomputed from scratch on every refresh and
/// derived only from that alliance's own on-board pieces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fog {
    alliance: Alliance,
    visible: [[bool; BOARD_SIZE]; BOARD_SIZE],
}

impl Fog {
    /// A fully fogged grid; call [`Fog::refresh`] to populate it.
    pub fn new(alliance: Alliance) -> Self {
        Fog {
            alliance,
            visible: [[false; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    pub fn alliance(&self) -> Alliance {
        self.alliance
    }

    /// Rebuild the grid from the vision of every on-board piece of this
    /// alliance.
    ///
    /// Area footprints go in first. Rays are then walked against that first
    /// pass, so a ray is stopped only by an occupant the alliance already
    /// sees, and the result does not depend on piece order.
    pub fn refresh(&mut self, board: &Board) {
        self.visible = [[false; BOARD_SIZE]; BOARD_SIZE];

        let own: Vec<_> = board
            .pieces_of(self.alliance)
            .filter(|(_, piece)| piece.on_board())
            .map(|(_, piece)| piece)
            .collect();

        for piece in &own {
            for pos in piece.area_vision() {
                self.reveal(pos);
            }
        }

        let area = self.visible;
        let seen = |pos: Position| area[pos.y][pos.x];
        for piece in &own {
            for pos in piece.ray_vision(board, &seen) {
                self.reveal(pos);
            }
        }

        debug!(
            alliance = %self.alliance,
            visible = self.visible_count(),
            "fog refreshed"
        );
    }

    fn reveal(&mut self, pos: Position) {
        self.visible[pos.y][pos.x] = true;
    }

    /// True when the cell got no vision this refresh. Off-board coordinates
    /// are always foggy.
    pub fn is_fog(&self, x: usize, y: usize) -> bool {
        if x >= BOARD_SIZE || y >= BOARD_SIZE {
            return true;
        }
        !self.visible[y][x]
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().flatten().filter(|&&cell| cell).count()
    }
}
