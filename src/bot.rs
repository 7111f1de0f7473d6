use crate::action::ActionList;
use crate::board::Board;
use crate::piece::{Alliance, BOARD_SIZE, Position};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Trait that all computer opponents must implement
pub trait Opponent: Send {
    /// Get the name of the opponent
    fn name(&self) -> &str;

    /// Pick the action list to play for `alliance`, or `None` when it has no
    /// legal action. The returned list must be valid for `board`.
    fn choose_action(&mut self, board: &Board, alliance: Alliance) -> Option<ActionList>;

    /// Notified when the session starts
    fn game_start(&mut self, _alliance: Alliance) {}

    /// Notified when an action list is committed (by either side)
    fn notify_action(&mut self, _actions: &ActionList) {}
}

/// Every valid action list `alliance` could submit on `board`.
///
/// Walks all 81 cells for every piece the alliance owns, on the board or in
/// hand. Optional promotions yield both variants. Clamped ray requests are
/// skipped so each distinct outcome is listed once.
pub fn legal_action_lists(board: &Board, alliance: Alliance) -> Vec<ActionList> {
    let mut lists = Vec::new();
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            let destination = Position::new(x, y);
            for (id, _) in board.pieces_of(alliance) {
                lists.extend(
                    ActionList::candidates(board, id, destination)
                        .into_iter()
                        .filter(|list| list.destination() == Some(destination)),
                );
            }
        }
    }
    lists
}

/// Picks uniformly at random among all legal action lists.
pub struct RandomOpponent<R: Rng + Send = StdRng> {
    name: String,
    rng: R,
}

impl RandomOpponent<StdRng> {
    pub fn new(name: String) -> Self {
        RandomOpponent {
            name,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(name: String, seed: u64) -> Self {
        RandomOpponent {
            name,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> RandomOpponent<R> {
    pub fn with_rng(name: String, rng: R) -> Self {
        RandomOpponent { name, rng }
    }
}

impl<R: Rng + Send> Opponent for RandomOpponent<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_action(&mut self, board: &Board, alliance: Alliance) -> Option<ActionList> {
        let mut lists = legal_action_lists(board, alliance);
        if lists.is_empty() {
            return None;
        }
        let pick = self.rng.gen_range(0..lists.len());
        Some(lists.swap_remove(pick))
    }
}
