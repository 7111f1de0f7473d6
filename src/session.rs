use crate::action::ActionList;
use crate::board::{Board, PieceId};
use crate::bot::{Opponent, RandomOpponent};
use crate::fog::Fog;
use crate::piece::{Alliance, Position};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstMove {
    Human,
    Opponent,
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub human: Alliance,
    pub first_move: FirstMove,
    /// Seeds the first-move draw and the default opponent
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            human: Alliance::Sente,
            first_move: FirstMove::Random,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    AwaitingAction,
    OpponentTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Ongoing,
    Won(Alliance),
    Draw,
}

/// Win/loss predicate evaluated at the end of every turn.
pub type Judge = Box<dyn Fn(&Board) -> Outcome + Send>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Action list is empty")]
    InvalidActionList,
    #[error("Action list was built for a different position")]
    StaleActionList,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("An action was already committed this turn")]
    TurnPending,
    #[error("Session is busy executing an action")]
    Busy,
    #[error("Game already over")]
    GameOver,
}

/// Turn and history manager for one game against a computer opponent.
///
/// Owns the board, both fogs and a linear ledger of committed action lists.
/// `cursor` counts the ledger entries currently applied to the board.
pub struct Session {
    board: Board,
    fogs: [Fog; 2],
    turn: Alliance,
    human: Alliance,
    phase: Phase,
    outcome: Outcome,
    ledger: Vec<ActionList>,
    cursor: usize,
    pending: bool,
    executing: bool,
    opponent: Box<dyn Opponent>,
    judge: Judge,
}

impl Session {
    /// Start a session on the standard layout with a [`RandomOpponent`]
    pub fn new(config: SessionConfig) -> Self {
        let opponent: Box<dyn Opponent> = match config.seed {
            Some(seed) => Box::new(RandomOpponent::seeded("RandomOpponent".to_string(), seed)),
            None => Box::new(RandomOpponent::new("RandomOpponent".to_string())),
        };
        Self::with_opponent(config, Board::new(), opponent)
    }

    /// Start a session on `board` against `opponent`. If the opponent moves
    /// first it plays before this returns.
    pub fn with_opponent(config: SessionConfig, board: Board, opponent: Box<dyn Opponent>) -> Self {
        let human_first = match config.first_move {
            FirstMove::Human => true,
            FirstMove::Opponent => false,
            FirstMove::Random => {
                let mut rng = match config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                rng.gen_bool(0.5)
            }
        };
        let turn = if human_first {
            config.human
        } else {
            config.human.opponent()
        };

        let mut session = Session {
            board,
            fogs: [Fog::new(Alliance::Sente), Fog::new(Alliance::Gote)],
            turn,
            human: config.human,
            phase: Phase::AwaitingAction,
            outcome: Outcome::Ongoing,
            ledger: Vec::new(),
            cursor: 0,
            pending: false,
            executing: false,
            opponent,
            judge: Box::new(|_: &Board| Outcome::Ongoing),
        };

        session.opponent.game_start(config.human.opponent());
        session.refresh_fogs();
        info!(human = %session.human, first = %session.turn, "session started");

        if !human_first {
            session.play_opponent_turns();
        }
        session
    }

    /// Replace the win/loss predicate. The default always reports
    /// [`Outcome::Ongoing`].
    pub fn set_judge(&mut self, judge: Judge) {
        self.judge = judge;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn fog(&self, alliance: Alliance) -> &Fog {
        &self.fogs[alliance.index()]
    }

    pub fn turn(&self) -> Alliance {
        self.turn
    }

    pub fn human(&self) -> Alliance {
        self.human
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn opponent_name(&self) -> &str {
        self.opponent.name()
    }

    /// Committed lists, including undone ones that can still be redone
    pub fn ledger(&self) -> &[ActionList] {
        &self.ledger
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.ledger.len()
    }

    /// Build the action list for `piece` to `destination` on the live board.
    pub fn action_list(&self, piece: PieceId, destination: Position) -> ActionList {
        ActionList::new(&self.board, piece, destination)
    }

    /// Every list the human could choose for this move. Two entries mean
    /// promotion is optional and the caller has to ask.
    pub fn candidates(&self, piece: PieceId, destination: Position) -> Vec<ActionList> {
        ActionList::candidates(&self.board, piece, destination)
    }

    /// Execute `actions` for the side to move and append it to the ledger,
    /// dropping any undone tail.
    pub fn request_action(&mut self, actions: ActionList) -> Result<(), SessionError> {
        if self.executing || self.phase == Phase::OpponentTurn {
            return Err(SessionError::Busy);
        }
        if self.outcome != Outcome::Ongoing {
            return Err(SessionError::GameOver);
        }
        if !actions.is_valid() {
            return Err(SessionError::InvalidActionList);
        }
        if self.pending {
            return Err(SessionError::TurnPending);
        }
        if !actions.is_current(&self.board) {
            return Err(SessionError::StaleActionList);
        }
        if self.turn != self.human || self.board.piece(actions.piece()).alliance() != self.turn {
            return Err(SessionError::NotYourTurn);
        }

        self.commit(actions);
        Ok(())
    }

    /// Commit `actions` and end the turn, letting the opponent reply.
    pub fn play(&mut self, actions: ActionList) -> Result<Outcome, SessionError> {
        self.request_action(actions)?;
        Ok(self.end_turn())
    }

    fn commit(&mut self, actions: ActionList) {
        self.executing = true;
        self.ledger.truncate(self.cursor);
        actions.execute(&mut self.board);
        self.opponent.notify_action(&actions);
        self.ledger.push(actions);
        self.cursor = self.ledger.len();
        self.pending = true;
        self.executing = false;
    }

    /// Refresh both fogs, judge the position and pass the turn. The opponent's
    /// reply, if it is its turn, is played before this returns.
    ///
    /// The human cannot pass: without a committed action this is a no-op.
    pub fn end_turn(&mut self) -> Outcome {
        if self.executing || (self.turn == self.human && !self.pending) {
            return self.outcome;
        }
        if self.finish_turn() {
            self.play_opponent_turns();
        }
        self.outcome
    }

    /// Returns whether the game goes on.
    fn finish_turn(&mut self) -> bool {
        self.refresh_fogs();
        self.pending = false;
        self.outcome = (self.judge)(&self.board);
        if self.outcome != Outcome::Ongoing {
            info!(outcome = ?self.outcome, "game over");
            self.phase = Phase::AwaitingAction;
            return false;
        }
        self.turn = self.turn.opponent();
        info!(turn = %self.turn, ply = self.cursor, "turn passed");
        true
    }

    /// Let the opponent play if an undo or redo left the turn with it.
    pub fn resume_opponent(&mut self) {
        if self.executing || self.turn == self.human {
            return;
        }
        self.play_opponent_turns();
    }

    fn play_opponent_turns(&mut self) {
        while self.turn != self.human && self.outcome == Outcome::Ongoing {
            self.phase = Phase::OpponentTurn;
            match self.opponent.choose_action(&self.board, self.turn) {
                Some(actions) => {
                    info!(opponent = self.opponent.name(), actions = %actions, "opponent moved");
                    self.commit(actions);
                }
                None => warn!(
                    opponent = self.opponent.name(),
                    "opponent has no legal action, passing"
                ),
            }
            if !self.finish_turn() {
                break;
            }
        }
        self.phase = Phase::AwaitingAction;
    }

    /// Revert the most recent applied ledger entry. The turn goes back to its
    /// mover. Returns `false` if there is nothing to undo.
    pub fn undo_previous_action(&mut self) -> bool {
        if self.executing || !self.can_undo() {
            return false;
        }
        self.executing = true;
        self.cursor -= 1;
        let actions = &self.ledger[self.cursor];
        actions.undo(&mut self.board);
        self.turn = self.board.piece(actions.piece()).alliance();
        self.executing = false;
        self.after_history_step();
        info!(cursor = self.cursor, turn = %self.turn, "undo");
        true
    }

    /// Re-apply the next undone ledger entry. The turn passes to the mover's
    /// opponent. Returns `false` if there is nothing to redo.
    pub fn redo_next_action(&mut self) -> bool {
        if self.executing || !self.can_redo() {
            return false;
        }
        self.executing = true;
        let actions = &self.ledger[self.cursor];
        let mover = self.board.piece(actions.piece()).alliance();
        actions.execute(&mut self.board);
        self.cursor += 1;
        self.turn = mover.opponent();
        self.executing = false;
        self.after_history_step();
        info!(cursor = self.cursor, turn = %self.turn, "redo");
        true
    }

    fn after_history_step(&mut self) {
        self.pending = false;
        self.phase = Phase::AwaitingAction;
        self.refresh_fogs();
        self.outcome = (self.judge)(&self.board);
    }

    fn refresh_fogs(&mut self) {
        for fog in &mut self.fogs {
            fog.refresh(&self.board);
        }
        debug!(
            sente = self.fogs[0].visible_count(),
            gote = self.fogs[1].visible_count(),
            "fogs refreshed"
        );
    }
}
