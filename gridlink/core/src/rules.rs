//! Rules Engine Adapter
//!
//! Boundary to the deterministic rules computation that owns board legality
//! and outcome detection. The session core never inspects the board through
//! this seam; it hands over applied moves and receives outcome events back
//! through its own queue, so an outcome produced on the same logical step is
//! still processed under run-to-completion semantics.
//!
//! [`GridRules`] is the crate's default engine behind the seam: a plain 3x3
//! legality and win/draw evaluator.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::events::SessionEvent;
use crate::protocol::{Mark, GRID_MAX};

/// Terminal outcome of a match, relative to the local player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The local player won.
    Win,
    /// Nobody won.
    Tie,
    /// The local player lost.
    Loss,
}

/// The deterministic rules computation.
///
/// Implementations receive every applied move in application order (own and
/// opponent's, after the session core validated turn ownership) and report
/// an outcome once the match is decided.
pub trait RulesEngine: Send {
    /// Initialize engine-side state for a fresh match.
    ///
    /// `as_joiner` tells the engine which side is local: the host plays `X`
    /// and moves first.
    fn start_match(&mut self, as_joiner: bool);

    /// Record an applied move and evaluate the position.
    ///
    /// Returns the outcome when this move decides the match.
    fn apply_move(&mut self, row: u8, column: u8) -> Option<Outcome>;
}

/// Adapter between the session core and a [`RulesEngine`].
///
/// Guards against duplicate match starts and forwards any produced outcome
/// into the session event queue as its own event.
pub struct RulesAdapter {
    engine: Box<dyn RulesEngine>,
    events: mpsc::UnboundedSender<SessionEvent>,
    in_flight: bool,
}

impl RulesAdapter {
    /// Wrap an engine, forwarding outcomes into `events`.
    #[must_use]
    pub fn new(engine: Box<dyn RulesEngine>, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            engine,
            events,
            in_flight: false,
        }
    }

    /// Start a match. Ignored with a warning if one is already running.
    pub fn start(&mut self, as_joiner: bool) {
        if self.in_flight {
            warn!("ignoring duplicate match start");
            return;
        }
        debug!(as_joiner, "starting match");
        self.engine.start_match(as_joiner);
        self.in_flight = true;
    }

    /// Feed one applied move to the engine.
    pub fn submit(&mut self, row: u8, column: u8) {
        if !self.in_flight {
            warn!(row, column, "move submitted with no match in flight");
            return;
        }
        if let Some(outcome) = self.engine.apply_move(row, column) {
            self.in_flight = false;
            let _ = self.events.send(SessionEvent::RulesOutcome { outcome });
        }
    }

    /// Whether a match is currently running.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}

/// Winning lines over the flattened 3x3 board (row-major, 0-8).
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// Default deterministic rules engine.
#[derive(Debug, Clone)]
pub struct GridRules {
    board: [Option<Mark>; 9],
    to_move: Mark,
    local: Mark,
    finished: bool,
}

impl GridRules {
    /// Create an engine with no match started.
    #[must_use]
    pub fn new() -> Self {
        Self {
            board: [None; 9],
            to_move: Mark::X,
            local: Mark::X,
            finished: true,
        }
    }

    fn winner(&self) -> Option<Mark> {
        for line in &LINES {
            if let (Some(a), Some(b), Some(c)) = (
                self.board[line[0]],
                self.board[line[1]],
                self.board[line[2]],
            ) {
                if a == b && b == c {
                    return Some(a);
                }
            }
        }
        None
    }

    fn is_full(&self) -> bool {
        self.board.iter().all(Option::is_some)
    }
}

impl Default for GridRules {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesEngine for GridRules {
    fn start_match(&mut self, as_joiner: bool) {
        self.board = [None; 9];
        self.to_move = Mark::X;
        self.local = if as_joiner { Mark::O } else { Mark::X };
        self.finished = false;
    }

    fn apply_move(&mut self, row: u8, column: u8) -> Option<Outcome> {
        if self.finished {
            warn!(row, column, "move after match end ignored");
            return None;
        }
        if row > GRID_MAX || column > GRID_MAX {
            warn!(row, column, "move outside the grid ignored");
            return None;
        }
        let idx = usize::from(row) * 3 + usize::from(column);
        if self.board[idx].is_some() {
            warn!(row, column, "move onto occupied square ignored");
            return None;
        }

        self.board[idx] = Some(self.to_move);
        if let Some(mark) = self.winner() {
            self.finished = true;
            return Some(if mark == self.local {
                Outcome::Win
            } else {
                Outcome::Loss
            });
        }
        if self.is_full() {
            self.finished = true;
            return Some(Outcome::Tie);
        }
        self.to_move = self.to_move.opponent();
        None
    }
}
