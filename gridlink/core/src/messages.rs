//! Surface Messages
//!
//! Directives sent from the session core to whatever renders it: a board
//! view, a status line, an audio layer. The core performs no rendering or
//! playback of its own; it emits these fire-and-forget over a channel and
//! never queries the surface back.
//!
//! # Design Philosophy
//!
//! Surfaces are dumb. They draw marks where told, show the status text they
//! are handed, and play the cues they receive. All decisions stay in the
//! session state machine.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::protocol::Mark;

/// Audio cues the surface may play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// A mark was placed (own or opponent's).
    Move,
    /// The local player won the match.
    Victory,
}

/// Messages from the session core to a surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SurfaceMessage {
    /// The human status line changed.
    StatusChanged {
        /// New status text.
        text: String,
    },

    /// The session entered a new phase.
    PhaseChanged {
        /// The phase just entered.
        phase: Phase,
    },

    /// A mark was applied to the board.
    MarkPlaced {
        /// Row index, 0..=2.
        row: u8,
        /// Column index, 0..=2.
        column: u8,
        /// The mark to draw.
        mark: Mark,
    },

    /// The surface should play a sound.
    SoundCue {
        /// Which cue.
        cue: SoundCue,
    },

    /// The turn counter advanced.
    TurnAdvanced {
        /// Total turns so far, both sides included.
        count: u32,
    },

    /// The host's invite URL is ready to share.
    InvitePublished {
        /// Full shareable URL carrying the session id.
        url: String,
    },
}
