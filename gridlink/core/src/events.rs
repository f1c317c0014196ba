//! Session Events
//!
//! Every input the session state machine reacts to, in one flat enum. All
//! producers (the signaling pump, the link pump, the rules adapter, the UI
//! gesture handle) push into a single queue, and each event is handled to
//! completion before the next one is looked at.

use crate::rules::Outcome;
use crate::signaling::{IncomingOffer, SessionId};

/// Inputs consumed by the session state machine.
#[derive(Debug)]
pub enum SessionEvent {
    /// The session driver started; the signaling identity is pending.
    Started,

    /// The signaling collaborator issued an identity.
    SignalOpened {
        /// The identity now registered at the rendezvous.
        id: SessionId,
    },

    /// A remote session offered a connection.
    OfferReceived {
        /// The offer, carrying its channel.
        offer: IncomingOffer,
    },

    /// The active peer link finished opening.
    LinkOpened,

    /// A raw payload arrived on the active link.
    MoveReceived {
        /// The payload text as received.
        payload: String,
    },

    /// The active peer link closed.
    LinkClosed,

    /// The signaling transport dropped; its identity is lost.
    SignalDropped,

    /// The signaling transport was re-established after a drop.
    SignalRestored,

    /// The signaling transport failed unrecoverably.
    SignalFailed {
        /// Human-readable failure description.
        reason: String,
    },

    /// The local player selected a cell.
    CellSelected {
        /// Row index of the gesture.
        row: u8,
        /// Column index of the gesture.
        column: u8,
    },

    /// The rules engine finished initializing the match.
    MatchReady,

    /// The rules engine reported a terminal outcome.
    RulesOutcome {
        /// The outcome, relative to the local player.
        outcome: Outcome,
    },

    /// Stop the session driver loop.
    Shutdown,
}
