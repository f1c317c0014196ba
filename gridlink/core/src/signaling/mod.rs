//! Signaling Layer
//!
//! The rendezvous boundary: how a session obtains its identity, learns about
//! incoming connection offers, and dials out to a remote session. The
//! session core only ever talks to the [`Signaling`] trait; the concrete
//! rendezvous is a collaborator.
//!
//! Ships with an in-process implementation:
//! - [`LoopbackExchange`]: a rendezvous shared by any number of endpoints in
//!   one process, used by the test suite and the exhibition binary.
//!
//! # Delivery guarantees
//!
//! Peer channels created through this layer are ordered and reliable by
//! construction (tokio mpsc). Move traffic must never travel over an
//! unordered or lossy channel.

pub mod loopback;
pub mod traits;

pub use loopback::{LoopbackExchange, LoopbackSignaling};
pub use traits::{
    ChannelSignal, IncomingOffer, OfferId, PeerChannel, SessionId, SignalEvent, Signaling,
};
