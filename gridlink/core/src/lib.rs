//! GridLink Core - Headless Session Core for Peer-to-Peer Grid Duels
//!
//! This crate provides the session lifecycle and turn-synchronization logic
//! for a two-player grid duel played over a direct point-to-point channel,
//! completely independent of any UI framework. One side hosts and shares an
//! invite; the other joins through it. The core assigns roles and turn
//! order, moves encoded moves across the link, polices turn ownership, and
//! drives an external deterministic rules engine that decides outcomes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Surfaces                              │
//! │        board renderer · status line · audio layer             │
//! │                            ▲                                  │
//! │                    SurfaceMessage (up)                        │
//! │                    gestures via SessionHandle (down)          │
//! └────────────────────────────┼─────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼─────────────────────────────────┐
//! │                      SESSION CORE                             │
//! │  ┌─────────────────────────┴───────────────────────────────┐ │
//! │  │                       Session                            │ │
//! │  │  ┌───────────┐  ┌────────────┐  ┌──────────────────────┐ │ │
//! │  │  │   Link    │  │   Rules    │  │  transition():       │ │ │
//! │  │  │  Manager  │  │  Adapter   │  │  pure state machine  │ │ │
//! │  │  └─────┬─────┘  └─────┬──────┘  └──────────────────────┘ │ │
//! │  └────────┼──────────────┼─────────────────────────────────┘ │
//! │           │              │                                    │
//! │      Signaling       RulesEngine                              │
//! │      (rendezvous)    (deterministic module)                   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Session`]: the driver owning collaborators and executing effects
//! - [`transition`]: the pure `(state, event) -> (state, effects)` function
//! - [`SessionEvent`]: every input the machine reacts to
//! - [`SurfaceMessage`]: directives to whatever renders the session
//! - [`LinkManager`]: owner of the single active peer link
//! - [`Signaling`]: the rendezvous boundary, with a loopback implementation
//! - [`RulesEngine`]: the deterministic rules module boundary
//!
//! # Quick Start
//!
//! ```ignore
//! use gridlink_core::{CoreConfig, GridRules, LoopbackExchange, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let exchange = LoopbackExchange::new();
//!     let (signaling, signals) = exchange.endpoint();
//!
//!     let (session, handle, mut surface) = Session::new(
//!         CoreConfig::default(),
//!         Box::new(signaling),
//!         Box::new(GridRules::new()),
//!         None, // no invite in the launch URL: this side hosts
//!     );
//!     session.attach_signals(signals);
//!     tokio::spawn(session.run());
//!
//!     while let Some(msg) = surface.recv().await {
//!         // Render the message; feed gestures back via `handle`.
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency Model
//!
//! Single logical event loop: every producer (signaling pump, link pump,
//! rules adapter, gesture handle) pushes into one queue, and each event is
//! handled to completion before the next. Only the refusal-close path is
//! timed; a silent peer leaves the session in its current phase until the
//! transport says otherwise.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod events;
pub mod link;
pub mod messages;
pub mod phase;
pub mod protocol;
pub mod rules;
pub mod session;
pub mod share;
pub mod signaling;

// Re-exports for convenience
pub use config::{ConfigError, CoreConfig};
pub use events::SessionEvent;
pub use link::{LinkError, LinkManager, PeerLink, RefusalReason};
pub use messages::{SoundCue, SurfaceMessage};
pub use phase::Phase;
pub use protocol::{decode_move, encode_move, Mark, MoveCodecError, MoveMessage, GRID_MAX};
pub use rules::{GridRules, Outcome, RulesAdapter, RulesEngine};
pub use session::{transition, BoardMirror, Effect, Role, Session, SessionHandle, SessionState};
pub use share::{invite_target, invite_url};
pub use signaling::{
    ChannelSignal, IncomingOffer, LoopbackExchange, LoopbackSignaling, OfferId, PeerChannel,
    SessionId, SignalEvent, Signaling,
};
