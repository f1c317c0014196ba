//! Signaling Traits
//!
//! Core types and the trait every rendezvous implementation provides.
//!
//! Construction of a concrete endpoint returns the command half (the
//! [`Signaling`] implementor) together with a receiver of [`SignalEvent`]s;
//! the session driver bridges those events into its own queue.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::link::LinkError;

/// Identity of a session at the rendezvous: the address a joiner dials.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh identity using a cryptographically random 128-bit value.
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        let bytes: [u8; 16] = rand::thread_rng().gen();
        Self(format!("peer_{}", hex::encode(bytes)))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one incoming offer, for log correlation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OfferId(pub uuid::Uuid);

impl OfferId {
    /// Generate a new offer id.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for OfferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Control and data signals traveling over one direction of a peer channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelSignal {
    /// The channel is established and usable.
    Open,
    /// One text payload.
    Data(String),
    /// The remote side closed the channel.
    Close,
}

/// One end of an established (or establishing) peer channel.
///
/// `tx` sends to the remote side, `rx` receives from it. Both directions are
/// ordered and reliable.
#[derive(Debug)]
pub struct PeerChannel {
    /// Identity of the remote session.
    pub peer: SessionId,
    /// Outbound half.
    pub tx: mpsc::Sender<ChannelSignal>,
    /// Inbound half.
    pub rx: mpsc::Receiver<ChannelSignal>,
}

/// An inbound connection offer, not yet accepted or refused.
///
/// Whoever consumes the offer decides its fate: adopt the channel as the
/// active link, or send a refusal payload and close it.
#[derive(Debug)]
pub struct IncomingOffer {
    /// Correlation id for logging.
    pub id: OfferId,
    /// Identity of the offering session.
    pub from: SessionId,
    /// The channel the offer rides on.
    pub channel: PeerChannel,
}

impl IncomingOffer {
    /// Wrap a channel as a fresh offer.
    #[must_use]
    pub fn new(from: SessionId, channel: PeerChannel) -> Self {
        Self {
            id: OfferId::new(),
            from,
            channel,
        }
    }
}

/// Events from the rendezvous to the session that owns the endpoint.
#[derive(Debug)]
pub enum SignalEvent {
    /// The rendezvous issued (or confirmed) this endpoint's identity.
    Opened {
        /// The identity now registered.
        id: SessionId,
    },
    /// A remote session offered a connection.
    Offer {
        /// The offer, carrying its channel.
        offer: IncomingOffer,
    },
    /// The rendezvous link dropped; the registered identity is lost.
    Dropped,
    /// The rendezvous link was re-established after a drop.
    Restored,
    /// The rendezvous closed the endpoint for good.
    Closed,
    /// The rendezvous failed unrecoverably.
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

/// Command surface of a rendezvous endpoint.
///
/// Events arrive separately, on the receiver handed out when the endpoint
/// was constructed.
#[async_trait]
pub trait Signaling: Send {
    /// The identity currently registered with the rendezvous, if any.
    fn local_id(&self) -> Option<&SessionId>;

    /// Open an ordered, reliable channel to a remote session.
    ///
    /// The returned channel is not yet open for game traffic; the remote
    /// side signals [`ChannelSignal::Open`] once it adopts the offer.
    ///
    /// # Errors
    ///
    /// Fails when the target is unknown to the rendezvous or the rendezvous
    /// itself is gone.
    async fn connect(&mut self, target: &SessionId) -> Result<PeerChannel, LinkError>;

    /// Re-register with the rendezvous after a drop.
    ///
    /// The transport loses its identity across reconnects, so the caller
    /// must seed this with the last identity it observed. Best effort.
    ///
    /// # Errors
    ///
    /// Fails when the rendezvous is unreachable.
    async fn reconnect(&mut self, seed: &SessionId) -> Result<(), LinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId("peer_abc".to_string());
        assert_eq!(format!("{id}"), "peer_abc");
    }

    #[test]
    fn test_offer_id_unique() {
        assert_ne!(OfferId::new(), OfferId::new());
    }
}
