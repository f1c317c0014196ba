//! Loopback Rendezvous
//!
//! An in-process implementation of the signaling boundary. Any number of
//! endpoints register with one [`LoopbackExchange`]; connecting builds a
//! duplex pair of tokio channels between the two endpoints, which gives the
//! ordered, reliable delivery mode the move protocol requires.
//!
//! Used by the integration suite and the exhibition binary. The exchange
//! also exposes fault hooks ([`LoopbackExchange::disrupt`],
//! [`LoopbackExchange::fail_endpoint`]) that model the transport quirks the
//! session core must survive: identity loss on reconnect and unrecoverable
//! signaling failure.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use super::traits::{IncomingOffer, PeerChannel, SessionId, SignalEvent, Signaling};
use crate::link::LinkError;

/// Capacity of per-endpoint event channels and per-link data channels.
const CHANNEL_CAPACITY: usize = 64;

/// Shared registry of live endpoints.
#[derive(Debug, Default)]
struct ExchangeInner {
    peers: DashMap<SessionId, mpsc::Sender<SignalEvent>>,
}

/// An in-process rendezvous shared by all endpoints in one process.
#[derive(Clone, Debug, Default)]
pub struct LoopbackExchange {
    inner: Arc<ExchangeInner>,
}

impl LoopbackExchange {
    /// Create an empty exchange.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh endpoint.
    ///
    /// Returns the command half plus the event receiver. The receiver's
    /// first event is `Opened` with the issued identity.
    #[must_use]
    pub fn endpoint(&self) -> (LoopbackSignaling, mpsc::Receiver<SignalEvent>) {
        let id = SessionId::generate();
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);

        // A fresh channel has room for the greeting.
        let _ = events_tx.try_send(SignalEvent::Opened { id: id.clone() });
        self.inner.peers.insert(id.clone(), events_tx.clone());
        debug!(id = %id, "loopback endpoint registered");

        let signaling = LoopbackSignaling {
            exchange: Arc::clone(&self.inner),
            id: Some(id),
            events: events_tx,
        };
        (signaling, events_rx)
    }

    /// Whether an identity is currently registered.
    #[must_use]
    pub fn is_registered(&self, id: &SessionId) -> bool {
        self.inner.peers.contains_key(id)
    }

    /// Sever an endpoint's registration, as a rendezvous restart would.
    ///
    /// The endpoint receives `Dropped` and its identity is forgotten; only a
    /// seeded reconnect brings it back.
    pub async fn disrupt(&self, id: &SessionId) {
        if let Some((_, events)) = self.inner.peers.remove(id) {
            debug!(id = %id, "loopback endpoint disrupted");
            let _ = events.send(SignalEvent::Dropped).await;
        }
    }

    /// Fail an endpoint unrecoverably.
    pub async fn fail_endpoint(&self, id: &SessionId, reason: &str) {
        if let Some((_, events)) = self.inner.peers.remove(id) {
            let _ = events
                .send(SignalEvent::Failed {
                    reason: reason.to_string(),
                })
                .await;
        }
    }
}

/// Command half of a loopback endpoint.
#[derive(Debug)]
pub struct LoopbackSignaling {
    exchange: Arc<ExchangeInner>,
    id: Option<SessionId>,
    events: mpsc::Sender<SignalEvent>,
}

#[async_trait]
impl Signaling for LoopbackSignaling {
    fn local_id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    async fn connect(&mut self, target: &SessionId) -> Result<PeerChannel, LinkError> {
        let remote = self
            .exchange
            .peers
            .get(target)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LinkError::UnknownPeer(target.clone()))?;

        let local_id = self.id.clone().ok_or(LinkError::SignalingClosed)?;

        let (caller_tx, callee_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (callee_tx, caller_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let offer = IncomingOffer::new(
            local_id.clone(),
            PeerChannel {
                peer: local_id,
                tx: callee_tx,
                rx: callee_rx,
            },
        );
        remote
            .send(SignalEvent::Offer { offer })
            .await
            .map_err(|_| LinkError::SignalingClosed)?;

        Ok(PeerChannel {
            peer: target.clone(),
            tx: caller_tx,
            rx: caller_rx,
        })
    }

    async fn reconnect(&mut self, seed: &SessionId) -> Result<(), LinkError> {
        self.exchange.peers.insert(seed.clone(), self.events.clone());
        self.id = Some(seed.clone());
        debug!(id = %seed, "loopback endpoint re-registered");
        self.events
            .send(SignalEvent::Restored)
            .await
            .map_err(|_| LinkError::SignalingClosed)
    }
}
