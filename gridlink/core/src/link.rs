//! Connection Lifecycle Manager
//!
//! Owns the single active peer link for a session: adopting or refusing
//! incoming offers, installing outbound channels, sending payloads, and
//! translating raw channel signals into the lifecycle events the session
//! state machine consumes.
//!
//! # Singleton invariant
//!
//! At most one link is open at a time. A second incoming offer while one is
//! open never touches the active link; it is answered with a refusal payload
//! and closed after a short grace delay so the payload can flush.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::events::SessionEvent;
use crate::signaling::{ChannelSignal, IncomingOffer, PeerChannel, SessionId};

/// Errors from the link layer.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No session is registered under the dialed identity.
    #[error("no peer registered under {0}")]
    UnknownPeer(SessionId),
    /// The rendezvous is gone.
    #[error("signaling channel closed")]
    SignalingClosed,
    /// The peer link is gone.
    #[error("peer link closed")]
    ChannelClosed,
    /// No link is currently open.
    #[error("no open link")]
    NotConnected,
}

/// Why an incoming offer was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefusalReason {
    /// Joiners never accept inbound offers.
    JoinerInbound,
    /// A link is already open.
    AlreadyLinked,
}

impl RefusalReason {
    /// The payload text sent back on the refused channel.
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::JoinerInbound => "Sender does not accept incoming connections",
            Self::AlreadyLinked => "Already connected to another client",
        }
    }
}

/// Handle to the active peer link.
///
/// Cheap to clone the parts that matter: the sender half plus a shared open
/// flag maintained by the pump task.
#[derive(Debug)]
pub struct PeerLink {
    peer: SessionId,
    tx: mpsc::Sender<ChannelSignal>,
    open: Arc<AtomicBool>,
}

impl PeerLink {
    /// Identity of the remote session.
    #[must_use]
    pub fn peer(&self) -> &SessionId {
        &self.peer
    }

    /// Whether the link is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Send one payload to the remote side.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ChannelClosed`] when the remote half is gone.
    pub async fn send(&self, payload: String) -> Result<(), LinkError> {
        self.tx
            .send(ChannelSignal::Data(payload))
            .await
            .map_err(|_| LinkError::ChannelClosed)
    }

    /// Close the link from this side.
    pub async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.tx.send(ChannelSignal::Close).await;
    }
}

/// Spawn the pump translating channel signals into session events.
///
/// The pump reports `LinkOpened` exactly once (when the open flag flips),
/// forwards data, and reports `LinkClosed` when the channel closes or its
/// sender side is dropped.
fn spawn_pump(
    mut rx: mpsc::Receiver<ChannelSignal>,
    open: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    tokio::spawn(async move {
        let mut closed_cleanly = false;
        while let Some(signal) = rx.recv().await {
            match signal {
                ChannelSignal::Open => {
                    if !open.swap(true, Ordering::SeqCst)
                        && events.send(SessionEvent::LinkOpened).is_err()
                    {
                        return;
                    }
                }
                ChannelSignal::Data(payload) => {
                    if events.send(SessionEvent::MoveReceived { payload }).is_err() {
                        return;
                    }
                }
                ChannelSignal::Close => {
                    closed_cleanly = true;
                    break;
                }
            }
        }
        // Either an explicit close or the remote dropped its sender.
        if open.swap(false, Ordering::SeqCst) || closed_cleanly {
            let _ = events.send(SessionEvent::LinkClosed);
        }
    });
}

/// Owner of the single active peer link.
#[derive(Debug)]
pub struct LinkManager {
    active: Option<PeerLink>,
    events: mpsc::UnboundedSender<SessionEvent>,
    refusal_grace: Duration,
}

impl LinkManager {
    /// Create a manager feeding lifecycle events into `events`.
    #[must_use]
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>, refusal_grace: Duration) -> Self {
        Self {
            active: None,
            events,
            refusal_grace,
        }
    }

    /// Whether a link is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.active.as_ref().is_some_and(PeerLink::is_open)
    }

    /// Identity of the connected peer, if any.
    #[must_use]
    pub fn peer(&self) -> Option<&SessionId> {
        self.active.as_ref().map(PeerLink::peer)
    }

    /// Adopt an incoming offer as the active link (host side).
    ///
    /// Adoption counts as the link opening: the remote side is signaled
    /// `Open` and a `LinkOpened` event is queued locally.
    pub fn adopt(&mut self, offer: IncomingOffer) {
        debug!(offer = %offer.id, from = %offer.from, "adopting incoming offer");
        self.replace_active(offer.channel, true);
    }

    /// Install an outbound channel as the active link (joiner side).
    ///
    /// The link is not yet open; `LinkOpened` fires when the remote side
    /// adopts the offer and its `Open` signal arrives.
    pub fn install_outbound(&mut self, channel: PeerChannel) {
        debug!(peer = %channel.peer, "installing outbound channel");
        self.replace_active(channel, false);
    }

    fn replace_active(&mut self, channel: PeerChannel, opened_here: bool) {
        if let Some(old) = self.active.take() {
            // One link at a time. The stale one is told to close.
            tokio::spawn(async move { old.close().await });
        }

        let open = Arc::new(AtomicBool::new(opened_here));
        let link = PeerLink {
            peer: channel.peer,
            tx: channel.tx,
            open: Arc::clone(&open),
        };
        if opened_here {
            let remote = link.tx.clone();
            tokio::spawn(async move {
                let _ = remote.send(ChannelSignal::Open).await;
            });
            let _ = self.events.send(SessionEvent::LinkOpened);
        }
        spawn_pump(channel.rx, open, self.events.clone());
        self.active = Some(link);
    }

    /// Refuse an incoming offer without touching the active link.
    ///
    /// Sends the refusal payload, waits out the grace delay so the payload
    /// can flush, then closes the refused channel.
    pub fn refuse(&self, offer: IncomingOffer, reason: RefusalReason) {
        warn!(
            offer = %offer.id,
            from = %offer.from,
            reason = reason.text(),
            "refusing incoming offer"
        );
        let grace = self.refusal_grace;
        let channel = offer.channel;
        tokio::spawn(async move {
            let _ = channel.tx.send(ChannelSignal::Open).await;
            let _ = channel
                .tx
                .send(ChannelSignal::Data(reason.text().to_string()))
                .await;
            sleep(grace).await;
            let _ = channel.tx.send(ChannelSignal::Close).await;
            // rx is dropped here; the refused side sees the channel end.
        });
    }

    /// Send a payload on the active link.
    ///
    /// A missing or closed link is not an error: the payload is dropped
    /// with a warning, since the state machine never legitimately sends
    /// outside an open match.
    pub async fn send_payload(&self, payload: String) {
        match &self.active {
            Some(link) if link.is_open() => {
                if let Err(e) = link.send(payload).await {
                    warn!(error = %e, "failed to send on active link");
                }
            }
            _ => warn!("dropping payload: no open link"),
        }
    }

    /// Forget the active link after it closed.
    pub fn reset(&mut self) {
        self.active = None;
    }
}
