//! Session State Machine
//!
//! The authoritative phase tracker and event dispatcher for one match
//! between two participants. The machine is split in two layers:
//!
//! - [`transition`]: a pure function `(SessionState, SessionEvent) ->
//!   (SessionState, Vec<Effect>)`. All phase logic lives here, auditable and
//!   testable without any I/O.
//! - [`Session`]: the driver. It owns the collaborators (link manager, rules
//!   adapter, signaling endpoint, surface channel), applies the transition
//!   for each event, then executes the returned effects in order.
//!
//! Every producer pushes into one queue and each event is handled to
//! completion before the next, so transitions are atomic with respect to
//! other events.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::events::SessionEvent;
use crate::link::{LinkManager, RefusalReason};
use crate::messages::{SoundCue, SurfaceMessage};
use crate::phase::Phase;
use crate::protocol::{decode_move, encode_move, Mark, MoveMessage, GRID_MAX};
use crate::rules::{Outcome, RulesAdapter, RulesEngine};
use crate::share;
use crate::signaling::{IncomingOffer, SessionId, SignalEvent, Signaling};

/// Which side of the session this participant is.
///
/// Assigned once when the signaling identity arrives; immutable thereafter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Created the session and shares the invite. Plays `X`, moves first.
    Host,
    /// Joined through a shared invite. Plays `O`, moves second.
    Joiner,
}

impl Role {
    /// The mark this role plays.
    #[must_use]
    pub fn mark(self) -> Mark {
        match self {
            Self::Host => Mark::X,
            Self::Joiner => Mark::O,
        }
    }

    /// Whether this role makes the first move of a match.
    #[must_use]
    pub fn moves_first(self) -> bool {
        matches!(self, Self::Host)
    }
}

/// Local mirror of the board, tracking occupancy only.
///
/// Legality and outcomes belong to the rules engine; this mirror exists so
/// gestures on occupied cells can be ignored without a round trip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoardMirror {
    cells: [Option<Mark>; 9],
}

impl BoardMirror {
    fn index(row: u8, column: u8) -> usize {
        usize::from(row) * 3 + usize::from(column)
    }

    /// Whether a cell already carries a mark.
    #[must_use]
    pub fn occupied(&self, row: u8, column: u8) -> bool {
        self.cells[Self::index(row, column)].is_some()
    }

    /// The mark at a cell, if any.
    #[must_use]
    pub fn mark_at(&self, row: u8, column: u8) -> Option<Mark> {
        self.cells[Self::index(row, column)]
    }

    fn place(&mut self, row: u8, column: u8, mark: Mark) {
        self.cells[Self::index(row, column)] = Some(mark);
    }

    fn clear(&mut self) {
        self.cells = [None; 9];
    }
}

/// Plain-data state consumed and produced by [`transition`].
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    /// Current phase.
    pub phase: Phase,
    /// Assigned role, once known.
    pub role: Option<Role>,
    /// Occupancy mirror of the board.
    pub board: BoardMirror,
    /// Turn counter, both sides included.
    pub turns: u32,
    /// Last identity observed from the rendezvous; seeds reconnects.
    pub signal_id: Option<SessionId>,
    /// Connect target carried by the launch URL, if any.
    pub invite: Option<SessionId>,
    /// Phase to resume after a successful signaling reconnect.
    pub resume_phase: Option<Phase>,
}

impl SessionState {
    /// Fresh state, optionally seeded with an invite target.
    #[must_use]
    pub fn new(invite: Option<SessionId>) -> Self {
        Self {
            phase: Phase::Idle,
            role: None,
            board: BoardMirror::default(),
            turns: 0,
            signal_id: None,
            invite,
            resume_phase: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Work the driver performs after a transition commits.
///
/// Effects are executed strictly in the order returned.
#[derive(Debug)]
pub enum Effect {
    /// Emit a surface message.
    Notify(SurfaceMessage),
    /// Dial out to a remote session.
    ConnectTo(SessionId),
    /// Publish the local id as a shareable invite.
    PublishInvite(SessionId),
    /// Adopt an incoming offer as the active link.
    AcceptOffer(IncomingOffer),
    /// Refuse an incoming offer, leaving the active link untouched.
    RefuseOffer(IncomingOffer, RefusalReason),
    /// Encode and transmit a move on the active link.
    TransmitMove(MoveMessage),
    /// Initialize the rules engine for a fresh match.
    EngineStart {
        /// Whether the local side is the joiner.
        as_joiner: bool,
    },
    /// Feed an applied move to the rules engine.
    EngineMove {
        /// Row index of the applied move.
        row: u8,
        /// Column index of the applied move.
        column: u8,
    },
    /// Re-register with the rendezvous after a drop.
    Reconnect {
        /// The last-known identity to reuse.
        seed: SessionId,
    },
}

/// Enter a phase: record it and emit its notifications.
fn enter(state: &mut SessionState, effects: &mut Vec<Effect>, phase: Phase) {
    state.phase = phase;
    effects.push(Effect::Notify(SurfaceMessage::PhaseChanged { phase }));
    if let Some(text) = phase.status_line() {
        effects.push(Effect::Notify(SurfaceMessage::StatusChanged {
            text: text.to_string(),
        }));
    }
}

fn status(effects: &mut Vec<Effect>, text: &str) {
    effects.push(Effect::Notify(SurfaceMessage::StatusChanged {
        text: text.to_string(),
    }));
}

fn advance_turn(state: &mut SessionState, effects: &mut Vec<Effect>) {
    state.turns += 1;
    effects.push(Effect::Notify(SurfaceMessage::TurnAdvanced {
        count: state.turns,
    }));
}

/// The pure transition function of the session state machine.
///
/// `link_open` is the link manager's view of the active link, consulted when
/// deciding the fate of incoming offers. The function never performs I/O;
/// everything observable is returned as [`Effect`]s for the driver.
#[must_use]
pub fn transition(
    mut state: SessionState,
    link_open: bool,
    event: SessionEvent,
) -> (SessionState, Vec<Effect>) {
    let mut effects = Vec::new();

    match event {
        SessionEvent::Started => {
            if state.phase == Phase::Idle {
                enter(&mut state, &mut effects, Phase::AwaitingSignalId);
            }
        }

        SessionEvent::SignalOpened { id } => {
            // Remember the identity across its lifetime; reconnects reuse it.
            state.signal_id = Some(id.clone());
            if state.phase == Phase::AwaitingSignalId {
                if let Some(target) = state.invite.clone() {
                    state.role = Some(Role::Joiner);
                    enter(&mut state, &mut effects, Phase::RoleAssigned);
                    status(&mut effects, "Connecting to peer...");
                    effects.push(Effect::ConnectTo(target));
                } else {
                    state.role = Some(Role::Host);
                    enter(&mut state, &mut effects, Phase::RoleAssigned);
                    status(&mut effects, "Share the URL!");
                    effects.push(Effect::PublishInvite(id));
                }
            }
        }

        SessionEvent::OfferReceived { offer } => {
            let accepts = state.role == Some(Role::Host)
                && !link_open
                && state.phase != Phase::Failed;
            if accepts {
                // Fresh match on the new link, including after a close.
                state.board.clear();
                state.turns = 0;
                state.resume_phase = None;
                effects.push(Effect::AcceptOffer(offer));
                enter(&mut state, &mut effects, Phase::AwaitingPeer);
            } else {
                let reason = if state.role == Some(Role::Joiner) {
                    RefusalReason::JoinerInbound
                } else {
                    RefusalReason::AlreadyLinked
                };
                effects.push(Effect::RefuseOffer(offer, reason));
            }
        }

        SessionEvent::LinkOpened => {
            let expecting = state.phase == Phase::AwaitingPeer
                || (state.phase == Phase::RoleAssigned && state.role == Some(Role::Joiner));
            if expecting {
                enter(&mut state, &mut effects, Phase::MatchStarting);
                effects.push(Effect::EngineStart {
                    as_joiner: state.role == Some(Role::Joiner),
                });
            } else {
                debug!(phase = ?state.phase, "unexpected link open ignored");
            }
        }

        SessionEvent::MatchReady => {
            if state.phase == Phase::MatchStarting {
                let first = state.role.is_some_and(Role::moves_first);
                let next = if first { Phase::MyTurn } else { Phase::OpponentTurn };
                enter(&mut state, &mut effects, next);
                advance_turn(&mut state, &mut effects);
            }
        }

        SessionEvent::CellSelected { row, column } => {
            if state.phase != Phase::MyTurn {
                debug!(row, column, phase = ?state.phase, "gesture outside own turn ignored");
            } else if row > GRID_MAX || column > GRID_MAX {
                warn!(row, column, "gesture outside the grid ignored");
            } else if state.board.occupied(row, column) {
                debug!(row, column, "gesture on occupied cell ignored");
            } else if let Some(mark) = state.role.map(Role::mark) {
                state.board.place(row, column, mark);
                effects.push(Effect::Notify(SurfaceMessage::MarkPlaced {
                    row,
                    column,
                    mark,
                }));
                effects.push(Effect::Notify(SurfaceMessage::SoundCue {
                    cue: SoundCue::Move,
                }));
                effects.push(Effect::TransmitMove(MoveMessage::new(mark, row, column)));
                enter(&mut state, &mut effects, Phase::OpponentTurn);
                advance_turn(&mut state, &mut effects);
                effects.push(Effect::EngineMove { row, column });
            }
        }

        SessionEvent::MoveReceived { payload } => match state.phase {
            Phase::MyTurn => {
                // A message here means the remote moved out of turn.
                warn!("out-of-turn move from peer dropped");
            }
            Phase::OpponentTurn => match decode_move(&payload) {
                Ok(msg) => {
                    state.board.place(msg.row, msg.column, msg.symbol);
                    effects.push(Effect::Notify(SurfaceMessage::MarkPlaced {
                        row: msg.row,
                        column: msg.column,
                        mark: msg.symbol,
                    }));
                    effects.push(Effect::Notify(SurfaceMessage::SoundCue {
                        cue: SoundCue::Move,
                    }));
                    enter(&mut state, &mut effects, Phase::MyTurn);
                    advance_turn(&mut state, &mut effects);
                    effects.push(Effect::EngineMove {
                        row: msg.row,
                        column: msg.column,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "malformed move dropped");
                }
            },
            _ => {
                debug!(phase = ?state.phase, "peer data outside a turn ignored");
            }
        },

        SessionEvent::RulesOutcome { outcome } => {
            if state.phase.in_match() {
                match outcome {
                    Outcome::Win => {
                        enter(&mut state, &mut effects, Phase::Won);
                        effects.push(Effect::Notify(SurfaceMessage::SoundCue {
                            cue: SoundCue::Victory,
                        }));
                    }
                    Outcome::Tie => enter(&mut state, &mut effects, Phase::Tied),
                    Outcome::Loss => enter(&mut state, &mut effects, Phase::Lost),
                }
            } else {
                warn!(?outcome, phase = ?state.phase, "outcome outside a match ignored");
            }
        }

        SessionEvent::LinkClosed => {
            if !matches!(state.phase, Phase::Closed | Phase::Failed) {
                enter(&mut state, &mut effects, Phase::Closed);
            }
        }

        SessionEvent::SignalDropped => {
            if state.phase != Phase::Failed {
                if !state.phase.is_terminal() {
                    state.resume_phase = Some(state.phase);
                }
                enter(&mut state, &mut effects, Phase::Disconnected);
                if let Some(seed) = state.signal_id.clone() {
                    effects.push(Effect::Reconnect { seed });
                } else {
                    warn!("signaling dropped before an identity was issued");
                }
            }
        }

        SessionEvent::SignalRestored => {
            if state.phase == Phase::Disconnected {
                if let Some(resume) = state.resume_phase.take() {
                    enter(&mut state, &mut effects, resume);
                }
            } else {
                debug!(phase = ?state.phase, "signal restore outside a disconnect ignored");
            }
        }

        SessionEvent::SignalFailed { reason } => {
            if state.phase != Phase::Failed {
                warn!(reason = %reason, "signaling failed");
                enter(&mut state, &mut effects, Phase::Failed);
            }
        }

        SessionEvent::Shutdown => {
            // Handled by the driver loop; nothing to transition.
        }
    }

    (state, effects)
}

/// Handle for pushing inputs into a running session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Report a local gesture at `(row, column)`.
    pub fn select_cell(&self, row: u8, column: u8) {
        let _ = self.events.send(SessionEvent::CellSelected { row, column });
    }

    /// Push a raw session event.
    pub fn send(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Stop the session driver loop.
    pub fn shutdown(&self) {
        let _ = self.events.send(SessionEvent::Shutdown);
    }
}

/// The session driver: pure transitions plus effect execution.
pub struct Session {
    state: SessionState,
    config: CoreConfig,
    link: LinkManager,
    rules: RulesAdapter,
    signaling: Box<dyn Signaling>,
    surface: mpsc::Sender<SurfaceMessage>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Session {
    /// Build a session around a signaling endpoint and a rules engine.
    ///
    /// The launch URL decides the role: if it carries the invite parameter,
    /// this side joins the referenced session; otherwise it hosts.
    ///
    /// Returns the session together with an input handle and the surface
    /// message receiver.
    #[must_use]
    pub fn new(
        config: CoreConfig,
        signaling: Box<dyn Signaling>,
        engine: Box<dyn RulesEngine>,
        launch_url: Option<&str>,
    ) -> (Self, SessionHandle, mpsc::Receiver<SurfaceMessage>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (surface_tx, surface_rx) = mpsc::channel(config.surface_capacity);

        let invite =
            launch_url.and_then(|launch| share::invite_target(launch, &config.invite_param));
        let link = LinkManager::new(events_tx.clone(), config.refusal_grace());
        let rules = RulesAdapter::new(engine, events_tx.clone());

        let session = Self {
            state: SessionState::new(invite),
            config,
            link,
            rules,
            signaling,
            surface: surface_tx,
            events_tx: events_tx.clone(),
            events_rx,
        };
        let handle = SessionHandle { events: events_tx };
        (session, handle, surface_rx)
    }

    /// Bridge a signaling event stream into the session queue.
    pub fn attach_signals(&self, mut signals: mpsc::Receiver<SignalEvent>) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                let mapped = match signal {
                    SignalEvent::Opened { id } => SessionEvent::SignalOpened { id },
                    SignalEvent::Offer { offer } => SessionEvent::OfferReceived { offer },
                    SignalEvent::Dropped => SessionEvent::SignalDropped,
                    SignalEvent::Restored => SessionEvent::SignalRestored,
                    SignalEvent::Closed => SessionEvent::LinkClosed,
                    SignalEvent::Failed { reason } => SessionEvent::SignalFailed { reason },
                };
                if events.send(mapped).is_err() {
                    break;
                }
            }
        });
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Current machine state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// A fresh input handle.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            events: self.events_tx.clone(),
        }
    }

    /// Apply one event: transition, then execute the effects in order.
    ///
    /// # Errors
    ///
    /// Fails only on effect execution errors that indicate a programming
    /// mistake; all expected trouble (malformed moves, refused offers,
    /// reconnect failures) is absorbed and logged.
    pub async fn handle_event(&mut self, event: SessionEvent) -> anyhow::Result<()> {
        // The pump already saw the close; drop our side of the link before
        // the transition consults `is_open`.
        if matches!(event, SessionEvent::LinkClosed) {
            self.link.reset();
        }

        let (next, effects) = transition(self.state.clone(), self.link.is_open(), event);
        self.state = next;
        for effect in effects {
            self.apply_effect(effect).await;
        }
        Ok(())
    }

    /// Run the driver loop until shutdown or all senders are gone.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Session::handle_event`].
    pub async fn run(mut self) -> anyhow::Result<()> {
        let _ = self.events_tx.send(SessionEvent::Started);
        while let Some(event) = self.events_rx.recv().await {
            if matches!(event, SessionEvent::Shutdown) {
                debug!("session shutting down");
                break;
            }
            self.handle_event(event).await?;
        }
        Ok(())
    }

    async fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Notify(msg) => {
                if self.surface.send(msg).await.is_err() {
                    debug!("surface receiver gone; dropping message");
                }
            }

            Effect::ConnectTo(target) => match self.signaling.connect(&target).await {
                Ok(channel) => self.link.install_outbound(channel),
                Err(e) => {
                    // Connect failures fold into the failure path rather
                    // than surfacing as a hard error.
                    warn!(peer = %target, error = %e, "connect attempt failed");
                    let _ = self.events_tx.send(SessionEvent::SignalFailed {
                        reason: e.to_string(),
                    });
                }
            },

            Effect::PublishInvite(id) => {
                match share::invite_url(&self.config.invite_base, &self.config.invite_param, &id)
                {
                    Ok(url) => {
                        if self
                            .surface
                            .send(SurfaceMessage::InvitePublished { url })
                            .await
                            .is_err()
                        {
                            debug!("surface receiver gone; dropping invite");
                        }
                    }
                    Err(e) => warn!(error = %e, "invite base URL is unusable"),
                }
            }

            Effect::AcceptOffer(offer) => self.link.adopt(offer),

            Effect::RefuseOffer(offer, reason) => self.link.refuse(offer, reason),

            Effect::TransmitMove(msg) => match encode_move(&msg) {
                Ok(payload) => self.link.send_payload(payload).await,
                Err(e) => warn!(error = %e, "failed to encode move"),
            },

            Effect::EngineStart { as_joiner } => {
                self.rules.start(as_joiner);
                let _ = self.events_tx.send(SessionEvent::MatchReady);
            }

            Effect::EngineMove { row, column } => self.rules.submit(row, column),

            Effect::Reconnect { seed } => {
                if let Err(e) = self.signaling.reconnect(&seed).await {
                    // Best effort: stay disconnected until something changes.
                    warn!(seed = %seed, error = %e, "reconnect attempt failed");
                }
            }
        }
    }
}
