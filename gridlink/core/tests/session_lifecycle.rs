//! Integration tests for the session lifecycle
//!
//! These tests wire two (sometimes three) full sessions over the loopback
//! rendezvous and verify realistic end-to-end flows:
//! - Invite handshake, role assignment, and first-turn order
//! - Full matches ending in win/loss and in a tie
//! - Duplicate connection attempts refused without disturbing the match
//! - Out-of-turn and malformed payloads dropped without killing the session
//! - Signaling disconnect and seeded reconnect mid-match

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio::time::timeout;

use gridlink_core::{
    invite_target, CoreConfig, GridRules, LoopbackExchange, Mark, Phase, Session, SessionEvent,
    SessionHandle, SurfaceMessage,
};

const WAIT: Duration = Duration::from_secs(2);

/// One side of a running match: its input handle and surface stream.
struct Side {
    handle: SessionHandle,
    surface: mpsc::Receiver<SurfaceMessage>,
}

async fn next_message(surface: &mut mpsc::Receiver<SurfaceMessage>) -> SurfaceMessage {
    timeout(WAIT, surface.recv())
        .await
        .expect("timed out waiting for a surface message")
        .expect("surface channel closed")
}

/// Consume surface traffic until the given phase is announced.
async fn await_phase(surface: &mut mpsc::Receiver<SurfaceMessage>, expected: Phase) {
    loop {
        if let SurfaceMessage::PhaseChanged { phase } = next_message(surface).await {
            if phase == expected {
                return;
            }
        }
    }
}

/// Consume surface traffic until a status line matches.
async fn await_status(surface: &mut mpsc::Receiver<SurfaceMessage>, expected: &str) {
    loop {
        if let SurfaceMessage::StatusChanged { text } = next_message(surface).await {
            if text == expected {
                return;
            }
        }
    }
}

/// Consume surface traffic until the next mark placement.
async fn await_mark(surface: &mut mpsc::Receiver<SurfaceMessage>) -> (u8, u8, Mark) {
    loop {
        if let SurfaceMessage::MarkPlaced { row, column, mark } = next_message(surface).await {
            return (row, column, mark);
        }
    }
}

fn quick_config() -> CoreConfig {
    CoreConfig {
        refusal_grace_ms: 25,
        ..CoreConfig::default()
    }
}

async fn start_host(exchange: &LoopbackExchange, config: CoreConfig) -> (Side, String) {
    let (signaling, signals) = exchange.endpoint();
    let (session, handle, mut surface) = Session::new(
        config,
        Box::new(signaling),
        Box::new(GridRules::new()),
        None,
    );
    session.attach_signals(signals);
    tokio::spawn(session.run());

    let url = loop {
        if let SurfaceMessage::InvitePublished { url } = next_message(&mut surface).await {
            break url;
        }
    };
    (Side { handle, surface }, url)
}

async fn start_joiner(exchange: &LoopbackExchange, config: CoreConfig, url: &str) -> Side {
    let (signaling, signals) = exchange.endpoint();
    let (session, handle, surface) = Session::new(
        config,
        Box::new(signaling),
        Box::new(GridRules::new()),
        Some(url),
    );
    session.attach_signals(signals);
    tokio::spawn(session.run());
    Side { handle, surface }
}

/// Bring up a full match: host in `MyTurn`, joiner in `OpponentTurn`.
async fn start_match(exchange: &LoopbackExchange) -> (Side, Side, String) {
    let (mut host, url) = start_host(exchange, quick_config()).await;
    let mut joiner = start_joiner(exchange, quick_config(), &url).await;
    await_phase(&mut host.surface, Phase::MyTurn).await;
    await_phase(&mut joiner.surface, Phase::OpponentTurn).await;
    (host, joiner, url)
}

/// Play one move on `mover` and wait until both sides rendered it.
async fn play(mover: &mut Side, watcher: &mut Side, row: u8, column: u8, mark: Mark) {
    mover.handle.select_cell(row, column);
    let own = await_mark(&mut mover.surface).await;
    assert_eq!(own, (row, column, mark));
    let applied = await_mark(&mut watcher.surface).await;
    assert_eq!(applied, (row, column, mark));
}

// =============================================================================
// Handshake
// =============================================================================

#[tokio::test]
async fn test_invite_handshake_assigns_roles_and_turn_order() {
    let exchange = LoopbackExchange::new();
    let (mut host, url) = start_host(&exchange, quick_config()).await;

    // The invite URL carries the host's session id.
    let target = invite_target(&url, "game").expect("invite URL should carry the session id");
    assert!(exchange.is_registered(&target));

    let mut joiner = start_joiner(&exchange, quick_config(), &url).await;

    // Host moves first, joiner waits.
    await_phase(&mut host.surface, Phase::MyTurn).await;
    await_status(&mut host.surface, "Move").await;
    await_phase(&mut joiner.surface, Phase::OpponentTurn).await;
    await_status(&mut joiner.surface, "Wait").await;
}

// =============================================================================
// Full matches
// =============================================================================

#[tokio::test]
async fn test_full_match_host_wins_top_row() {
    let exchange = LoopbackExchange::new();
    let (mut host, mut joiner, _url) = start_match(&exchange).await;

    play(&mut host, &mut joiner, 0, 0, Mark::X).await;
    play(&mut joiner, &mut host, 1, 1, Mark::O).await;
    play(&mut host, &mut joiner, 0, 1, Mark::X).await;
    play(&mut joiner, &mut host, 2, 2, Mark::O).await;
    play(&mut host, &mut joiner, 0, 2, Mark::X).await;

    await_phase(&mut host.surface, Phase::Won).await;
    await_status(&mut host.surface, "You are the winner!").await;
    await_phase(&mut joiner.surface, Phase::Lost).await;
    await_status(&mut joiner.surface, "You lost! Game over.").await;
}

#[tokio::test]
async fn test_tie_after_ninth_move() {
    let exchange = LoopbackExchange::new();
    let (mut host, mut joiner, _url) = start_match(&exchange).await;

    // X O X
    // X O O
    // O X X
    let script: [(u8, u8); 9] = [
        (0, 0),
        (0, 1),
        (0, 2),
        (1, 1),
        (1, 0),
        (1, 2),
        (2, 1),
        (2, 0),
        (2, 2),
    ];
    for (i, (row, column)) in script.into_iter().enumerate() {
        if i % 2 == 0 {
            play(&mut host, &mut joiner, row, column, Mark::X).await;
        } else {
            play(&mut joiner, &mut host, row, column, Mark::O).await;
        }
    }

    await_phase(&mut host.surface, Phase::Tied).await;
    await_status(&mut host.surface, "Tie.").await;
    await_phase(&mut joiner.surface, Phase::Tied).await;
    await_status(&mut joiner.surface, "Tie.").await;
}

// =============================================================================
// Duplicate connection attempts
// =============================================================================

#[tokio::test]
async fn test_second_offer_refused_and_match_unaffected() {
    let exchange = LoopbackExchange::new();
    let (mut host, mut joiner, url) = start_match(&exchange).await;

    // A third participant dials the same invite while the match runs.
    let mut intruder = start_joiner(&exchange, quick_config(), &url).await;

    // The intruder is turned away: its channel ends after the grace delay.
    await_phase(&mut intruder.surface, Phase::Closed).await;
    await_status(&mut intruder.surface, "Connection closed.").await;

    // The original match is untouched and keeps flowing.
    play(&mut host, &mut joiner, 1, 1, Mark::X).await;
}

// =============================================================================
// Hostile or broken payloads
// =============================================================================

#[tokio::test]
async fn test_out_of_turn_move_never_applied() {
    let exchange = LoopbackExchange::new();
    let (mut host, mut joiner, _url) = start_match(&exchange).await;

    // The host is in MyTurn: a well-formed move arriving now is a cheat.
    host.handle.send(SessionEvent::MoveReceived {
        payload: r#"{"symbol":"O","row":2,"column":0}"#.to_string(),
    });

    // The next mark on the host's board must be its own move, not the
    // injected one.
    host.handle.select_cell(0, 0);
    let applied = await_mark(&mut host.surface).await;
    assert_eq!(applied, (0, 0, Mark::X));

    // And the joiner sees exactly that move too.
    let mirrored = await_mark(&mut joiner.surface).await;
    assert_eq!(mirrored, (0, 0, Mark::X));
}

#[tokio::test]
async fn test_malformed_payload_keeps_session_alive() {
    let exchange = LoopbackExchange::new();
    let (host, mut joiner, _url) = start_match(&exchange).await;

    // Garbage and out-of-range records arrive while the joiner waits.
    joiner.handle.send(SessionEvent::MoveReceived {
        payload: "not a move at all".to_string(),
    });
    joiner.handle.send(SessionEvent::MoveReceived {
        payload: r#"{"symbol":"X","row":9,"column":9}"#.to_string(),
    });

    // A real move still lands and flips the turn.
    host.handle.select_cell(1, 1);
    let applied = await_mark(&mut joiner.surface).await;
    assert_eq!(applied, (1, 1, Mark::X));
    await_phase(&mut joiner.surface, Phase::MyTurn).await;
}

// =============================================================================
// Signaling loss and recovery
// =============================================================================

#[tokio::test]
async fn test_disconnect_reconnect_resumes_match() {
    let exchange = LoopbackExchange::new();
    let (mut host, mut joiner, url) = start_match(&exchange).await;
    let host_id = invite_target(&url, "game").expect("invite carries the host id");

    exchange.disrupt(&host_id).await;
    await_phase(&mut host.surface, Phase::Disconnected).await;
    await_status(&mut host.surface, "Connection lost. Please reconnect.").await;

    // The reconnect is seeded with the prior identity and play resumes
    // where it left off, with no second MatchStarting.
    loop {
        match next_message(&mut host.surface).await {
            SurfaceMessage::PhaseChanged {
                phase: Phase::MatchStarting,
            } => panic!("match restarted after reconnect"),
            SurfaceMessage::PhaseChanged {
                phase: Phase::MyTurn,
            } => break,
            _ => {}
        }
    }
    assert!(exchange.is_registered(&host_id));

    play(&mut host, &mut joiner, 2, 2, Mark::X).await;
}

#[tokio::test]
async fn test_signal_failure_is_terminal() {
    let exchange = LoopbackExchange::new();
    let (mut host, url) = start_host(&exchange, quick_config()).await;
    let host_id = invite_target(&url, "game").expect("invite carries the host id");

    exchange.fail_endpoint(&host_id, "rendezvous exploded").await;
    await_phase(&mut host.surface, Phase::Failed).await;
    await_status(&mut host.surface, "Something went wrong. Please restart.").await;
}
