//! GridLink Exhibition Harness
//!
//! Wires a host and a joiner session over the in-process loopback
//! rendezvous and plays a scripted match, printing all surface traffic.
//! Useful for eyeballing the whole session lifecycle without any UI.
//!
//! # Usage
//!
//! ```bash
//! # Default script: host wins the top row
//! gridlink
//!
//! # A custom script, moves alternating host/joiner
//! gridlink --script "0,0 0,1 1,1 0,2 2,2"
//!
//! # With verbose logging
//! RUST_LOG=debug gridlink
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log level (trace, debug, info, warn, error)
//! - `GRIDLINK_*`: core configuration overrides, see `gridlink-core`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};

use gridlink_core::{
    CoreConfig, GridRules, LoopbackExchange, Phase, Session, SessionHandle, SurfaceMessage,
};

/// How long the exhibition may run before it is considered stuck.
const MATCH_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(
    name = "gridlink",
    about = "Play a scripted exhibition match over the loopback rendezvous"
)]
struct Args {
    /// Moves as "row,column" pairs, alternating host and joiner.
    #[arg(long, default_value = "0,0 1,1 0,1 2,2 0,2")]
    script: String,

    /// Config file path; defaults to the standard location.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Parse a script of whitespace-separated "row,column" tokens.
fn parse_script(raw: &str) -> anyhow::Result<Vec<(u8, u8)>> {
    raw.split_whitespace()
        .map(|token| {
            let (row, column) = token
                .split_once(',')
                .with_context(|| format!("bad move {token:?}: expected row,column"))?;
            let row = row.trim().parse().with_context(|| format!("bad row in {token:?}"))?;
            let column = column
                .trim()
                .parse()
                .with_context(|| format!("bad column in {token:?}"))?;
            Ok((row, column))
        })
        .collect()
}

fn log_surface(side: &'static str, msg: &SurfaceMessage) {
    match msg {
        SurfaceMessage::StatusChanged { text } => info!(side, status = %text, "status"),
        SurfaceMessage::PhaseChanged { phase } => info!(side, ?phase, "phase"),
        SurfaceMessage::MarkPlaced { row, column, mark } => {
            info!(side, mark = %mark, row = *row, column = *column, "mark placed");
        }
        SurfaceMessage::SoundCue { cue } => debug!(side, cue = ?cue, "sound cue"),
        SurfaceMessage::TurnAdvanced { count } => debug!(side, count = *count, "turn advanced"),
        SurfaceMessage::InvitePublished { url } => info!(side, url = %url, "invite published"),
    }
}

/// Drive the match: whichever side reports `MyTurn` plays the next scripted
/// move; both sides shut down once they reach a terminal phase.
async fn play(
    script: Vec<(u8, u8)>,
    host_handle: SessionHandle,
    joiner_handle: SessionHandle,
    mut host_surface: mpsc::Receiver<SurfaceMessage>,
    mut joiner_surface: mpsc::Receiver<SurfaceMessage>,
) {
    let mut moves = script.into_iter();
    let mut host_done = false;
    let mut joiner_done = false;

    while !(host_done && joiner_done) {
        let (side, handle, done, msg) = tokio::select! {
            msg = host_surface.recv(), if !host_done => {
                ("host", &host_handle, &mut host_done, msg)
            }
            msg = joiner_surface.recv(), if !joiner_done => {
                ("joiner", &joiner_handle, &mut joiner_done, msg)
            }
        };

        let Some(msg) = msg else {
            *done = true;
            continue;
        };
        log_surface(side, &msg);

        if let SurfaceMessage::PhaseChanged { phase } = msg {
            if phase == Phase::MyTurn {
                if let Some((row, column)) = moves.next() {
                    info!(side, row, column, "playing scripted move");
                    handle.select_cell(row, column);
                }
            }
            if phase.is_terminal() {
                *done = true;
                handle.shutdown();
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gridlink=info".parse()?)
                .add_directive("gridlink_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let script = parse_script(&args.script)?;
    let config = match &args.config {
        Some(path) => CoreConfig::load(path)?,
        None => match CoreConfig::default_path() {
            Some(path) if path.exists() => CoreConfig::load(&path)?,
            _ => CoreConfig::from_env(),
        },
    };

    info!(moves = script.len(), "starting exhibition match");
    let exchange = LoopbackExchange::new();

    // Host side comes up first and publishes the invite.
    let (host_sig, host_signals) = exchange.endpoint();
    let (host, host_handle, mut host_surface) = Session::new(
        config.clone(),
        Box::new(host_sig),
        Box::new(GridRules::new()),
        None,
    );
    host.attach_signals(host_signals);
    tokio::spawn(host.run());

    let url = loop {
        match host_surface.recv().await {
            Some(SurfaceMessage::InvitePublished { url }) => break url,
            Some(msg) => log_surface("host", &msg),
            None => anyhow::bail!("host surface closed before publishing an invite"),
        }
    };

    // Joiner launches with the shared URL.
    let (joiner_sig, joiner_signals) = exchange.endpoint();
    let (joiner, joiner_handle, joiner_surface) = Session::new(
        config,
        Box::new(joiner_sig),
        Box::new(GridRules::new()),
        Some(&url),
    );
    joiner.attach_signals(joiner_signals);
    tokio::spawn(joiner.run());

    tokio::time::timeout(
        MATCH_DEADLINE,
        play(
            script,
            host_handle,
            joiner_handle,
            host_surface,
            joiner_surface,
        ),
    )
    .await
    .context("exhibition match did not finish in time; script too short?")?;

    info!("exhibition match finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        assert_eq!(
            parse_script("0,0 1,2  2,1").unwrap(),
            vec![(0, 0), (1, 2), (2, 1)]
        );
    }

    #[test]
    fn test_parse_script_rejects_garbage() {
        assert!(parse_script("0;0").is_err());
        assert!(parse_script("a,b").is_err());
    }
}
