//! Session Phases
//!
//! The discrete states of the session state machine. Exactly one phase is
//! active at any instant, and only the machine mutates it.

use serde::{Deserialize, Serialize};

/// Current phase of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Freshly constructed, no work started.
    Idle,
    /// Waiting for the signaling collaborator to issue an identity.
    AwaitingSignalId,
    /// Role decided; host is sharable, joiner is dialing out.
    RoleAssigned,
    /// Host accepted an offer and is waiting for the link to settle.
    AwaitingPeer,
    /// Link is up; the rules engine is being initialized.
    MatchStarting,
    /// Local player to move.
    MyTurn,
    /// Waiting on the remote player's move.
    OpponentTurn,
    /// Local player won. Terminal.
    Won,
    /// Match ended without a winner. Terminal.
    Tied,
    /// Local player lost. Terminal.
    Lost,
    /// Signaling transport dropped; a reconnect attempt is in flight.
    Disconnected,
    /// The peer link closed. Terminal for the match.
    Closed,
    /// Unrecoverable transport failure. Terminal for the session.
    Failed,
}

impl Phase {
    /// Whether the session can make no further progress from this phase
    /// without outside intervention.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Won | Self::Tied | Self::Lost | Self::Closed | Self::Failed
        )
    }

    /// Whether a match is currently in progress.
    #[must_use]
    pub fn in_match(self) -> bool {
        matches!(self, Self::MatchStarting | Self::MyTurn | Self::OpponentTurn)
    }

    /// The fixed human status line for this phase, if it has one.
    ///
    /// Phases whose status depends on the assigned role (`RoleAssigned`)
    /// have their text emitted by the transition that enters them.
    #[must_use]
    pub fn status_line(self) -> Option<&'static str> {
        match self {
            Self::AwaitingSignalId => Some("Connecting to signal server"),
            Self::AwaitingPeer => Some("Connecting to peer..."),
            Self::MyTurn => Some("Move"),
            Self::OpponentTurn => Some("Wait"),
            Self::Won => Some("You are the winner!"),
            Self::Tied => Some("Tie."),
            Self::Lost => Some("You lost! Game over."),
            Self::Disconnected => Some("Connection lost. Please reconnect."),
            Self::Closed => Some("Connection closed."),
            Self::Failed => Some("Something went wrong. Please restart."),
            Self::Idle | Self::RoleAssigned | Self::MatchStarting => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(Phase::Won.is_terminal());
        assert!(Phase::Tied.is_terminal());
        assert!(Phase::Lost.is_terminal());
        assert!(Phase::Closed.is_terminal());
        assert!(Phase::Failed.is_terminal());

        assert!(!Phase::Idle.is_terminal());
        assert!(!Phase::MyTurn.is_terminal());
        assert!(!Phase::Disconnected.is_terminal());
    }

    #[test]
    fn test_in_match() {
        assert!(Phase::MatchStarting.in_match());
        assert!(Phase::MyTurn.in_match());
        assert!(Phase::OpponentTurn.in_match());
        assert!(!Phase::RoleAssigned.in_match());
        assert!(!Phase::Won.in_match());
    }

    #[test]
    fn test_turn_status_lines() {
        assert_eq!(Phase::MyTurn.status_line(), Some("Move"));
        assert_eq!(Phase::OpponentTurn.status_line(), Some("Wait"));
        assert_eq!(Phase::RoleAssigned.status_line(), None);
    }
}
