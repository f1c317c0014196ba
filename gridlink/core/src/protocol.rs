//! Move Protocol Codec
//!
//! Bidirectional mapping between a [`MoveMessage`] and its wire form: a JSON
//! text record such as `{"symbol":"X","row":0,"column":2}`. The peer channel
//! is message-oriented, so each payload is one complete record with no
//! framing around it.
//!
//! Encoding is total over valid messages. Decoding is strict: anything that
//! is not the expected record shape, or whose coordinates fall outside the
//! grid, fails with [`MoveCodecError`] and the session drops the payload
//! without applying it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest legal row/column index on the grid.
pub const GRID_MAX: u8 = 2;

/// Board mark assigned to one side of a match.
///
/// The host plays `X` and moves first; the joiner plays `O`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    /// First mover's mark.
    X,
    /// Second mover's mark.
    O,
}

impl Mark {
    /// Returns the other side's mark.
    #[must_use]
    pub fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
        }
    }
}

/// A single move as exchanged between peers.
///
/// Immutable once constructed; produced locally from a validated gesture or
/// remotely by decoding channel data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMessage {
    /// Mark of the side that made the move.
    pub symbol: Mark,
    /// Row index, 0..=2.
    pub row: u8,
    /// Column index, 0..=2.
    pub column: u8,
}

impl MoveMessage {
    /// Create a move message.
    #[must_use]
    pub fn new(symbol: Mark, row: u8, column: u8) -> Self {
        Self { symbol, row, column }
    }
}

/// Errors raised when a payload does not decode to a legal move.
#[derive(Debug, Error)]
pub enum MoveCodecError {
    /// The payload is not parseable as a move record.
    #[error("payload is not a move record: {0}")]
    Unparseable(#[from] serde_json::Error),
    /// The record parsed but its coordinates fall outside the grid.
    #[error("coordinates out of range: row {row}, column {column}")]
    OutOfRange {
        /// Row index carried by the payload.
        row: u8,
        /// Column index carried by the payload.
        column: u8,
    },
}

/// Encode a move to its wire form.
///
/// # Errors
///
/// Returns [`MoveCodecError::Unparseable`] if JSON serialization fails, which
/// cannot happen for a well-formed [`MoveMessage`].
pub fn encode_move(msg: &MoveMessage) -> Result<String, MoveCodecError> {
    Ok(serde_json::to_string(msg)?)
}

/// Decode a wire payload into a move.
///
/// # Errors
///
/// Returns [`MoveCodecError::Unparseable`] for anything that is not the
/// expected record shape, and [`MoveCodecError::OutOfRange`] when `row` or
/// `column` exceed [`GRID_MAX`].
pub fn decode_move(payload: &str) -> Result<MoveMessage, MoveCodecError> {
    let msg: MoveMessage = serde_json::from_str(payload)?;
    if msg.row > GRID_MAX || msg.column > GRID_MAX {
        return Err(MoveCodecError::OutOfRange {
            row: msg.row,
            column: msg.column,
        });
    }
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_decode_roundtrip() {
        let msg = MoveMessage::new(Mark::X, 0, 2);
        let payload = encode_move(&msg).unwrap();
        let decoded = decode_move(&payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_wire_shape_matches_record_format() {
        let msg = MoveMessage::new(Mark::O, 1, 0);
        let payload = encode_move(&msg).unwrap();
        assert_eq!(payload, r#"{"symbol":"O","row":1,"column":0}"#);
    }

    #[test]
    fn test_decode_missing_column() {
        let result = decode_move(r#"{"symbol":"X","row":1}"#);
        assert!(matches!(result, Err(MoveCodecError::Unparseable(_))));
    }

    #[test]
    fn test_decode_row_out_of_range() {
        let result = decode_move(r#"{"symbol":"X","row":3,"column":0}"#);
        assert!(matches!(
            result,
            Err(MoveCodecError::OutOfRange { row: 3, column: 0 })
        ));
    }

    #[test]
    fn test_decode_column_out_of_range() {
        let result = decode_move(r#"{"symbol":"O","row":0,"column":7}"#);
        assert!(matches!(
            result,
            Err(MoveCodecError::OutOfRange { row: 0, column: 7 })
        ));
    }

    #[test]
    fn test_decode_negative_coordinate() {
        let result = decode_move(r#"{"symbol":"X","row":-1,"column":0}"#);
        assert!(matches!(result, Err(MoveCodecError::Unparseable(_))));
    }

    #[test]
    fn test_decode_unknown_symbol() {
        let result = decode_move(r#"{"symbol":"Z","row":0,"column":0}"#);
        assert!(matches!(result, Err(MoveCodecError::Unparseable(_))));
    }

    #[test]
    fn test_decode_refusal_text_is_malformed() {
        let result = decode_move("Already connected to another client");
        assert!(matches!(result, Err(MoveCodecError::Unparseable(_))));
    }

    #[test]
    fn test_mark_opponent() {
        assert_eq!(Mark::X.opponent(), Mark::O);
        assert_eq!(Mark::O.opponent(), Mark::X);
    }
}
