// src/error.rs
// Error taxonomy for the front-end boundary (UCI loop, notation adapters).
// The searcher itself never returns a failure value (see search::search);
// this enum exists for the things that sit around it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseKind {
    Fen,
    Epd,
    San,
    UciMove,
}

impl fmt::Display for ParseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParseKind::Fen => "FEN",
            ParseKind::Epd => "EPD",
            ParseKind::San => "SAN",
            ParseKind::UciMove => "UCI move",
        };
        f.write_str(s)
    }
}

/// Boundary error taxonomy (spec.md §7). `InternalInvariant` failures
/// (bad bitboard index, king-count > 1) are programming errors and stay as
/// `panic!`/`debug_assert!` at their call sites rather than living here.
#[derive(Debug)]
pub enum EngineError {
    Parse { kind: ParseKind, input: String },
    InvalidMove { uci: String },
    NoLegalMoves,
    Io(std::io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Parse { kind, input } => {
                write!(f, "could not parse {kind} input: '{input}'")
            }
            EngineError::InvalidMove { uci } => write!(f, "invalid or illegal move: '{uci}'"),
            EngineError::NoLegalMoves => write!(f, "no legal moves in the given position"),
            EngineError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e)
    }
}

impl EngineError {
    pub fn fen(input: impl Into<String>) -> Self {
        EngineError::Parse {
            kind: ParseKind::Fen,
            input: input.into(),
        }
    }

    pub fn san(input: impl Into<String>) -> Self {
        EngineError::Parse {
            kind: ParseKind::San,
            input: input.into(),
        }
    }

    pub fn uci_move(input: impl Into<String>) -> Self {
        EngineError::Parse {
            kind: ParseKind::UciMove,
            input: input.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_message_includes_offending_input() {
        let e = EngineError::fen("not a fen");
        assert!(e.to_string().contains("not a fen"));
        assert!(e.to_string().contains("FEN"));
    }

    #[test]
    fn invalid_move_message_includes_uci() {
        let e = EngineError::InvalidMove {
            uci: "e2e5".to_string(),
        };
        assert!(e.to_string().contains("e2e5"));
    }
}
