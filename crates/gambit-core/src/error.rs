//! Error types for position setup and move input.

/// Errors raised while building or mutating a [`Position`](crate::Position)
/// from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// The board part of a FEN string was rejected by the rules engine.
    #[error("invalid FEN \"{fen}\": {reason}")]
    InvalidFen {
        /// The FEN string that failed to parse.
        fen: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A move counter (halfmove clock or fullmove number) is not a number.
    #[error("invalid {field}: \"{found}\"")]
    InvalidMoveCounter {
        /// The field name ("halfmove clock" or "fullmove number").
        field: &'static str,
        /// The invalid string.
        found: String,
    },

    /// The move is not legal in the current position.
    #[error("illegal move: {uci}")]
    IllegalMove {
        /// The move in UCI notation.
        uci: String,
    },

    /// A null move was requested while the side to move is in check.
    #[error("cannot pass the move while in check")]
    NullMoveInCheck,
}

#[cfg(test)]
mod tests {
    use super::PositionError;

    #[test]
    fn invalid_fen_display() {
        let err = PositionError::InvalidFen {
            fen: "xyz".to_string(),
            reason: "bad board".to_string(),
        };
        assert_eq!(format!("{err}"), "invalid FEN \"xyz\": bad board");
    }

    #[test]
    fn illegal_move_display() {
        let err = PositionError::IllegalMove {
            uci: "e2e5".to_string(),
        };
        assert_eq!(format!("{err}"), "illegal move: e2e5");
    }
}
