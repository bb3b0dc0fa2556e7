//! Boundary to the external chess rules engine.
//!
//! Move legality, SAN generation and board arithmetic are not implemented
//! here. The session engine only needs three operations, expressed by
//! [`RulesEngine`], and is handed an implementation at construction time.

use boardsync_types::{Fen, Move, Role};
use thiserror::Error;

/// Errors reported by a rules engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    /// The position could not be parsed.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// The move is not legal in the position.
    #[error("illegal move: {0}")]
    IllegalMove(String),
}

/// Material one side has in excess of the other.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SideMaterial {
    /// Point balance in this side's favour (0 if behind or equal).
    pub score: i32,
    /// Pieces this side has that the other does not, one entry per piece.
    pub surplus: Vec<Role>,
}

/// Material-difference summary of a position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaterialDiff {
    /// White's surplus.
    pub white: SideMaterial,
    /// Black's surplus.
    pub black: SideMaterial,
}

/// The chess rules library the session engine relies on.
pub trait RulesEngine: Send + Sync {
    /// Apply a locally-initiated move, checking legality.
    ///
    /// Returns the new position and the move in algebraic notation.
    fn apply_move(&self, position: &Fen, mv: &Move) -> Result<(Fen, String), RulesError>;

    /// Apply a server-confirmed move without re-checking legality.
    fn apply_unchecked(&self, position: &Fen, mv: &Move) -> Result<Fen, RulesError>;

    /// Material-difference summary of a position.
    fn material_diff(&self, position: &Fen) -> MaterialDiff;
}

impl<R: RulesEngine + ?Sized> RulesEngine for std::sync::Arc<R> {
    fn apply_move(&self, position: &Fen, mv: &Move) -> Result<(Fen, String), RulesError> {
        (**self).apply_move(position, mv)
    }

    fn apply_unchecked(&self, position: &Fen, mv: &Move) -> Result<Fen, RulesError> {
        (**self).apply_unchecked(position, mv)
    }

    fn material_diff(&self, position: &Fen) -> MaterialDiff {
        (**self).material_diff(position)
    }
}

/// Whether a SAN string records a capture.
pub fn san_is_capture(san: &str) -> bool {
    san.contains('x')
}

/// Whether a SAN string records a check or mate.
pub fn san_is_check(san: &str) -> bool {
    san.ends_with('+') || san.ends_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn san_flags() {
        assert!(san_is_capture("exd5"));
        assert!(!san_is_capture("Nf3"));
        assert!(san_is_check("Qh5+"));
        assert!(san_is_check("Qxf7#"));
        assert!(!san_is_check("O-O"));
    }
}
