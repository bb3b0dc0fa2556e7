//! Board vocabulary shared between the wire format and the rules engine.
//!
//! Moves travel as UCI strings (`e2e4`, `e7e8q`, `N@f3`). Positions travel
//! as FEN strings; this crate only reads the few FEN fields the session
//! engine needs (side to move, full-move number) and leaves board semantics
//! to the rules engine.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{ProtocolError, Side};

/// A board square, `a1` = 0 through `h8` = 63.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// Create a square from file (0-7) and rank (0-7).
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (file < 8 && rank < 8).then(|| Self(rank * 8 + file))
    }

    /// File index, 0 = a.
    pub fn file(self) -> u8 {
        self.0 % 8
    }

    /// Rank index, 0 = first rank.
    pub fn rank(self) -> u8 {
        self.0 / 8
    }
}

impl FromStr for Square {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ProtocolError::InvalidSquare(s.to_string()));
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(|| ProtocolError::InvalidSquare(s.to_string()))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file()) as char, (b'1' + self.rank()) as char)
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Square({})", self)
    }
}

/// A piece kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Pawn.
    Pawn,
    /// Knight.
    Knight,
    /// Bishop.
    Bishop,
    /// Rook.
    Rook,
    /// Queen.
    Queen,
    /// King.
    King,
}

impl Role {
    /// Lowercase UCI letter for this role.
    pub fn char(self) -> char {
        match self {
            Role::Pawn => 'p',
            Role::Knight => 'n',
            Role::Bishop => 'b',
            Role::Rook => 'r',
            Role::Queen => 'q',
            Role::King => 'k',
        }
    }

    /// Parse a UCI letter (either case).
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Role::Pawn),
            'n' => Some(Role::Knight),
            'b' => Some(Role::Bishop),
            'r' => Some(Role::Rook),
            'q' => Some(Role::Queen),
            'k' => Some(Role::King),
            _ => None,
        }
    }

    /// Wire name used by drop messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Pawn => "pawn",
            Role::Knight => "knight",
            Role::Bishop => "bishop",
            Role::Rook => "rook",
            Role::Queen => "queen",
            Role::King => "king",
        }
    }
}

/// A move in machine form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    /// A piece moves from one square to another.
    Normal {
        /// Origin square.
        from: Square,
        /// Destination square.
        to: Square,
        /// Promotion piece, if any.
        promotion: Option<Role>,
    },
    /// A piece from the pocket is dropped (crazyhouse).
    Drop {
        /// Dropped piece kind.
        role: Role,
        /// Destination square.
        to: Square,
    },
}

impl Move {
    /// Parse a UCI move string.
    pub fn from_uci(uci: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidMove(uci.to_string());
        if !uci.is_ascii() {
            return Err(invalid());
        }
        if let Some((role, to)) = uci.split_once('@') {
            let mut chars = role.chars();
            let role = match (chars.next(), chars.next()) {
                (Some(c), None) => Role::from_char(c).ok_or_else(invalid)?,
                _ => return Err(invalid()),
            };
            let to = to.parse().map_err(|_| invalid())?;
            return Ok(Move::Drop { role, to });
        }
        if uci.len() != 4 && uci.len() != 5 {
            return Err(invalid());
        }
        let from = uci[0..2].parse().map_err(|_| invalid())?;
        let to = uci[2..4].parse().map_err(|_| invalid())?;
        let promotion = match uci[4..].chars().next() {
            Some(c) => Some(Role::from_char(c).ok_or_else(invalid)?),
            None => None,
        };
        Ok(Move::Normal {
            from,
            to,
            promotion,
        })
    }

    /// UCI string form.
    pub fn uci(&self) -> String {
        self.to_string()
    }

    /// Destination square.
    pub fn to(&self) -> Square {
        match self {
            Move::Normal { to, .. } | Move::Drop { to, .. } => *to,
        }
    }

    /// Whether this is a pocket drop.
    pub fn is_drop(&self) -> bool {
        matches!(self, Move::Drop { .. })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Normal {
                from,
                to,
                promotion,
            } => {
                write!(f, "{}{}", from, to)?;
                if let Some(role) = promotion {
                    write!(f, "{}", role.char())?;
                }
                Ok(())
            }
            Move::Drop { role, to } => write!(f, "{}@{}", role.char().to_ascii_uppercase(), to),
        }
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({})", self)
    }
}

impl FromStr for Move {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::from_uci(s)
    }
}

impl Serialize for Move {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Move {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uci = String::deserialize(deserializer)?;
        Move::from_uci(&uci).map_err(serde::de::Error::custom)
    }
}

/// An immutable board snapshot in Forsyth-Edwards Notation.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fen(String);

impl Fen {
    /// Standard starting position.
    pub const INITIAL: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Wrap a FEN string. Fields are validated lazily by the accessors.
    pub fn new(fen: impl Into<String>) -> Self {
        Self(fen.into())
    }

    /// The standard starting position.
    pub fn initial() -> Self {
        Self::new(Self::INITIAL)
    }

    /// Side to move. Board-only FENs default to white.
    pub fn turn(&self) -> Side {
        match self.0.split_whitespace().nth(1) {
            Some("b") => Side::Black,
            _ => Side::White,
        }
    }

    /// Full-move number (starts at 1, increments after black moves).
    pub fn fullmoves(&self) -> u32 {
        self.0
            .split_whitespace()
            .nth(5)
            .and_then(|n| n.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }

    /// The piece placement field.
    pub fn board(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or("")
    }

    /// Get the FEN as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fen({})", self.0)
    }
}
