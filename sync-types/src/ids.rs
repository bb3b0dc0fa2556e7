//! Identity types for boardsync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// Identifier of a game on the server.
///
/// Public game ids are 8 characters; the 12-character "full" id carries the
/// player token as a suffix. Both forms are accepted here.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Create a GameId from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The public (8 character) part of this id.
    pub fn public_id(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameId({})", self.0)
    }
}

/// One of the two players of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The side that moves first.
    White,
    /// The side that moves second.
    Black,
}

impl Side {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// The side that played the given ply (ply 1 is white's first move).
    pub fn of_ply(ply: u32) -> Self {
        if ply % 2 == 1 {
            Side::White
        } else {
            Side::Black
        }
    }

    /// Wire name of this side.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" | "w" => Ok(Side::White),
            "black" | "b" => Ok(Side::Black),
            other => Err(ProtocolError::InvalidSide(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_id_truncates_full_id() {
        let id = GameId::new("abcdefghWXYZ");
        assert_eq!(id.public_id(), "abcdefgh");
        assert_eq!(GameId::new("abc").public_id(), "abc");
    }

    #[test]
    fn game_id_serializes_as_plain_string() {
        let id = GameId::new("abcdefgh");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abcdefgh\"");
    }

    #[test]
    fn side_of_ply() {
        assert_eq!(Side::of_ply(1), Side::White);
        assert_eq!(Side::of_ply(2), Side::Black);
        assert_eq!(Side::of_ply(37), Side::White);
    }

    #[test]
    fn side_parses_short_and_long_names() {
        assert_eq!("w".parse::<Side>().unwrap(), Side::White);
        assert_eq!("black".parse::<Side>().unwrap(), Side::Black);
        assert!("red".parse::<Side>().is_err());
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::White.opposite(), Side::Black);
        assert_eq!(Side::Black.opposite().opposite(), Side::Black);
    }
}
