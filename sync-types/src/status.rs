//! Game status and ruleset metadata.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a game as reported by the server.
///
/// Statuses partition into three subsets: *playable* (`Created`, `Started`),
/// *aborted* (`Aborted`), and *finished* (everything else).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    /// Game created, no move played yet.
    Created,
    /// Game in progress.
    Started,
    /// Game aborted before it really began.
    Aborted,
    /// Checkmate.
    Mate,
    /// A player resigned.
    Resign,
    /// Stalemate.
    Stalemate,
    /// A player left and the opponent claimed victory.
    Timeout,
    /// Drawn by agreement or rule.
    Draw,
    /// A player flagged.
    #[serde(rename = "outoftime")]
    OutOfTime,
    /// Cheat detected.
    Cheat,
    /// A player failed to make the first move in time.
    NoStart,
    /// Finished for an unknown reason.
    UnknownFinish,
}

impl GameStatus {
    /// Moves may still be played.
    pub fn is_playable(self) -> bool {
        matches!(self, GameStatus::Created | GameStatus::Started)
    }

    /// The game was aborted.
    pub fn is_aborted(self) -> bool {
        self == GameStatus::Aborted
    }

    /// The game ended with a result.
    pub fn is_finished(self) -> bool {
        !self.is_playable() && !self.is_aborted()
    }
}

/// Special rules attached to a game that restrict what players may do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameRule {
    /// The game cannot be aborted.
    NoAbort,
    /// A player cannot claim victory when the opponent leaves.
    NoClaimWin,
    /// No rematch may be offered.
    NoRematch,
    /// Time cannot be given to the opponent.
    NoGiveTime,
    /// Draw offers are not allowed early in the game.
    NoEarlyDraw,
    /// A rule this client does not know about.
    Other(String),
}

impl From<String> for GameRule {
    fn from(value: String) -> Self {
        match value.as_str() {
            "noAbort" => GameRule::NoAbort,
            "noClaimWin" => GameRule::NoClaimWin,
            "noRematch" => GameRule::NoRematch,
            "noGiveTime" => GameRule::NoGiveTime,
            "noEarlyDraw" => GameRule::NoEarlyDraw,
            _ => GameRule::Other(value),
        }
    }
}

impl From<GameRule> for String {
    fn from(rule: GameRule) -> Self {
        match rule {
            GameRule::NoAbort => "noAbort".into(),
            GameRule::NoClaimWin => "noClaimWin".into(),
            GameRule::NoRematch => "noRematch".into(),
            GameRule::NoGiveTime => "noGiveTime".into(),
            GameRule::NoEarlyDraw => "noEarlyDraw".into(),
            GameRule::Other(other) => other,
        }
    }
}

/// Where the game originated. Used to decide whether "new opponent" applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameSource {
    /// Created from a lobby seek.
    Lobby,
    /// Created from a quick-pairing pool.
    Pool,
    /// Challenge between friends.
    Friend,
    /// Game against the computer.
    Ai,
    /// Tournament pairing.
    Arena,
    /// Any other source.
    Other(String),
}

impl GameSource {
    /// Games paired automatically by the server.
    pub fn is_matchmade(&self) -> bool {
        matches!(self, GameSource::Lobby | GameSource::Pool)
    }
}

impl From<String> for GameSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "lobby" => GameSource::Lobby,
            "pool" => GameSource::Pool,
            "friend" => GameSource::Friend,
            "ai" => GameSource::Ai,
            "arena" => GameSource::Arena,
            _ => GameSource::Other(value),
        }
    }
}

impl From<GameSource> for String {
    fn from(source: GameSource) -> Self {
        match source {
            GameSource::Lobby => "lobby".into(),
            GameSource::Pool => "pool".into(),
            GameSource::Friend => "friend".into(),
            GameSource::Ai => "ai".into(),
            GameSource::Arena => "arena".into(),
            GameSource::Other(other) => other,
        }
    }
}

/// Time-control category of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Speed {
    /// Under 30 seconds estimated.
    UltraBullet,
    /// Under 3 minutes estimated.
    Bullet,
    /// Under 8 minutes estimated.
    #[default]
    Blitz,
    /// Under 25 minutes estimated.
    Rapid,
    /// Longer real-time games.
    Classical,
    /// Days per move.
    Correspondence,
}
