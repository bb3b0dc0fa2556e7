//! Read-only account preferences consulted by the session.

use serde::Deserialize;
use std::time::Duration;

/// When a promotion is completed with a queen without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoQueen {
    /// Always promote to a queen.
    Always,
    /// Only when the promotion comes from a premove.
    #[default]
    Premove,
    /// Always ask.
    Never,
}

/// Whether the board hides everything but the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZenMode {
    /// Zen mode on.
    Yes,
    /// Zen mode off.
    #[default]
    No,
    /// Zen mode while a game is being played.
    GameAuto,
}

/// Account preferences snapshot.
///
/// Typically loaded from the `[preferences]` table of the client config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Preferences {
    /// Hold each move until the player confirms it.
    #[serde(default)]
    pub submit_move_confirm: bool,

    /// Allow queueing a move during the opponent's turn.
    #[serde(default = "default_true")]
    pub enable_premove: bool,

    /// Auto-queen policy.
    #[serde(default)]
    pub auto_queen: AutoQueen,

    /// Ask before resigning.
    #[serde(default = "default_true")]
    pub confirm_resign: bool,

    /// Zen mode policy.
    #[serde(default)]
    pub zen_mode: ZenMode,

    /// Piece animation duration in milliseconds.
    #[serde(default = "default_piece_animation_ms")]
    pub piece_animation_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_piece_animation_ms() -> u64 {
    150
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            submit_move_confirm: false,
            enable_premove: default_true(),
            auto_queen: AutoQueen::default(),
            confirm_resign: default_true(),
            zen_mode: ZenMode::default(),
            piece_animation_ms: default_piece_animation_ms(),
        }
    }
}

impl Preferences {
    /// Piece animation duration.
    pub fn piece_animation(&self) -> Duration {
        Duration::from_millis(self.piece_animation_ms)
    }
}
