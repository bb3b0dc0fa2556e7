//! The session aggregate published to readers.

use boardsync_types::{GameId, Move};
use std::time::{Duration, Instant};

use crate::countdown::AbandonmentCountdown;
use crate::game::Game;

/// A locally-played move held until the player confirms it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    /// The move.
    pub mv: Move,
    /// Thinking time to report when transmitted.
    pub move_time: Option<Duration>,
    /// Ask the transport to attach measured lag.
    pub with_lag: bool,
    /// Cursor position before the speculative step was appended.
    pub cursor_before: usize,
}

/// Everything a reader needs to render one game.
///
/// A session is a value: the engine never changes one that has been
/// handed out, it builds the next one and replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    /// The game record.
    pub game: Game,
    /// Index of the step being shown.
    pub step_cursor: usize,
    /// Ply at which the local player last offered a draw.
    pub last_draw_offer_at_ply: Option<u32>,
    /// Move queued for the opponent's reply.
    pub premove: Option<Move>,
    /// Move waiting for confirmation.
    pub move_to_confirm: Option<PendingMove>,
    /// Per-session override of the confirm-move preference.
    pub confirm_move_override: Option<bool>,
    /// A move has been played and the clock is stopped until the server echoes it.
    pub awaiting_ack: bool,
    /// Abandonment countdown.
    pub countdown: AbandonmentCountdown,
    /// Game the navigation collaborator should open next.
    pub redirect_game_id: Option<GameId>,
    /// When the opponent's last move was applied; move time is measured from here.
    pub last_move_at: Option<Instant>,
}

impl GameSession {
    /// Fresh session showing the live position of `game`.
    pub fn new(game: Game) -> Self {
        let step_cursor = game.steps.len() - 1;
        Self {
            game,
            step_cursor,
            last_draw_offer_at_ply: None,
            premove: None,
            move_to_confirm: None,
            confirm_move_override: None,
            awaiting_ack: false,
            countdown: AbandonmentCountdown::Idle,
            redirect_game_id: None,
            last_move_at: None,
        }
    }

    /// Replace the game after a resync, keeping only the fields that
    /// outlive a snapshot.
    pub fn resynced(&self, game: Game) -> Self {
        Self {
            last_draw_offer_at_ply: self.last_draw_offer_at_ply,
            confirm_move_override: self.confirm_move_override,
            ..Self::new(game)
        }
    }

    /// Index of the live step.
    pub fn live_cursor(&self) -> usize {
        self.game.steps.len() - 1
    }

    /// Whether the cursor is behind the live position.
    pub fn is_replaying(&self) -> bool {
        self.step_cursor < self.live_cursor()
    }

    /// Seconds left on the abandonment countdown, while it runs.
    pub fn opponent_left_countdown(&self) -> Option<Duration> {
        self.countdown.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRules, SnapshotBuilder};

    fn session(plies: u32) -> GameSession {
        let snapshot = SnapshotBuilder::new("abcdefgh").plies(plies).build();
        let game = Game::from_snapshot(snapshot, &FakeRules::default(), Instant::now()).unwrap();
        GameSession::new(game)
    }

    #[test]
    fn new_session_shows_live_step() {
        let s = session(4);
        assert_eq!(s.step_cursor, 4);
        assert!(!s.is_replaying());
        assert!(s.opponent_left_countdown().is_none());
    }

    #[test]
    fn resync_carries_only_offer_and_override() {
        let mut s = session(4);
        s.last_draw_offer_at_ply = Some(3);
        s.confirm_move_override = Some(true);
        s.awaiting_ack = true;
        s.premove = Some(Move::from_uci("e2e4").unwrap());
        s.countdown = AbandonmentCountdown::arm(10);
        s.step_cursor = 1;

        let next = s.resynced(session(6).game);
        assert_eq!(next.last_draw_offer_at_ply, Some(3));
        assert_eq!(next.confirm_move_override, Some(true));
        assert!(!next.awaiting_ack);
        assert!(next.premove.is_none());
        assert!(!next.countdown.is_armed());
        assert_eq!(next.step_cursor, 6);
    }
}
