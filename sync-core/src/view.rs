//! Derived, non-stored values computed from a session on every read.

use boardsync_types::{GameRule, GameStatus, Side, Speed};
use std::time::{Duration, Instant};

use crate::prefs::{AutoQueen, Preferences, ZenMode};
use crate::session::GameSession;

/// Plies that must pass after the player's own draw offer before another.
pub const DRAW_OFFER_COOLDOWN_PLIES: u32 = 20;

/// Read-only facade over a session.
///
/// `now` is the instant the view is evaluated at; it only affects
/// [`time_to_move`](Self::time_to_move).
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    session: &'a GameSession,
    prefs: &'a Preferences,
    now: Instant,
}

impl<'a> SessionView<'a> {
    /// Create a view.
    pub fn new(session: &'a GameSession, prefs: &'a Preferences, now: Instant) -> Self {
        Self {
            session,
            prefs,
            now,
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &'a GameSession {
        self.session
    }

    /// Side controlled by the local player.
    pub fn player_side(&self) -> Option<Side> {
        self.session.game.player_side
    }

    /// Side of the opponent.
    pub fn opponent_side(&self) -> Option<Side> {
        self.player_side().map(Side::opposite)
    }

    /// Whether the cursor is behind the live position.
    pub fn is_replaying(&self) -> bool {
        self.session.is_replaying()
    }

    /// Whether the local player is to move in a playable game.
    pub fn is_my_turn(&self) -> bool {
        let game = &self.session.game;
        game.playable() && self.player_side() == Some(game.last_position().turn())
    }

    /// Side whose clock is ticking, if any.
    ///
    /// Clocks start once both players have moved and stop while a local
    /// move awaits the server's echo.
    pub fn active_clock_side(&self) -> Option<Side> {
        let game = &self.session.game;
        if game.clock.is_none()
            || game.status != GameStatus::Started
            || self.session.awaiting_ack
        {
            return None;
        }
        let position = game.last_position();
        (position.fullmoves() > 1).then(|| position.turn())
    }

    /// Time left to make the first moves before the game is aborted.
    pub fn time_to_move(&self) -> Option<Duration> {
        let game = &self.session.game;
        if !game.playable() {
            return None;
        }
        game.expiration.map(|e| {
            let elapsed = self.now.saturating_duration_since(e.moved_at);
            e.time_to_move.saturating_sub(elapsed)
        })
    }

    /// Whether the game can be aborted.
    pub fn can_abort(&self) -> bool {
        self.player_side().is_some() && self.session.game.abortable()
    }

    /// Whether the game can be resigned.
    pub fn can_resign(&self) -> bool {
        self.player_side().is_some() && self.session.game.resignable()
    }

    /// Whether a takeback can be proposed.
    pub fn can_takeback(&self) -> bool {
        self.session.game.takebackable()
    }

    /// Whether a draw can be offered. Enforces the offer cooldown.
    pub fn can_offer_draw(&self) -> bool {
        let game = &self.session.game;
        let cooled_down = self
            .session
            .last_draw_offer_at_ply
            .map_or(true, |ply| {
                ply.saturating_add(DRAW_OFFER_COOLDOWN_PLIES) < game.last_ply()
            });
        game.drawable() && cooled_down
    }

    /// Whether a threefold repetition can be claimed.
    pub fn can_claim_draw(&self) -> bool {
        self.player_side().is_some() && self.session.game.playable() && self.session.game.threefold
    }

    /// Whether a rematch can be offered.
    pub fn can_offer_rematch(&self) -> bool {
        let game = &self.session.game;
        let matchmade = game.meta.source.as_ref().is_some_and(|s| s.is_matchmade());
        let over = game.status.is_finished()
            || (game.status.is_aborted() && (!game.meta.rated || !matchmade));
        self.player_side().is_some()
            && game.rematch.is_none()
            && game.rematchable()
            && over
            && !game.boosted
    }

    /// Whether the player can look for a new opponent from this game.
    pub fn can_get_new_opponent(&self) -> bool {
        let game = &self.session.game;
        !game.playable() && game.meta.source.as_ref().is_some_and(|s| s.is_matchmade())
    }

    /// Whether the opponent may be given extra time.
    pub fn can_give_time(&self) -> bool {
        let game = &self.session.game;
        self.player_side().is_some()
            && game.playable()
            && game.clock.is_some()
            && !game.meta.has_rule(&GameRule::NoGiveTime)
    }

    /// Whether the abandonment countdown may keep running.
    pub fn countdown_eligible(&self) -> bool {
        let game = &self.session.game;
        self.player_side().is_some()
            && !self.is_my_turn()
            && game.resignable()
            && !game.meta.has_rule(&GameRule::NoClaimWin)
    }

    /// Whether the player can claim the win (or a draw) after the opponent left.
    pub fn can_claim_win(&self) -> bool {
        self.countdown_eligible()
            && self.session.game.opponent().is_some_and(|op| op.is_gone)
            && !self.session.countdown.is_armed()
    }

    /// Whether the board is in zen mode.
    pub fn is_zen_mode(&self) -> bool {
        match self.prefs.zen_mode {
            ZenMode::Yes => true,
            ZenMode::No => false,
            ZenMode::GameAuto => self.session.game.playable(),
        }
    }

    /// Whether premoves are allowed.
    pub fn can_premove(&self) -> bool {
        self.prefs.enable_premove && self.session.game.meta.speed != Speed::Correspondence
    }

    /// Whether promotions complete as a queen without asking.
    pub fn can_auto_queen(&self) -> bool {
        self.prefs.auto_queen == AutoQueen::Always
    }

    /// Whether premoved promotions complete as a queen without asking.
    pub fn can_auto_queen_on_premove(&self) -> bool {
        matches!(self.prefs.auto_queen, AutoQueen::Always | AutoQueen::Premove)
    }

    /// Whether a local move will wait for confirmation.
    pub fn should_confirm_move(&self) -> bool {
        self.session
            .confirm_move_override
            .unwrap_or(self.prefs.submit_move_confirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;
    use crate::testing::{FakeRules, SnapshotBuilder};
    use boardsync_types::GameSource;

    fn session(builder: SnapshotBuilder, now: Instant) -> GameSession {
        let game = Game::from_snapshot(builder.build(), &FakeRules::default(), now).unwrap();
        GameSession::new(game)
    }

    // ===========================================
    // Turn and clocks
    // ===========================================

    #[test]
    fn turn_follows_fen() {
        let now = Instant::now();
        let prefs = Preferences::default();
        let s = session(SnapshotBuilder::new("abcdefgh").plies(2), now);
        assert!(SessionView::new(&s, &prefs, now).is_my_turn());

        let s = session(SnapshotBuilder::new("abcdefgh").plies(3), now);
        let view = SessionView::new(&s, &prefs, now);
        assert!(!view.is_my_turn());
        assert_eq!(view.opponent_side(), Some(Side::Black));
    }

    #[test]
    fn clock_starts_after_first_full_move() {
        let now = Instant::now();
        let prefs = Preferences::default();
        let s = session(SnapshotBuilder::new("abcdefgh").plies(1).clock(60.0, 0), now);
        assert_eq!(SessionView::new(&s, &prefs, now).active_clock_side(), None);

        let mut s = session(SnapshotBuilder::new("abcdefgh").plies(2).clock(60.0, 0), now);
        assert_eq!(
            SessionView::new(&s, &prefs, now).active_clock_side(),
            Some(Side::White)
        );

        s.awaiting_ack = true;
        assert_eq!(SessionView::new(&s, &prefs, now).active_clock_side(), None);
    }

    #[test]
    fn clock_idle_until_game_started() {
        let now = Instant::now();
        let prefs = Preferences::default();
        let s = session(
            SnapshotBuilder::new("abcdefgh")
                .plies(2)
                .clock(60.0, 0)
                .status(GameStatus::Created),
            now,
        );
        assert!(s.game.playable());
        assert_eq!(SessionView::new(&s, &prefs, now).active_clock_side(), None);
    }

    #[test]
    fn time_to_move_counts_down() {
        let start = Instant::now();
        let prefs = Preferences::default();
        let s = session(SnapshotBuilder::new("abcdefgh").expiration(30_000), start);

        let later = start + Duration::from_secs(12);
        assert_eq!(
            SessionView::new(&s, &prefs, later).time_to_move(),
            Some(Duration::from_secs(18))
        );
        let much_later = start + Duration::from_secs(60);
        assert_eq!(
            SessionView::new(&s, &prefs, much_later).time_to_move(),
            Some(Duration::ZERO)
        );
    }

    // ===========================================
    // Offers
    // ===========================================

    #[test]
    fn draw_offer_cooldown() {
        let now = Instant::now();
        let prefs = Preferences::default();
        let mut s = session(SnapshotBuilder::new("abcdefgh").plies(30), now);
        assert!(SessionView::new(&s, &prefs, now).can_offer_draw());

        s.last_draw_offer_at_ply = Some(12);
        assert!(!SessionView::new(&s, &prefs, now).can_offer_draw());

        s.last_draw_offer_at_ply = Some(9);
        assert!(SessionView::new(&s, &prefs, now).can_offer_draw());

        s.last_draw_offer_at_ply = Some(u32::MAX);
        assert!(!SessionView::new(&s, &prefs, now).can_offer_draw());
    }

    #[test]
    fn no_draw_against_computer() {
        let now = Instant::now();
        let prefs = Preferences::default();
        let s = session(SnapshotBuilder::new("abcdefgh").plies(10).black_ai(3), now);
        assert!(!SessionView::new(&s, &prefs, now).can_offer_draw());
    }

    #[test]
    fn rematch_after_finished_game() {
        let now = Instant::now();
        let prefs = Preferences::default();
        let s = session(
            SnapshotBuilder::new("abcdefgh")
                .plies(10)
                .status(GameStatus::Resign),
            now,
        );
        assert!(SessionView::new(&s, &prefs, now).can_offer_rematch());

        let s = session(
            SnapshotBuilder::new("abcdefgh")
                .plies(10)
                .status(GameStatus::Resign)
                .rule(GameRule::NoRematch),
            now,
        );
        assert!(!SessionView::new(&s, &prefs, now).can_offer_rematch());
    }

    #[test]
    fn rated_matchmade_abort_cannot_rematch() {
        let now = Instant::now();
        let prefs = Preferences::default();
        let s = session(
            SnapshotBuilder::new("abcdefgh")
                .status(GameStatus::Aborted)
                .rated(true)
                .source(GameSource::Pool),
            now,
        );
        let view = SessionView::new(&s, &prefs, now);
        assert!(!view.can_offer_rematch());
        assert!(view.can_get_new_opponent());
    }

    // ===========================================
    // Abandonment
    // ===========================================

    #[test]
    fn claim_win_needs_gone_opponent_and_idle_countdown() {
        let now = Instant::now();
        let prefs = Preferences::default();
        let mut s = session(SnapshotBuilder::new("abcdefgh").plies(3), now);
        assert!(SessionView::new(&s, &prefs, now).countdown_eligible());
        assert!(!SessionView::new(&s, &prefs, now).can_claim_win());

        s.game.black.is_gone = true;
        s.countdown = crate::AbandonmentCountdown::arm(5);
        assert!(!SessionView::new(&s, &prefs, now).can_claim_win());

        s.countdown = crate::AbandonmentCountdown::Idle;
        assert!(SessionView::new(&s, &prefs, now).can_claim_win());
    }

    #[test]
    fn no_claim_win_rule_disables_countdown() {
        let now = Instant::now();
        let prefs = Preferences::default();
        let s = session(
            SnapshotBuilder::new("abcdefgh")
                .plies(3)
                .rule(GameRule::NoClaimWin),
            now,
        );
        assert!(!SessionView::new(&s, &prefs, now).countdown_eligible());
    }

    // ===========================================
    // Preferences
    // ===========================================

    #[test]
    fn preference_predicates() {
        let now = Instant::now();
        let s = session(SnapshotBuilder::new("abcdefgh"), now);
        let prefs = Preferences {
            zen_mode: ZenMode::GameAuto,
            auto_queen: AutoQueen::Premove,
            ..Preferences::default()
        };
        let view = SessionView::new(&s, &prefs, now);
        assert!(view.is_zen_mode());
        assert!(!view.can_auto_queen());
        assert!(view.can_auto_queen_on_premove());
        assert!(view.can_premove());
        assert!(!view.should_confirm_move());
    }

    #[test]
    fn session_override_beats_preference() {
        let now = Instant::now();
        let mut s = session(SnapshotBuilder::new("abcdefgh"), now);
        let prefs = Preferences {
            submit_move_confirm: true,
            ..Preferences::default()
        };
        assert!(SessionView::new(&s, &prefs, now).should_confirm_move());
        s.confirm_move_override = Some(false);
        assert!(!SessionView::new(&s, &prefs, now).should_confirm_move());
    }
}
