//! Per-topic reducers.
//!
//! Each reducer takes the current session and one typed payload and returns
//! the next session plus the actions the change implies. Reducers never
//! fail: a payload that cannot be applied leaves the affected field alone.

use boardsync_types::{
    ClockIncEvent, CrowdEvent, EndDataEvent, GameId, MoveEvent, Side, TakebackOffersEvent,
};
use std::time::Instant;
use tracing::{debug, warn};

use crate::action::{Action, FeedbackCue};
use crate::countdown::AbandonmentCountdown;
use crate::game::{centis, seconds, Game, Step};
use crate::rules::{san_is_capture, RulesEngine};
use crate::session::GameSession;

/// Result of a reduction.
pub type Reduction = (GameSession, Vec<Action>);

/// Expiration is dropped once the game has more steps than this.
const EXPIRATION_STEPS: usize = 2;

/// `full`: replace the game wholesale.
pub fn full(previous: Option<&GameSession>, game: Game) -> Reduction {
    let next = match previous {
        Some(previous) => previous.resynced(game),
        None => GameSession::new(game),
    };
    let mut actions = vec![Action::CancelMoveWatchdog];
    if previous.is_some_and(|p| p.countdown.is_armed()) {
        actions.push(Action::CancelCountdown);
    }
    (next, actions)
}

/// `move`: a move by either side, echoed or new.
pub fn moved(
    session: &GameSession,
    event: &MoveEvent,
    rules: &dyn RulesEngine,
    now: Instant,
) -> Reduction {
    let mut next = session.clone();
    let mut actions = Vec::new();
    let game = &mut next.game;

    if game.last_ply().checked_add(1) == Some(event.ply) {
        match rules.apply_unchecked(game.last_position(), &event.uci) {
            Ok(position) => {
                game.steps.push(Step {
                    ply: event.ply,
                    diff: rules.material_diff(&position),
                    position,
                    mv: Some(event.uci),
                    san: Some(event.san.clone()),
                    check: event.check,
                });
                if !session.is_replaying() {
                    next.step_cursor = next.game.steps.len() - 1;
                    actions.push(Action::Feedback(FeedbackCue::MovePlayed {
                        capture: san_is_capture(&event.san),
                        check: event.check || event.mate,
                    }));
                }
            }
            Err(e) => {
                warn!("Cannot apply move {} at ply {}: {}", event.uci, event.ply, e);
                actions.push(Action::RequestResync);
            }
        }
    } else {
        debug!(
            "Move at ply {} not appended (last ply {})",
            event.ply,
            game.last_ply()
        );
    }

    let game = &mut next.game;
    if let Some(status) = event.status {
        game.status = status;
    }
    if event.winner.is_some() {
        game.winner = event.winner;
    }
    game.threefold = event.threefold;

    if let (Some(clock), Some(times)) = (game.clock.as_mut(), event.clock.as_ref()) {
        clock.white = seconds(times.white);
        clock.black = seconds(times.black);
        clock.running = game.status.is_playable();
    }

    if game.steps.len() > EXPIRATION_STEPS {
        game.expiration = None;
    } else if let Some(expiration) = game.expiration.as_mut() {
        expiration.moved_at = now;
    }

    match game.player_side {
        Some(side) if side == Side::of_ply(event.ply) => {
            next.awaiting_ack = false;
            actions.push(Action::CancelMoveWatchdog);
        }
        Some(_) => next.last_move_at = Some(now),
        None => {}
    }

    (next, actions)
}

/// `endData`: the game is over.
pub fn end_data(session: &GameSession, event: &EndDataEvent) -> Reduction {
    let mut next = session.clone();
    let game = &mut next.game;
    game.status = event.status;
    game.winner = event.winner;
    game.boosted = event.boosted;
    if let Some(diff) = event.rating_diff {
        game.white.rating_diff = Some(diff.white);
        game.black.rating_diff = Some(diff.black);
    }
    if let (Some(clock), Some(last)) = (game.clock.as_mut(), event.clock) {
        clock.white = centis(last.wc);
        clock.black = centis(last.bc);
        clock.running = false;
    }
    next.premove = None;
    next.awaiting_ack = false;
    if let Some(pending) = next.move_to_confirm.take() {
        if next.game.steps.len() > 1 {
            next.game.steps.pop();
        }
        next.step_cursor = pending.cursor_before.min(next.live_cursor());
        debug!("Dropped unconfirmed {} at game end", pending.mv);
    }

    let mut actions = vec![Action::CancelMoveWatchdog];
    if next.game.last_position().fullmoves() > 1 {
        actions.push(Action::Feedback(FeedbackCue::GameEnd));
    }
    (next, actions)
}

/// `clockInc`: one side's clock changed. Incomplete payloads are ignored.
pub fn clock_inc(session: &GameSession, event: &ClockIncEvent) -> Reduction {
    let (Some(side), Some(time)) = (event.color, event.time) else {
        debug!("Ignoring incomplete clockInc");
        return (session.clone(), Vec::new());
    };
    let mut next = session.clone();
    if let Some(clock) = next.game.clock {
        next.game.clock = Some(clock.with_time(side, centis(time)));
    }
    (next, Vec::new())
}

/// `crowd`: presence flags. An opponent coming back stops the countdown.
pub fn crowd(session: &GameSession, event: &CrowdEvent) -> Reduction {
    let mut next = session.clone();
    if let Some(on_game) = event.white {
        next.game.white.on_game = on_game;
    }
    if let Some(on_game) = event.black {
        next.game.black.on_game = on_game;
    }

    let opponent_present = match next.game.player_side.map(Side::opposite) {
        Some(Side::White) => event.white == Some(true),
        Some(Side::Black) => event.black == Some(true),
        None => false,
    };
    let mut actions = Vec::new();
    if opponent_present && next.countdown.is_armed() {
        next.countdown = AbandonmentCountdown::Idle;
        actions.push(Action::CancelCountdown);
    }
    (next, actions)
}

/// `gone`: the opponent left or came back.
pub fn gone(session: &GameSession, is_gone: bool) -> Reduction {
    let mut next = session.clone();
    if let Some(opponent) = next.game.player_side.map(Side::opposite) {
        next.game.side_mut(opponent).is_gone = is_gone;
    }
    let mut actions = Vec::new();
    if next.countdown.is_armed() {
        next.countdown = AbandonmentCountdown::Idle;
        actions.push(Action::CancelCountdown);
    }
    (next, actions)
}

/// `goneIn`: seconds before the absent opponent's game can be claimed.
pub fn gone_in(session: &GameSession, seconds: u32) -> Reduction {
    let mut next = session.clone();
    next.countdown = AbandonmentCountdown::arm(seconds);
    let action = if next.countdown.is_armed() {
        Action::ArmCountdown
    } else {
        Action::CancelCountdown
    };
    (next, vec![action])
}

/// `drawOffer`: the side currently offering a draw.
pub fn draw_offer(session: &GameSession, offering: Option<Side>) -> Reduction {
    let mut next = session.clone();
    next.game.white.offering_draw = offering == Some(Side::White);
    next.game.black.offering_draw = offering == Some(Side::Black);
    if offering.is_some() && offering == next.game.player_side {
        next.last_draw_offer_at_ply = Some(next.game.last_ply());
    }
    (next, Vec::new())
}

/// `rematchOffer`: the side currently offering a rematch.
pub fn rematch_offer(session: &GameSession, offering: Option<Side>) -> Reduction {
    let mut next = session.clone();
    next.game.white.offering_rematch = offering == Some(Side::White);
    next.game.black.offering_rematch = offering == Some(Side::Black);
    (next, Vec::new())
}

/// `takebackOffers`: proposal flags, absent meaning no proposal.
pub fn takeback_offers(session: &GameSession, event: &TakebackOffersEvent) -> Reduction {
    let mut next = session.clone();
    next.game.white.proposing_takeback = event.white.unwrap_or(false);
    next.game.black.proposing_takeback = event.black.unwrap_or(false);
    (next, Vec::new())
}

/// `rematchTaken`: the rematch game exists.
pub fn rematch_taken(session: &GameSession, id: &GameId) -> Reduction {
    let mut next = session.clone();
    next.game.rematch = Some(id.clone());
    (next, Vec::new())
}

/// `redirect`: the player should move to another game.
pub fn redirect(session: &GameSession, id: &GameId) -> Reduction {
    let mut next = session.clone();
    next.redirect_game_id = Some(id.clone());
    (next, vec![Action::Redirect(id.clone())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRules, SnapshotBuilder};
    use crate::session::PendingMove;
    use boardsync_types::{FinalClock, GameStatus, Move, MoveClock, RatingDiffs};
    use std::time::Duration;

    fn session(builder: SnapshotBuilder) -> GameSession {
        let game = Game::from_snapshot(builder.build(), &FakeRules::default(), Instant::now())
            .unwrap();
        GameSession::new(game)
    }

    fn move_event(ply: u32, uci: &str, san: &str) -> MoveEvent {
        MoveEvent {
            ply,
            uci: Move::from_uci(uci).unwrap(),
            san: san.to_string(),
            check: false,
            mate: false,
            threefold: false,
            status: None,
            winner: None,
            clock: None,
        }
    }

    // ===========================================
    // move
    // ===========================================

    #[test]
    fn next_ply_appends_one_step() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(2));
        let (next, actions) = moved(
            &s,
            &move_event(3, "e2e4", "e4"),
            &FakeRules::default(),
            Instant::now(),
        );
        assert_eq!(next.game.steps.len(), 4);
        assert_eq!(next.game.last_ply(), 3);
        assert_eq!(next.step_cursor, 3);
        assert!(actions.contains(&Action::Feedback(FeedbackCue::MovePlayed {
            capture: false,
            check: false
        })));
        // our own move: white played ply 3
        assert!(actions.contains(&Action::CancelMoveWatchdog));
    }

    #[test]
    fn duplicate_ply_does_not_append() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(2));
        let rules = FakeRules::default();
        let now = Instant::now();
        let (once, _) = moved(&s, &move_event(3, "e2e4", "e4"), &rules, now);
        let (twice, actions) = moved(&once, &move_event(3, "e2e4", "e4"), &rules, now);
        assert_eq!(twice.game.steps.len(), once.game.steps.len());
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::Feedback(_))));
    }

    #[test]
    fn terminal_fields_apply_even_without_append() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(4));
        let mut event = move_event(4, "f6g8", "Ng8");
        event.status = Some(GameStatus::Draw);
        event.threefold = true;
        let (next, _) = moved(&s, &event, &FakeRules::default(), Instant::now());
        assert_eq!(next.game.steps.len(), 5);
        assert_eq!(next.game.status, GameStatus::Draw);
        assert!(next.game.threefold);
    }

    #[test]
    fn replaying_cursor_stays_put() {
        let mut s = session(SnapshotBuilder::new("abcdefgh").plies(4));
        s.step_cursor = 1;
        let (next, actions) = moved(
            &s,
            &move_event(5, "e2e4", "e4"),
            &FakeRules::default(),
            Instant::now(),
        );
        assert_eq!(next.game.steps.len(), 6);
        assert_eq!(next.step_cursor, 1);
        assert!(!actions.iter().any(|a| matches!(a, Action::Feedback(_))));
    }

    #[test]
    fn opponent_move_starts_move_timer() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(1));
        let now = Instant::now();
        let (next, actions) = moved(&s, &move_event(2, "e7e5", "e5"), &FakeRules::default(), now);
        assert_eq!(next.last_move_at, Some(now));
        assert!(!actions.contains(&Action::CancelMoveWatchdog));
    }

    #[test]
    fn own_echo_clears_awaiting_ack() {
        let mut s = session(SnapshotBuilder::new("abcdefgh").plies(2));
        s.awaiting_ack = true;
        let (next, _) = moved(
            &s,
            &move_event(3, "e2e4", "e4"),
            &FakeRules::default(),
            Instant::now(),
        );
        assert!(!next.awaiting_ack);
    }

    #[test]
    fn move_updates_clock_and_expiration() {
        let start = Instant::now();
        let s = session(
            SnapshotBuilder::new("abcdefgh")
                .clock(60.0, 0)
                .expiration(30_000),
        );
        let mut event = move_event(1, "e2e4", "e4");
        event.clock = Some(MoveClock {
            white: 58.5,
            black: 60.0,
            lag: None,
        });
        let later = start + Duration::from_secs(5);
        let (next, _) = moved(&s, &event, &FakeRules::default(), later);
        let clock = next.game.clock.unwrap();
        assert_eq!(clock.white, Duration::from_millis(58_500));
        assert_eq!(next.game.expiration.unwrap().moved_at, later);

        let (next, _) = moved(&next, &move_event(2, "e7e5", "e5"), &FakeRules::default(), later);
        assert!(next.game.expiration.is_none());
    }

    #[test]
    fn move_after_max_ply_is_dropped() {
        let mut s = session(SnapshotBuilder::new("abcdefgh").plies(2));
        let last = s.game.steps.len() - 1;
        s.game.steps[last].ply = u32::MAX;
        for ply in [0, 5, u32::MAX] {
            let (next, actions) = moved(
                &s,
                &move_event(ply, "e2e4", "e4"),
                &FakeRules::default(),
                Instant::now(),
            );
            assert_eq!(next.game.steps.len(), 3);
            assert!(!actions.iter().any(|a| matches!(a, Action::Feedback(_))));
        }
    }

    #[test]
    fn capture_and_check_feedback() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(2));
        let mut event = move_event(3, "e4d5", "exd5+");
        event.check = true;
        let (_, actions) = moved(&s, &event, &FakeRules::default(), Instant::now());
        assert!(actions.contains(&Action::Feedback(FeedbackCue::MovePlayed {
            capture: true,
            check: true
        })));
    }

    // ===========================================
    // endData
    // ===========================================

    #[test]
    fn short_game_ends_silently() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(1));
        let event = EndDataEvent {
            status: GameStatus::Aborted,
            winner: None,
            boosted: false,
            rating_diff: None,
            clock: None,
        };
        let (next, actions) = end_data(&s, &event);
        assert_eq!(next.game.status, GameStatus::Aborted);
        assert!(!actions.contains(&Action::Feedback(FeedbackCue::GameEnd)));
    }

    #[test]
    fn longer_game_ends_with_chime() {
        let mut s = session(SnapshotBuilder::new("abcdefgh").plies(4).clock(60.0, 0));
        s.premove = Some(Move::from_uci("e2e4").unwrap());
        let event = EndDataEvent {
            status: GameStatus::Resign,
            winner: Some(Side::White),
            boosted: false,
            rating_diff: Some(RatingDiffs { white: 8, black: -8 }),
            clock: Some(FinalClock { wc: 4_250, bc: 3_000 }),
        };
        let (next, actions) = end_data(&s, &event);
        assert!(actions.contains(&Action::Feedback(FeedbackCue::GameEnd)));
        assert_eq!(next.game.winner, Some(Side::White));
        assert_eq!(next.game.black.rating_diff, Some(-8));
        assert_eq!(next.game.clock.unwrap().white, Duration::from_millis(42_500));
        assert!(next.premove.is_none());
    }

    #[test]
    fn game_end_drops_unconfirmed_move() {
        let mut s = session(SnapshotBuilder::new("abcdefgh").plies(2).clock(60.0, 0));
        s.step_cursor = 1;
        let mut held = s.game.last_step().clone();
        held.ply = 3;
        s.game.steps.push(held);
        s.move_to_confirm = Some(PendingMove {
            mv: Move::from_uci("e2e4").unwrap(),
            move_time: None,
            with_lag: false,
            cursor_before: 1,
        });
        let event = EndDataEvent {
            status: GameStatus::OutOfTime,
            winner: Some(Side::Black),
            boosted: false,
            rating_diff: None,
            clock: None,
        };
        let (next, _) = end_data(&s, &event);
        assert_eq!(next.game.steps.len(), 3);
        assert_eq!(next.game.last_ply(), 2);
        assert_eq!(next.step_cursor, 1);
        assert!(next.move_to_confirm.is_none());
        assert_eq!(next.game.status, GameStatus::OutOfTime);
    }

    // ===========================================
    // clockInc / presence
    // ===========================================

    #[test]
    fn clock_inc_overwrites_one_side() {
        let s = session(SnapshotBuilder::new("abcdefgh").clock(60.0, 0));
        let (next, _) = clock_inc(
            &s,
            &ClockIncEvent {
                color: Some(Side::Black),
                time: Some(7_500),
            },
        );
        let clock = next.game.clock.unwrap();
        assert_eq!(clock.black, Duration::from_secs(75));
        assert_eq!(clock.white, Duration::from_secs(60));

        let (same, _) = clock_inc(&s, &ClockIncEvent::default());
        assert_eq!(same, s);
    }

    #[test]
    fn gone_marks_opponent_only() {
        let s = session(SnapshotBuilder::new("abcdefgh").you_are(Side::Black));
        let (next, _) = gone(&s, true);
        assert!(next.game.white.is_gone);
        assert!(!next.game.black.is_gone);

        let spectating = session(SnapshotBuilder::new("abcdefgh").spectator());
        let (next, _) = gone(&spectating, true);
        assert!(!next.game.white.is_gone && !next.game.black.is_gone);
    }

    #[test]
    fn gone_cancels_countdown() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(3));
        let (armed, actions) = gone_in(&s, 20);
        assert_eq!(actions, vec![Action::ArmCountdown]);
        assert_eq!(
            armed.opponent_left_countdown(),
            Some(Duration::from_secs(20))
        );

        let (next, actions) = gone(&armed, false);
        assert_eq!(actions, vec![Action::CancelCountdown]);
        assert!(next.opponent_left_countdown().is_none());
    }

    #[test]
    fn returning_opponent_cancels_countdown() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(3));
        let (armed, _) = gone_in(&s, 20);

        let (still, actions) = crowd(
            &armed,
            &CrowdEvent {
                white: Some(true),
                black: None,
            },
        );
        assert!(actions.is_empty());
        assert!(still.countdown.is_armed());

        let (next, actions) = crowd(
            &armed,
            &CrowdEvent {
                white: None,
                black: Some(true),
            },
        );
        assert_eq!(actions, vec![Action::CancelCountdown]);
        assert!(!next.countdown.is_armed());
    }

    // ===========================================
    // Offers
    // ===========================================

    #[test]
    fn own_draw_offer_records_ply() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(6));
        let (next, _) = draw_offer(&s, Some(Side::White));
        assert!(next.game.white.offering_draw);
        assert_eq!(next.last_draw_offer_at_ply, Some(6));

        let (next, _) = draw_offer(&next, Some(Side::Black));
        assert!(!next.game.white.offering_draw);
        assert!(next.game.black.offering_draw);
        assert_eq!(next.last_draw_offer_at_ply, Some(6));

        let (next, _) = draw_offer(&next, None);
        assert!(!next.game.black.offering_draw);
    }

    #[test]
    fn takeback_flags_default_false() {
        let mut s = session(SnapshotBuilder::new("abcdefgh").plies(6));
        s.game.white.proposing_takeback = true;
        let (next, _) = takeback_offers(
            &s,
            &TakebackOffersEvent {
                white: None,
                black: Some(true),
            },
        );
        assert!(!next.game.white.proposing_takeback);
        assert!(next.game.black.proposing_takeback);
    }

    #[test]
    fn rematch_and_redirect() {
        let s = session(SnapshotBuilder::new("abcdefgh").status(GameStatus::Mate));
        let (next, _) = rematch_offer(&s, Some(Side::Black));
        assert!(next.game.black.offering_rematch);

        let (next, _) = rematch_taken(&next, &GameId::new("zyxwvuts"));
        assert_eq!(next.game.rematch, Some(GameId::new("zyxwvuts")));

        let (next, actions) = redirect(&next, &GameId::new("zyxwvuts"));
        assert_eq!(next.redirect_game_id, Some(GameId::new("zyxwvuts")));
        assert_eq!(actions, vec![Action::Redirect(GameId::new("zyxwvuts"))]);
    }

    // ===========================================
    // full
    // ===========================================

    #[test]
    fn full_cancels_running_timers() {
        let s = session(SnapshotBuilder::new("abcdefgh").plies(3));
        let (armed, _) = gone_in(&s, 20);
        let fresh = session(SnapshotBuilder::new("abcdefgh").plies(5)).game;
        let (next, actions) = full(Some(&armed), fresh);
        assert_eq!(
            actions,
            vec![Action::CancelMoveWatchdog, Action::CancelCountdown]
        );
        assert_eq!(next.step_cursor, 5);
        assert!(!next.countdown.is_armed());
    }
}
