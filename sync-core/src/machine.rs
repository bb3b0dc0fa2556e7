//! Session state machine.
//!
//! [`SessionMachine`] is the single owner of a game's session value. It
//! takes the three kinds of stimuli (inbound frames, user calls, timer
//! expiries), replaces the session wholesale, and returns the [`Action`]s
//! the client must perform. It performs no I/O.
//!
//! Inbound frames flow through:
//!
//! ```text
//! SocketEvent -> VersionTracker::observe -> GameEvent::decode -> dispatch -> reducer
//! ```
//!
//! `full` frames skip classification; they are checked against the
//! tracker's high-water mark and reseed it.

use boardsync_types::{FullSnapshot, GameEvent, SocketEvent};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::action::{Action, Defect};
use crate::game::Game;
use crate::prefs::Preferences;
use crate::reducer::{self, Reduction};
use crate::rules::RulesEngine;
use crate::session::GameSession;
use crate::version::{Classification, VersionTracker};
use crate::view::SessionView;

const FULL_TOPIC: &str = "full";

/// Owner of one game's session value.
#[derive(Debug)]
pub struct SessionMachine<R> {
    pub(crate) rules: R,
    pub(crate) prefs: Preferences,
    tracker: VersionTracker,
    session: Option<Arc<GameSession>>,
}

impl<R: RulesEngine> SessionMachine<R> {
    /// Create a machine that waits for its first snapshot.
    pub fn new(rules: R, prefs: Preferences) -> Self {
        Self {
            rules,
            prefs,
            tracker: VersionTracker::new(),
            session: None,
        }
    }

    /// Current session, once a snapshot has arrived.
    pub fn session(&self) -> Option<&Arc<GameSession>> {
        self.session.as_ref()
    }

    /// The version tracker.
    pub fn tracker(&self) -> &VersionTracker {
        &self.tracker
    }

    /// Account preferences.
    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    /// Derived view of the current session at `now`.
    pub fn view(&self, now: Instant) -> Option<SessionView<'_>> {
        self.session
            .as_deref()
            .map(|session| SessionView::new(session, &self.prefs, now))
    }

    /// A fresh transport connection was established.
    ///
    /// Events are ignored until the connection's first snapshot arrives.
    pub fn on_connected(&mut self) {
        debug!(
            "Connection established; awaiting snapshot (high water {:?})",
            self.tracker.high_water()
        );
        self.tracker.reseed();
    }

    /// Process one inbound frame.
    pub fn on_socket_event(&mut self, frame: &SocketEvent, now: Instant) -> Vec<Action> {
        if frame.topic != FULL_TOPIC {
            let last = self.tracker.last_version();
            match self.tracker.observe(frame.version) {
                Classification::AwaitingFull => {
                    debug!("Dropping {} received before snapshot", frame.topic);
                    return Vec::new();
                }
                Classification::Stale => {
                    debug!(
                        "Dropping stale {} v{:?} (at v{:?})",
                        frame.topic, frame.version, last
                    );
                    return Vec::new();
                }
                Classification::Gap => {
                    warn!(
                        "Version gap: {} v{:?} after v{:?}, resyncing",
                        frame.topic, frame.version, last
                    );
                    return vec![Action::RequestResync];
                }
                Classification::Next => {}
            }
        }

        match GameEvent::decode(frame) {
            Ok(event) => self.dispatch(event, frame.version, now, false),
            Err(e) => {
                warn!("Dropping {}: {}", frame.topic, e);
                Vec::new()
            }
        }
    }

    /// The move-acknowledgement watchdog expired.
    pub fn on_move_watchdog(&mut self) -> Vec<Action> {
        match &self.session {
            Some(session) if session.awaiting_ack => {
                info!("No echo for our move, resyncing");
                vec![Action::RequestResync]
            }
            _ => Vec::new(),
        }
    }

    /// The one-second abandonment countdown ticker fired.
    pub fn on_countdown_tick(&mut self, now: Instant) -> Vec<Action> {
        let Some(current) = self.session.clone() else {
            return vec![Action::CancelCountdown];
        };
        if !current.countdown.is_armed() {
            return vec![Action::CancelCountdown];
        }
        let eligible = SessionView::new(&current, &self.prefs, now).countdown_eligible();
        let mut next = (*current).clone();
        next.countdown = current.countdown.tick(eligible);
        let actions = if next.countdown.is_armed() {
            Vec::new()
        } else {
            debug!("Abandonment countdown stopped (eligible: {})", eligible);
            vec![Action::CancelCountdown]
        };
        self.commit((next, actions))
    }

    fn dispatch(
        &mut self,
        event: GameEvent,
        version: Option<u64>,
        now: Instant,
        unwrapped: bool,
    ) -> Vec<Action> {
        let event = match event {
            GameEvent::Full(snapshot) => return self.apply_full(*snapshot, version, now),
            GameEvent::Resync => {
                info!("Server requested resync");
                return vec![Action::RequestResync];
            }
            GameEvent::Reload(Some(inner)) if !unwrapped => {
                return match GameEvent::decode(&inner) {
                    Ok(event) => self.dispatch(event, inner.version, now, true),
                    Err(e) => {
                        warn!("Dropping reloaded {}: {}", inner.topic, e);
                        Vec::new()
                    }
                };
            }
            GameEvent::Reload(_) => {
                info!("Reload without a usable payload, resyncing");
                return vec![Action::RequestResync];
            }
            GameEvent::Unknown(topic) => {
                debug!("Ignoring unknown topic {}", topic);
                return Vec::new();
            }
            event => event,
        };

        let Some(current) = self.session.clone() else {
            error!("Event {:?} dispatched before the first snapshot", event);
            return Vec::new();
        };

        let reduction = match &event {
            GameEvent::Move(e) => reducer::moved(&current, e, &self.rules, now),
            GameEvent::EndData(e) => reducer::end_data(&current, e),
            GameEvent::ClockInc(e) => reducer::clock_inc(&current, e),
            GameEvent::Crowd(e) => reducer::crowd(&current, e),
            GameEvent::Gone(is_gone) => reducer::gone(&current, *is_gone),
            GameEvent::GoneIn(seconds) => reducer::gone_in(&current, *seconds),
            GameEvent::DrawOffer(side) => reducer::draw_offer(&current, *side),
            GameEvent::RematchOffer(side) => reducer::rematch_offer(&current, *side),
            GameEvent::TakebackOffers(e) => reducer::takeback_offers(&current, e),
            GameEvent::RematchTaken(id) => reducer::rematch_taken(&current, id),
            GameEvent::Redirect(id) => reducer::redirect(&current, id),
            GameEvent::Full(_)
            | GameEvent::Reload(_)
            | GameEvent::Resync
            | GameEvent::Unknown(_) => return Vec::new(),
        };
        self.commit(reduction)
    }

    fn apply_full(
        &mut self,
        snapshot: FullSnapshot,
        frame_version: Option<u64>,
        now: Instant,
    ) -> Vec<Action> {
        let version = snapshot.socket.or(frame_version);
        if !self.tracker.accepts_snapshot(version) {
            debug!(
                "Ignoring snapshot v{:?} behind v{:?}",
                version,
                self.tracker.high_water()
            );
            return Vec::new();
        }
        let game = match Game::from_snapshot(snapshot, &self.rules, now) {
            Ok(game) => game,
            Err(e) => {
                warn!("Dropping snapshot: {}", e);
                return Vec::new();
            }
        };
        self.tracker.seed(version);
        info!(
            "Game {} synced at v{:?}, ply {}",
            game.id.public_id(),
            self.tracker.last_version(),
            game.last_ply()
        );
        let reduction = reducer::full(self.session.as_deref(), game);
        self.commit(reduction)
    }

    /// The current session, or [`Defect::NoSnapshot`].
    pub(crate) fn current(&self) -> Result<Arc<GameSession>, Defect> {
        self.session.clone().ok_or(Defect::NoSnapshot)
    }

    /// Publish the next session value.
    pub(crate) fn commit(&mut self, (session, actions): Reduction) -> Vec<Action> {
        self.session = Some(Arc::new(session));
        actions
    }
}
