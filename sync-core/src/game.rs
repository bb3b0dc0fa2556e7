//! The game record: players, clock, status and the step sequence.

use boardsync_types::{
    Fen, FullSnapshot, GameId, GameRule, GameSource, GameStatus, Move, ProtocolError, Side,
    SnapshotClock, SnapshotPlayer, SnapshotStep, Speed,
};
use std::time::{Duration, Instant};

use crate::rules::{MaterialDiff, RulesEngine};

/// One player's side of the board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerSide {
    /// Username, absent for anonymous players and engines.
    pub user: Option<String>,
    /// Rating before the game.
    pub rating: Option<u32>,
    /// Rating change once the game is over.
    pub rating_diff: Option<i32>,
    /// Engine level when this side is the computer.
    pub ai: Option<u8>,
    /// Connected to the game.
    pub on_game: bool,
    /// Left the game.
    pub is_gone: bool,
    /// Offering a draw.
    pub offering_draw: bool,
    /// Offering a rematch.
    pub offering_rematch: bool,
    /// Proposing a takeback.
    pub proposing_takeback: bool,
}

impl From<SnapshotPlayer> for PlayerSide {
    fn from(p: SnapshotPlayer) -> Self {
        Self {
            user: p.user,
            rating: p.rating,
            rating_diff: p.rating_diff,
            ai: p.ai,
            on_game: p.on_game,
            is_gone: p.is_gone,
            offering_draw: p.offering_draw,
            offering_rematch: p.offering_rematch,
            proposing_takeback: p.proposing_takeback,
        }
    }
}

/// Real-time clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameClock {
    /// White's remaining time.
    pub white: Duration,
    /// Black's remaining time.
    pub black: Duration,
    /// Whether the clock is ticking.
    pub running: bool,
    /// Initial time per side.
    pub initial: Duration,
    /// Increment per move.
    pub increment: Duration,
}

impl GameClock {
    /// Remaining time of one side.
    pub fn time(&self, side: Side) -> Duration {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    /// Copy with one side's time replaced.
    pub fn with_time(self, side: Side, time: Duration) -> Self {
        match side {
            Side::White => Self { white: time, ..self },
            Side::Black => Self { black: time, ..self },
        }
    }
}

impl From<&SnapshotClock> for GameClock {
    fn from(c: &SnapshotClock) -> Self {
        Self {
            white: seconds(c.white),
            black: seconds(c.black),
            running: c.running,
            initial: Duration::from_secs(u64::from(c.initial)),
            increment: Duration::from_secs(u64::from(c.increment)),
        }
    }
}

/// Convert wire seconds to a duration. Negative or non-finite values clamp to zero.
pub(crate) fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Convert wire centiseconds to a duration.
pub(crate) fn centis(value: u64) -> Duration {
    Duration::from_millis(value.saturating_mul(10))
}

/// Deadline for the first moves of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiration {
    /// How long the game had been idle when the deadline was set.
    pub idle: Duration,
    /// Time allowed for the move.
    pub time_to_move: Duration,
    /// When the deadline was last refreshed.
    pub moved_at: Instant,
}

/// A position reached by one ply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Ply number.
    pub ply: u32,
    /// Resulting position.
    pub position: Fen,
    /// The move that produced this step; absent for the initial step.
    pub mv: Option<Move>,
    /// Algebraic notation of the move.
    pub san: Option<String>,
    /// Whether the move gave check.
    pub check: bool,
    /// Material balance of the position.
    pub diff: MaterialDiff,
}

/// Variant and ruleset metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMeta {
    /// Variant key.
    pub variant: String,
    /// Time-control category.
    pub speed: Speed,
    /// Whether the game is rated.
    pub rated: bool,
    /// Where the game came from.
    pub source: Option<GameSource>,
    /// Restrictions on player actions.
    pub rules: Vec<GameRule>,
}

impl GameMeta {
    /// Whether the ruleset contains `rule`.
    pub fn has_rule(&self, rule: &GameRule) -> bool {
        self.rules.contains(rule)
    }
}

/// The game as known to this client.
///
/// `steps` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// Game identifier.
    pub id: GameId,
    /// Variant and rules.
    pub meta: GameMeta,
    /// White player.
    pub white: PlayerSide,
    /// Black player.
    pub black: PlayerSide,
    /// Side controlled by the local player; `None` when spectating.
    pub player_side: Option<Side>,
    /// Current status.
    pub status: GameStatus,
    /// Winner, once decided.
    pub winner: Option<Side>,
    /// Flagged as rating manipulation.
    pub boosted: bool,
    /// The current position occurred for the third time.
    pub threefold: bool,
    /// Real-time clock.
    pub clock: Option<GameClock>,
    /// First-move deadline.
    pub expiration: Option<Expiration>,
    /// Rematch game, once created.
    pub rematch: Option<GameId>,
    /// Positions from the initial one to the latest.
    pub steps: Vec<Step>,
}

impl Game {
    /// Build a game from a `full` snapshot.
    ///
    /// Step material diffs are computed by `rules`. `now` anchors the
    /// expiration deadline.
    pub fn from_snapshot(
        snapshot: FullSnapshot,
        rules: &dyn RulesEngine,
        now: Instant,
    ) -> Result<Self, ProtocolError> {
        if snapshot.steps.is_empty() {
            return Err(ProtocolError::InvalidSnapshot("no steps".into()));
        }
        if let Some(pair) = snapshot
            .steps
            .windows(2)
            .find(|pair| pair[0].ply.checked_add(1) != Some(pair[1].ply))
        {
            return Err(ProtocolError::InvalidSnapshot(format!(
                "ply {} follows ply {}",
                pair[1].ply, pair[0].ply
            )));
        }
        if snapshot.steps.iter().any(|s| s.ply == u32::MAX) {
            return Err(ProtocolError::InvalidSnapshot(format!(
                "ply {} leaves no room for another move",
                u32::MAX
            )));
        }

        let steps = snapshot
            .steps
            .into_iter()
            .map(|s: SnapshotStep| Step {
                diff: rules.material_diff(&s.fen),
                ply: s.ply,
                position: s.fen,
                mv: s.uci,
                san: s.san,
                check: s.check,
            })
            .collect();

        Ok(Self {
            id: snapshot.id,
            meta: GameMeta {
                variant: snapshot.variant,
                speed: snapshot.speed,
                rated: snapshot.rated,
                source: snapshot.source,
                rules: snapshot.rules,
            },
            white: snapshot.white.into(),
            black: snapshot.black.into(),
            player_side: snapshot.you_are,
            status: snapshot.status,
            winner: snapshot.winner,
            boosted: snapshot.boosted,
            threefold: false,
            clock: snapshot.clock.as_ref().map(GameClock::from),
            expiration: snapshot.expiration.map(|e| Expiration {
                idle: Duration::from_millis(e.idle_millis),
                time_to_move: Duration::from_millis(e.millis_to_move),
                moved_at: now,
            }),
            rematch: snapshot.rematch,
            steps,
        })
    }

    /// The latest step.
    pub fn last_step(&self) -> &Step {
        &self.steps[self.steps.len() - 1]
    }

    /// Ply of the latest step.
    pub fn last_ply(&self) -> u32 {
        self.last_step().ply
    }

    /// The latest position.
    pub fn last_position(&self) -> &Fen {
        &self.last_step().position
    }

    /// One side's player record.
    pub fn side(&self, side: Side) -> &PlayerSide {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// Mutable access to one side's player record.
    pub fn side_mut(&mut self, side: Side) -> &mut PlayerSide {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }

    /// The local player's record, if playing.
    pub fn me(&self) -> Option<&PlayerSide> {
        self.player_side.map(|s| self.side(s))
    }

    /// The opponent's record, if playing.
    pub fn opponent(&self) -> Option<&PlayerSide> {
        self.player_side.map(|s| self.side(s.opposite()))
    }

    /// Whether either side is the computer.
    pub fn has_ai(&self) -> bool {
        self.white.ai.is_some() || self.black.ai.is_some()
    }

    /// Whether moves can still be played.
    pub fn playable(&self) -> bool {
        self.status.is_playable()
    }

    /// Whether the game can be aborted instead of resigned.
    pub fn abortable(&self) -> bool {
        self.playable()
            && self.last_position().fullmoves() <= 1
            && !self.meta.has_rule(&GameRule::NoAbort)
    }

    /// Whether the game can be resigned.
    pub fn resignable(&self) -> bool {
        self.playable() && !self.abortable()
    }

    /// Whether the local player may propose a takeback.
    pub fn takebackable(&self) -> bool {
        self.playable()
            && self.last_position().fullmoves() > 1
            && self.me().is_some_and(|me| !me.proposing_takeback)
            && self.opponent().is_some_and(|op| !op.proposing_takeback)
    }

    /// Whether the local player may offer a draw, ignoring the offer cooldown.
    pub fn drawable(&self) -> bool {
        self.playable()
            && self.last_position().fullmoves() >= 2
            && !self.has_ai()
            && self.me().is_some_and(|me| !me.offering_draw)
    }

    /// Whether the ruleset allows a rematch.
    pub fn rematchable(&self) -> bool {
        !self.meta.has_rule(&GameRule::NoRematch)
    }
}
