//! Test support shared by this crate and `boardsync-client`.
//!
//! Compiled for this crate's tests and behind the `testing` feature.
//!
//! - [`FakeRules`]: a rules engine that only tracks side to move and the
//!   full-move counter, with scripted SAN and rejections.
//! - [`SnapshotBuilder`]: `full` snapshots with a configurable number of plies.
//! - [`move_frame`]: a `move` frame for the next ply.

use boardsync_types::{
    Fen, FullSnapshot, GameId, GameRule, GameSource, GameStatus, Move, Side, SnapshotClock,
    SnapshotExpiration, SnapshotPlayer, SnapshotStep, SocketEvent, Speed,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

use crate::rules::{MaterialDiff, RulesEngine, RulesError};

/// Moves used to fill snapshot steps. Knights shuffling back and forth.
const FILLER_MOVES: [&str; 4] = ["g1f3", "g8f6", "f3g1", "f6g8"];

/// A rules engine that never looks at the board.
///
/// Every move is legal unless registered with [`rejecting`](Self::rejecting).
/// The SAN of a move is its UCI form unless registered with
/// [`with_san`](Self::with_san).
#[derive(Debug, Clone, Default)]
pub struct FakeRules {
    sans: HashMap<String, String>,
    illegal: HashSet<String>,
}

impl FakeRules {
    /// Report `san` for `uci`.
    pub fn with_san(mut self, uci: &str, san: &str) -> Self {
        self.sans.insert(uci.to_string(), san.to_string());
        self
    }

    /// Reject `uci` as illegal.
    pub fn rejecting(mut self, uci: &str) -> Self {
        self.illegal.insert(uci.to_string());
        self
    }
}

impl RulesEngine for FakeRules {
    fn apply_move(&self, position: &Fen, mv: &Move) -> Result<(Fen, String), RulesError> {
        let uci = mv.uci();
        if self.illegal.contains(&uci) {
            return Err(RulesError::IllegalMove(uci));
        }
        let san = self.sans.get(&uci).cloned().unwrap_or_else(|| uci.clone());
        Ok((advance(position), san))
    }

    fn apply_unchecked(&self, position: &Fen, _mv: &Move) -> Result<Fen, RulesError> {
        Ok(advance(position))
    }

    fn material_diff(&self, _position: &Fen) -> MaterialDiff {
        MaterialDiff::default()
    }
}

/// Flip the side to move and bump the full-move number after black.
pub fn advance(position: &Fen) -> Fen {
    let mut fields: Vec<String> = position
        .as_str()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let defaults = ["8/8/8/8/8/8/8/8", "w", "-", "-", "0", "1"];
    for default in defaults.iter().skip(fields.len()) {
        fields.push(default.to_string());
    }
    let turn = position.turn();
    fields[1] = turn.opposite().as_str()[..1].to_string();
    let fullmoves = position.fullmoves();
    fields[5] = match turn {
        Side::White => fullmoves,
        Side::Black => fullmoves + 1,
    }
    .to_string();
    Fen::new(fields.join(" "))
}

/// Builder for `full` snapshots.
///
/// Defaults: local player is white, game started, both players on the
/// game, no clock, version 1.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: FullSnapshot,
    plies: u32,
}

impl SnapshotBuilder {
    /// Start a snapshot for game `id` at the initial position.
    pub fn new(id: &str) -> Self {
        let player = SnapshotPlayer {
            on_game: true,
            ..SnapshotPlayer::default()
        };
        Self {
            snapshot: FullSnapshot {
                id: GameId::new(id),
                variant: "standard".into(),
                speed: Speed::Blitz,
                rated: false,
                source: Some(GameSource::Friend),
                rules: Vec::new(),
                status: GameStatus::Started,
                winner: None,
                boosted: false,
                you_are: Some(Side::White),
                white: player.clone(),
                black: player,
                clock: None,
                expiration: None,
                rematch: None,
                steps: Vec::new(),
                socket: Some(1),
            },
            plies: 0,
        }
    }

    /// Number of moves played after the initial position.
    pub fn plies(mut self, plies: u32) -> Self {
        self.plies = plies;
        self
    }

    /// Event-stream version of the snapshot.
    pub fn version(mut self, version: u64) -> Self {
        self.snapshot.socket = Some(version);
        self
    }

    /// Game status.
    pub fn status(mut self, status: GameStatus) -> Self {
        self.snapshot.status = status;
        self
    }

    /// Add a ruleset restriction.
    pub fn rule(mut self, rule: GameRule) -> Self {
        self.snapshot.rules.push(rule);
        self
    }

    /// Side played by the local player.
    pub fn you_are(mut self, side: Side) -> Self {
        self.snapshot.you_are = Some(side);
        self
    }

    /// Watch as a spectator.
    pub fn spectator(mut self) -> Self {
        self.snapshot.you_are = None;
        self
    }

    /// White's username.
    pub fn white_user(mut self, name: &str) -> Self {
        self.snapshot.white.user = Some(name.to_string());
        self
    }

    /// Black's username.
    pub fn black_user(mut self, name: &str) -> Self {
        self.snapshot.black.user = Some(name.to_string());
        self
    }

    /// Black is the computer at `level`.
    pub fn black_ai(mut self, level: u8) -> Self {
        self.snapshot.black.ai = Some(level);
        self
    }

    /// Mark one side as gone.
    pub fn gone(mut self, side: Side) -> Self {
        match side {
            Side::White => self.snapshot.white.is_gone = true,
            Side::Black => self.snapshot.black.is_gone = true,
        }
        self
    }

    /// Real-time clock with `seconds` on both sides.
    pub fn clock(mut self, seconds: f64, increment: u32) -> Self {
        self.snapshot.clock = Some(SnapshotClock {
            white: seconds,
            black: seconds,
            running: false,
            initial: seconds as u32,
            increment,
        });
        self
    }

    /// First-move deadline.
    pub fn expiration(mut self, millis_to_move: u64) -> Self {
        self.snapshot.expiration = Some(SnapshotExpiration {
            idle_millis: 0,
            millis_to_move,
        });
        self
    }

    /// Whether the game is rated.
    pub fn rated(mut self, rated: bool) -> Self {
        self.snapshot.rated = rated;
        self
    }

    /// Where the game came from.
    pub fn source(mut self, source: GameSource) -> Self {
        self.snapshot.source = Some(source);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> FullSnapshot {
        let mut snapshot = self.snapshot;
        let mut fen = Fen::initial();
        snapshot.steps = vec![SnapshotStep {
            ply: 0,
            fen: fen.clone(),
            uci: None,
            san: None,
            check: false,
        }];
        for ply in 1..=self.plies {
            fen = advance(&fen);
            let uci = FILLER_MOVES[(ply as usize - 1) % FILLER_MOVES.len()];
            snapshot.steps.push(SnapshotStep {
                ply,
                fen: fen.clone(),
                uci: Move::from_uci(uci).ok(),
                san: Some(uci.to_string()),
                check: false,
            });
        }
        snapshot
    }

    /// Build the snapshot as a `full` frame.
    pub fn frame(self) -> SocketEvent {
        let snapshot = self.build();
        let version = snapshot.socket;
        let data = serde_json::to_value(&snapshot).unwrap_or_default();
        SocketEvent::new("full", data, version)
    }
}

/// A `move` frame whose SAN is the UCI string.
pub fn move_frame(ply: u32, uci: &str, version: Option<u64>) -> SocketEvent {
    SocketEvent::new("move", json!({ "ply": ply, "uci": uci, "san": uci }), version)
}

/// A frame with an arbitrary payload.
pub fn frame(topic: &str, data: Value, version: Option<u64>) -> SocketEvent {
    SocketEvent::new(topic, data, version)
}
