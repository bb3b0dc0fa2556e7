//! Outbound messages from the client to the server.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;

use crate::Move;

/// Kind of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// Play a board move
    Move,
    /// Drop a pocket piece
    Drop,
    /// Resign the game
    Resign,
    /// Abort the game
    Abort,
    /// Offer or accept a draw
    DrawYes,
    /// Decline a draw
    DrawNo,
    /// Claim a draw by threefold repetition
    DrawClaim,
    /// Claim a draw after the opponent left
    DrawForce,
    /// Claim victory after the opponent left
    ResignForce,
    /// Propose or accept a takeback
    TakebackYes,
    /// Decline a takeback
    TakebackNo,
    /// Offer or accept a rematch
    RematchYes,
    /// Decline a rematch
    RematchNo,
    /// Give the opponent more time
    Moretime,
}

impl MessageKind {
    /// Wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Move => "move",
            MessageKind::Drop => "drop",
            MessageKind::Resign => "resign",
            MessageKind::Abort => "abort",
            MessageKind::DrawYes => "draw-yes",
            MessageKind::DrawNo => "draw-no",
            MessageKind::DrawClaim => "draw-claim",
            MessageKind::DrawForce => "draw-force",
            MessageKind::ResignForce => "resign-force",
            MessageKind::TakebackYes => "takeback-yes",
            MessageKind::TakebackNo => "takeback-no",
            MessageKind::RematchYes => "rematch-yes",
            MessageKind::RematchNo => "rematch-no",
            MessageKind::Moretime => "moretime",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message handed to the transport for sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// What the message asks for.
    pub kind: MessageKind,
    /// Kind-specific payload.
    pub payload: Value,
    /// The transport should retry until the server acknowledges it.
    pub ackable: bool,
    /// The transport should attach its measured network lag.
    pub with_lag: bool,
}

impl ClientMessage {
    /// A move (or drop) message.
    ///
    /// `move_time` is the client-measured thinking time, sent as
    /// `round(ms * 0.1)` in base 36 because that is what the server's lag
    /// compensation reads.
    pub fn play(mv: &Move, move_time: Option<Duration>, with_lag: bool) -> Self {
        let mut payload = Map::new();
        let kind = match mv {
            Move::Normal { .. } => {
                payload.insert("u".into(), Value::String(mv.uci()));
                MessageKind::Move
            }
            Move::Drop { role, to } => {
                payload.insert("role".into(), Value::String(role.as_str().into()));
                payload.insert("pos".into(), Value::String(to.to_string()));
                MessageKind::Drop
            }
        };
        if let Some(time) = move_time {
            payload.insert("s".into(), Value::String(encode_move_time(time)));
        }
        Self {
            kind,
            payload: Value::Object(payload),
            ackable: true,
            with_lag,
        }
    }

    /// A command without payload (`resign`, `draw-yes`, ...).
    pub fn command(kind: MessageKind) -> Self {
        Self {
            kind,
            payload: Value::Null,
            ackable: false,
            with_lag: false,
        }
    }

    /// Serialize to the socket frame shape `{"t": kind, "d": payload}`.
    pub fn to_frame(&self) -> Value {
        json!({ "t": self.kind.as_str(), "d": self.payload })
    }
}

/// Encode a move time as the server expects: `round(ms * 0.1)` in base 36.
pub(crate) fn encode_move_time(time: Duration) -> String {
    let mut value = (time.as_millis() as f64 * 0.1).round() as u64;
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % 36) as u32;
        digits.push(std::char::from_digit(digit, 36).unwrap_or('0'));
        value /= 36;
    }
    digits.iter().rev().collect()
}
