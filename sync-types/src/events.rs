//! Inbound socket events.
//!
//! The server multiplexes every sub-protocol of a game (moves, clocks, offers,
//! presence) over one event channel. Each frame is `{"t": topic, "d": data,
//! "v": version}`; [`SocketEvent`] is that raw frame and [`GameEvent`] is the
//! closed, strongly-typed view of it produced by [`GameEvent::decode`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Fen, GameId, GameRule, GameSource, GameStatus, Move, ProtocolError, Side, Speed};

/// A raw versioned frame as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketEvent {
    /// Topic name (`move`, `full`, `crowd`, ...).
    #[serde(rename = "t")]
    pub topic: String,
    /// Untyped payload.
    #[serde(rename = "d", default)]
    pub data: Value,
    /// Sequence number assigned by the server, if the topic is ordered.
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl SocketEvent {
    /// Create a new frame.
    pub fn new(topic: impl Into<String>, data: Value, version: Option<u64>) -> Self {
        Self {
            topic: topic.into(),
            data,
            version,
        }
    }

    /// Parse a frame from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Frame)
    }

    /// Serialize the frame to JSON text.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Frame)
    }
}

/// Every topic this client understands, with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Complete game snapshot.
    Full(Box<FullSnapshot>),
    /// A move was played.
    Move(MoveEvent),
    /// The game ended.
    EndData(EndDataEvent),
    /// Time was added to one side's clock.
    ClockInc(ClockIncEvent),
    /// Player presence changed.
    Crowd(CrowdEvent),
    /// The opponent left (`true`) or came back (`false`).
    Gone(bool),
    /// Seconds until a win can be claimed against the absent opponent.
    GoneIn(u32),
    /// Side currently offering a draw, if any.
    DrawOffer(Option<Side>),
    /// Side currently offering a rematch, if any.
    RematchOffer(Option<Side>),
    /// Takeback proposal flags.
    TakebackOffers(TakebackOffersEvent),
    /// The rematch game was created.
    RematchTaken(GameId),
    /// The client should move to another game.
    Redirect(GameId),
    /// A wrapped event to reprocess. `None` means "reload everything".
    Reload(Option<Box<SocketEvent>>),
    /// The server asks the client to fetch a fresh snapshot.
    Resync,
    /// A topic added by the server after this client was built.
    Unknown(String),
}

impl GameEvent {
    /// Decode the typed event carried by a raw frame.
    pub fn decode(event: &SocketEvent) -> Result<Self, ProtocolError> {
        let topic = event.topic.as_str();
        let data = &event.data;
        let decoded = match topic {
            "full" => GameEvent::Full(Box::new(payload(topic, data)?)),
            "move" => GameEvent::Move(payload(topic, data)?),
            "endData" => GameEvent::EndData(payload(topic, data)?),
            "clockInc" => GameEvent::ClockInc(payload(topic, data)?),
            "crowd" => GameEvent::Crowd(payload(topic, data)?),
            "gone" => GameEvent::Gone(payload(topic, data)?),
            "goneIn" => GameEvent::GoneIn(payload(topic, data)?),
            "drawOffer" => GameEvent::DrawOffer(payload(topic, data)?),
            "rematchOffer" => GameEvent::RematchOffer(payload(topic, data)?),
            "takebackOffers" => GameEvent::TakebackOffers(payload(topic, data)?),
            "rematchTaken" => GameEvent::RematchTaken(payload(topic, data)?),
            "redirect" => GameEvent::Redirect(redirect_target(data)?),
            "reload" => GameEvent::Reload(reload_inner(data).map(Box::new)),
            "resync" => GameEvent::Resync,
            other => GameEvent::Unknown(other.to_string()),
        };
        Ok(decoded)
    }
}

fn payload<T: DeserializeOwned>(topic: &str, data: &Value) -> Result<T, ProtocolError> {
    T::deserialize(data).map_err(|e| ProtocolError::payload(topic, e))
}

fn redirect_target(data: &Value) -> Result<GameId, ProtocolError> {
    let id = match data {
        Value::String(id) => Some(id.as_str()),
        Value::Object(map) => map.get("id").and_then(Value::as_str),
        _ => None,
    };
    id.map(GameId::from)
        .ok_or(ProtocolError::MissingField("redirect id"))
}

fn reload_inner(data: &Value) -> Option<SocketEvent> {
    let topic = data.get("t")?.as_str()?;
    Some(SocketEvent {
        topic: topic.to_string(),
        data: data.get("d").cloned().unwrap_or(Value::Null),
        version: None,
    })
}

fn default_variant() -> String {
    "standard".to_string()
}

/// Complete game snapshot (`full` topic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSnapshot {
    /// Game identifier.
    pub id: GameId,
    /// Variant key.
    #[serde(default = "default_variant")]
    pub variant: String,
    /// Time-control category.
    #[serde(default)]
    pub speed: Speed,
    /// Whether the game is rated.
    #[serde(default)]
    pub rated: bool,
    /// Where the game came from.
    #[serde(default)]
    pub source: Option<GameSource>,
    /// Restrictions on player actions.
    #[serde(default)]
    pub rules: Vec<GameRule>,
    /// Current status.
    pub status: GameStatus,
    /// Winner, once decided.
    #[serde(default)]
    pub winner: Option<Side>,
    /// Whether the game was flagged as rating manipulation.
    #[serde(default)]
    pub boosted: bool,
    /// The side the local player controls; absent for spectators.
    #[serde(default)]
    pub you_are: Option<Side>,
    /// White player.
    pub white: SnapshotPlayer,
    /// Black player.
    pub black: SnapshotPlayer,
    /// Real-time clock, absent for unlimited or correspondence games.
    #[serde(default)]
    pub clock: Option<SnapshotClock>,
    /// First-move deadline, present at the start of a game.
    #[serde(default)]
    pub expiration: Option<SnapshotExpiration>,
    /// Rematch game, if already created.
    #[serde(default)]
    pub rematch: Option<GameId>,
    /// Every position from the initial one to the latest.
    pub steps: Vec<SnapshotStep>,
    /// Version of the event stream this snapshot corresponds to.
    #[serde(default)]
    pub socket: Option<u64>,
}

/// One player as described in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotPlayer {
    /// Username, absent for anonymous players and engines.
    pub user: Option<String>,
    /// Rating before the game.
    pub rating: Option<u32>,
    /// Rating change once the game is over.
    pub rating_diff: Option<i32>,
    /// Engine level, for games against the computer.
    pub ai: Option<u8>,
    /// Connected to this game.
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

/// Clock state in a snapshot. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotClock {
    /// White's remaining time.
    pub white: f64,
    /// Black's remaining time.
    pub black: f64,
    /// Whether the clock is ticking.
    #[serde(default)]
    pub running: bool,
    /// Initial time per side.
    #[serde(default)]
    pub initial: u32,
    /// Increment per move.
    #[serde(default)]
    pub increment: u32,
}

/// First-move deadline in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotExpiration {
    /// Time the game has been idle.
    #[serde(default)]
    pub idle_millis: u64,
    /// Time allowed for the current move.
    pub millis_to_move: u64,
}

/// One step of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStep {
    /// Ply number of this step.
    pub ply: u32,
    /// Resulting position.
    pub fen: Fen,
    /// Move that produced this step (absent for the initial step).
    #[serde(default)]
    pub uci: Option<Move>,
    /// Algebraic notation of the move.
    #[serde(default)]
    pub san: Option<String>,
    /// Whether the move gave check.
    #[serde(default)]
    pub check: bool,
}

/// A move played by either side (`move` topic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveEvent {
    /// Ply of the move.
    pub ply: u32,
    /// The move in machine form.
    pub uci: Move,
    /// The move in algebraic notation.
    pub san: String,
    /// The move gave check.
    #[serde(default)]
    pub check: bool,
    /// The move delivered mate.
    #[serde(default)]
    pub mate: bool,
    /// The position repeated for the third time.
    #[serde(default)]
    pub threefold: bool,
    /// Terminal status, when the move ended the game.
    #[serde(default)]
    pub status: Option<GameStatus>,
    /// Winner, when the move ended the game.
    #[serde(default)]
    pub winner: Option<Side>,
    /// Clock after the move.
    #[serde(default)]
    pub clock: Option<MoveClock>,
}

/// Clock values carried by a move event. Times in seconds, lag in centiseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveClock {
    /// White's remaining time.
    pub white: f64,
    /// Black's remaining time.
    pub black: f64,
    /// Server-estimated network lag of the mover.
    #[serde(default)]
    pub lag: Option<u32>,
}

/// The game is over (`endData` topic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndDataEvent {
    /// Terminal status.
    pub status: GameStatus,
    /// Winner, if not a draw.
    #[serde(default)]
    pub winner: Option<Side>,
    /// Whether the game was flagged as rating manipulation.
    #[serde(default)]
    pub boosted: bool,
    /// Rating changes.
    #[serde(default)]
    pub rating_diff: Option<RatingDiffs>,
    /// Final clock values.
    #[serde(default)]
    pub clock: Option<FinalClock>,
}

/// Rating change per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingDiffs {
    /// White's rating change.
    pub white: i32,
    /// Black's rating change.
    pub black: i32,
}

/// Final clock values in centiseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalClock {
    /// White's remaining time.
    pub wc: u64,
    /// Black's remaining time.
    pub bc: u64,
}

/// Time added to one clock (`clockInc` topic). Both fields are required for
/// the event to have any effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockIncEvent {
    /// Side whose clock changed.
    pub color: Option<Side>,
    /// New total in centiseconds.
    pub time: Option<u64>,
}

/// Presence flags (`crowd` topic). Absent sides are unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdEvent {
    /// White is on the game page.
    pub white: Option<bool>,
    /// Black is on the game page.
    pub black: Option<bool>,
}

/// Takeback proposal flags (`takebackOffers` topic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TakebackOffersEvent {
    /// White proposes a takeback.
    pub white: Option<bool>,
    /// Black proposes a takeback.
    pub black: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(text: &str) -> GameEvent {
        let frame = SocketEvent::from_json(text).unwrap();
        GameEvent::decode(&frame).unwrap()
    }

    #[test]
    fn frame_parses_version() {
        let frame = SocketEvent::from_json(r#"{"t":"crowd","d":{"white":true},"v":12}"#).unwrap();
        assert_eq!(frame.topic, "crowd");
        assert_eq!(frame.version, Some(12));

        let frame = SocketEvent::from_json(r#"{"t":"resync"}"#).unwrap();
        assert_eq!(frame.version, None);
        assert_eq!(frame.data, Value::Null);
    }

    #[test]
    fn frame_without_version_omits_field() {
        let frame = SocketEvent::new("gone", json!(true), None);
        assert_eq!(frame.to_json().unwrap(), r#"{"t":"gone","d":true}"#);
    }

    #[test]
    fn decodes_move_event() {
        let event = decode(
            r#"{"t":"move","v":7,"d":{"ply":3,"uci":"g1f3","san":"Nf3","clock":{"white":178.5,"black":180,"lag":4}}}"#,
        );
        match event {
            GameEvent::Move(mv) => {
                assert_eq!(mv.ply, 3);
                assert_eq!(mv.uci.uci(), "g1f3");
                assert_eq!(mv.san, "Nf3");
                assert!(!mv.check);
                assert_eq!(mv.clock.unwrap().lag, Some(4));
            }
            other => panic!("Expected Move, got {:?}", other),
        }
    }

    #[test]
    fn decodes_offers() {
        assert_eq!(
            decode(r#"{"t":"drawOffer","d":"black"}"#),
            GameEvent::DrawOffer(Some(Side::Black))
        );
        assert_eq!(
            decode(r#"{"t":"drawOffer","d":null}"#),
            GameEvent::DrawOffer(None)
        );
        assert_eq!(
            decode(r#"{"t":"rematchOffer","d":"white"}"#),
            GameEvent::RematchOffer(Some(Side::White))
        );
    }

    #[test]
    fn clock_inc_tolerates_missing_fields() {
        assert_eq!(
            decode(r#"{"t":"clockInc","d":{"color":"white"}}"#),
            GameEvent::ClockInc(ClockIncEvent {
                color: Some(Side::White),
                time: None
            })
        );
    }

    #[test]
    fn reload_unwraps_nested_frame() {
        match decode(r#"{"t":"reload","v":4,"d":{"t":"gone","d":true}}"#) {
            GameEvent::Reload(Some(inner)) => {
                assert_eq!(inner.topic, "gone");
                assert_eq!(inner.data, json!(true));
                assert_eq!(inner.version, None);
            }
            other => panic!("Expected nested reload, got {:?}", other),
        }
        assert_eq!(decode(r#"{"t":"reload","d":null}"#), GameEvent::Reload(None));
    }

    #[test]
    fn redirect_accepts_string_or_object() {
        assert_eq!(
            decode(r#"{"t":"redirect","d":"abcdefgh"}"#),
            GameEvent::Redirect(GameId::new("abcdefgh"))
        );
        assert_eq!(
            decode(r#"{"t":"redirect","d":{"id":"abcdefghWXYZ","url":"/abcdefgh"}}"#),
            GameEvent::Redirect(GameId::new("abcdefghWXYZ"))
        );
    }

    #[test]
    fn unknown_topic_is_explicit() {
        assert_eq!(
            decode(r#"{"t":"simulEnd","d":{}}"#),
            GameEvent::Unknown("simulEnd".into())
        );
    }

    #[test]
    fn malformed_payload_names_topic() {
        let frame = SocketEvent::new("move", json!({"ply": "three"}), Some(2));
        let err = GameEvent::decode(&frame).unwrap_err();
        assert!(err.to_string().starts_with("malformed move payload"));
    }

    #[test]
    fn decodes_full_snapshot_with_defaults() {
        let event = decode(
            r#"{"t":"full","d":{
                "id":"abcdefgh","status":"started","youAre":"white",
                "white":{"onGame":true},"black":{},
                "steps":[{"ply":0,"fen":"rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"}],
                "socket":5}}"#,
        );
        match event {
            GameEvent::Full(snapshot) => {
                assert_eq!(snapshot.variant, "standard");
                assert_eq!(snapshot.status, GameStatus::Started);
                assert_eq!(snapshot.you_are, Some(Side::White));
                assert!(snapshot.white.on_game);
                assert!(!snapshot.black.on_game);
                assert_eq!(snapshot.steps.len(), 1);
                assert_eq!(snapshot.socket, Some(5));
                assert!(snapshot.clock.is_none());
            }
            other => panic!("Expected Full, got {:?}", other),
        }
    }
}
