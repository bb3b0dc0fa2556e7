//! # sync-types
//!
//! Wire format types for the boardsync game-session protocol.
//!
//! This crate provides the foundational types used across all boardsync crates:
//! - [`GameId`], [`Side`] - Identity types
//! - [`GameStatus`] - Game lifecycle status with its playable/finished/aborted partition
//! - [`Move`], [`Square`], [`Role`], [`Fen`] - Board vocabulary shared with the rules engine
//! - [`SocketEvent`], [`GameEvent`] - Inbound versioned events and their typed payloads
//! - [`ClientMessage`] - Outbound messages handed to the transport
//! - [`ProtocolError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod ids;
mod messages;
mod moves;
mod status;

pub use error::ProtocolError;
pub use events::{
    ClockIncEvent, CrowdEvent, EndDataEvent, FinalClock, FullSnapshot, GameEvent, MoveClock,
    MoveEvent, RatingDiffs, SnapshotClock, SnapshotExpiration, SnapshotPlayer, SnapshotStep,
    SocketEvent, TakebackOffersEvent,
};
pub use ids::{GameId, Side};
pub use messages::{ClientMessage, MessageKind};
pub use moves::{Fen, Move, Role, Square};
pub use status::{GameRule, GameSource, GameStatus, Speed};
