//! # sync-client
//!
//! Async session supervisor for boardsync game sessions.
//!
//! This is the crate applications use to keep one open game in sync with
//! the server. It interprets the [`Action`](boardsync_core::Action)s of the
//! pure `sync-core` state machine over an injected transport.
//!
//! ## Features
//!
//! - **Versioned Event Stream**: gaps and stale frames handled by `sync-core`, resync on demand
//! - **Optimistic Moves**: moves apply locally at once, a watchdog resyncs when no echo arrives
//! - **Abandonment Countdown**: periodic tick owned by the supervisor
//! - **Transport Abstraction**: pluggable transport layer (mock included)
//! - **Snapshot Publication**: immutable `Arc<GameSession>` values through a watch channel
//!
//! ## Example
//!
//! ```ignore
//! use boardsync_client::{NoopFeedback, SessionConfig, SessionSupervisor};
//!
//! let config = SessionConfig::from_file(Path::new("session.toml"))?;
//! let session = SessionSupervisor::open(config, transport, rules, NoopFeedback).await?;
//!
//! // Play a move
//! session.play_move(Move::from_uci("e2e4")?, false).await;
//!
//! // Render every update
//! let mut updates = session.subscribe();
//! while updates.changed().await.is_ok() {
//!     render(&updates.borrow());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod feedback;
pub mod supervisor;
mod timer;
pub mod transport;

pub use config::{ConfigError, ConnectionConfig, SessionConfig, TimerConfig};
pub use feedback::{Feedback, NoopFeedback, RecordingFeedback};
pub use supervisor::{ClientError, SessionStatus, SessionSupervisor};
pub use transport::{MockTransport, Transport, TransportError, TransportEvent};
