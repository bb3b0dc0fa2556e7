//! # sync-core
//!
//! Pure logic for boardsync game sessions (no I/O, instant tests).
//!
//! This crate keeps the authoritative view of one game in sync with the
//! server: it tracks event versions, reduces typed events into a new
//! session value, runs the optimistic move pipeline and the abandonment
//! countdown, and derives read-only predicates for the UI.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! Time is passed in as an [`Instant`](std::time::Instant) argument. The
//! actual I/O (transport, timers, sound) is performed by `sync-client`,
//! which interprets the [`Action`]s returned by [`SessionMachine`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod countdown;
pub mod game;
pub mod machine;
mod pipeline;
pub mod prefs;
pub mod reducer;
pub mod rules;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod version;
pub mod view;

pub use action::{Action, Defect, FeedbackCue};
pub use countdown::AbandonmentCountdown;
pub use game::{Expiration, Game, GameClock, GameMeta, PlayerSide, Step};
pub use machine::SessionMachine;
pub use prefs::{AutoQueen, Preferences, ZenMode};
pub use rules::{MaterialDiff, RulesEngine, RulesError, SideMaterial};
pub use session::{GameSession, PendingMove};
pub use version::{classify, Classification, VersionTracker};
pub use view::SessionView;
