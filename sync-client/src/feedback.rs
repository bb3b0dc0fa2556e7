//! Sound and haptic feedback hooks.

use boardsync_core::FeedbackCue;
use std::sync::{Arc, Mutex};

/// Receiver of feedback cues.
///
/// Called from the supervisor's event loop, so implementations should
/// return quickly (queue the sound, don't play it inline).
pub trait Feedback: Send + Sync + 'static {
    /// A move was added to the game.
    fn move_played(&self, capture: bool, check: bool);

    /// The game ended (called after the chime delay).
    fn game_end(&self);

    /// The player stepped through the move list.
    fn replay_move(&self);
}

/// Feedback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFeedback;

impl Feedback for NoopFeedback {
    fn move_played(&self, _capture: bool, _check: bool) {}
    fn game_end(&self) {}
    fn replay_move(&self) {}
}

/// Feedback that records every cue, for tests.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingFeedback {
    cues: Arc<Mutex<Vec<FeedbackCue>>>,
}

impl RecordingFeedback {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All cues received so far.
    pub fn cues(&self) -> Vec<FeedbackCue> {
        self.record(|cues| cues.clone())
    }

    /// Number of game-end chimes received.
    pub fn game_ends(&self) -> usize {
        self.record(|cues| {
            cues.iter()
                .filter(|cue| **cue == FeedbackCue::GameEnd)
                .count()
        })
    }

    fn push(&self, cue: FeedbackCue) {
        self.record(|cues| cues.push(cue));
    }

    fn record<X>(&self, f: impl FnOnce(&mut Vec<FeedbackCue>) -> X) -> X {
        let mut cues = self.cues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut cues)
    }
}

impl Feedback for RecordingFeedback {
    fn move_played(&self, capture: bool, check: bool) {
        self.push(FeedbackCue::MovePlayed { capture, check });
    }

    fn game_end(&self) {
        self.push(FeedbackCue::GameEnd);
    }

    fn replay_move(&self) {
        self.push(FeedbackCue::ReplayMove);
    }
}
