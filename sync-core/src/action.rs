//! Actions produced by the session machine and interpreted by the client.

use boardsync_types::{ClientMessage, GameId, MessageKind};
use thiserror::Error;

/// Side effects the client must perform after a stimulus.
///
/// The core never performs I/O. Every operation returns the list of
/// actions to execute, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Hand a message to the transport.
    Transmit(ClientMessage),
    /// Reconnect with `force_reconnect` to fetch a fresh snapshot.
    RequestResync,
    /// (Re)arm the move-acknowledgement watchdog.
    ArmMoveWatchdog,
    /// Cancel the move-acknowledgement watchdog.
    CancelMoveWatchdog,
    /// (Re)arm the one-second abandonment countdown ticker.
    ArmCountdown,
    /// Cancel the abandonment countdown ticker.
    CancelCountdown,
    /// Notify the sound/haptics collaborators.
    Feedback(FeedbackCue),
    /// Tell the navigation collaborator to open another game.
    Redirect(GameId),
}

/// Fire-and-forget notification for sound and haptics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackCue {
    /// A move was added to the live position.
    MovePlayed {
        /// The move captured a piece.
        capture: bool,
        /// The move gave check.
        check: bool,
    },
    /// The game ended. The client plays this after a short delay.
    GameEnd,
    /// The cursor moved through history.
    ReplayMove,
}

/// A call made when its precondition does not hold.
///
/// Defects indicate a bug in the caller. The operation that reports one
/// leaves the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Defect {
    /// No snapshot has been received yet.
    #[error("no game snapshot has been received yet")]
    NoSnapshot,

    /// The local player is spectating.
    #[error("spectators cannot act on the game")]
    Spectator,

    /// The game is over.
    #[error("the game is not playable")]
    NotPlayable,

    /// It is the opponent's turn.
    #[error("it is not the player's turn")]
    NotPlayersTurn,

    /// `confirm_move`/`cancel_move` without a pending move.
    #[error("no move is pending confirmation")]
    NoPendingMove,

    /// A second move while one awaits confirmation.
    #[error("a move is already pending confirmation")]
    MoveAlreadyPending,

    /// Cancelling would remove the initial step.
    #[error("cannot remove the initial step")]
    EmptySteps,

    /// The rules engine rejected the move.
    #[error("illegal move {mv}: {reason}")]
    IllegalMove {
        /// The move in UCI form.
        mv: String,
        /// Why the rules engine rejected it.
        reason: String,
    },

    /// Navigation beyond the step sequence.
    #[error("step {index} out of range (0..{len})")]
    StepOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of steps.
        len: usize,
    },

    /// Premoves are switched off for this game.
    #[error("premoves are disabled")]
    PremoveDisabled,

    /// A command the game state does not allow.
    #[error("{0} is not allowed now")]
    CommandNotAllowed(MessageKind),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defect_display() {
        let d = Defect::StepOutOfRange { index: 9, len: 4 };
        assert_eq!(d.to_string(), "step 9 out of range (0..4)");
        let d = Defect::CommandNotAllowed(MessageKind::DrawYes);
        assert_eq!(d.to_string(), "draw-yes is not allowed now");
    }
}
