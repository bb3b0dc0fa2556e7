//! User-initiated operations: optimistic moves, commands, navigation.
//!
//! A local move is shown immediately. It is then either transmitted (and
//! the move watchdog armed) or held until [`SessionMachine::confirm_move`].
//! The server's `move` echo, or a newer snapshot, settles it.

use boardsync_types::{ClientMessage, MessageKind, Move};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::action::{Action, Defect, FeedbackCue};
use crate::game::Step;
use crate::machine::SessionMachine;
use crate::rules::{san_is_capture, san_is_check, RulesEngine};
use crate::session::PendingMove;
use crate::view::SessionView;

impl<R: RulesEngine> SessionMachine<R> {
    /// Play a move on the live position.
    ///
    /// `is_premove` marks a queued premove being auto-played; it is never
    /// held for confirmation and reports zero thinking time.
    pub fn on_user_move(
        &mut self,
        mv: Move,
        is_premove: bool,
        now: Instant,
    ) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        let view = SessionView::new(&current, &self.prefs, now);
        if view.player_side().is_none() {
            return Err(Defect::Spectator);
        }
        let ply = match current.game.last_ply().checked_add(1) {
            Some(ply) if current.game.playable() => ply,
            _ => return Err(Defect::NotPlayable),
        };
        if current.move_to_confirm.is_some() {
            return Err(Defect::MoveAlreadyPending);
        }
        if !view.is_my_turn() {
            return Err(Defect::NotPlayersTurn);
        }
        let confirm = !is_premove && view.should_confirm_move();

        let (position, san) = self
            .rules
            .apply_move(current.game.last_position(), &mv)
            .map_err(|e| Defect::IllegalMove {
                mv: mv.uci(),
                reason: e.to_string(),
            })?;

        let mut next = (*current).clone();
        let cursor_before = next.step_cursor;
        let check = san_is_check(&san);
        let mut actions = vec![Action::Feedback(FeedbackCue::MovePlayed {
            capture: san_is_capture(&san),
            check,
        })];
        next.game.steps.push(Step {
            ply,
            diff: self.rules.material_diff(&position),
            position,
            mv: Some(mv),
            san: Some(san),
            check,
        });
        next.step_cursor = next.live_cursor();
        next.awaiting_ack = true;
        if is_premove {
            next.premove = None;
        }

        let (move_time, with_lag) = match current.game.clock {
            None => (None, false),
            Some(_) if is_premove => (Some(Duration::ZERO), false),
            Some(_) => match current.last_move_at {
                Some(at) => (Some(now.saturating_duration_since(at)), false),
                None => (None, true),
            },
        };

        if confirm {
            debug!("Holding {} for confirmation", mv);
            next.move_to_confirm = Some(PendingMove {
                mv,
                move_time,
                with_lag,
                cursor_before,
            });
        } else {
            debug!("Sending {}", mv);
            actions.push(Action::Transmit(ClientMessage::play(
                &mv, move_time, with_lag,
            )));
            actions.push(Action::ArmMoveWatchdog);
        }
        Ok(self.commit((next, actions)))
    }

    /// Send the move held for confirmation.
    pub fn confirm_move(&mut self) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        let pending = current
            .move_to_confirm
            .clone()
            .ok_or(Defect::NoPendingMove)?;
        if !current.game.playable() {
            return Err(Defect::NotPlayable);
        }
        let mut next = (*current).clone();
        next.move_to_confirm = None;
        debug!("Sending confirmed {}", pending.mv);
        let actions = vec![
            Action::Transmit(ClientMessage::play(
                &pending.mv,
                pending.move_time,
                pending.with_lag,
            )),
            Action::ArmMoveWatchdog,
        ];
        Ok(self.commit((next, actions)))
    }

    /// Take back the move held for confirmation.
    pub fn cancel_move(&mut self) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        let pending = current
            .move_to_confirm
            .clone()
            .ok_or(Defect::NoPendingMove)?;
        if current.game.steps.len() < 2 {
            return Err(Defect::EmptySteps);
        }
        let mut next = (*current).clone();
        next.game.steps.pop();
        next.step_cursor = pending.cursor_before.min(next.live_cursor());
        next.move_to_confirm = None;
        next.awaiting_ack = false;
        debug!("Cancelled {}", pending.mv);
        Ok(self.commit((next, Vec::new())))
    }

    /// Queue, replace or clear the premove.
    ///
    /// Clearing is always allowed; queueing needs premoves enabled for
    /// this game.
    pub fn set_premove(
        &mut self,
        premove: Option<Move>,
        now: Instant,
    ) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        if premove.is_some() {
            let view = SessionView::new(&current, &self.prefs, now);
            if view.player_side().is_none() {
                return Err(Defect::Spectator);
            }
            if !view.can_premove() {
                return Err(Defect::PremoveDisabled);
            }
        }
        let mut next = (*current).clone();
        next.premove = premove;
        Ok(self.commit((next, Vec::new())))
    }

    /// Override the confirm-move preference for this session. `None` restores it.
    pub fn set_confirm_move_override(
        &mut self,
        confirm: Option<bool>,
    ) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        let mut next = (*current).clone();
        next.confirm_move_override = confirm;
        Ok(self.commit((next, Vec::new())))
    }

    /// Send a game command (resign, draw, takeback, rematch, ...).
    ///
    /// Moves go through [`on_user_move`](Self::on_user_move) instead.
    pub fn send_command(
        &mut self,
        kind: MessageKind,
        now: Instant,
    ) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        let view = SessionView::new(&current, &self.prefs, now);
        let Some(opponent) = current.game.opponent() else {
            return Err(Defect::Spectator);
        };
        let playable = current.game.playable();

        let allowed = match kind {
            MessageKind::Resign => view.can_resign(),
            MessageKind::Abort => view.can_abort(),
            MessageKind::DrawYes => (playable && opponent.offering_draw) || view.can_offer_draw(),
            MessageKind::DrawNo => playable && opponent.offering_draw,
            MessageKind::DrawClaim => view.can_claim_draw(),
            MessageKind::DrawForce | MessageKind::ResignForce => view.can_claim_win(),
            MessageKind::TakebackYes => {
                (playable && opponent.proposing_takeback) || view.can_takeback()
            }
            MessageKind::TakebackNo => playable && opponent.proposing_takeback,
            MessageKind::RematchYes => opponent.offering_rematch || view.can_offer_rematch(),
            MessageKind::RematchNo => opponent.offering_rematch,
            MessageKind::Moretime => view.can_give_time(),
            MessageKind::Move | MessageKind::Drop => false,
        };
        if !allowed {
            return Err(Defect::CommandNotAllowed(kind));
        }

        let actions = vec![Action::Transmit(ClientMessage::command(kind))];
        if kind == MessageKind::DrawYes && !opponent.offering_draw {
            let mut next = (*current).clone();
            next.last_draw_offer_at_ply = Some(current.game.last_ply());
            return Ok(self.commit((next, actions)));
        }
        Ok(actions)
    }

    /// Show the step at `index`.
    pub fn go_to_step(&mut self, index: usize) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        let len = current.game.steps.len();
        if index >= len {
            return Err(Defect::StepOutOfRange { index, len });
        }
        if index == current.step_cursor {
            return Ok(Vec::new());
        }
        let mut next = (*current).clone();
        next.step_cursor = index;
        Ok(self.commit((next, vec![Action::Feedback(FeedbackCue::ReplayMove)])))
    }

    /// Show the next step. A no-op on the live step.
    pub fn step_forward(&mut self) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        if !current.is_replaying() {
            return Ok(Vec::new());
        }
        self.go_to_step(current.step_cursor + 1)
    }

    /// Show the previous step. A no-op on the initial step.
    pub fn step_backward(&mut self) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        match current.step_cursor.checked_sub(1) {
            Some(index) => self.go_to_step(index),
            None => Ok(Vec::new()),
        }
    }

    /// Show the live step.
    pub fn go_to_live(&mut self) -> Result<Vec<Action>, Defect> {
        let current = self.current()?;
        self.go_to_step(current.live_cursor())
    }
}
