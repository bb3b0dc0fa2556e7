//! Session supervisor: the async interpreter of [`SessionMachine`] actions.
//!
//! [`SessionSupervisor`] owns one game session. It connects the transport,
//! waits for the first `full` snapshot, then runs an event loop that feeds
//! inbound frames and timer firings to the pure core and performs the
//! resulting [`Action`]s. User operations go through the same lock, so
//! reactions never interleave.

use crate::config::SessionConfig;
use crate::feedback::Feedback;
use crate::timer::{TimerEvent, TimerKind, TimerSlot};
use crate::transport::{Transport, TransportError, TransportEvent};
use boardsync_core::{
    Action, Defect, FeedbackCue, GameSession, RulesEngine, SessionMachine, SessionView,
};
use boardsync_types::{MessageKind, Move};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No snapshot arrived while opening the session.
    #[error("no game snapshot within {0:?}")]
    SnapshotTimeout(Duration),
}

/// Whether the published session is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Events are applied as they arrive.
    Live,
    /// Waiting for a fresh snapshot after a gap, timeout, or disconnect.
    Resyncing,
}

/// Current time on the tokio clock (pausable in tests).
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

struct Inner<R> {
    machine: SessionMachine<R>,
    watchdog: TimerSlot,
    countdown: TimerSlot,
    chime: TimerSlot,
    awaiting_snapshot: bool,
}

impl<R> Inner<R> {
    fn new(machine: SessionMachine<R>) -> Self {
        Self {
            machine,
            watchdog: TimerSlot::new(TimerKind::MoveWatchdog),
            countdown: TimerSlot::new(TimerKind::Countdown),
            chime: TimerSlot::new(TimerKind::GameEndChime),
            awaiting_snapshot: false,
        }
    }

    fn cancel_timers(&mut self) {
        self.watchdog.cancel();
        self.countdown.cancel();
        self.chime.cancel();
    }
}

struct Shared<T, R, F> {
    config: SessionConfig,
    transport: T,
    feedback: F,
    state: Mutex<Inner<R>>,
    session_tx: watch::Sender<Arc<GameSession>>,
    status_tx: watch::Sender<SessionStatus>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
}

/// Supervisor of one open game.
///
/// Generic over transport, rules engine and feedback sink so tests can use
/// [`MockTransport`](crate::MockTransport), the `FakeRules` engine from
/// `boardsync-core`'s `testing` feature and
/// [`RecordingFeedback`](crate::RecordingFeedback).
///
/// User operations never fail. Calling one when it does not apply is a
/// defect: it is logged at error level and leaves the session untouched,
/// or panics when `strict_defects` is set.
pub struct SessionSupervisor<T, R, F>
where
    T: Transport,
    R: RulesEngine + 'static,
    F: Feedback,
{
    shared: Arc<Shared<T, R, F>>,
    event_loop: JoinHandle<()>,
}

impl<T, R, F> SessionSupervisor<T, R, F>
where
    T: Transport,
    R: RulesEngine + 'static,
    F: Feedback,
{
    /// Connect and wait for the first snapshot.
    ///
    /// Frames before the first `full` are dropped. Fails with
    /// [`ClientError::SnapshotTimeout`] when no snapshot arrives within
    /// `connection.snapshot_timeout_secs`.
    pub async fn open(
        config: SessionConfig,
        transport: T,
        rules: R,
        feedback: F,
    ) -> Result<Self, ClientError> {
        let address = config.connection.address.clone();
        tracing::info!("Opening game session at {}", address);
        transport.connect(&address, false).await?;

        let mut machine = SessionMachine::new(rules, config.preferences.clone());
        let wait = config.connection.snapshot_timeout();
        let (session, actions) =
            match tokio::time::timeout(wait, await_snapshot(&transport, &mut machine)).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!("No snapshot from {} within {:?}", address, wait);
                    if let Err(e) = transport.close().await {
                        tracing::warn!("Failed to close transport: {}", e);
                    }
                    return Err(ClientError::SnapshotTimeout(wait));
                }
            };
        tracing::info!(
            "Session live for game {} at ply {}",
            session.game.id,
            session.game.last_ply()
        );

        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (session_tx, _) = watch::channel(session);
        let (status_tx, _) = watch::channel(SessionStatus::Live);
        let shared = Arc::new(Shared {
            config,
            transport,
            feedback,
            state: Mutex::new(Inner::new(machine)),
            session_tx,
            status_tx,
            timer_tx,
        });

        {
            let mut inner = shared.state.lock().await;
            shared.execute(&mut inner, actions).await;
        }

        let event_loop = tokio::spawn(run_event_loop(Arc::clone(&shared), timer_rx));
        Ok(Self { shared, event_loop })
    }

    /// The latest session value.
    pub fn session(&self) -> Arc<GameSession> {
        Arc::clone(&self.shared.session_tx.borrow())
    }

    /// Watch session updates.
    pub fn subscribe(&self) -> watch::Receiver<Arc<GameSession>> {
        self.shared.session_tx.subscribe()
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        *self.shared.status_tx.borrow()
    }

    /// Watch status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Evaluate derived predicates on the latest session.
    pub fn with_view<X>(&self, f: impl FnOnce(&SessionView<'_>) -> X) -> X {
        let session = self.session();
        let view = SessionView::new(&session, &self.shared.config.preferences, now());
        f(&view)
    }

    /// Get the transport (for testing).
    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    /// Get the feedback sink.
    pub fn feedback(&self) -> &F {
        &self.shared.feedback
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    // ===========================================
    // User operations
    // ===========================================

    /// Play a move (or a queued premove).
    pub async fn play_move(&self, mv: Move, is_premove: bool) {
        self.shared
            .user_op(move |machine, now| machine.on_user_move(mv, is_premove, now))
            .await
    }

    /// Transmit the move held for confirmation.
    pub async fn confirm_move(&self) {
        self.shared
            .user_op(|machine, _| machine.confirm_move())
            .await
    }

    /// Take back the move held for confirmation.
    pub async fn cancel_move(&self) {
        self.shared.user_op(|machine, _| machine.cancel_move()).await
    }

    /// Queue or clear a premove.
    pub async fn set_premove(&self, premove: Option<Move>) {
        self.shared
            .user_op(move |machine, now| machine.set_premove(premove, now))
            .await
    }

    /// Override the move confirmation preference for this game.
    pub async fn set_confirm_move_override(&self, confirm: Option<bool>) {
        self.shared
            .user_op(move |machine, _| machine.set_confirm_move_override(confirm))
            .await
    }

    /// Send a game command.
    pub async fn send_command(&self, kind: MessageKind) {
        self.shared
            .user_op(move |machine, now| machine.send_command(kind, now))
            .await
    }

    /// Show the position after step `index`.
    pub async fn go_to_step(&self, index: usize) {
        self.shared
            .user_op(move |machine, _| machine.go_to_step(index))
            .await
    }

    /// Show the next step.
    pub async fn step_forward(&self) {
        self.shared.user_op(|machine, _| machine.step_forward()).await
    }

    /// Show the previous step.
    pub async fn step_backward(&self) {
        self.shared.user_op(|machine, _| machine.step_backward()).await
    }

    /// Show the live position.
    pub async fn go_to_live(&self) {
        self.shared.user_op(|machine, _| machine.go_to_live()).await
    }

    /// Tear down: stop the event loop, cancel timers, close the transport.
    pub async fn dispose(self) {
        self.event_loop.abort();
        self.shared.state.lock().await.cancel_timers();
        if let Err(e) = self.shared.transport.close().await {
            tracing::warn!("Failed to close transport: {}", e);
        }
        tracing::info!("Session disposed");
    }
}

impl<T, R, F> Drop for SessionSupervisor<T, R, F>
where
    T: Transport,
    R: RulesEngine + 'static,
    F: Feedback,
{
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

async fn await_snapshot<T, R>(
    transport: &T,
    machine: &mut SessionMachine<R>,
) -> Result<(Arc<GameSession>, Vec<Action>), ClientError>
where
    T: Transport,
    R: RulesEngine,
{
    loop {
        match transport.recv().await? {
            TransportEvent::Connected => machine.on_connected(),
            TransportEvent::Message(frame) => {
                let actions = machine.on_socket_event(&frame, now());
                if let Some(session) = machine.session() {
                    return Ok((Arc::clone(session), actions));
                }
            }
            TransportEvent::Disconnected { reason } => {
                tracing::warn!("Disconnected before first snapshot: {}", reason);
            }
        }
    }
}

async fn run_event_loop<T, R, F>(
    shared: Arc<Shared<T, R, F>>,
    mut timers: mpsc::UnboundedReceiver<TimerEvent>,
) where
    T: Transport,
    R: RulesEngine + 'static,
    F: Feedback,
{
    loop {
        tokio::select! {
            event = shared.transport.recv() => match event {
                Ok(event) => shared.on_transport_event(event).await,
                Err(TransportError::NotConnected | TransportError::ConnectionClosed) => {
                    tracing::debug!("Transport closed, stopping event loop");
                    break;
                }
                Err(e) => tracing::warn!("Transport receive failed: {}", e),
            },
            Some(event) = timers.recv() => shared.on_timer(event).await,
        }
    }
}

impl<T, R, F> Shared<T, R, F>
where
    T: Transport,
    R: RulesEngine + 'static,
    F: Feedback,
{
    async fn on_transport_event(&self, event: TransportEvent) {
        let mut inner = self.state.lock().await;
        match event {
            TransportEvent::Connected => {
                tracing::debug!("Connected, awaiting snapshot");
                inner.machine.on_connected();
                inner.awaiting_snapshot = true;
            }
            TransportEvent::Message(frame) => {
                let actions = inner.machine.on_socket_event(&frame, now());
                self.execute(&mut inner, actions).await;
                if inner.awaiting_snapshot && inner.machine.tracker().is_seeded() {
                    inner.awaiting_snapshot = false;
                    self.set_status(SessionStatus::Live);
                }
            }
            TransportEvent::Disconnected { reason } => {
                tracing::warn!("Disconnected: {}", reason);
                self.set_status(SessionStatus::Resyncing);
            }
        }
    }

    async fn on_timer(&self, event: TimerEvent) {
        let mut inner = self.state.lock().await;
        let actions = match event.kind {
            TimerKind::MoveWatchdog => {
                if !inner.watchdog.accepts(&event) {
                    return;
                }
                inner.watchdog.fired();
                tracing::debug!("Move watchdog fired");
                inner.machine.on_move_watchdog()
            }
            TimerKind::Countdown => {
                if !inner.countdown.accepts(&event) {
                    return;
                }
                inner.machine.on_countdown_tick(now())
            }
            TimerKind::GameEndChime => {
                if inner.chime.accepts(&event) {
                    inner.chime.fired();
                    self.feedback.game_end();
                }
                return;
            }
        };
        self.execute(&mut inner, actions).await;
    }

    /// Run a user operation. A defect leaves the session untouched.
    async fn user_op<Op>(&self, op: Op)
    where
        Op: FnOnce(&mut SessionMachine<R>, Instant) -> Result<Vec<Action>, Defect> + Send,
    {
        let mut inner = self.state.lock().await;
        match op(&mut inner.machine, now()) {
            Ok(actions) => self.execute(&mut inner, actions).await,
            Err(defect) => {
                tracing::error!("Defect: {}", defect);
                if self.config.strict_defects {
                    panic!("defect: {defect}");
                }
            }
        }
    }

    async fn execute(&self, inner: &mut Inner<R>, actions: Vec<Action>) {
        let timers = &self.config.timers;
        for action in actions {
            match action {
                Action::Transmit(message) => {
                    let kind = message.kind;
                    if let Err(e) = self.transport.send(message).await {
                        tracing::warn!("Failed to send {}: {}", kind, e);
                    }
                }
                Action::RequestResync => self.resync().await,
                Action::ArmMoveWatchdog => {
                    inner.watchdog.arm_once(timers.move_ack_timeout(), &self.timer_tx)
                }
                Action::CancelMoveWatchdog => inner.watchdog.cancel(),
                Action::ArmCountdown => {
                    inner.countdown.arm_periodic(timers.countdown_tick(), &self.timer_tx)
                }
                Action::CancelCountdown => inner.countdown.cancel(),
                Action::Feedback(FeedbackCue::MovePlayed { capture, check }) => {
                    self.feedback.move_played(capture, check)
                }
                Action::Feedback(FeedbackCue::GameEnd) => {
                    inner.chime.arm_once(timers.game_end_chime_delay(), &self.timer_tx)
                }
                Action::Feedback(FeedbackCue::ReplayMove) => self.feedback.replay_move(),
                Action::Redirect(game_id) => tracing::info!("Redirected to game {}", game_id),
            }
        }
        self.publish(inner);
    }

    async fn resync(&self) {
        tracing::info!("Requesting full resync");
        self.set_status(SessionStatus::Resyncing);
        if let Err(e) = self
            .transport
            .connect(&self.config.connection.address, true)
            .await
        {
            tracing::warn!("Resync reconnect failed: {}", e);
        }
    }

    fn publish(&self, inner: &Inner<R>) {
        let Some(session) = inner.machine.session() else {
            return;
        };
        self.session_tx.send_if_modified(|current| {
            if Arc::ptr_eq(current, session) {
                false
            } else {
                *current = Arc::clone(session);
                true
            }
        });
    }

    fn set_status(&self, status: SessionStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
