//! Owned timer handles.
//!
//! Each slot holds at most one spawned timer task. Arming a slot aborts the
//! previous task first. Fired timers post a [`TimerEvent`] to the
//! supervisor's channel; events from a cancelled or re-armed generation are
//! rejected by [`TimerSlot::accepts`].

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    MoveWatchdog,
    Countdown,
    GameEndChime,
}

/// A timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerEvent {
    pub kind: TimerKind,
    pub generation: u64,
}

#[derive(Debug)]
pub(crate) struct TimerSlot {
    kind: TimerKind,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            generation: 0,
            handle: None,
        }
    }

    /// Fire once after `delay`.
    pub fn arm_once(&mut self, delay: Duration, events: &UnboundedSender<TimerEvent>) {
        let event = self.rearm();
        let events = events.clone();
        self.handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            let _ = events.send(event);
        }));
        tracing::debug!("Armed {:?} timer ({:?})", self.kind, delay);
    }

    /// Fire every `period`, first after one full period.
    pub fn arm_periodic(&mut self, period: Duration, events: &UnboundedSender<TimerEvent>) {
        let event = self.rearm();
        let events = events.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if events.send(event).is_err() {
                    break;
                }
            }
        }));
        tracing::debug!("Armed {:?} timer (every {:?})", self.kind, period);
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            self.generation += 1;
            tracing::debug!("Cancelled {:?} timer", self.kind);
        }
    }

    /// Mark a one-shot timer as spent.
    pub fn fired(&mut self) {
        self.handle = None;
        self.generation += 1;
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether `event` comes from the currently armed timer.
    pub fn accepts(&self, event: &TimerEvent) -> bool {
        self.is_armed() && event.kind == self.kind && event.generation == self.generation
    }

    fn rearm(&mut self) -> TimerEvent {
        self.cancel();
        self.generation += 1;
        TimerEvent {
            kind: self.kind,
            generation: self.generation,
        }
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    // ===========================================
    // One-shot Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn one_shot_fires_after_delay() {
        let (tx, mut rx) = unbounded_channel();
        let mut slot = TimerSlot::new(TimerKind::MoveWatchdog);
        slot.arm_once(Duration::from_secs(10), &tx);
        assert!(slot.is_armed());

        let started = Instant::now();
        let event = rx.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert!(slot.accepts(&event));

        slot.fired();
        assert!(!slot.is_armed());
        assert!(!slot.accepts(&event));
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_previous_timer() {
        let (tx, mut rx) = unbounded_channel();
        let mut slot = TimerSlot::new(TimerKind::MoveWatchdog);
        slot.arm_once(Duration::from_secs(1), &tx);
        slot.arm_once(Duration::from_secs(5), &tx);

        let started = Instant::now();
        let event = rx.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert!(slot.accepts(&event));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_timer() {
        let (tx, mut rx) = unbounded_channel();
        let mut slot = TimerSlot::new(TimerKind::GameEndChime);
        slot.arm_once(Duration::from_millis(500), &tx);
        slot.cancel();
        assert!(!slot.is_armed());

        sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_rejected() {
        let (tx, mut rx) = unbounded_channel();
        let mut slot = TimerSlot::new(TimerKind::MoveWatchdog);
        slot.arm_once(Duration::from_secs(1), &tx);
        let stale = rx.recv().await.unwrap();

        // Re-armed before the first firing was handled
        slot.arm_once(Duration::from_secs(1), &tx);
        assert!(!slot.accepts(&stale));
    }

    // ===========================================
    // Periodic Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn periodic_ticks_until_cancelled() {
        let (tx, mut rx) = unbounded_channel();
        let mut slot = TimerSlot::new(TimerKind::Countdown);
        let started = Instant::now();
        slot.arm_periodic(Duration::from_secs(1), &tx);

        for tick in 1..=3u64 {
            let event = rx.recv().await.unwrap();
            assert!(slot.accepts(&event));
            assert_eq!(started.elapsed(), Duration::from_secs(tick));
        }

        slot.cancel();
        sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_task() {
        let (tx, mut rx) = unbounded_channel();
        {
            let mut slot = TimerSlot::new(TimerKind::Countdown);
            slot.arm_periodic(Duration::from_secs(1), &tx);
        }

        sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());
    }
}
