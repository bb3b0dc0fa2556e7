//! Abandonment countdown.
//!
//! When the opponent leaves, the server announces how many seconds remain
//! before the local player may claim the win. The client counts those
//! seconds down locally, one tick per second:
//!
//! ```text
//! Idle --arm(n)--> Armed(n) --tick--> Armed(n-1) ... --tick--> Idle
//!                     |
//!                     +--tick while ineligible / cancel--> Idle
//! ```

use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

/// Countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbandonmentCountdown {
    /// Not counting.
    #[default]
    Idle,
    /// Counting down.
    Armed {
        /// Time left before a win can be claimed.
        remaining: Duration,
    },
}

impl AbandonmentCountdown {
    /// Start counting from `seconds`. Zero seconds leaves the countdown idle.
    pub fn arm(seconds: u32) -> Self {
        if seconds == 0 {
            Self::Idle
        } else {
            Self::Armed {
                remaining: Duration::from_secs(u64::from(seconds)),
            }
        }
    }

    /// Advance by one tick.
    ///
    /// Eligibility is checked before decrementing; an ineligible tick
    /// goes straight to idle.
    pub fn tick(self, eligible: bool) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Armed { .. } if !eligible => Self::Idle,
            Self::Armed { remaining } => {
                let remaining = remaining.saturating_sub(TICK);
                if remaining.is_zero() {
                    Self::Idle
                } else {
                    Self::Armed { remaining }
                }
            }
        }
    }

    /// Time left, while armed.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Idle => None,
            Self::Armed { remaining } => Some(*remaining),
        }
    }

    /// Whether the countdown is running.
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_to_idle() {
        let mut countdown = AbandonmentCountdown::arm(3);
        assert_eq!(countdown.remaining(), Some(Duration::from_secs(3)));

        countdown = countdown.tick(true);
        assert_eq!(countdown.remaining(), Some(Duration::from_secs(2)));
        countdown = countdown.tick(true);
        assert_eq!(countdown.remaining(), Some(Duration::from_secs(1)));
        countdown = countdown.tick(true);
        assert_eq!(countdown, AbandonmentCountdown::Idle);
    }

    #[test]
    fn reaches_idle_within_n_plus_one_ticks() {
        for n in 0..10 {
            let mut countdown = AbandonmentCountdown::arm(n);
            for _ in 0..=n {
                countdown = countdown.tick(true);
            }
            assert!(!countdown.is_armed(), "armed with {n}s still running");
        }
    }

    #[test]
    fn ineligible_tick_cancels() {
        let countdown = AbandonmentCountdown::arm(30).tick(false);
        assert_eq!(countdown, AbandonmentCountdown::Idle);
    }

    #[test]
    fn idle_stays_idle() {
        assert_eq!(
            AbandonmentCountdown::Idle.tick(true),
            AbandonmentCountdown::Idle
        );
        assert_eq!(AbandonmentCountdown::arm(0), AbandonmentCountdown::Idle);
    }
}
