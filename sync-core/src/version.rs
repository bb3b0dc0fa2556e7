//! Event-version tracking for boardsync.
//!
//! The server numbers every ordered event of a game. The tracker remembers
//! the last version applied and classifies each incoming version as:
//! - the next one in sequence (apply it)
//! - stale (already applied, drop it)
//! - a gap (events were lost, a full resync is needed)
//!
//! Nothing is applied until a full snapshot seeds the tracker. A reconnection
//! puts the tracker back into that waiting state, but it never forgets the
//! highest version it has seen, so an older snapshot cannot roll it back.

/// How an incoming event relates to the tracked sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No snapshot has seeded the tracker yet.
    AwaitingFull,
    /// The event is at or behind the last applied version.
    Stale,
    /// The event carries no version, or exactly the next one.
    Next,
    /// The event skips at least one version.
    Gap,
}

/// Classify an incoming version against the last applied one.
///
/// Unversioned events are always [`Classification::Next`] once seeded.
pub fn classify(last: Option<u64>, incoming: Option<u64>) -> Classification {
    let Some(last) = last else {
        return Classification::AwaitingFull;
    };
    match incoming {
        None => Classification::Next,
        Some(v) if v <= last => Classification::Stale,
        Some(v) if v == last + 1 => Classification::Next,
        Some(_) => Classification::Gap,
    }
}

/// Tracks the last applied event version of one game.
#[derive(Debug, Clone, Default)]
pub struct VersionTracker {
    /// Last applied version; `None` while awaiting a snapshot.
    applied: Option<u64>,
    /// Highest version ever seeded or applied. Survives [`reseed`](Self::reseed).
    high_water: Option<u64>,
}

impl VersionTracker {
    /// Create a tracker that waits for its first snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last applied version, or `None` while awaiting a snapshot.
    pub fn last_version(&self) -> Option<u64> {
        self.applied
    }

    /// Highest version the tracker has ever held.
    pub fn high_water(&self) -> Option<u64> {
        self.high_water
    }

    /// Whether a snapshot has seeded the tracker.
    pub fn is_seeded(&self) -> bool {
        self.applied.is_some()
    }

    /// Classify an incoming version and advance past it when it is
    /// [`Next`](Classification::Next) or a [`Gap`](Classification::Gap).
    ///
    /// On a gap the tracker moves to the incoming version; the caller is
    /// expected to resync, and the snapshot that follows reseeds it.
    pub fn observe(&mut self, incoming: Option<u64>) -> Classification {
        let class = classify(self.applied, incoming);
        if let (Classification::Next | Classification::Gap, Some(v)) = (class, incoming) {
            self.advance(v);
        }
        class
    }

    /// Whether a snapshot at `version` may replace the current state.
    ///
    /// Snapshots behind the high-water mark are refused. A snapshot without
    /// a version is accepted.
    pub fn accepts_snapshot(&self, version: Option<u64>) -> bool {
        match (version, self.high_water) {
            (Some(v), Some(high)) => v >= high,
            _ => true,
        }
    }

    /// Seed the tracker from a snapshot.
    ///
    /// A snapshot without a version keeps the high-water mark.
    pub fn seed(&mut self, version: Option<u64>) {
        let version = version.or(self.high_water).unwrap_or(0);
        self.advance(version);
    }

    /// Forget the applied version so the next snapshot reseeds the tracker.
    pub fn reseed(&mut self) {
        self.applied = None;
    }

    fn advance(&mut self, version: u64) {
        self.applied = Some(version);
        self.high_water = Some(self.high_water.map_or(version, |high| high.max(version)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // classify
    // ===========================================

    #[test]
    fn unseeded_tracker_awaits_full() {
        assert_eq!(classify(None, Some(1)), Classification::AwaitingFull);
        assert_eq!(classify(None, None), Classification::AwaitingFull);
    }

    #[test]
    fn classify_sequence() {
        assert_eq!(classify(Some(5), Some(6)), Classification::Next);
        assert_eq!(classify(Some(5), Some(5)), Classification::Stale);
        assert_eq!(classify(Some(5), Some(3)), Classification::Stale);
        assert_eq!(classify(Some(5), Some(7)), Classification::Gap);
        assert_eq!(classify(Some(5), None), Classification::Next);
    }

    // ===========================================
    // VersionTracker
    // ===========================================

    #[test]
    fn seeded_tracker_follows_sequence() {
        let mut tracker = VersionTracker::new();
        assert_eq!(tracker.observe(Some(1)), Classification::AwaitingFull);
        assert_eq!(tracker.last_version(), None);

        tracker.seed(Some(5));
        assert_eq!(tracker.observe(Some(6)), Classification::Next);
        assert_eq!(tracker.observe(Some(6)), Classification::Stale);
        assert_eq!(tracker.observe(Some(9)), Classification::Gap);
        assert_eq!(tracker.last_version(), Some(9));
        assert_eq!(tracker.high_water(), Some(9));
    }

    #[test]
    fn unversioned_event_does_not_move_tracker() {
        let mut tracker = VersionTracker::new();
        tracker.seed(Some(4));
        assert_eq!(tracker.observe(None), Classification::Next);
        assert_eq!(tracker.last_version(), Some(4));
    }

    #[test]
    fn version_never_decreases_while_seeded() {
        let mut tracker = VersionTracker::new();
        tracker.seed(Some(10));
        for v in [3, 10, 11, 2, 11] {
            tracker.observe(Some(v));
            assert!(tracker.last_version().unwrap() >= 10);
        }
        assert_eq!(tracker.last_version(), Some(11));
    }

    #[test]
    fn reseed_keeps_high_water_mark() {
        let mut tracker = VersionTracker::new();
        tracker.seed(Some(8));
        tracker.observe(Some(9));
        tracker.reseed();

        assert!(!tracker.is_seeded());
        assert_eq!(tracker.observe(Some(10)), Classification::AwaitingFull);
        assert!(!tracker.accepts_snapshot(Some(7)));
        assert!(tracker.accepts_snapshot(Some(9)));
        assert!(tracker.accepts_snapshot(None));
    }

    #[test]
    fn snapshot_without_version_reuses_high_water() {
        let mut tracker = VersionTracker::new();
        tracker.seed(None);
        assert_eq!(tracker.last_version(), Some(0));

        tracker.seed(Some(12));
        tracker.reseed();
        tracker.seed(None);
        assert_eq!(tracker.last_version(), Some(12));
    }
}
