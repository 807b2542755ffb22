use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Recent vertical positions for one identity, most-recent-last.
#[derive(Debug)]
struct Trail {
    positions: VecDeque<f32>,
    last_seen: u64,
}

/// Bounded per-identity history of vertical centroid positions.
///
/// The crossing check only needs the most recent position; the rest of the
/// window exists for inspection and debugging. Entries for identities the
/// tracker has stopped reporting are removed by [`TrackHistory::evict_stale`]
/// so the keyspace stays bounded on long streams.
#[derive(Debug)]
pub struct TrackHistory {
    trails: HashMap<u32, Trail>,
    window: usize,
}

impl TrackHistory {
    pub const DEFAULT_WINDOW: usize = 10;

    pub fn new(window: usize) -> Self {
        TrackHistory {
            trails: HashMap::new(),
            window,
        }
    }

    /// Most recently recorded position for `id`, or `None` for an identity
    /// that has never been seen. `None` means "cannot have crossed this
    /// frame" to the crossing check.
    pub fn previous_position(&self, id: u32) -> Option<f32> {
        self.trails
            .get(&id)
            .and_then(|trail| trail.positions.back().copied())
    }

    /// Append a position for `id`, discarding the oldest entry once the
    /// window is full.
    pub fn record(&mut self, id: u32, y: f32, frame_index: u64) {
        let trail = self.trails.entry(id).or_insert_with(|| Trail {
            positions: VecDeque::with_capacity(self.window),
            last_seen: frame_index,
        });
        trail.positions.push_back(y);
        while trail.positions.len() > self.window {
            trail.positions.pop_front();
        }
        trail.last_seen = frame_index;
    }

    /// Drop identities unseen for more than `max_age` frames. Returns how
    /// many were removed.
    pub fn evict_stale(&mut self, frame_index: u64, max_age: u64) -> usize {
        let before = self.trails.len();
        self.trails
            .retain(|_, trail| frame_index.saturating_sub(trail.last_seen) <= max_age);
        let evicted = before - self.trails.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.trails.len(), "evicted stale track history");
        }
        evicted
    }

    /// Full trail for `id`, oldest first, for drawing.
    pub fn trail(&self, id: u32) -> Option<&VecDeque<f32>> {
        self.trails.get(&id).map(|t| &t.positions)
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    pub fn clear(&mut self) {
        self.trails.clear();
    }
}

impl Default for TrackHistory {
    fn default() -> Self {
        TrackHistory::new(Self::DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unseen_identity_has_no_previous_position() {
        let history = TrackHistory::default();
        assert_eq!(history.previous_position(42), None);
    }

    #[test]
    fn previous_position_is_last_recorded() {
        let mut history = TrackHistory::default();
        history.record(7, 100.0, 1);
        history.record(7, 120.0, 2);
        assert_relative_eq!(history.previous_position(7).unwrap(), 120.0);
    }

    #[test]
    fn trail_never_exceeds_window() {
        let mut history = TrackHistory::default();
        for i in 0..25 {
            history.record(3, i as f32, i);
        }
        let trail = history.trail(3).unwrap();
        assert_eq!(trail.len(), TrackHistory::DEFAULT_WINDOW);
        // Oldest surviving entry is the 15th sample.
        assert_relative_eq!(*trail.front().unwrap(), 15.0);
        assert_relative_eq!(*trail.back().unwrap(), 24.0);
    }

    #[test]
    fn stale_identities_are_evicted() {
        let mut history = TrackHistory::default();
        history.record(1, 50.0, 10);
        history.record(2, 60.0, 100);
        let evicted = history.evict_stale(101, 30);
        assert_eq!(evicted, 1);
        assert_eq!(history.previous_position(1), None);
        assert!(history.previous_position(2).is_some());
    }

    #[test]
    fn recent_identity_survives_eviction() {
        let mut history = TrackHistory::default();
        history.record(5, 10.0, 100);
        assert_eq!(history.evict_stale(130, 30), 0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut history = TrackHistory::default();
        history.record(1, 1.0, 1);
        history.clear();
        assert!(history.is_empty());
    }
}
