//! Shared fix state
//!
//! One producer (the serial reader) publishes updates while the capture loop
//! and the UI read snapshots. The fix and the last known position live behind
//! a single lock so a reader always sees one consistent state.

use crate::fix::{FixUpdate, GpsFix, Position};
use crate::geo;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Default)]
struct TrackerState {
    fix: GpsFix,
    /// Most recent position reported by any sentence. Unrelated to the
    /// capture scheduler's last capture location.
    last_known_position: Option<Position>,
    updates: u64,
}

/// Thread-safe holder of the latest GPS fix
#[derive(Debug, Default)]
pub struct FixTracker {
    state: RwLock<TrackerState>,
}

impl FixTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a parsed update into the current snapshot and return the result
    pub fn update(&self, update: &FixUpdate) -> GpsFix {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.fix = state.fix.merged(update);
        if let Some(position) = state.fix.position {
            state.last_known_position = Some(position);
        }
        state.updates += 1;

        debug!(
            updates = state.updates,
            has_fix = state.fix.has_fix(),
            "GPS fix updated"
        );
        state.fix.clone()
    }

    /// Snapshot copy of the current fix
    pub fn current_fix(&self) -> GpsFix {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .fix
            .clone()
    }

    pub fn has_fix(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .fix
            .has_fix()
    }

    pub fn last_known_position(&self) -> Option<Position> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_known_position
    }

    /// Distance from the last known position to `position`, in meters.
    ///
    /// `None` until some sentence has reported a position.
    pub fn distance_from_last_known(&self, position: Position) -> Option<f64> {
        geo::distance(self.last_known_position(), Some(position))
    }

    /// Number of updates applied since creation
    pub fn update_count(&self) -> u64 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).updates
    }

    /// Forget everything (used when a receiver disconnects)
    pub fn reset(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = TrackerState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn at(lat: f64, lon: f64) -> FixUpdate {
        FixUpdate {
            position: Some(Position::new(lat, lon)),
            fix_quality: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_distance_from_last_known() {
        let tracker = FixTracker::new();
        assert_eq!(tracker.distance_from_last_known(Position::new(0.0, 0.0)), None);

        tracker.update(&at(0.0, 0.0));
        let d = tracker
            .distance_from_last_known(Position::new(0.0, 1.0))
            .unwrap();
        assert!((d - 111_195.0).abs() < 1_200.0);
    }

    #[test]
    fn test_field_level_merge() {
        let tracker = FixTracker::new();
        tracker.update(&FixUpdate {
            altitude: Some(545.4),
            satellites: Some(8),
            fix_quality: Some(1),
            ..at(48.0, 11.0)
        });
        // RMC-like update: position and speed only
        tracker.update(&FixUpdate {
            position: Some(Position::new(48.001, 11.0)),
            speed: Some(40.0),
            ..Default::default()
        });

        let fix = tracker.current_fix();
        assert_eq!(fix.latitude(), Some(48.001));
        assert_eq!(fix.altitude, Some(545.4));
        assert_eq!(fix.satellites, Some(8));
        assert_eq!(fix.speed, Some(40.0));
        assert!(fix.has_fix());
        assert_eq!(tracker.update_count(), 2);
    }

    #[test]
    fn test_lost_fix() {
        let tracker = FixTracker::new();
        tracker.update(&at(10.0, 10.0));
        assert!(tracker.has_fix());

        tracker.update(&FixUpdate {
            fix_quality: Some(0),
            ..Default::default()
        });
        assert!(!tracker.has_fix());
        // Position stays known even without a fix
        assert_eq!(tracker.last_known_position(), Some(Position::new(10.0, 10.0)));

        tracker.reset();
        assert_eq!(tracker.current_fix(), GpsFix::default());
        assert_eq!(tracker.last_known_position(), None);
    }

    #[test]
    fn test_snapshots_are_never_torn() {
        let tracker = Arc::new(FixTracker::new());
        let writer = {
            let tracker = tracker.clone();
            std::thread::spawn(move || {
                for i in 0..2_000u32 {
                    let v = f64::from(i);
                    tracker.update(&FixUpdate {
                        position: Some(Position::new(v / 100.0, v / 100.0)),
                        altitude: Some(v),
                        satellites: Some(i),
                        fix_quality: Some(1),
                        ..Default::default()
                    });
                }
            })
        };

        for _ in 0..2_000 {
            let fix = tracker.current_fix();
            if let (Some(pos), Some(alt), Some(sats)) = (fix.position, fix.altitude, fix.satellites) {
                assert_eq!(alt, f64::from(sats));
                assert_eq!(pos.latitude, alt / 100.0);
            }
        }
        writer.join().unwrap();
    }
}
