//! Decides when the renderer has to rebuild the iris or an eyelid mesh

use crate::config::{Bounds, LidPath, ProfileGeometry};
use tracing::debug;

/// Minimum change in each weight that is worth a rebuild
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegenThresholds {
    pub iris: f64,
    pub upper_lid: f64,
    pub lower_lid: f64,
}

fn max_edge_distance(a: &Bounds, b: &Bounds) -> f64 {
    [
        (a.min_x - b.min_x).abs(),
        (a.min_y - b.min_y).abs(),
        (a.max_x - b.max_x).abs(),
        (a.max_y - b.max_y).abs(),
    ]
    .into_iter()
    .fold(0.0, f64::max)
}

fn lid_travel(path: &LidPath) -> f64 {
    let dx = path.closed_mid[0] - path.open_mid[0];
    let dy = path.closed_mid[1] - path.open_mid[1];
    (dx * dx + dy * dy).sqrt()
}

/// Half a pixel of movement, expressed as a weight
fn half_pixel(distance: f64) -> f64 {
    if distance > 0.0 {
        0.5 / distance
    } else {
        0.0
    }
}

impl RegenThresholds {
    pub fn from_geometry(geometry: &ProfileGeometry) -> Self {
        Self {
            iris: half_pixel(max_edge_distance(&geometry.pupil_min, &geometry.pupil_max)),
            upper_lid: half_pixel(lid_travel(&geometry.upper_lid)),
            lower_lid: half_pixel(lid_travel(&geometry.lower_lid)),
        }
    }
}

pub fn should_regenerate(prev: f64, new: f64, threshold: f64) -> bool {
    (new - prev).abs() >= threshold
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegenFlags {
    pub iris: bool,
    pub upper: bool,
    pub lower: bool,
}

/// Remembers the weights each mesh was last built for. A rebuild happens
/// iff the weight moved by at least the threshold, or on the first frame
/// after construction or a profile switch.
#[derive(Debug, Clone)]
pub struct RegenTracker {
    thresholds: RegenThresholds,
    prev_pupil: f64,
    prev_upper: f64,
    prev_lower: f64,
    forced: bool,
}

impl RegenTracker {
    pub fn new(thresholds: RegenThresholds) -> Self {
        Self {
            thresholds,
            prev_pupil: 0.0,
            prev_upper: 0.5,
            prev_lower: 0.5,
            forced: true,
        }
    }

    /// Profile switch: new thresholds and everything rebuilt next frame
    pub fn reset(&mut self, thresholds: RegenThresholds) {
        debug!("Regeneration thresholds {:?}", thresholds);
        *self = Self::new(thresholds);
    }

    pub fn evaluate(&mut self, pupil: f64, upper: f64, lower: f64) -> RegenFlags {
        let t = self.thresholds;
        let flags = RegenFlags {
            iris: self.forced || should_regenerate(self.prev_pupil, pupil, t.iris),
            upper: self.forced || should_regenerate(self.prev_upper, upper, t.upper_lid),
            lower: self.forced || should_regenerate(self.prev_lower, lower, t.lower_lid),
        };
        if flags.iris {
            self.prev_pupil = pupil;
        }
        if flags.upper {
            self.prev_upper = upper;
        }
        if flags.lower {
            self.prev_lower = lower;
        }
        self.forced = false;
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileTable;
    use crate::mapping::ProfileId;
    use proptest::prelude::*;

    fn thresholds() -> RegenThresholds {
        RegenThresholds {
            iris: 0.01,
            upper_lid: 0.01,
            lower_lid: 0.01,
        }
    }

    proptest! {
        #[test]
        fn decision_is_a_pure_function(prev in -1.0f64..2.0, new in -1.0f64..2.0, threshold in 0.0f64..0.5) {
            let first = should_regenerate(prev, new, threshold);
            prop_assert_eq!(first, should_regenerate(prev, new, threshold));
            prop_assert_eq!(first, (new - prev).abs() >= threshold);
        }
    }

    #[test]
    fn test_thresholds_from_builtin_geometry() {
        let table = ProfileTable::default();
        let t = RegenThresholds::from_geometry(&table.get(ProfileId::Dragon).geometry);

        assert!((t.iris - 0.5 / 66.0).abs() < 1e-12);
        assert!((t.upper_lid - 0.5 / 142.0).abs() < 1e-12);
        assert!((t.lower_lid - 0.5 / 104.0).abs() < 1e-12);
    }

    #[test]
    fn test_first_frame_rebuilds_everything() {
        let mut tracker = RegenTracker::new(thresholds());
        let flags = tracker.evaluate(0.5, 0.5, 0.5);
        assert_eq!(
            flags,
            RegenFlags {
                iris: true,
                upper: true,
                lower: true
            }
        );
    }

    #[test]
    fn test_small_iris_change_is_skipped() {
        let mut tracker = RegenTracker::new(thresholds());
        tracker.evaluate(0.5, 0.5, 0.5);
        tracker.evaluate(0.5, 0.5, 0.5);

        assert!(!tracker.evaluate(0.505, 0.5, 0.5).iris);
        assert!(tracker.evaluate(0.52, 0.5, 0.5).iris);
        // Compared against the last rebuilt value, not the last seen one
        assert!(!tracker.evaluate(0.525, 0.5, 0.5).iris);
    }

    #[test]
    fn test_lid_rebuilds_only_when_weight_moves() {
        let mut tracker = RegenTracker::new(thresholds());
        tracker.evaluate(0.5, 0.5, 0.5);
        assert!(!tracker.evaluate(0.5, 0.5, 0.5).upper);

        let crossing = tracker.evaluate(0.5, 0.8, 0.5);
        assert!(crossing.upper);
        assert!(!crossing.lower);
        // Same weight again: nothing to rebuild
        assert_eq!(tracker.evaluate(0.5, 0.8, 0.5), RegenFlags::default());
    }

    #[test]
    fn test_reset_forces_full_rebuild() {
        let mut tracker = RegenTracker::new(thresholds());
        for _ in 0..3 {
            tracker.evaluate(0.5, 0.5, 0.5);
        }
        assert_eq!(tracker.evaluate(0.5, 0.5, 0.5), RegenFlags::default());

        let table = ProfileTable::default();
        tracker.reset(RegenThresholds::from_geometry(&table.get(ProfileId::Hack).geometry));
        let flags = tracker.evaluate(0.5, 0.5, 0.5);
        assert!(flags.iris && flags.upper && flags.lower);
        assert_eq!(tracker.evaluate(0.5, 0.5, 0.5), RegenFlags::default());
    }
}
