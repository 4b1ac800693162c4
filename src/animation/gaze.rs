//! Gaze: hold at a point, then ease to the next one

use super::overrides::Overrides;
use super::uniform;
use crate::config::GazeConfig;
use crate::mapping::events::GazeDirection;
use rand::RngCore;
use std::f64::consts::FRAC_1_SQRT_2;

/// Radius of the disk the gaze point lives in
pub const GAZE_RADIUS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn radius_sq(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    fn lerp(&self, to: &Point, s: f64) -> Point {
        Point::new(self.x + (to.x - self.x) * s, self.y + (to.y - self.y) * s)
    }
}

/// Ease in/out `3t² − 2t³`, with `t` clamped to [0, 1]
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    3.0 * t * t - 2.0 * t * t * t
}

/// Uniform x, then y uniform within the chord at x
pub fn random_destination(rng: &mut dyn RngCore) -> Point {
    let x = uniform(rng, -GAZE_RADIUS, GAZE_RADIUS);
    let n = (GAZE_RADIUS * GAZE_RADIUS - x * x).max(0.0).sqrt();
    let y = uniform(rng, -n, n);
    Point::new(x, y)
}

/// Target for a requested direction. The display mirrors the eye, so "left"
/// means positive x.
pub fn preset(direction: GazeDirection) -> Point {
    let d = GAZE_RADIUS * FRAC_1_SQRT_2;
    match direction {
        GazeDirection::Up => Point::new(0.0, GAZE_RADIUS),
        GazeDirection::Down => Point::new(0.0, -GAZE_RADIUS),
        GazeDirection::Left => Point::new(GAZE_RADIUS, 0.0),
        GazeDirection::Right => Point::new(-GAZE_RADIUS, 0.0),
        GazeDirection::Center => Point::ORIGIN,
        GazeDirection::NorthEast => Point::new(-d, d),
        GazeDirection::NorthWest => Point::new(d, d),
        GazeDirection::SouthEast => Point::new(-d, -d),
        GazeDirection::SouthWest => Point::new(d, -d),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeMotion {
    Holding,
    Moving,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GazeTransition {
    /// Started towards a requested direction
    Directed(GazeDirection),
    /// Hold expired; `forced` is set when the emotion director picked the target
    Wander { forced: Option<GazeDirection> },
    /// Arrived and started holding
    Settled,
}

#[derive(Debug, Clone)]
pub struct GazeState {
    pub current: Point,
    pub start: Point,
    pub dest: Point,
    /// Start of the current move or hold
    pub phase_start: f64,
    pub move_duration: f64,
    pub hold_duration: f64,
    pub motion: GazeMotion,
}

#[derive(Debug)]
pub struct GazeController {
    state: GazeState,
    config: GazeConfig,
}

impl GazeController {
    pub fn new(config: GazeConfig, now: f64, rng: &mut dyn RngCore) -> Self {
        let start = random_destination(rng);
        let state = GazeState {
            current: start,
            start,
            dest: start,
            phase_start: now,
            move_duration: uniform(rng, config.move_duration_min_sec, config.move_duration_max_sec),
            hold_duration: uniform(rng, config.hold_duration_min_sec, config.hold_duration_max_sec),
            motion: GazeMotion::Holding,
        };
        Self { state, config }
    }

    pub fn state(&self) -> &GazeState {
        &self.state
    }

    pub fn current(&self) -> Point {
        self.state.current
    }

    /// Directed requests are only taken while holding
    pub fn is_holding(&self) -> bool {
        self.state.motion == GazeMotion::Holding
    }

    pub fn update(
        &mut self,
        now: f64,
        directed: Option<GazeDirection>,
        overrides: &mut Overrides,
        rng: &mut dyn RngCore,
    ) -> Option<GazeTransition> {
        let elapsed = now - self.state.phase_start;

        match self.state.motion {
            GazeMotion::Moving => {
                if elapsed < self.state.move_duration {
                    let s = smoothstep(elapsed / self.state.move_duration);
                    self.state.current = self.state.start.lerp(&self.state.dest, s);
                    None
                } else {
                    self.state.start = self.state.dest;
                    self.state.current = self.state.dest;
                    self.state.hold_duration = overrides.hold_duration.consume().unwrap_or_else(
                        || {
                            uniform(
                                rng,
                                self.config.hold_duration_min_sec,
                                self.config.hold_duration_max_sec,
                            )
                        },
                    );
                    self.state.phase_start = now;
                    self.state.motion = GazeMotion::Holding;
                    Some(GazeTransition::Settled)
                }
            }
            GazeMotion::Holding => {
                if let Some(direction) = directed {
                    self.begin_move(now, preset(direction), self.config.event_move_duration_sec);
                    return Some(GazeTransition::Directed(direction));
                }
                if elapsed < self.state.hold_duration {
                    return None;
                }

                let forced = overrides.gaze_direction.consume();
                let dest = forced.map(preset).unwrap_or_else(|| random_destination(rng));
                let duration = overrides.move_duration.consume().unwrap_or_else(|| {
                    uniform(
                        rng,
                        self.config.move_duration_min_sec,
                        self.config.move_duration_max_sec,
                    )
                });
                self.begin_move(now, dest, duration);
                Some(GazeTransition::Wander { forced })
            }
        }
    }

    fn begin_move(&mut self, now: f64, dest: Point, duration: f64) {
        self.state.start = self.state.current;
        self.state.dest = dest;
        self.state.move_duration = duration;
        self.state.phase_start = now;
        self.state.motion = GazeMotion::Moving;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::overrides::ClearPolicy;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const LIMIT: f64 = GAZE_RADIUS * GAZE_RADIUS + 1e-9;

    proptest! {
        #[test]
        fn random_destinations_stay_in_disk(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..64 {
                let p = random_destination(&mut rng);
                prop_assert!(p.radius_sq() <= LIMIT, "{:?}", p);
            }
        }

        #[test]
        fn smoothstep_is_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(smoothstep(lo) <= smoothstep(hi));
        }

        #[test]
        fn current_position_never_leaves_disk(seed in any::<u64>(), steps in 1usize..400) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut overrides = Overrides::new(ClearPolicy::ClearOnRead);
            let mut gaze = GazeController::new(GazeConfig::default(), 0.0, &mut rng);
            let mut now = 0.0;
            for step in 0..steps {
                now += 0.05;
                let directed = if step % 37 == 0 { Some(GazeDirection::NorthEast) } else { None };
                gaze.update(now, directed, &mut overrides, &mut rng);
                prop_assert!(gaze.current().radius_sq() <= LIMIT);
            }
        }
    }

    #[test]
    fn test_presets_sit_on_circle() {
        for direction in GazeDirection::ALL {
            let p = preset(direction);
            if direction == GazeDirection::Center {
                assert_eq!(p, Point::ORIGIN);
            } else {
                assert!((p.radius_sq().sqrt() - GAZE_RADIUS).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert_eq!(smoothstep(2.0), 1.0);
    }

    #[test]
    fn test_directed_move_uses_event_duration() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut overrides = Overrides::default();
        let mut gaze = GazeController::new(GazeConfig::default(), 0.0, &mut rng);

        let transition = gaze.update(0.01, Some(GazeDirection::Up), &mut overrides, &mut rng);
        assert_eq!(transition, Some(GazeTransition::Directed(GazeDirection::Up)));
        assert!(!gaze.is_holding());
        assert_eq!(gaze.state().move_duration, 0.12);

        gaze.update(0.2, None, &mut overrides, &mut rng);
        assert_eq!(gaze.update(0.2, None, &mut overrides, &mut rng), None);
        assert!(gaze.is_holding());
        assert_eq!(gaze.current(), Point::new(0.0, GAZE_RADIUS));
    }

    #[test]
    fn test_move_completes_when_duration_elapses() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut overrides = Overrides::default();
        let mut gaze = GazeController::new(GazeConfig::default(), 0.0, &mut rng);

        gaze.update(0.0, Some(GazeDirection::Down), &mut overrides, &mut rng);
        assert_eq!(gaze.update(0.06, None, &mut overrides, &mut rng), None);
        assert!(!gaze.is_holding());

        // elapsed == move duration is arrival, not one more interpolated frame
        assert_eq!(
            gaze.update(0.12, None, &mut overrides, &mut rng),
            Some(GazeTransition::Settled)
        );
        assert!(gaze.is_holding());
        assert_eq!(gaze.current(), Point::new(0.0, -GAZE_RADIUS));
    }

    #[test]
    fn test_hold_override_is_used_once_on_arrival() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut overrides = Overrides::default();
        let mut gaze = GazeController::new(GazeConfig::default(), 0.0, &mut rng);
        overrides.hold_duration.set(9.0);

        gaze.update(0.0, Some(GazeDirection::Left), &mut overrides, &mut rng);
        assert_eq!(
            gaze.update(1.0, None, &mut overrides, &mut rng),
            Some(GazeTransition::Settled)
        );
        assert_eq!(gaze.state().hold_duration, 9.0);
        assert!(!overrides.hold_duration.is_set());
    }

    #[test]
    fn test_forced_direction_replaces_random_destination() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut overrides = Overrides::default();
        let mut gaze = GazeController::new(GazeConfig::default(), 0.0, &mut rng);
        overrides.gaze_direction.set(GazeDirection::Center);
        overrides.move_duration.set(0.5);

        let transition = gaze.update(10.0, None, &mut overrides, &mut rng);
        assert_eq!(
            transition,
            Some(GazeTransition::Wander {
                forced: Some(GazeDirection::Center)
            })
        );
        assert_eq!(gaze.state().dest, Point::ORIGIN);
        assert_eq!(gaze.state().move_duration, 0.5);
    }
}
