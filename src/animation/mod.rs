//! # Animation core
//!
//! Single-threaded and cooperative. One [`animator::EyeAnimator`] owns all
//! animation state; every rendered frame is one tick:
//!
//! ```text
//! feeds ─poll─▶ EventArbiter ─▶ gaze / blink / emotion ─▶ RegenTracker ─▶ Renderer
//!                                        ▲
//!                           pupil sampler (drives the ticks)
//! ```
//!
//! Time comes from a [`clock::Clock`] so the whole loop can be driven by a
//! manual clock in tests.

pub mod animator;
pub mod arbiter;
pub mod blink;
pub mod clock;
pub mod emotion;
pub mod gaze;
pub mod overrides;
pub mod pupil;
pub mod regen;
pub mod render;

pub use animator::{EyeAnimator, RunOutcome};
pub use arbiter::EventArbiter;
pub use clock::{Clock, SystemClock};
pub use render::{FrameOutput, HeadlessRenderer, RenderContext, Renderer};

use rand::distributions::{Distribution, Open01};
use rand::{Rng, RngCore};

/// `U(min, max)`; an empty range yields `min`
pub fn uniform(rng: &mut dyn RngCore, min: f64, max: f64) -> f64 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// Strictly inside `(min, max)`; an empty range yields `min`
pub fn uniform_open(rng: &mut dyn RngCore, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    let t: f64 = Open01.sample(rng);
    let value = min + (max - min) * t;
    // Rounding can land on an end point for very narrow ranges
    if value > min && value < max {
        value
    } else {
        min + (max - min) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    proptest! {
        #[test]
        fn open_range_never_hits_bounds(seed in any::<u64>(), min in 0.0f64..1.0, width in 1e-9f64..1.0) {
            let mut rng = StdRng::seed_from_u64(seed);
            let max = min + width;
            let value = uniform_open(&mut rng, min, max);
            prop_assert!(value > min && value < max, "{} not in ({}, {})", value, min, max);
        }
    }

    #[test]
    fn test_empty_range_yields_min() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(uniform(&mut rng, 0.4, 0.4), 0.4);
        assert_eq!(uniform_open(&mut rng, 0.4, 0.4), 0.4);
        assert_eq!(uniform_open(&mut rng, 0.4, 0.1), 0.4);
    }
}
