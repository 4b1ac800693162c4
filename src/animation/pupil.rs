//! Recursive pupil-scale sampler
//!
//! A move from `start` to `end` is split in half in time and range until the
//! range drops below [`MIN_SPLIT_RANGE`]; each half gets a randomly jittered
//! midpoint, which gives the twitchy organic look of a real pupil. Leaves
//! interpolate linearly, emitting one value per frame.

use super::uniform;
use rand::RngCore;

pub const MIN_SPLIT_RANGE: f64 = 0.125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRequest {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub range: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PupilBounds {
    pub min: f64,
    pub max: f64,
}

impl PupilBounds {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Receiver of sampled values; also the only place time passes
pub trait SampleSink {
    fn now(&mut self) -> f64;

    /// Polled once per recursion level and once per sample
    fn should_cancel(&mut self) -> bool;

    /// One sample = one rendered frame
    fn emit(&mut self, value: f64);

    fn enter_segment(&mut self, _depth: usize) {}
}

pub fn sample(
    request: SampleRequest,
    bounds: PupilBounds,
    rng: &mut dyn RngCore,
    sink: &mut dyn SampleSink,
) -> SampleOutcome {
    split(
        request.start,
        request.end,
        request.duration,
        request.range,
        0,
        bounds,
        rng,
        sink,
    )
}

#[allow(clippy::too_many_arguments)]
fn split(
    start: f64,
    end: f64,
    duration: f64,
    range: f64,
    depth: usize,
    bounds: PupilBounds,
    rng: &mut dyn RngCore,
    sink: &mut dyn SampleSink,
) -> SampleOutcome {
    sink.enter_segment(depth);
    if sink.should_cancel() {
        return SampleOutcome::Cancelled;
    }

    if range >= MIN_SPLIT_RANGE {
        let duration = duration * 0.5;
        let range = range * 0.5;
        let mid = (start + end - range) * 0.5 + uniform(rng, 0.0, range);

        if split(start, mid, duration, range, depth + 1, bounds, rng, sink)
            == SampleOutcome::Cancelled
        {
            return SampleOutcome::Cancelled;
        }
        return split(mid, end, duration, range, depth + 1, bounds, rng, sink);
    }

    let leaf_start = sink.now();
    let delta = end - start;
    loop {
        let dt = sink.now() - leaf_start;
        if dt >= duration {
            return SampleOutcome::Completed;
        }
        if sink.should_cancel() {
            return SampleOutcome::Cancelled;
        }
        sink.emit(bounds.clamp(start + delta * dt / duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Advances a fake clock by one frame per emitted sample
    struct RecordingSink {
        now: f64,
        frame: f64,
        samples: Vec<f64>,
        max_depth: usize,
        cancel_after: Option<usize>,
    }

    impl RecordingSink {
        fn new(frame: f64) -> Self {
            Self {
                now: 0.0,
                frame,
                samples: Vec::new(),
                max_depth: 0,
                cancel_after: None,
            }
        }
    }

    impl SampleSink for RecordingSink {
        fn now(&mut self) -> f64 {
            self.now
        }

        fn should_cancel(&mut self) -> bool {
            self.cancel_after
                .map_or(false, |limit| self.samples.len() >= limit)
        }

        fn emit(&mut self, value: f64) {
            self.samples.push(value);
            self.now += self.frame;
        }

        fn enter_segment(&mut self, depth: usize) {
            self.max_depth = self.max_depth.max(depth);
        }
    }

    fn depth_bound(range: f64) -> usize {
        ((range / MIN_SPLIT_RANGE).log2().ceil() + 1.0).max(0.0) as usize
    }

    proptest! {
        #[test]
        fn samples_respect_bounds_and_depth(
            seed in any::<u64>(),
            start in 0.0f64..1.0,
            end in 0.0f64..1.0,
            range in 0.125f64..2.0,
            duration in 0.05f64..2.0,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut sink = RecordingSink::new(1.0 / 60.0);
            let bounds = PupilBounds { min: 0.0, max: 1.0 };
            let request = SampleRequest { start, end, duration, range };

            let outcome = sample(request, bounds, &mut rng, &mut sink);

            prop_assert_eq!(outcome, SampleOutcome::Completed);
            prop_assert!(sink.max_depth <= depth_bound(range));
            for value in &sink.samples {
                prop_assert!((0.0..=1.0).contains(value));
            }
        }
    }

    #[test]
    fn test_small_range_is_a_single_leaf() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sink = RecordingSink::new(0.125);
        let request = SampleRequest {
            start: 0.0,
            end: 1.0,
            duration: 1.0,
            range: 0.1,
        };

        let outcome = sample(request, PupilBounds { min: 0.0, max: 1.0 }, &mut rng, &mut sink);

        assert_eq!(outcome, SampleOutcome::Completed);
        assert_eq!(sink.max_depth, 0);
        assert_eq!(sink.samples.len(), 8);
        assert_eq!(sink.samples[0], 0.0);
        assert!(sink.samples.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_cancellation_unwinds_every_level() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut sink = RecordingSink::new(0.01);
        sink.cancel_after = Some(5);
        let request = SampleRequest {
            start: 0.2,
            end: 0.8,
            duration: 4.0,
            range: 1.0,
        };

        let outcome = sample(request, PupilBounds { min: 0.0, max: 1.0 }, &mut rng, &mut sink);

        assert_eq!(outcome, SampleOutcome::Cancelled);
        assert_eq!(sink.samples.len(), 5);
    }

    #[test]
    fn test_values_are_clamped() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sink = RecordingSink::new(0.05);
        let request = SampleRequest {
            start: -0.5,
            end: 1.5,
            duration: 1.0,
            range: 0.0,
        };

        sample(request, PupilBounds { min: 0.1, max: 0.9 }, &mut rng, &mut sink);
        assert!(sink.samples.iter().all(|v| (0.1..=0.9).contains(v)));
        assert_eq!(sink.samples[0], 0.1);
    }

    #[test]
    fn test_zero_duration_emits_nothing() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut sink = RecordingSink::new(0.05);
        let request = SampleRequest {
            start: 0.0,
            end: 1.0,
            duration: 0.0,
            range: 1.0,
        };

        let outcome = sample(request, PupilBounds { min: 0.0, max: 1.0 }, &mut rng, &mut sink);
        assert_eq!(outcome, SampleOutcome::Completed);
        assert!(sink.samples.is_empty());
    }
}
