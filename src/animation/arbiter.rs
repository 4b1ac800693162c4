//! Per-tick merge of canonical events from every source
//!
//! Events are staged as feeds are polled, then committed once per tick in
//! source-priority order. Gaze requests queue up; pupil and context requests
//! collapse into single slots; blink toggles a held flag.

use crate::mapping::events::{CanonicalEvent, EventSource, GazeDirection, ProfileId};
use std::collections::VecDeque;
use tracing::{debug, warn};

pub const DEFAULT_GAZE_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GazeCommand {
    pub direction: GazeDirection,
    pub source: EventSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PupilRequest {
    Widen,
    Narrow,
}

impl PupilRequest {
    pub fn target(&self, min: f64, max: f64) -> f64 {
        match self {
            PupilRequest::Widen => max,
            PupilRequest::Narrow => min,
        }
    }
}

#[derive(Debug)]
pub struct EventArbiter {
    staged: Vec<(EventSource, CanonicalEvent)>,
    gaze_queue: VecDeque<GazeCommand>,
    gaze_capacity: usize,
    pupil: Option<PupilRequest>,
    context: Option<ProfileId>,
    blink_held: bool,
    committed: usize,
    dropped: usize,
}

impl EventArbiter {
    pub fn new(gaze_capacity: usize) -> Self {
        Self {
            staged: Vec::new(),
            gaze_queue: VecDeque::with_capacity(gaze_capacity),
            gaze_capacity: gaze_capacity.max(1),
            pupil: None,
            context: None,
            blink_held: false,
            committed: 0,
            dropped: 0,
        }
    }

    pub fn stage<I>(&mut self, source: EventSource, events: I)
    where
        I: IntoIterator<Item = CanonicalEvent>,
    {
        self.staged
            .extend(events.into_iter().map(|event| (source, event)));
    }

    /// Apply everything staged this tick; returns the number of events seen
    pub fn commit_tick(&mut self) -> usize {
        if self.staged.is_empty() {
            return 0;
        }

        // Stable: arrival order is kept within a source
        self.staged.sort_by_key(|(source, _)| source.rank());

        let mut pupil_rank: Option<usize> = None;
        let mut context_rank: Option<usize> = None;
        let count = self.staged.len();

        for (source, event) in std::mem::take(&mut self.staged) {
            let rank = source.rank();
            match event {
                CanonicalEvent::Gaze(direction) => self.push_gaze(direction, source),
                CanonicalEvent::PupilWiden | CanonicalEvent::PupilNarrow => {
                    if pupil_rank.map_or(true, |held| rank <= held) {
                        self.pupil = Some(if event == CanonicalEvent::PupilWiden {
                            PupilRequest::Widen
                        } else {
                            PupilRequest::Narrow
                        });
                        pupil_rank = Some(rank);
                    } else {
                        debug!("{:?} pupil request outranked this tick", source);
                    }
                }
                CanonicalEvent::BlinkToggle => {
                    self.blink_held = !self.blink_held;
                    debug!("Blink held: {}", self.blink_held);
                }
                CanonicalEvent::ContextSwitch(profile) => {
                    if context_rank.map_or(true, |held| rank <= held) {
                        self.context = Some(profile);
                        context_rank = Some(rank);
                    } else {
                        debug!("{:?} context request outranked this tick", source);
                    }
                }
            }
        }

        self.committed += count;
        count
    }

    fn push_gaze(&mut self, direction: GazeDirection, source: EventSource) {
        if self.gaze_queue.back().map(|pending| pending.direction) == Some(direction) {
            debug!("Dropping repeated gaze {:?}", direction);
            return;
        }
        if self.gaze_queue.len() >= self.gaze_capacity {
            warn!(
                "Gaze queue full ({}), discarding {:?} from {:?}",
                self.gaze_capacity, direction, source
            );
            self.dropped += 1;
            return;
        }
        self.gaze_queue.push_back(GazeCommand { direction, source });
    }

    pub fn next_gaze(&mut self) -> Option<GazeCommand> {
        self.gaze_queue.pop_front()
    }

    pub fn take_pupil(&mut self) -> Option<PupilRequest> {
        self.pupil.take()
    }

    pub fn take_context(&mut self) -> Option<ProfileId> {
        self.context.take()
    }

    pub fn has_pending_pupil(&self) -> bool {
        self.pupil.is_some()
    }

    pub fn has_pending_context(&self) -> bool {
        self.context.is_some()
    }

    /// A running pupil sample must stop for a pupil or context request
    pub fn should_interrupt(&self) -> bool {
        self.has_pending_pupil() || self.has_pending_context()
    }

    pub fn blink_held(&self) -> bool {
        self.blink_held
    }

    pub fn pending_gaze(&self) -> usize {
        self.gaze_queue.len()
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Forget queued requests, keep the held flag (it mirrors a physical button)
    pub fn clear_pending(&mut self) {
        self.staged.clear();
        self.gaze_queue.clear();
        self.pupil = None;
        self.context = None;
    }
}

impl Default for EventArbiter {
    fn default() -> Self {
        Self::new(DEFAULT_GAZE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GazeDirection::*;

    #[test]
    fn test_device_gaze_precedes_network_in_same_tick() {
        let mut arbiter = EventArbiter::default();
        arbiter.stage(EventSource::Network, [CanonicalEvent::Gaze(Right)]);
        arbiter.stage(EventSource::Device, [CanonicalEvent::Gaze(Left)]);
        arbiter.commit_tick();

        assert_eq!(
            arbiter.next_gaze(),
            Some(GazeCommand {
                direction: Left,
                source: EventSource::Device
            })
        );
        assert_eq!(arbiter.next_gaze().map(|c| c.direction), Some(Right));
        assert_eq!(arbiter.next_gaze(), None);
    }

    #[test]
    fn test_arrival_order_kept_within_source() {
        let mut arbiter = EventArbiter::default();
        arbiter.stage(
            EventSource::Network,
            [CanonicalEvent::Gaze(Down), CanonicalEvent::Gaze(SouthWest)],
        );
        arbiter.commit_tick();

        assert_eq!(arbiter.next_gaze().map(|c| c.direction), Some(Down));
        assert_eq!(arbiter.next_gaze().map(|c| c.direction), Some(SouthWest));
    }

    #[test]
    fn test_consecutive_duplicates_collapse() {
        let mut arbiter = EventArbiter::default();
        arbiter.stage(
            EventSource::Network,
            [
                CanonicalEvent::Gaze(Up),
                CanonicalEvent::Gaze(Up),
                CanonicalEvent::Gaze(Left),
                CanonicalEvent::Gaze(Up),
            ],
        );
        arbiter.commit_tick();
        assert_eq!(arbiter.pending_gaze(), 3);
    }

    #[test]
    fn test_gaze_queue_is_bounded() {
        let mut arbiter = EventArbiter::new(2);
        arbiter.stage(
            EventSource::Network,
            [
                CanonicalEvent::Gaze(Up),
                CanonicalEvent::Gaze(Down),
                CanonicalEvent::Gaze(Left),
            ],
        );
        arbiter.commit_tick();
        assert_eq!(arbiter.pending_gaze(), 2);
        assert_eq!(arbiter.dropped(), 1);
    }

    #[test]
    fn test_latest_pupil_request_wins_across_ticks() {
        let mut arbiter = EventArbiter::default();
        arbiter.stage(EventSource::Device, [CanonicalEvent::PupilWiden]);
        arbiter.commit_tick();
        arbiter.stage(EventSource::Network, [CanonicalEvent::PupilNarrow]);
        arbiter.commit_tick();

        assert!(arbiter.should_interrupt());
        assert_eq!(arbiter.take_pupil(), Some(PupilRequest::Narrow));
        assert_eq!(arbiter.take_pupil(), None);
    }

    #[test]
    fn test_network_cannot_override_device_within_tick() {
        let mut arbiter = EventArbiter::default();
        arbiter.stage(
            EventSource::Network,
            [
                CanonicalEvent::PupilNarrow,
                CanonicalEvent::ContextSwitch(ProfileId::Hack),
            ],
        );
        arbiter.stage(
            EventSource::Device,
            [
                CanonicalEvent::PupilWiden,
                CanonicalEvent::ContextSwitch(ProfileId::Cyclops),
            ],
        );
        arbiter.commit_tick();

        assert_eq!(arbiter.take_pupil(), Some(PupilRequest::Widen));
        assert_eq!(arbiter.take_context(), Some(ProfileId::Cyclops));
    }

    #[test]
    fn test_blink_toggles_held_flag() {
        let mut arbiter = EventArbiter::default();
        arbiter.stage(EventSource::Device, [CanonicalEvent::BlinkToggle]);
        arbiter.commit_tick();
        assert!(arbiter.blink_held());

        arbiter.stage(EventSource::Device, [CanonicalEvent::BlinkToggle]);
        arbiter.commit_tick();
        assert!(!arbiter.blink_held());
    }

    #[test]
    fn test_pupil_targets() {
        assert_eq!(PupilRequest::Widen.target(0.0, 1.0), 1.0);
        assert_eq!(PupilRequest::Narrow.target(0.2, 1.0), 0.2);
    }
}
