use crate::mapping::events::{CanonicalEvent, EventSource};
use crate::mapping::normalizer::EventNormalizer;
use crate::wearables::{effect_events, WearableMessage, SYNC_MSGCODE};
use tracing::{debug, warn};

/// Maps decoded wearables/sync datagrams onto canonical events
#[derive(Debug, Default)]
pub struct WearableNormalizer {
    unmapped: usize,
}

impl EventNormalizer for WearableNormalizer {
    type Input = WearableMessage;

    fn normalize(&mut self, input: &WearableMessage, out: &mut Vec<CanonicalEvent>) {
        match effect_events(&input.effect) {
            Ok(events) => {
                debug!(
                    "{} '{}' -> {:?}",
                    if input.msgcode == SYNC_MSGCODE {
                        "sync"
                    } else {
                        "wearable"
                    },
                    input.effect,
                    events
                );
                out.extend(events);
            }
            Err(e) => {
                self.unmapped += 1;
                warn!("{} ({} unmapped so far)", e, self.unmapped);
            }
        }
    }

    fn source(&self) -> EventSource {
        EventSource::Network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::events::GazeDirection;

    fn message(effect: &str) -> WearableMessage {
        WearableMessage {
            msgcode: 1,
            effect: effect.to_string(),
            elapsed_ms: 0,
            beat_count: 0,
            hue_median: 0,
            hue_deviation: 0,
        }
    }

    #[test]
    fn test_rider_sweeps_left_then_right() {
        let mut normalizer = WearableNormalizer::default();
        let mut out = Vec::new();
        normalizer.normalize(&message("rider"), &mut out);
        assert_eq!(
            out,
            vec![
                CanonicalEvent::Gaze(GazeDirection::Left),
                CanonicalEvent::Gaze(GazeDirection::Right)
            ]
        );
    }

    #[test]
    fn test_unknown_effect_yields_nothing() {
        let mut normalizer = WearableNormalizer::default();
        let mut out = Vec::new();
        normalizer.normalize(&message("sparkle"), &mut out);
        assert!(out.is_empty());
        assert_eq!(normalizer.unmapped, 1);
    }
}
