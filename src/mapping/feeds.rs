//! Non-blocking input feeds drained by the animation loop once per tick

use crate::controller::RawDeviceEvent;
use crate::mapping::events::{CanonicalEvent, EventSource};
use crate::mapping::joystick::DeviceNormalizer;
use crate::mapping::normalizer::EventNormalizer;
use crate::mapping::wearable::WearableNormalizer;
use crate::wearables::WearableMessage;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{info, warn};

/// Upper bound on raw records taken from one feed per tick
const MAX_DRAIN_PER_TICK: usize = 64;

pub trait InputFeed {
    fn source(&self) -> EventSource;

    /// Append everything currently available; never waits
    fn poll(&mut self, out: &mut Vec<CanonicalEvent>);
}

/// mpsc receiver plus the normalizer for its raw record type
pub struct ChannelFeed<N: EventNormalizer> {
    receiver: mpsc::Receiver<N::Input>,
    normalizer: N,
    closed: bool,
    processed: usize,
}

impl<N: EventNormalizer> ChannelFeed<N> {
    pub fn new(receiver: mpsc::Receiver<N::Input>, normalizer: N) -> Self {
        Self {
            receiver,
            normalizer,
            closed: false,
            processed: 0,
        }
    }
}

impl<N: EventNormalizer> InputFeed for ChannelFeed<N> {
    fn source(&self) -> EventSource {
        self.normalizer.source()
    }

    fn poll(&mut self, out: &mut Vec<CanonicalEvent>) {
        if self.closed {
            return;
        }

        for _ in 0..MAX_DRAIN_PER_TICK {
            match self.receiver.try_recv() {
                Ok(raw) => {
                    self.normalizer.normalize(&raw, out);
                    self.processed += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!(
                        "{:?} feed closed after {} records, continuing without it",
                        self.normalizer.source(),
                        self.processed
                    );
                    self.normalizer.reset();
                    self.closed = true;
                    break;
                }
            }
        }
    }
}

pub type DeviceInput = ChannelFeed<DeviceNormalizer>;
pub type NetworkInput = ChannelFeed<WearableNormalizer>;

impl DeviceInput {
    pub fn device(receiver: mpsc::Receiver<RawDeviceEvent>, normalizer: DeviceNormalizer) -> Self {
        info!("Device feed attached");
        ChannelFeed::new(receiver, normalizer)
    }
}

impl NetworkInput {
    pub fn network(receiver: mpsc::Receiver<WearableMessage>) -> Self {
        info!("Network feed attached");
        ChannelFeed::new(receiver, WearableNormalizer::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::events::GazeDirection;

    fn message(effect: &str) -> WearableMessage {
        WearableMessage::sync(effect, 0)
    }

    #[test]
    fn test_poll_drains_without_waiting() {
        let (tx, rx) = mpsc::channel(8);
        let mut feed = NetworkInput::network(rx);
        let mut out = Vec::new();

        feed.poll(&mut out);
        assert!(out.is_empty());

        tx.try_send(message("flame")).unwrap();
        tx.try_send(message("eye_up")).unwrap();
        feed.poll(&mut out);
        assert_eq!(
            out,
            vec![
                CanonicalEvent::Gaze(GazeDirection::Down),
                CanonicalEvent::Gaze(GazeDirection::SouthWest),
                CanonicalEvent::Gaze(GazeDirection::Up)
            ]
        );
        assert_eq!(feed.processed, 2);
    }

    #[test]
    fn test_dropped_sender_closes_feed() {
        let (tx, rx) = mpsc::channel::<WearableMessage>(8);
        let mut feed = NetworkInput::network(rx);
        drop(tx);

        let mut out = Vec::new();
        feed.poll(&mut out);
        assert!(feed.closed);
        assert_eq!(feed.source(), EventSource::Network);
    }
}
