//! Raw input → canonical events
//!
//! Each source (gamepad, wearables multicast, inter-eye sync) gets a
//! normalizer that reduces its raw records to [`CanonicalEvent`]s. The
//! animation loop drains the resulting feeds once per tick.

pub mod error;
pub mod events;
pub mod feeds;
pub mod joystick;
pub mod normalizer;
pub mod wearable;

pub use error::MappingError;
pub use events::{CanonicalEvent, EventSource, GazeDirection, ProfileId};
pub use feeds::{ChannelFeed, DeviceInput, InputFeed, NetworkInput};
pub use joystick::{ButtonAction, ButtonBinding, DeviceNormalizer};
pub use normalizer::EventNormalizer;
pub use wearable::WearableNormalizer;
