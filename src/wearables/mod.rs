//! # Wearables network feed
//!
//! Companion wearables broadcast their current light effect as a fixed
//! 42-byte datagram on a UDP multicast group. The same layout is reused on a
//! second group so a pair of eyes can mirror each other's gaze.
//!
//! ```text
//! wearables/
//! ├── codec.rs      - datagram layout, decode / encode
//! ├── config.rs     - multicast group settings
//! ├── effects.rs    - effect name → gaze directions
//! ├── publisher.rs  - inter-eye sync sender
//! └── receiver.rs   - multicast receive task (Binding → Listening)
//! ```

pub mod codec;
pub mod config;
pub mod effects;
pub mod publisher;
pub mod receiver;

pub use codec::{decode, encode, DecodeError, WearableMessage, SYNC_MSGCODE, WIRE_LEN};
pub use config::{ChannelConfig, NetworkConfig};
pub use effects::{effect_directions, effect_events};
pub use publisher::SyncPublisher;
pub use receiver::{ReceiverError, ReceiverHandle, ReceiverStatus};
