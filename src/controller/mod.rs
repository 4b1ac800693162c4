//! Local input device handling
//!
//! 1. [`event_collector`] - gilrs polling, raw device events
//! 2. [`device_handle`] - blocking task, reconnect backoff
//!
//! ```text
//! Gamepad ──► Collector ──► mpsc ──► DeviceInput (mapping::feeds)
//! ```

pub mod device_handle;
pub mod event_collector;

pub use device_handle::DeviceHandle;
pub use event_collector::{
    ButtonState, ButtonType, CollectorError, CollectorSettings, HatDirection, RawDeviceEvent,
    RetryBackoff, StickAxis,
};
