//! Device Handle - lifecycle of the gamepad collector
//!
//! Runs the collector on a blocking tokio task because gilrs polling is
//! synchronous. A failed `Gilrs::new` is retried on the collector's fixed
//! backoff; meanwhile the animation loop keeps running on autonomous input.

use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use super::event_collector::{
    ButtonState, ButtonType, CollectorError, CollectorSettings, EventCollector, HatDirection,
    RawDeviceEvent, RetryBackoff, StickAxis,
};

/// Handle for the spawned device collector
///
/// ```text
/// gilrs ─► EventCollector ─[RawDeviceEvent]─► DeviceInput (animation loop)
///          (spawn_blocking)  mpsc::channel
/// ```
pub struct DeviceHandle {
    task: JoinHandle<()>,
}

impl DeviceHandle {
    pub fn spawn(
        settings: CollectorSettings,
        sender: mpsc::Sender<RawDeviceEvent>,
        cancel: CancellationToken,
    ) -> Self {
        info!("Spawning device collector with settings: {:?}", settings);

        let task = tokio::task::spawn_blocking(move || {
            let mut backoff = RetryBackoff::new(settings.retry_interval);

            while !cancel.is_cancelled() {
                if !backoff.ready(Instant::now()) {
                    std::thread::sleep(Duration::from_millis(50));
                    continue;
                }

                let collector = match EventCollector::create(Some(settings.clone()), sender.clone())
                {
                    Ok(collector) => collector,
                    Err(e) => {
                        warn!(
                            "Device collector unavailable ({}), retrying in {:?}",
                            e,
                            backoff.interval()
                        );
                        continue;
                    }
                };

                let result = collector
                    .initialize()
                    .and_then(|mut collecting| collecting.run_collection_loop(&cancel));
                match result {
                    Ok(()) => break,
                    Err(CollectorError::EventSendError(e)) => {
                        info!("Device collector stopping: {}", e);
                        break;
                    }
                    Err(e) => error!("Device collector failed: {}", e),
                }
            }
            debug!("Device collector task finished");
        });

        Self { task }
    }

    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Device collector task panicked: {}", e);
        }
    }
}
