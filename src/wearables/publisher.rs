use super::codec::{encode, WearableMessage};
use super::config::ChannelConfig;
use crate::mapping::events::GazeDirection;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Sends locally applied gaze moves to the other eye over the sync group
pub struct SyncPublisher {
    socket: UdpSocket,
    target: SocketAddr,
    started: Instant,
    sent: usize,
}

impl SyncPublisher {
    pub async fn bind(channel: &ChannelConfig) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
        socket.set_multicast_loop_v4(false)?;
        socket.set_multicast_ttl_v4(1)?;
        info!("Sync publisher sending to {}", channel.group_addr());

        Ok(Self {
            socket,
            target: SocketAddr::V4(channel.group_addr()),
            started: Instant::now(),
            sent: 0,
        })
    }

    pub async fn publish(&mut self, direction: GazeDirection) -> Result<(), std::io::Error> {
        let elapsed_ms = self.started.elapsed().as_millis() as u32;
        let message = WearableMessage::sync(direction.as_str(), elapsed_ms);
        let bytes = encode(&message)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        self.socket.send_to(&bytes, self.target).await?;
        self.sent += 1;
        debug!("Published {} to sync group ({} total)", direction.as_str(), self.sent);
        Ok(())
    }

    /// Spawn the publishing task; returns the sender the animation loop feeds
    pub fn spawn(
        channel: ChannelConfig,
        capacity: usize,
        cancel: CancellationToken,
    ) -> mpsc::Sender<GazeDirection> {
        let (tx, mut rx) = mpsc::channel::<GazeDirection>(capacity);

        tokio::spawn(async move {
            let mut publisher = match SyncPublisher::bind(&channel).await {
                Ok(publisher) => publisher,
                Err(e) => {
                    error!("Sync publisher disabled, bind failed: {}", e);
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = rx.recv() => match next {
                        Some(direction) => {
                            if let Err(e) = publisher.publish(direction).await {
                                warn!("Failed to publish sync message: {}", e);
                            }
                        }
                        None => break,
                    }
                }
            }
            info!("Sync publisher stopped after {} messages", publisher.sent);
        });

        tx
    }
}
