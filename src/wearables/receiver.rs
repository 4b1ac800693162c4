use super::codec::{self, WearableMessage, WIRE_LEN};
use super::config::ChannelConfig;
use chrono::{DateTime, Local};
use socket2::{Domain, Protocol, Socket, Type};
use statum::{machine, state};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("Failed to bind multicast socket: {0}")]
    BindError(String),

    #[error("Failed to join multicast group: {0}")]
    JoinError(String),

    #[error("Failed to receive datagram: {0}")]
    ReceiveError(String),

    #[error("Message queue closed")]
    QueueClosed,
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Binding,
    Listening,
    Failed,
}

#[derive(Clone, Debug, Default)]
pub struct ReceiverStatus {
    pub connection_state: ConnectionState,
    pub error_messages: Vec<String>,
    pub messages_received: usize,
    pub malformed_dropped: usize,
    pub last_activity: Option<DateTime<Local>>,
}

const MAX_STATUS_ERRORS: usize = 8;

impl ReceiverStatus {
    fn record_error(&mut self, message: String) {
        if self.error_messages.len() == MAX_STATUS_ERRORS {
            self.error_messages.remove(0);
        }
        self.error_messages.push(message);
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum ReceiverState {
    Binding,
    Listening,
}

#[machine]
#[derive(Debug)]
pub struct MulticastReceiver<S: ReceiverState> {
    // Label used in logs ("wearables" / "sync")
    name: String,

    channel: ChannelConfig,

    // Bound socket, present once Listening
    socket: Option<UdpSocket>,

    // Decoded messages towards the animation loop
    message_sender: mpsc::Sender<WearableMessage>,

    status: watch::Sender<ReceiverStatus>,
}

impl<S: ReceiverState> MulticastReceiver<S> {
    fn update_status(&self, update: impl FnOnce(&mut ReceiverStatus)) {
        self.status.send_modify(update);
    }
}

impl MulticastReceiver<Binding> {
    pub fn create(
        name: &str,
        channel: ChannelConfig,
        message_sender: mpsc::Sender<WearableMessage>,
        status: watch::Sender<ReceiverStatus>,
    ) -> Self {
        debug!("Creating {} receiver for {}", name, channel.group_addr());
        Self::new(name.to_string(), channel, None, message_sender, status)
    }

    /// Bind the port on all interfaces and join the group
    pub async fn bind(mut self) -> Result<MulticastReceiver<Listening>, ReceiverError> {
        self.update_status(|s| s.connection_state = ConnectionState::Binding);

        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.channel.port));
        let socket = reusable_socket(bind_addr)
            .map_err(|e| ReceiverError::BindError(format!("{}: {}", bind_addr, e)))?;
        socket
            .join_multicast_v4(self.channel.group, Ipv4Addr::UNSPECIFIED)
            .map_err(|e| ReceiverError::JoinError(format!("{}: {}", self.channel.group, e)))?;

        info!(
            "{} receiver listening on {}",
            self.name,
            self.channel.group_addr()
        );
        self.socket = Some(socket);
        self.update_status(|s| s.connection_state = ConnectionState::Listening);
        Ok(self.transition())
    }
}

/// UDP socket with SO_REUSEADDR, so a paired eye or a debug listener on the
/// same host can bind the group port too
fn reusable_socket(bind_addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&bind_addr.into())?;
    UdpSocket::from_std(socket.into())
}

impl MulticastReceiver<Listening> {
    pub async fn run_receive_loop(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), ReceiverError> {
        let Some(socket) = self.socket.take() else {
            return Err(ReceiverError::BindError("socket missing".to_string()));
        };

        // One spare byte so oversized datagrams are seen as such
        let mut buf = [0u8; WIRE_LEN + 1];
        let mut received = 0usize;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(30);

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("{} receiver cancelled", self.name);
                    break Ok(());
                }
                recv = socket.recv_from(&mut buf) => {
                    match recv {
                        Ok((len, peer)) => {
                            if let Err(e) = self.handle_datagram(&buf[..len], peer) {
                                break Err(e);
                            }
                            received += 1;
                        }
                        Err(e) => break Err(ReceiverError::ReceiveError(e.to_string())),
                    }
                }
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "{} receiver stats: {} datagrams in last {} seconds",
                    self.name,
                    received,
                    log_interval.num_seconds()
                );
                received = 0;
                last_log_time = now;
            }
        };

        self.update_status(|s| s.connection_state = ConnectionState::Disconnected);
        result
    }

    fn handle_datagram(&mut self, datagram: &[u8], peer: SocketAddr) -> Result<(), ReceiverError> {
        let message = match codec::decode(datagram) {
            Ok(message) => message,
            Err(e) => {
                warn!("{} receiver dropped datagram from {}: {}", self.name, peer, e);
                self.update_status(|s| {
                    s.malformed_dropped += 1;
                    s.record_error(e.to_string());
                });
                return Ok(());
            }
        };

        debug!(
            "{} receiver got '{}' (code {:#x}) from {}",
            self.name, message.effect, message.msgcode, peer
        );
        self.update_status(|s| {
            s.messages_received += 1;
            s.last_activity = Some(Local::now());
        });

        match self.message_sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(
                    "{} queue full, dropping '{}'",
                    self.name, message.effect
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ReceiverError::QueueClosed),
        }
    }
}

/// Spawned receiver task plus its status feed
pub struct ReceiverHandle {
    status: watch::Receiver<ReceiverStatus>,
}

impl ReceiverHandle {
    pub fn spawn(
        name: &str,
        channel: ChannelConfig,
        rebind_interval: Duration,
        message_sender: mpsc::Sender<WearableMessage>,
        cancel: CancellationToken,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(ReceiverStatus::default());
        let name = name.to_string();

        info!("Spawning {} receiver task", name);
        tokio::spawn(async move {
            while !cancel.is_cancelled() {
                let receiver = MulticastReceiver::create(
                    &name,
                    channel.clone(),
                    message_sender.clone(),
                    status_tx.clone(),
                );

                match receiver.bind().await {
                    Ok(mut listening) => match listening.run_receive_loop(&cancel).await {
                        Ok(()) => break,
                        Err(ReceiverError::QueueClosed) => {
                            info!("{} receiver stopping, consumer gone", name);
                            break;
                        }
                        Err(e) => {
                            error!("{} receiver failed: {}", name, e);
                            status_tx.send_modify(|s| {
                                s.connection_state = ConnectionState::Failed;
                                s.record_error(e.to_string());
                            });
                        }
                    },
                    Err(e) => {
                        error!("{} receiver could not start: {}", name, e);
                        status_tx.send_modify(|s| {
                            s.connection_state = ConnectionState::Failed;
                            s.record_error(e.to_string());
                        });
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(rebind_interval) => {
                        info!("Retrying {} receiver", name);
                    }
                }
            }
            debug!("{} receiver task finished", name);
        });

        Self { status: status_rx }
    }

    pub fn status(&self) -> ReceiverStatus {
        self.status.borrow().clone()
    }
}
