use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddrV4};

/// One multicast group the eye listens on (or publishes to)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    pub enabled: bool,
}

impl ChannelConfig {
    pub fn wearables() -> Self {
        Self {
            group: Ipv4Addr::new(239, 255, 223, 1),
            port: 0xDF0D,
            enabled: true,
        }
    }

    pub fn sync() -> Self {
        Self {
            group: Ipv4Addr::new(239, 255, 223, 2),
            port: 0xDF0E,
            enabled: true,
        }
    }

    pub fn group_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.group, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub wearables: ChannelConfig,
    pub sync: ChannelConfig,
    /// Publish gaze moves from the local device to the sync group
    pub publish_sync: bool,
    /// Capacity of the mpsc queue between receivers and the animation loop
    pub queue_capacity: usize,
    pub rebind_interval_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wearables: ChannelConfig::wearables(),
            sync: ChannelConfig::sync(),
            publish_sync: false,
            queue_capacity: 64,
            rebind_interval_secs: 5,
        }
    }
}
