#![deny(unsafe_code)]
#![deny(warnings)]
//! Network configuration structures

use crate::device_id;

/// Timer server connection configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host name or dotted IPv4 address
    pub host: &'static str,
    pub port: u16,
    /// WebSocket endpoint path
    pub path: &'static str,
    /// Timer to subscribe to; spaces are ignored by the server handshake
    pub timer_id: &'static str,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Pause between a dropped connection and the next attempt
    pub reconnect_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "timer.itsblue.de",
            port: 80,
            path: "/api/ws",
            // Set TIMER_ID at build time to pick a timer; otherwise the
            // chip UID is announced and the server answers with an error
            // until a timer with that id exists.
            timer_id: option_env!("TIMER_ID").unwrap_or_else(device_id::uid_hex),
            connect_timeout_ms: 5000,
            reconnect_delay_ms: 2000,
        }
    }
}

/// Network stack configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// MAC address for Ethernet
    pub mac_addr: [u8; 6],
    /// Random seed for network stack
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac_addr: device_id::mac_address(),
            seed: device_id::stack_seed(),
        }
    }
}
