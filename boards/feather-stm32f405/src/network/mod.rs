#![deny(warnings)]
//! Network module with trait-based client architecture
//!
//! This module provides the path from the W5500 to the timer server:
//! - **`client`**: `NetworkClient` trait for protocol implementations
//! - **`config`**: Configuration structs with `Default` implementations
//! - **`error`**: Simple error enum for network operations
//! - **`manager`**: W5500/embassy-net stack initialization and DHCP wait
//! - **`socket`**: Async TCP socket wrapper for embedded-io-async
//! - **`websocket`**: WebSocket upgrade and frame transport
//! - **`timer_client`**: Timer server client implementing `NetworkClient`
//!
//! ## Init-Inside-Task
//!
//! Raw peripherals (Send) are passed to the RTIC network task; the stack,
//! runners and drivers (!Send) are constructed inside it and never leave.
//! The only things shared with other tasks are `timer_core::SharedState`
//! and [`INBOUND_FRAMES`].

pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod socket;
pub mod timer_client;
pub mod websocket;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use websocket::WsEvent;

pub use client::NetworkClient;
pub use config::{NetworkConfig, ServerConfig};
pub use timer_client::TimerClient;

/// Decoded frames from the reader loop to the handler loop
///
/// Using CriticalSectionRawMutex makes it safe across all RTIC priorities.
/// Text frames are large, so the queue is kept short; when it is full the
/// reader waits for the handler to catch up.
pub static INBOUND_FRAMES: Channel<CriticalSectionRawMutex, WsEvent, 2> = Channel::new();
