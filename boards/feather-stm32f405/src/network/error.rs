#![deny(unsafe_code)]
#![deny(warnings)]
//! Network client error types

use defmt::Format;
use timer_core::error::WsError;

/// Network client operation errors
#[derive(Debug, Clone, Copy, Format)]
pub enum NetworkError {
    /// DNS resolution failed
    DnsError,
    /// Socket bind/connect/read/write error
    SocketError,
    /// Connect or handshake timeout
    Timeout,
    /// WebSocket upgrade failed
    HandshakeFailed(WsError),
    /// Peer closed the connection
    ConnectionClosed,
    /// Inbound frame larger than the frame buffer
    FrameTooLarge,
    /// Server broke WebSocket framing rules
    Protocol(WsError),
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::SocketError => write!(f, "Socket error"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::HandshakeFailed(e) => write!(f, "Handshake failed: {}", e),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::FrameTooLarge => write!(f, "Frame too large"),
            Self::Protocol(e) => write!(f, "Protocol error: {}", e),
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for NetworkError {}

impl From<WsError> for NetworkError {
    fn from(e: WsError) -> Self {
        match e {
            WsError::UnsupportedLength | WsError::BufferTooSmall => Self::FrameTooLarge,
            other => Self::Protocol(other),
        }
    }
}

impl embedded_io_async::Error for NetworkError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::SocketError | Self::ConnectionClosed => embedded_io_async::ErrorKind::BrokenPipe,
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            Self::HandshakeFailed(_) | Self::FrameTooLarge | Self::Protocol(_) => {
                embedded_io_async::ErrorKind::InvalidData
            }
            Self::DnsError => embedded_io_async::ErrorKind::Other,
        }
    }
}
