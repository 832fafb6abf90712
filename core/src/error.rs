//! Error types for the timer protocol and its WebSocket framing
//!
//! None of these are fatal: the offending frame is dropped and the previous
//! state stays in effect.

/// Timer protocol decode/encode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Not valid JSON, or a field has the wrong shape
    Malformed,
    /// `type` is not one the display understands
    UnknownType,
    /// Timer carries more segments than the display can hold
    TooManySegments,
    /// Output buffer too small for the encoded message
    BufferTooSmall,
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed => write!(f, "Malformed message"),
            Self::UnknownType => write!(f, "Unknown message type"),
            Self::TooManySegments => write!(f, "Too many segments"),
            Self::BufferTooSmall => write!(f, "Buffer too small"),
        }
    }
}

impl core::error::Error for ProtocolError {}

/// WebSocket framing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WsError {
    /// Server answered the upgrade with something other than 101
    HandshakeRejected,
    /// Upgrade response header does not fit the receive buffer
    HandshakeTooLarge,
    /// Servers must not mask frames (RFC 6455 §5.1)
    MaskedServerFrame,
    /// Payload length does not fit in memory
    UnsupportedLength,
    /// Output buffer too small for the frame
    BufferTooSmall,
}

impl core::fmt::Display for WsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HandshakeRejected => write!(f, "WebSocket handshake rejected"),
            Self::HandshakeTooLarge => write!(f, "WebSocket handshake too large"),
            Self::MaskedServerFrame => write!(f, "Masked frame from server"),
            Self::UnsupportedLength => write!(f, "Unsupported frame length"),
            Self::BufferTooSmall => write!(f, "Buffer too small"),
        }
    }
}

impl core::error::Error for WsError {}
