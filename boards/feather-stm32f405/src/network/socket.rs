#![deny(unsafe_code)]
#![deny(warnings)]
//! Async TCP socket wrapper
//!
//! Wraps `embassy_net::tcp::TcpSocket` behind the `embedded-io-async` traits
//! with [`NetworkError`] as the error type, so the WebSocket layer never sees
//! embassy-net error types.

use embassy_net::tcp::{TcpReader, TcpSocket, TcpWriter};
use embassy_net::{IpEndpoint, Stack};
use embedded_io_async::{ErrorType, Read, Write};

use super::error::NetworkError;

/// Async TCP socket wrapper implementing embedded-io-async traits
pub struct AsyncTcpSocket<'a> {
    socket: TcpSocket<'a>,
}

impl<'a> AsyncTcpSocket<'a> {
    /// Create a new async TCP socket over caller-owned buffers
    pub fn new(stack: Stack<'a>, rx_buffer: &'a mut [u8], tx_buffer: &'a mut [u8]) -> Self {
        Self {
            socket: TcpSocket::new(stack, rx_buffer, tx_buffer),
        }
    }

    /// Connect to a remote endpoint
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::SocketError` if connection fails
    pub async fn connect(&mut self, endpoint: IpEndpoint) -> Result<(), NetworkError> {
        self.socket
            .connect(endpoint)
            .await
            .map_err(|_| NetworkError::SocketError)
    }

    /// Split into halves that can be driven concurrently
    pub fn split(&mut self) -> (SocketReader<'_>, SocketWriter<'_>) {
        let (reader, writer) = self.socket.split();
        (SocketReader(reader), SocketWriter(writer))
    }

    /// Reset the connection without the FIN handshake
    pub fn abort(&mut self) {
        self.socket.abort();
    }
}

/// Read half of a split [`AsyncTcpSocket`]
pub struct SocketReader<'a>(TcpReader<'a>);

/// Write half of a split [`AsyncTcpSocket`]
pub struct SocketWriter<'a>(TcpWriter<'a>);

/// Error type for embedded-io-async traits
///
/// We use NetworkError as our error type to maintain consistency
/// with the rest of the network module.
impl ErrorType for AsyncTcpSocket<'_> {
    type Error = NetworkError;
}

impl ErrorType for SocketReader<'_> {
    type Error = NetworkError;
}

impl ErrorType for SocketWriter<'_> {
    type Error = NetworkError;
}

/// Async read for the WebSocket upgrade, before the socket is split
impl Read for AsyncTcpSocket<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket
            .read(buf)
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}

/// Async write for the WebSocket upgrade, before the socket is split
impl Write for AsyncTcpSocket<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket
            .write(buf)
            .await
            .map_err(|_| NetworkError::SocketError)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket
            .flush()
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}

impl Read for SocketReader<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.read(buf).await.map_err(|_| NetworkError::SocketError)
    }
}

impl Write for SocketWriter<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).await.map_err(|_| NetworkError::SocketError)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush().await.map_err(|_| NetworkError::SocketError)
    }
}
