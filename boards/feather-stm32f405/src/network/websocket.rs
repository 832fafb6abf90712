#![deny(unsafe_code)]
#![deny(warnings)]
//! WebSocket transport over the split TCP socket
//!
//! Framing lives in `timer_core::ws`; this module only moves bytes. The
//! upgrade runs on the whole socket, then [`FrameReader`] and [`FrameWriter`]
//! each own one half so reading and writing can proceed concurrently.

use defmt::{debug, warn};
use embedded_io_async::{Read, Write};
use hal_abstractions::MonotonicClock;
use heapless::Vec;
use rand_core::RngCore;
use timer_core::error::WsError;
use timer_core::ws::{self, Frame, Opcode};

use super::config::ServerConfig;
use super::error::NetworkError;
use crate::time::Uptime;

/// Largest text frame accepted from the server. Longer frames are skipped.
pub const MAX_TEXT_FRAME: usize = 4096;

/// Receive buffer: one full frame plus its largest header
pub const RX_CAPACITY: usize = MAX_TEXT_FRAME + 10;

/// Control frame payloads are at most 125 bytes (RFC 6455 §5.5)
const MAX_CONTROL_PAYLOAD: usize = 125;

/// Transmit buffer: outbound messages are small JSON objects
const TX_CAPACITY: usize = 256;

/// Something the reader saw that the handler must act on
pub enum WsEvent {
    /// Complete text frame and the local time it finished arriving
    Text {
        payload: Vec<u8, MAX_TEXT_FRAME>,
        received_at: u64,
    },
    Ping(Vec<u8, MAX_CONTROL_PAYLOAD>),
    Closed,
}

/// Fresh `Sec-WebSocket-Key` from the RNG
pub fn new_key<R: RngCore>(rng: &mut R) -> ws::Key {
    let mut nonce = [0u8; 16];
    rng.fill_bytes(&mut nonce);
    ws::encode_key(&nonce)
}

/// Send the upgrade request and wait for `101 Switching Protocols`.
///
/// On success, bytes the server sent after the response header are moved
/// to the front of `buf` and their count is returned.
pub async fn handshake<S>(
    socket: &mut S,
    server: &ServerConfig,
    key: &str,
    buf: &mut [u8],
) -> Result<usize, NetworkError>
where
    S: Read<Error = NetworkError> + Write<Error = NetworkError>,
{
    let request = ws::client_handshake(server.host, server.port, server.path, key)
        .map_err(NetworkError::HandshakeFailed)?;
    socket.write_all(request.as_bytes()).await?;
    socket.flush().await?;

    let mut filled = 0;
    loop {
        if let Some(header_len) =
            ws::parse_handshake_response(&buf[..filled]).map_err(NetworkError::HandshakeFailed)?
        {
            buf.copy_within(header_len..filled, 0);
            return Ok(filled - header_len);
        }
        if filled == buf.len() {
            return Err(NetworkError::HandshakeFailed(WsError::HandshakeTooLarge));
        }

        let n = socket.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(NetworkError::ConnectionClosed);
        }
        filled += n;
    }
}

/// Turns the byte stream into [`WsEvent`]s
pub struct FrameReader<'b, R> {
    inner: R,
    buf: &'b mut [u8],
    filled: usize,
    /// Bytes of an oversized frame still to be read and thrown away
    skip: usize,
}

impl<'b, R: Read<Error = NetworkError>> FrameReader<'b, R> {
    /// `buf[..filled]` holds bytes already received after the handshake
    pub fn new(inner: R, buf: &'b mut [u8], filled: usize) -> Self {
        Self {
            inner,
            buf,
            filled,
            skip: 0,
        }
    }

    pub async fn next_event(&mut self) -> Result<WsEvent, NetworkError> {
        loop {
            if self.skip > 0 {
                self.discard().await?;
                continue;
            }
            if let Some(frame) = ws::decode_frame(&self.buf[..self.filled])? {
                let event = self.event_for(&frame);
                self.consume(frame.consumed);
                match event {
                    Some(event) => return Ok(event),
                    None => continue,
                }
            }
            if self.filled == self.buf.len() {
                self.start_skip()?;
                continue;
            }
            self.fill().await?;
        }
    }

    fn event_for(&self, frame: &Frame) -> Option<WsEvent> {
        let payload = &self.buf[frame.payload.clone()];
        match frame.opcode {
            Opcode::Text if frame.fin => match Vec::from_slice(payload) {
                Ok(payload) => Some(WsEvent::Text {
                    payload,
                    received_at: Uptime.now_ms(),
                }),
                Err(()) => {
                    warn!("Dropping {} byte text frame", payload.len());
                    None
                }
            },
            Opcode::Text | Opcode::Continuation => {
                warn!("Dropping fragmented frame ({} bytes)", payload.len());
                None
            }
            Opcode::Ping => match Vec::from_slice(payload) {
                Ok(payload) => Some(WsEvent::Ping(payload)),
                Err(()) => {
                    warn!("Ignoring {} byte ping", payload.len());
                    None
                }
            },
            Opcode::Close => Some(WsEvent::Closed),
            Opcode::Pong => None,
            other => {
                debug!("Ignoring {} frame", other);
                None
            }
        }
    }

    /// The buffer is full and still holds no complete frame: drop what is
    /// buffered and read past the rest of that frame.
    fn start_skip(&mut self) -> Result<(), NetworkError> {
        let header = ws::decode_header(&self.buf[..self.filled])?
            .ok_or(NetworkError::FrameTooLarge)?;
        warn!(
            "Skipping {} byte {} frame",
            header.frame_len - header.header_len,
            header.opcode
        );
        self.skip = header.frame_len - self.filled;
        self.filled = 0;
        Ok(())
    }

    async fn discard(&mut self) -> Result<(), NetworkError> {
        let want = self.skip.min(self.buf.len());
        let n = self.inner.read(&mut self.buf[..want]).await?;
        if n == 0 {
            return Err(NetworkError::ConnectionClosed);
        }
        self.skip -= n;
        Ok(())
    }

    async fn fill(&mut self) -> Result<(), NetworkError> {
        let n = self.inner.read(&mut self.buf[self.filled..]).await?;
        if n == 0 {
            return Err(NetworkError::ConnectionClosed);
        }
        self.filled += n;
        Ok(())
    }

    fn consume(&mut self, n: usize) {
        self.buf.copy_within(n..self.filled, 0);
        self.filled -= n;
    }
}

/// Sends masked client frames
pub struct FrameWriter<'r, W, G> {
    inner: W,
    rng: &'r mut G,
    buf: [u8; TX_CAPACITY],
}

impl<'r, W: Write<Error = NetworkError>, G: RngCore> FrameWriter<'r, W, G> {
    pub fn new(inner: W, rng: &'r mut G) -> Self {
        Self {
            inner,
            rng,
            buf: [0; TX_CAPACITY],
        }
    }

    pub async fn send(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), NetworkError> {
        let mut mask = [0u8; 4];
        self.rng.fill_bytes(&mut mask);
        let len = ws::encode_frame(opcode, payload, mask, &mut self.buf)?;
        self.inner.write_all(&self.buf[..len]).await?;
        self.inner.flush().await
    }

    pub async fn send_text(&mut self, payload: &[u8]) -> Result<(), NetworkError> {
        self.send(Opcode::Text, payload).await
    }
}
