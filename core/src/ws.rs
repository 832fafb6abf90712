//! Minimal RFC 6455 WebSocket client framing
//!
//! Just enough to talk to the timer server: the HTTP upgrade request,
//! masked client frames and unmasked server frames. No extensions, no
//! subprotocols. `Sec-WebSocket-Accept` is not verified.

use core::fmt::Write;
use core::ops::Range;

use heapless::String;

use crate::error::WsError;

/// Upper bound on the upgrade response header
pub const MAX_HANDSHAKE_LEN: usize = 1024;

/// Capacity of the upgrade request
pub const REQUEST_CAPACITY: usize = 512;

/// Base64 of a 16-byte nonce
pub type Key = String<24>;

const FIN: u8 = 0x80;
const MASKED: u8 = 0x80;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Reserved(u8),
}

impl Opcode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x0F {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            other => Self::Reserved(other),
        }
    }

    fn bits(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::Reserved(bits) => bits & 0x0F,
        }
    }
}

/// Frame header, available before the payload has arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub fin: bool,
    pub opcode: Opcode,
    pub header_len: usize,
    /// Header plus payload
    pub frame_len: usize,
}

/// A complete frame at the front of a receive buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    /// Payload position within the buffer
    pub payload: Range<usize>,
    /// Header plus payload; drop this many bytes after handling the frame
    pub consumed: usize,
}

/// Base64 `Sec-WebSocket-Key` for a random 16-byte nonce
pub fn encode_key(nonce: &[u8; 16]) -> Key {
    let mut key = Key::new();
    for chunk in nonce.chunks(3) {
        let b = [
            chunk[0],
            chunk.get(1).copied().unwrap_or(0),
            chunk.get(2).copied().unwrap_or(0),
        ];
        let sextets = [
            b[0] >> 2,
            ((b[0] & 0x03) << 4) | (b[1] >> 4),
            ((b[1] & 0x0F) << 2) | (b[2] >> 6),
            b[2] & 0x3F,
        ];
        // Input length + 1 sextets carry data, the rest is padding
        for (i, sextet) in sextets.iter().enumerate() {
            let ch = if i <= chunk.len() {
                BASE64[*sextet as usize] as char
            } else {
                '='
            };
            // 16 bytes always encode to exactly 24 characters
            let _ = key.push(ch);
        }
    }
    key
}

/// HTTP/1.1 upgrade request
pub fn client_handshake(
    host: &str,
    port: u16,
    path: &str,
    key: &str,
) -> Result<String<REQUEST_CAPACITY>, WsError> {
    let mut request = String::new();
    write!(request, "GET {} HTTP/1.1\r\nHost: {}", path, host)
        .map_err(|_| WsError::BufferTooSmall)?;
    if port != 80 {
        write!(request, ":{}", port).map_err(|_| WsError::BufferTooSmall)?;
    }
    write!(
        request,
        "\r\nUpgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\n\
         Sec-WebSocket-Version: 13\r\n\r\n",
        key
    )
    .map_err(|_| WsError::BufferTooSmall)?;
    Ok(request)
}

/// Check the upgrade response received so far.
///
/// Returns the header length once the header is complete and the status is
/// `101`, or `None` while more bytes are needed. Bytes after the header
/// already belong to the first frame.
pub fn parse_handshake_response(buf: &[u8]) -> Result<Option<usize>, WsError> {
    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        if buf.len() >= MAX_HANDSHAKE_LEN {
            return Err(WsError::HandshakeTooLarge);
        }
        return Ok(None);
    };

    let status_line = buf[..end].split(|&b| b == b'\r').next().unwrap_or_default();
    let mut parts = status_line.split(|&b| b == b' ');
    let version = parts.next().unwrap_or_default();
    let status = parts.next().unwrap_or_default();
    if !version.starts_with(b"HTTP/1.") || status != b"101" {
        return Err(WsError::HandshakeRejected);
    }

    Ok(Some(end + 4))
}

/// Write one final, masked client frame into `out`
pub fn encode_frame(
    opcode: Opcode,
    payload: &[u8],
    mask: [u8; 4],
    out: &mut [u8],
) -> Result<usize, WsError> {
    let len = payload.len();
    let mut header = [0u8; 14];
    header[0] = FIN | opcode.bits();
    let mut at = 2;
    if len < LEN_16 as usize {
        header[1] = MASKED | len as u8;
    } else if let Ok(short) = u16::try_from(len) {
        header[1] = MASKED | LEN_16;
        header[2..4].copy_from_slice(&short.to_be_bytes());
        at = 4;
    } else {
        header[1] = MASKED | LEN_64;
        header[2..10].copy_from_slice(&(len as u64).to_be_bytes());
        at = 10;
    }
    header[at..at + 4].copy_from_slice(&mask);
    at += 4;

    let total = at + len;
    let out = out.get_mut(..total).ok_or(WsError::BufferTooSmall)?;
    out[..at].copy_from_slice(&header[..at]);
    for (i, (dst, src)) in out[at..].iter_mut().zip(payload).enumerate() {
        *dst = src ^ mask[i % 4];
    }
    Ok(total)
}

/// Parse the header of the frame at the front of `buf`, or `None` if the
/// header is not complete yet. The payload may still be missing.
pub fn decode_header(buf: &[u8]) -> Result<Option<Header>, WsError> {
    let [b0, b1, ..] = *buf else {
        return Ok(None);
    };
    if b1 & MASKED != 0 {
        return Err(WsError::MaskedServerFrame);
    }

    let (header_len, payload_len): (usize, usize) = match b1 & 0x7F {
        LEN_16 => {
            let Some(bytes) = buf.get(2..4) else {
                return Ok(None);
            };
            (4, u16::from_be_bytes([bytes[0], bytes[1]]) as usize)
        }
        LEN_64 => {
            let Some(bytes) = buf.get(2..10) else {
                return Ok(None);
            };
            let mut be = [0u8; 8];
            be.copy_from_slice(bytes);
            let len = usize::try_from(u64::from_be_bytes(be))
                .map_err(|_| WsError::UnsupportedLength)?;
            (10, len)
        }
        short => (2, short as usize),
    };

    let frame_len = header_len
        .checked_add(payload_len)
        .ok_or(WsError::UnsupportedLength)?;

    Ok(Some(Header {
        fin: b0 & FIN != 0,
        opcode: Opcode::from_bits(b0),
        header_len,
        frame_len,
    }))
}

/// Parse the frame at the front of `buf`, or `None` if it is not complete
/// yet
pub fn decode_frame(buf: &[u8]) -> Result<Option<Frame>, WsError> {
    let Some(header) = decode_header(buf)? else {
        return Ok(None);
    };
    if buf.len() < header.frame_len {
        return Ok(None);
    }

    Ok(Some(Frame {
        fin: header.fin,
        opcode: header.opcode,
        payload: header.header_len..header.frame_len,
        consumed: header.frame_len,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key() {
        // RFC 6455 §1.3
        assert_eq!(encode_key(b"the sample nonce").as_str(), "dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(encode_key(&[0u8; 16]).as_str(), "AAAAAAAAAAAAAAAAAAAAAA==");
    }

    #[test]
    fn test_client_handshake() {
        let request = client_handshake("timer.example", 80, "/api/ws", "KEY").unwrap();
        assert_eq!(
            request.as_str(),
            "GET /api/ws HTTP/1.1\r\n\
             Host: timer.example\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: KEY\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n"
        );

        let request = client_handshake("10.0.0.2", 8080, "/", "KEY").unwrap();
        assert!(request.starts_with("GET / HTTP/1.1\r\nHost: 10.0.0.2:8080\r\n"));
    }

    #[test]
    fn test_handshake_response() {
        let response = b"HTTP/1.1 101 Switching Protocols\r\n\
            Upgrade: websocket\r\nConnection: Upgrade\r\n\
            Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n\x81\x02hi";
        let header_len = response.len() - 4;
        assert_eq!(parse_handshake_response(response), Ok(Some(header_len)));
        assert_eq!(parse_handshake_response(&response[..40]), Ok(None));
        assert_eq!(parse_handshake_response(b""), Ok(None));
    }

    #[test]
    fn test_handshake_rejected() {
        assert_eq!(
            parse_handshake_response(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n"),
            Err(WsError::HandshakeRejected)
        );
        assert_eq!(
            parse_handshake_response(&[b'x'; MAX_HANDSHAKE_LEN]),
            Err(WsError::HandshakeTooLarge)
        );
    }

    #[test]
    fn test_encode_masked_text() {
        // RFC 6455 §5.7
        let mut out = [0u8; 16];
        let len = encode_frame(Opcode::Text, b"Hello", [0x37, 0xfa, 0x21, 0x3d], &mut out).unwrap();
        assert_eq!(
            &out[..len],
            &[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58]
        );
    }

    #[test]
    fn test_encode_extended_length() {
        let payload = [0u8; 300];
        let mut out = [0u8; 400];
        let len = encode_frame(Opcode::Binary, &payload, [0; 4], &mut out).unwrap();
        assert_eq!(len, 4 + 4 + 300);
        assert_eq!(&out[..4], &[0x82, 0x80 | 126, 0x01, 0x2C]);

        let mut small = [0u8; 100];
        assert_eq!(
            encode_frame(Opcode::Binary, &payload, [0; 4], &mut small),
            Err(WsError::BufferTooSmall)
        );
    }

    #[test]
    fn test_decode_text() {
        let buf = b"\x81\x05Hello\x89\x00";
        let frame = decode_frame(buf).unwrap().unwrap();
        assert!(frame.fin);
        assert_eq!(frame.opcode, Opcode::Text);
        assert_eq!(&buf[frame.payload.clone()], b"Hello");
        assert_eq!(frame.consumed, 7);

        let ping = decode_frame(&buf[frame.consumed..]).unwrap().unwrap();
        assert_eq!(ping.opcode, Opcode::Ping);
        assert!(ping.payload.is_empty());
    }

    #[test]
    fn test_decode_incomplete() {
        assert_eq!(decode_frame(b""), Ok(None));
        assert_eq!(decode_frame(b"\x81"), Ok(None));
        assert_eq!(decode_frame(b"\x81\x05Hel"), Ok(None));
        assert_eq!(decode_frame(b"\x82\x7e\x01"), Ok(None));
    }

    #[test]
    fn test_decode_extended_length() {
        let mut buf = [0u8; 4 + 256];
        buf[..4].copy_from_slice(&[0x82, 0x7E, 0x01, 0x00]);
        let frame = decode_frame(&buf).unwrap().unwrap();
        assert_eq!(frame.opcode, Opcode::Binary);
        assert_eq!(frame.payload, 4..260);
        assert_eq!(decode_frame(&buf[..259]), Ok(None));
    }

    #[test]
    fn test_decode_header_before_payload() {
        // 64-bit length: 70 000 bytes of text, only the header received
        let buf = [0x81, 0x7F, 0, 0, 0, 0, 0, 0x01, 0x11, 0x70, b'{'];
        let header = decode_header(&buf).unwrap().unwrap();
        assert_eq!(header.opcode, Opcode::Text);
        assert_eq!(header.header_len, 10);
        assert_eq!(header.frame_len, 10 + 70_000);
        assert_eq!(decode_frame(&buf), Ok(None));

        assert_eq!(decode_header(&buf[..9]), Ok(None));
    }

    #[test]
    fn test_decode_fragment() {
        let frame = decode_frame(b"\x01\x03Hel").unwrap().unwrap();
        assert!(!frame.fin);
        assert_eq!(frame.opcode, Opcode::Text);
    }

    #[test]
    fn test_masked_server_frame_rejected() {
        assert_eq!(
            decode_frame(b"\x81\x85\x37\xfa\x21\x3d\x7f\x9f\x4d\x51\x58"),
            Err(WsError::MaskedServerFrame)
        );
    }
}
