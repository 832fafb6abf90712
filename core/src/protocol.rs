//! Timer server wire protocol
//!
//! Every WebSocket text frame carries one JSON object of the shape
//! `{"type": "<Kind>", "data": <payload>}`.
//!
//! | Direction | `type` | `data` |
//! |---|---|---|
//! | in  | `Timer`     | full timer configuration |
//! | in  | `Timestamp` | server time, ms since the Unix epoch |
//! | in  | `Error`     | `[code, ...]` |
//! | out | `Hello`     | timer id, sent on every (re)connection |
//! | out | `GetTime`   | none, the time probe |
//!
//! Decoding is two-pass and allocation-free: the envelope is read first to
//! learn the `type`, then the frame is decoded again into the matching
//! payload. Plain strings borrow from the frame. Labels are copied out
//! unescaped, so `\"` or `\u00fc` arrive as the characters they encode.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::label::{self, Label};

/// Upper bound on segments accepted by the decoder. Anything between this
/// and [`crate::MAX_SEGMENTS`] decodes, and is then rejected by
/// [`crate::TimerConfig::from_wire`] as too many segments.
pub const MAX_WIRE_SEGMENTS: usize = 16;

/// Maximum timer id length after stripping spaces
pub const MAX_TIMER_ID_LEN: usize = 32;

/// Scratch space for unescaping one string, before label truncation
const UNESCAPE_CAPACITY: usize = 256;

/// `display_options` object of a `Timer` message
#[derive(Debug, Deserialize)]
pub struct DisplayOptionsPayload<'a> {
    #[serde(default, borrow)]
    pub pre_start_behaviour: Option<&'a str>,
    #[serde(default)]
    pub clock: bool,
}

/// One entry of `segments`
#[derive(Debug, Deserialize)]
pub struct SegmentPayload<'a> {
    /// Duration in ms
    pub time: u64,
    #[serde(default)]
    pub count_to: u64,
    #[serde(default)]
    pub sound: bool,
    #[serde(default, deserialize_with = "label::deserialize_truncated")]
    pub label: Label,
    #[serde(default, borrow)]
    pub color: Option<&'a str>,
}

/// `data` of a `Timer` message
#[derive(Debug, Deserialize)]
pub struct TimerPayload<'a> {
    #[serde(default)]
    pub repeat: bool,
    pub start_at: u64,
    #[serde(default)]
    pub stop_at: Option<u64>,
    /// The server sends `null` when no options are set
    #[serde(default, borrow)]
    pub display_options: Option<DisplayOptionsPayload<'a>>,
    #[serde(borrow)]
    pub segments: Vec<SegmentPayload<'a>, MAX_WIRE_SEGMENTS>,
}

/// A decoded inbound message
#[derive(Debug)]
pub enum Inbound<'a> {
    Timer(TimerPayload<'a>),
    Timestamp(u64),
    Error(u16),
}

#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(Serialize)]
struct Outbound<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
}

fn decode_data<'a, T: Deserialize<'a>>(frame: &'a [u8]) -> Result<T, ProtocolError> {
    let mut scratch = [0u8; UNESCAPE_CAPACITY];
    serde_json_core::from_slice_escaped::<Data<T>>(frame, &mut scratch)
        .map(|(msg, _)| msg.data)
        .map_err(|_| ProtocolError::Malformed)
}

/// Decode one inbound text frame
pub fn decode(frame: &[u8]) -> Result<Inbound<'_>, ProtocolError> {
    let (envelope, _) = serde_json_core::from_slice::<Envelope<'_>>(frame)
        .map_err(|_| ProtocolError::Malformed)?;

    match envelope.kind {
        "Timer" => decode_data(frame).map(Inbound::Timer),
        "Timestamp" => decode_data(frame).map(Inbound::Timestamp),
        "Error" => {
            let codes: Vec<i64, 4> = decode_data(frame)?;
            let code = codes.first().copied().ok_or(ProtocolError::Malformed)?;
            u16::try_from(code)
                .map(Inbound::Error)
                .map_err(|_| ProtocolError::Malformed)
        }
        _ => Err(ProtocolError::UnknownType),
    }
}

fn encode(msg: &Outbound<'_>, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    serde_json_core::to_slice(msg, buf).map_err(|_| ProtocolError::BufferTooSmall)
}

/// Encode the `Hello` handshake. Spaces are stripped from the timer id, as
/// users tend to type ids with separators.
pub fn encode_hello(timer_id: &str, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    let mut id = String::<MAX_TIMER_ID_LEN>::new();
    for ch in timer_id.chars().filter(|c| *c != ' ') {
        id.push(ch).map_err(|_| ProtocolError::BufferTooSmall)?;
    }

    encode(
        &Outbound {
            kind: "Hello",
            data: Some(id.as_str()),
        },
        buf,
    )
}

/// Encode the `GetTime` probe
pub fn encode_get_time(buf: &mut [u8]) -> Result<usize, ProtocolError> {
    encode(
        &Outbound {
            kind: "GetTime",
            data: None,
        },
        buf,
    )
}
