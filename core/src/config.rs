//! Timer configuration
//!
//! A [`TimerConfig`] is a complete, immutable snapshot of one schedule. It is
//! never edited in place: a new `Timer` message builds a whole new value that
//! then replaces the old one in [`crate::SharedState`].

use heapless::Vec;

use crate::color::Rgb;
use crate::error::ProtocolError;
use crate::label::Label;
use crate::protocol::TimerPayload;

/// Segment capacity of a configuration
pub const MAX_SEGMENTS: usize = 10;

/// What to show before `start_at` is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreStartBehavior {
    /// First segment with (almost) its full duration
    #[default]
    ShowFirstSegment,
    /// Last segment with nothing remaining
    ShowLastSegment,
    /// Nothing is shown until the timer starts
    RunNormally,
}

impl PreStartBehavior {
    /// Map the wire name; unknown or absent names fall back to
    /// [`PreStartBehavior::ShowFirstSegment`].
    pub fn from_wire(name: Option<&str>) -> Self {
        match name {
            Some("ShowLastSegment") => Self::ShowLastSegment,
            Some("RunNormally") => Self::RunNormally,
            _ => Self::ShowFirstSegment,
        }
    }
}

/// One labeled, colored, timed phase of the schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Always > 0
    pub duration_ms: u64,
    /// Added to the displayed remaining time, so a segment can count up to
    /// a base instead of down to zero
    pub count_to_offset_ms: u64,
    pub plays_sound: bool,
    pub color: Rgb,
    pub label: Label,
}

/// Snapshot of the active schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    pub valid: bool,
    pub repeat: bool,
    /// ms since the Unix epoch, in server time
    pub start_at: u64,
    /// `None` or `Some(0)` means unbounded
    pub stop_at: Option<u64>,
    pub pre_start_behavior: PreStartBehavior,
    pub show_clock: bool,
    /// Exactly the valid segments, in order
    pub segments: Vec<Segment, MAX_SEGMENTS>,
}

impl TimerConfig {
    /// The "nothing configured yet" state
    pub const fn unconfigured() -> Self {
        Self {
            valid: false,
            repeat: false,
            start_at: 0,
            stop_at: None,
            pre_start_behavior: PreStartBehavior::ShowFirstSegment,
            show_clock: false,
            segments: Vec::new(),
        }
    }

    /// Build a configuration from a decoded `Timer` message.
    ///
    /// More than [`MAX_SEGMENTS`] segments rejects the whole message. A
    /// segment with zero duration ends the valid prefix: it and all later
    /// segments are dropped.
    pub fn from_wire(payload: &TimerPayload<'_>) -> Result<Self, ProtocolError> {
        if payload.segments.len() > MAX_SEGMENTS {
            return Err(ProtocolError::TooManySegments);
        }

        let mut segments = Vec::new();
        for wire in payload.segments.iter().take_while(|s| s.time > 0) {
            segments
                .push(Segment {
                    duration_ms: wire.time,
                    count_to_offset_ms: wire.count_to,
                    plays_sound: wire.sound,
                    color: Rgb::from_wire(wire.color),
                    label: wire.label.clone(),
                })
                .map_err(|_| ProtocolError::TooManySegments)?;
        }

        let options = payload.display_options.as_ref();
        Ok(Self {
            valid: true,
            repeat: payload.repeat,
            start_at: payload.start_at,
            stop_at: payload.stop_at.filter(|&at| at != 0),
            pre_start_behavior: PreStartBehavior::from_wire(
                options.and_then(|o| o.pre_start_behaviour),
            ),
            show_clock: options.is_some_and(|o| o.clock),
            segments,
        })
    }

    /// Sum of all segment durations, i.e. the length of one round.
    /// Saturates at `u64::MAX`.
    pub fn round_duration_ms(&self) -> u64 {
        self.segments
            .iter()
            .fold(0u64, |total, s| total.saturating_add(s.duration_ms))
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::unconfigured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode, Inbound};

    fn timer_json(segments: usize) -> heapless::String<2048> {
        use core::fmt::Write;
        let mut json = heapless::String::new();
        write!(
            json,
            r#"{{"type":"Timer","data":{{"repeat":false,"start_at":5,"segments":["#
        )
        .unwrap();
        for i in 0..segments {
            if i > 0 {
                json.push(',').unwrap();
            }
            write!(json, r#"{{"time":1000,"label":"S{}"}}"#, i).unwrap();
        }
        json.push_str("]}}").unwrap();
        json
    }

    fn config_from(json: &str) -> Result<TimerConfig, ProtocolError> {
        match decode(json.as_bytes())? {
            Inbound::Timer(payload) => TimerConfig::from_wire(&payload),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_ten_segments_fit() {
        let config = config_from(&timer_json(MAX_SEGMENTS)).unwrap();
        assert!(config.valid);
        assert_eq!(config.segments.len(), MAX_SEGMENTS);
        assert_eq!(config.round_duration_ms(), 10_000);
        assert_eq!(config.segments[9].label.as_str(), "S9");
    }

    #[test]
    fn test_eleven_segments_rejected() {
        assert_eq!(
            config_from(&timer_json(11)).unwrap_err(),
            ProtocolError::TooManySegments
        );
    }

    #[test]
    fn test_zero_duration_ends_prefix() {
        let json = r##"{"type":"Timer","data":{"start_at":0,"segments":[
            {"time":1000,"label":"a"},{"time":0,"label":"b"},{"time":1000,"label":"c"}]}}"##;
        let config = config_from(json).unwrap();
        assert_eq!(config.segments.len(), 1);
        assert_eq!(config.segments[0].label.as_str(), "a");
    }

    #[test]
    fn test_defaults() {
        let json = r#"{"type":"Timer","data":{"start_at":7,"stop_at":0,"segments":[{"time":1}]}}"#;
        let config = config_from(json).unwrap();
        assert!(!config.repeat);
        assert_eq!(config.stop_at, None);
        assert_eq!(config.pre_start_behavior, PreStartBehavior::ShowFirstSegment);
        assert!(!config.show_clock);
        assert_eq!(config.segments[0].color, Rgb::WHITE);
        assert_eq!(config.segments[0].count_to_offset_ms, 0);
        assert!(config.segments[0].label.is_empty());
    }

    #[test]
    fn test_pre_start_names() {
        assert_eq!(
            PreStartBehavior::from_wire(Some("RunNormally")),
            PreStartBehavior::RunNormally
        );
        assert_eq!(
            PreStartBehavior::from_wire(Some("ShowLastSegment")),
            PreStartBehavior::ShowLastSegment
        );
        assert_eq!(
            PreStartBehavior::from_wire(Some("ShowZero")),
            PreStartBehavior::ShowFirstSegment
        );
        assert_eq!(
            PreStartBehavior::from_wire(None),
            PreStartBehavior::ShowFirstSegment
        );
    }
}
