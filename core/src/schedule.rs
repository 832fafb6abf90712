//! Segment scheduling
//!
//! [`compute`] maps a configuration and a synchronized instant to the segment
//! that is active at that instant and the time left in it. It is pure and
//! total: every input yields a value, with [`Phase::Unconfigured`] standing in
//! for "nothing to show".
//!
//! ```text
//! Unconfigured ──valid config + synced──▶ Running(i) ──boundary──▶ Running(i+1)
//!                                             │ repeat: wraps to Running(0)
//!                                             └ no repeat, past end: Finished(last)
//! ```

use crate::clock::SyncedInstant;
use crate::color::Rgb;
use crate::config::{PreStartBehavior, TimerConfig};
use crate::label::Label;

/// Pre-start position for [`PreStartBehavior::ShowFirstSegment`]: the
/// smallest positive time into the round, so the walk settles on segment 0
/// with (almost) its full duration left.
const FIRST_SEGMENT_POSITION_MS: u64 = 1;

/// Where the schedule stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No usable schedule, or not synchronized
    Unconfigured,
    /// Before `start_at`, showing a placeholder segment
    PreStart,
    Running,
    /// Clamped to `stop_at`
    Stopped,
    /// Non-repeating timer past its last segment, parked there
    Finished,
}

/// Output of [`compute`]; rebuilt on every render tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSegment {
    pub phase: Phase,
    /// Index into the configuration's segments; `None` when unconfigured
    pub index: Option<usize>,
    pub remaining_seconds: i64,
    pub color: Rgb,
    pub label: Label,
    /// The instant this was computed for, for the clock-of-day display
    pub reference_instant: u64,
}

impl ActiveSegment {
    /// The "nothing to show" sentinel
    pub fn unconfigured(reference_instant: u64) -> Self {
        Self {
            phase: Phase::Unconfigured,
            index: None,
            remaining_seconds: 0,
            color: Rgb::NEUTRAL,
            label: Label::new(),
            reference_instant,
        }
    }
}

/// Compute the active segment of `config` at `now`
pub fn compute(config: &TimerConfig, now: SyncedInstant) -> ActiveSegment {
    let instant = now.millis;
    if !config.valid || !now.synchronized {
        return ActiveSegment::unconfigured(instant);
    }

    let total = config.round_duration_ms();
    if total == 0 {
        return ActiveSegment::unconfigured(instant);
    }

    let Some((phase, time_in_round)) = position_in_round(config, instant, total) else {
        return ActiveSegment::unconfigured(instant);
    };

    // Walk the segments until the position falls inside one. The last
    // segment always matches because `time_in_round <= total`.
    let mut remainder = time_in_round;
    for (index, segment) in config.segments.iter().enumerate() {
        if remainder <= segment.duration_ms {
            let remaining_ms =
                (segment.duration_ms - remainder).saturating_add(segment.count_to_offset_ms);
            return ActiveSegment {
                phase,
                index: Some(index),
                remaining_seconds: (remaining_ms / 1000) as i64,
                color: segment.color,
                label: segment.label.clone(),
                reference_instant: instant,
            };
        }
        remainder -= segment.duration_ms;
    }

    ActiveSegment::unconfigured(instant)
}

/// Position inside one round, or `None` when nothing should be shown
fn position_in_round(config: &TimerConfig, instant: u64, total: u64) -> Option<(Phase, u64)> {
    if instant < config.start_at {
        return match config.pre_start_behavior {
            PreStartBehavior::ShowFirstSegment => {
                Some((Phase::PreStart, FIRST_SEGMENT_POSITION_MS.min(total)))
            }
            PreStartBehavior::ShowLastSegment => Some((Phase::PreStart, total)),
            PreStartBehavior::RunNormally => None,
        };
    }

    let (effective, stopped) = match config.stop_at {
        Some(stop_at) if stop_at != 0 && instant > stop_at => (stop_at, true),
        _ => (instant, false),
    };
    let elapsed = effective.saturating_sub(config.start_at);

    if !config.repeat && elapsed > total {
        return Some((Phase::Finished, total));
    }

    let phase = if stopped { Phase::Stopped } else { Phase::Running };
    let time_in_round = if config.repeat { elapsed % total } else { elapsed };
    Some((phase, time_in_round))
}
