//! Server-synchronized time
//!
//! `now = local monotonic ms + estimated offset`. The local clock counts from
//! boot; the sum is server time in ms since the Unix epoch.

use embassy_sync::blocking_mutex::raw::RawMutex;
use hal_abstractions::MonotonicClock;

use crate::state::SharedState;

const SECONDS_PER_DAY: i64 = 86_400;

/// One reading of the synchronized clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncedInstant {
    /// Estimated server time in ms; meaningless unless `synchronized`
    pub millis: u64,
    pub synchronized: bool,
}

/// Local clock corrected by the shared offset estimate
pub struct SyncedClock<'a, C, M: RawMutex> {
    local: C,
    state: &'a SharedState<M>,
}

impl<'a, C: MonotonicClock, M: RawMutex> SyncedClock<'a, C, M> {
    pub fn new(local: C, state: &'a SharedState<M>) -> Self {
        Self { local, state }
    }

    /// Local monotonic time, as used to timestamp probe round trips
    pub fn local_ms(&self) -> u64 {
        self.local.now_ms()
    }

    pub fn now(&self) -> SyncedInstant {
        let status = self.state.sync_status();
        SyncedInstant {
            // Negative sums saturate at the epoch
            millis: self.local.now_ms().saturating_add_signed(status.offset_ms),
            synchronized: status.synchronized,
        }
    }
}

/// `(hour, minute)` of the day at `millis` (ms since the Unix epoch), shifted
/// by a whole-hour UTC offset
pub fn clock_of_day(millis: u64, utc_offset_hours: i8) -> (u8, u8) {
    let secs = (millis / 1000) as i64 + i64::from(utc_offset_hours) * 3600;
    let secs_today = secs.rem_euclid(SECONDS_PER_DAY);

    let hour = (secs_today / 3600) as u8;
    let minute = ((secs_today % 3600) / 60) as u8;
    (hour, minute)
}
