#![deny(unsafe_code)]
#![deny(warnings)]
//! Local time source
//!
//! The board has no trusted wall clock; server time is estimated in
//! `timer_core`. Everything here counts from boot on the embassy-time
//! driver, which never goes backwards.

use hal_abstractions::MonotonicClock;

/// Milliseconds since boot
#[derive(Debug, Clone, Copy, Default)]
pub struct Uptime;

impl MonotonicClock for Uptime {
    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }
}
