//! Local time source

/// Free-running local clock in milliseconds since boot.
///
/// Must never go backwards. It has no relation to wall-clock time; the
/// offset to server time is estimated separately.
pub trait MonotonicClock {
    fn now_ms(&self) -> u64;
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
