//! Process-wide display state
//!
//! One [`SharedState`] lives in a `static` on the board. The network actor is
//! the only writer of every field; the render tick only reads. Locks are
//! critical sections held just long enough to swap a value or run a pure
//! computation over it.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use hal_abstractions::LinkIndicator;

use crate::config::TimerConfig;
use crate::offset::{OffsetEstimator, Verdict};

/// "No upstream error"
const NO_ERROR: u16 = 0;

/// Estimator state as seen by readers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncStatus {
    pub offset_ms: i64,
    pub synchronized: bool,
}

pub struct SharedState<M: RawMutex> {
    config: Mutex<M, RefCell<TimerConfig>>,
    estimator: Mutex<M, RefCell<OffsetEstimator>>,
    network_up: AtomicBool,
    server_connected: AtomicBool,
    error_code: AtomicU16,
}

impl<M: RawMutex> SharedState<M> {
    pub const fn new() -> Self {
        Self {
            config: Mutex::new(RefCell::new(TimerConfig::unconfigured())),
            estimator: Mutex::new(RefCell::new(OffsetEstimator::new())),
            network_up: AtomicBool::new(false),
            server_connected: AtomicBool::new(false),
            error_code: AtomicU16::new(NO_ERROR),
        }
    }

    /// Swap in a fully built configuration
    pub fn replace_config(&self, config: TimerConfig) {
        self.config.lock(|cell| {
            cell.replace(config);
        });
    }

    /// Run `f` against the current configuration inside the lock
    pub fn with_config<R>(&self, f: impl FnOnce(&TimerConfig) -> R) -> R {
        self.config.lock(|cell| f(&cell.borrow()))
    }

    pub fn record_round_trip(
        &self,
        server_time: u64,
        request_sent_at: u64,
        response_received_at: u64,
    ) -> Verdict {
        self.estimator.lock(|cell| {
            cell.borrow_mut()
                .record_round_trip(server_time, request_sent_at, response_received_at)
        })
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.estimator.lock(|cell| {
            let estimator = cell.borrow();
            SyncStatus {
                offset_ms: estimator.current_offset(),
                synchronized: estimator.is_synchronized(),
            }
        })
    }

    /// Run `f` against the estimator inside the lock, for diagnostics
    pub fn with_estimator<R>(&self, f: impl FnOnce(&OffsetEstimator) -> R) -> R {
        self.estimator.lock(|cell| f(&cell.borrow()))
    }

    pub fn set_network_up(&self, up: bool) {
        self.network_up.store(up, Ordering::Relaxed);
        if !up {
            self.server_connected.store(false, Ordering::Relaxed);
        }
    }

    pub fn is_network_up(&self) -> bool {
        self.network_up.load(Ordering::Relaxed)
    }

    pub fn set_server_connected(&self, connected: bool) {
        self.server_connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_server_connected(&self) -> bool {
        self.server_connected.load(Ordering::Relaxed)
    }

    /// Store an upstream error code. Code 0 clears it.
    pub fn set_error(&self, code: u16) {
        self.error_code.store(code, Ordering::Relaxed);
    }

    pub fn clear_error(&self) {
        self.set_error(NO_ERROR);
    }

    pub fn error(&self) -> Option<u16> {
        match self.error_code.load(Ordering::Relaxed) {
            NO_ERROR => None,
            code => Some(code),
        }
    }

    pub fn link(&self) -> LinkIndicator {
        match (self.is_network_up(), self.is_server_connected()) {
            (true, true) => LinkIndicator::Online,
            (true, false) => LinkIndicator::ServerUnreachable,
            (false, _) => LinkIndicator::Offline,
        }
    }
}

impl<M: RawMutex> Default for SharedState<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    static STATE: SharedState<CriticalSectionRawMutex> = SharedState::new();

    type State = SharedState<CriticalSectionRawMutex>;

    #[test]
    fn test_static_starts_unconfigured() {
        assert!(!STATE.with_config(|c| c.valid));
        assert!(!STATE.sync_status().synchronized);
    }

    #[test]
    fn test_replace_config() {
        let state = State::new();
        state.replace_config(TimerConfig {
            valid: true,
            start_at: 42,
            ..TimerConfig::unconfigured()
        });
        assert_eq!(state.with_config(|c| (c.valid, c.start_at)), (true, 42));
    }

    #[test]
    fn test_round_trip_synchronizes() {
        let state = State::new();
        state.record_round_trip(10_000, 100, 300);
        assert_eq!(
            state.sync_status(),
            SyncStatus {
                offset_ms: 9_800,
                synchronized: true
            }
        );
        assert_eq!(state.with_estimator(|e| e.accepted_samples()), 1);
    }

    #[test]
    fn test_error_code() {
        let state = State::new();
        assert_eq!(state.error(), None);
        state.set_error(404);
        assert_eq!(state.error(), Some(404));
        state.clear_error();
        assert_eq!(state.error(), None);
    }

    #[test]
    fn test_link_indicator() {
        let state = State::new();
        assert_eq!(state.link(), LinkIndicator::Offline);
        state.set_network_up(true);
        assert_eq!(state.link(), LinkIndicator::ServerUnreachable);
        state.set_server_connected(true);
        assert_eq!(state.link(), LinkIndicator::Online);

        // Losing the link drops the server connection with it
        state.set_network_up(false);
        assert_eq!(state.link(), LinkIndicator::Offline);
        assert!(!state.is_server_connected());
    }
}
