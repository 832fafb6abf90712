//! `GetTime` probe cadence
//!
//! At most one probe is in flight. The next one goes out a second after the
//! previous reply arrived, so the probe rate adapts to the round-trip time.
//! A probe left unanswered for ten seconds means the connection is dead
//! even if TCP has not noticed yet.

/// Minimum gap between a reply and the next probe
pub const PROBE_INTERVAL_MS: u64 = 1_000;

/// Outstanding probe age after which the connection is considered stalled
pub const STALL_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProbeAction {
    Idle,
    /// Send a probe now; it is recorded as outstanding
    Send,
    /// The outstanding probe timed out
    Stalled,
}

/// Probe scheduler, driven with local monotonic time
#[derive(Debug, Default)]
pub struct TimeProbe {
    outstanding_since: Option<u64>,
    last_reply_at: Option<u64>,
}

impl TimeProbe {
    pub const fn new() -> Self {
        Self {
            outstanding_since: None,
            last_reply_at: None,
        }
    }

    pub fn poll(&mut self, now: u64) -> ProbeAction {
        if let Some(sent_at) = self.outstanding_since {
            return if now.saturating_sub(sent_at) >= STALL_TIMEOUT_MS {
                ProbeAction::Stalled
            } else {
                ProbeAction::Idle
            };
        }

        let due = match self.last_reply_at {
            None => true,
            Some(at) => now.saturating_sub(at) >= PROBE_INTERVAL_MS,
        };
        if !due {
            return ProbeAction::Idle;
        }

        self.outstanding_since = Some(now);
        ProbeAction::Send
    }

    /// Close the outstanding probe and return `(sent_at, received_at)`.
    ///
    /// A reply without an outstanding probe (duplicate, or left over from
    /// a previous connection) returns `None` and must not be used as a
    /// round-trip sample.
    pub fn on_response(&mut self, now: u64) -> Option<(u64, u64)> {
        let sent_at = self.outstanding_since.take()?;
        self.last_reply_at = Some(now);
        Some((sent_at, now))
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding_since.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_poll_sends() {
        let mut probe = TimeProbe::new();
        assert_eq!(probe.poll(0), ProbeAction::Send);
        assert!(probe.is_outstanding());
        assert_eq!(probe.poll(1), ProbeAction::Idle);
    }

    #[test]
    fn test_waits_a_second_after_reply() {
        let mut probe = TimeProbe::new();
        probe.poll(100);
        assert_eq!(probe.on_response(150), Some((100, 150)));

        assert_eq!(probe.poll(150), ProbeAction::Idle);
        assert_eq!(probe.poll(1_149), ProbeAction::Idle);
        assert_eq!(probe.poll(1_150), ProbeAction::Send);
    }

    #[test]
    fn test_stalls_without_reply() {
        let mut probe = TimeProbe::new();
        probe.poll(1_000);
        assert_eq!(probe.poll(10_999), ProbeAction::Idle);
        assert_eq!(probe.poll(11_000), ProbeAction::Stalled);
        // Stays stalled until the caller resets
        assert_eq!(probe.poll(12_000), ProbeAction::Stalled);
        probe.reset();
        assert_eq!(probe.poll(12_000), ProbeAction::Send);
    }

    #[test]
    fn test_unsolicited_reply_ignored() {
        let mut probe = TimeProbe::new();
        assert_eq!(probe.on_response(10), None);

        probe.poll(20);
        assert_eq!(probe.on_response(30), Some((20, 30)));
        // Duplicate
        assert_eq!(probe.on_response(31), None);
    }
}
