//! Local→server clock offset estimation
//!
//! The device has no trustworthy wall clock. Instead it asks the timer server
//! for its time about once a second and turns each round trip into an offset
//! candidate, applying the usual RTT/2 correction:
//!
//! ```text
//! candidate = server_time − received_at + (received_at − sent_at) / 2
//! ```
//!
//! Candidates are smoothed over a rolling window. A rolling mean of absolute
//! deviations (the "fluctuation") gives the jitter band; once enough history
//! exists, candidates far outside that band are dropped as outliers (a
//! delayed or reordered reply).

use heapless::HistoryBuffer;

/// Samples kept for both rolling averages
pub const WINDOW: usize = 10;

/// Fluctuation samples required before outliers are rejected
const MIN_FLUCTUATION_HISTORY: usize = 6;

/// Candidates deviating more than this many times the average fluctuation
/// are outliers
const OUTLIER_FACTOR: i64 = 4;

/// Outcome of one round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    Accepted { candidate: i64 },
    Rejected { candidate: i64, deviation: i64 },
}

/// Smoothed local→server offset
pub struct OffsetEstimator {
    offsets: HistoryBuffer<i64, WINDOW>,
    fluctuations: HistoryBuffer<i64, WINDOW>,
    avg_offset: i64,
    avg_fluctuation: i64,
}

impl OffsetEstimator {
    pub const fn new() -> Self {
        Self {
            offsets: HistoryBuffer::new(),
            fluctuations: HistoryBuffer::new(),
            avg_offset: 0,
            avg_fluctuation: 0,
        }
    }

    /// Offset candidate for one round trip, all values in ms
    pub fn candidate(server_time: u64, request_sent_at: u64, response_received_at: u64) -> i64 {
        let rtt = response_received_at.saturating_sub(request_sent_at) as i64;
        server_time as i64 - response_received_at as i64 + rtt / 2
    }

    /// Feed one round trip into the estimator.
    ///
    /// Rejected candidates leave every buffer untouched.
    pub fn record_round_trip(
        &mut self,
        server_time: u64,
        request_sent_at: u64,
        response_received_at: u64,
    ) -> Verdict {
        let candidate = Self::candidate(server_time, request_sent_at, response_received_at);

        if self.offsets.len() == 0 {
            // No baseline to measure a deviation against yet.
            self.offsets.write(candidate);
            self.avg_offset = candidate;
            return Verdict::Accepted { candidate };
        }

        let deviation = (candidate - self.avg_offset).abs();
        if self.is_outlier(deviation) {
            return Verdict::Rejected {
                candidate,
                deviation,
            };
        }

        self.fluctuations.write(deviation);
        self.avg_fluctuation = average(&self.fluctuations);
        self.offsets.write(candidate);
        self.avg_offset = average(&self.offsets);

        Verdict::Accepted { candidate }
    }

    fn is_outlier(&self, deviation: i64) -> bool {
        // A zero band means every sample so far agreed exactly; there is
        // nothing to compare against.
        self.fluctuations.len() >= MIN_FLUCTUATION_HISTORY
            && self.avg_fluctuation > 0
            && deviation > OUTLIER_FACTOR * self.avg_fluctuation
    }

    /// Current estimate of `server_time − local_time` in ms
    pub fn current_offset(&self) -> i64 {
        self.avg_offset
    }

    /// `true` once at least one sample has been accepted
    pub fn is_synchronized(&self) -> bool {
        self.offsets.len() > 0
    }

    /// Rolling mean absolute deviation in ms
    pub fn average_fluctuation(&self) -> i64 {
        self.avg_fluctuation
    }

    /// Accepted samples currently in the window
    pub fn accepted_samples(&self) -> usize {
        self.offsets.len()
    }

    /// Forget all history
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for OffsetEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean over the populated slots
fn average(values: &HistoryBuffer<i64, WINDOW>) -> i64 {
    let populated = values.as_slice();
    if populated.is_empty() {
        return 0;
    }
    populated.iter().sum::<i64>() / populated.len() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUE_OFFSET: i64 = 1_700_000_000_000;

    /// Round trip starting at local `sent` whose candidate is exactly
    /// `TRUE_OFFSET + jitter`
    fn round_trip(sent: u64, rtt: u64, jitter: i64) -> (u64, u64, u64) {
        let received = sent + rtt;
        let server = (received as i64 + TRUE_OFFSET - (rtt / 2) as i64 + jitter) as u64;
        (server, sent, received)
    }

    fn feed(estimator: &mut OffsetEstimator, sent: u64, rtt: u64, jitter: i64) -> Verdict {
        let (server, sent, received) = round_trip(sent, rtt, jitter);
        estimator.record_round_trip(server, sent, received)
    }

    #[test]
    fn test_candidate_applies_half_rtt() {
        assert_eq!(OffsetEstimator::candidate(10_000, 100, 300), 9_800);
        // Server behind the local clock
        assert_eq!(OffsetEstimator::candidate(100, 1_000, 1_010), -905);
    }

    #[test]
    fn test_first_sample_synchronizes() {
        let mut estimator = OffsetEstimator::new();
        assert!(!estimator.is_synchronized());
        assert_eq!(estimator.current_offset(), 0);

        assert_eq!(
            feed(&mut estimator, 500, 40, 0),
            Verdict::Accepted {
                candidate: TRUE_OFFSET
            }
        );
        assert!(estimator.is_synchronized());
        assert_eq!(estimator.current_offset(), TRUE_OFFSET);
        assert_eq!(estimator.average_fluctuation(), 0);
    }

    #[test]
    fn test_converges_within_jitter() {
        const JITTER: i64 = 20;
        let mut estimator = OffsetEstimator::new();

        let mut i = 0u64;
        while estimator.accepted_samples() < WINDOW {
            let jitter = ((i * 7) % 41) as i64 - JITTER;
            let rtt = 30 + (i * 13) % 50;
            feed(&mut estimator, 1_000 * i, rtt, jitter);
            i += 1;
            assert!(i < 100, "estimator never filled its window");
        }

        let error = (estimator.current_offset() - TRUE_OFFSET).abs();
        assert!(error <= JITTER, "offset error {} ms", error);
    }

    #[test]
    fn test_outlier_is_rejected() {
        let mut estimator = OffsetEstimator::new();
        for (i, jitter) in [0, 6, -4, 8, -6, 4, -8, 2].iter().enumerate() {
            let verdict = feed(&mut estimator, 1_000 * i as u64, 40, *jitter);
            assert!(matches!(verdict, Verdict::Accepted { .. }));
        }

        let offset = estimator.current_offset();
        let fluctuation = estimator.average_fluctuation();
        let samples = estimator.accepted_samples();
        assert!(fluctuation > 0);

        let verdict = feed(&mut estimator, 20_000, 40, 100 * fluctuation);
        assert!(matches!(verdict, Verdict::Rejected { .. }));
        assert_eq!(estimator.current_offset(), offset);
        assert_eq!(estimator.average_fluctuation(), fluctuation);
        assert_eq!(estimator.accepted_samples(), samples);
    }

    #[test]
    fn test_lenient_before_history() {
        let mut estimator = OffsetEstimator::new();
        feed(&mut estimator, 0, 40, 0);
        feed(&mut estimator, 1_000, 40, 2);
        // Only one fluctuation sample so far: a large jump is still taken.
        let verdict = feed(&mut estimator, 2_000, 40, 5_000);
        assert!(matches!(verdict, Verdict::Accepted { .. }));
        assert_eq!(estimator.accepted_samples(), 3);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut estimator = OffsetEstimator::new();
        for i in 0..WINDOW as u64 {
            feed(&mut estimator, 1_000 * i, 40, 0);
        }
        assert_eq!(estimator.current_offset(), TRUE_OFFSET);

        // A 1 ms drift stays inside the band and replaces the whole window.
        for i in 0..WINDOW as u64 {
            let verdict = feed(&mut estimator, 100_000 + 1_000 * i, 40, 1);
            assert!(matches!(verdict, Verdict::Accepted { .. }));
        }
        assert_eq!(estimator.accepted_samples(), WINDOW);
        assert_eq!(estimator.current_offset(), TRUE_OFFSET + 1);
    }

    #[test]
    fn test_reset() {
        let mut estimator = OffsetEstimator::new();
        feed(&mut estimator, 0, 40, 0);
        estimator.reset();
        assert!(!estimator.is_synchronized());
        assert_eq!(estimator.accepted_samples(), 0);
    }
}
