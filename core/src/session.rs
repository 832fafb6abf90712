//! Timer server session driver
//!
//! [`Session`] holds no I/O. The board's network actor feeds it connection
//! events, inbound text frames and the local time, and sends whatever bytes
//! it asks for. Everything it learns goes into [`SharedState`].

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::TimerConfig;
use crate::error::ProtocolError;
use crate::offset::Verdict;
use crate::probe::{ProbeAction, TimeProbe};
use crate::protocol::{self, Inbound};
use crate::state::SharedState;

/// What the network actor should do after [`Session::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionAction {
    Idle,
    /// Send the first `n` bytes of the buffer as a text frame
    Send(usize),
    /// Drop the connection and dial again
    Reconnect,
}

/// Effect of one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Applied {
    /// New configuration with this many valid segments is in effect
    Timer { segments: usize },
    /// Round-trip sample fed to the estimator
    Sample(Verdict),
    /// Timestamp with no probe outstanding
    Unsolicited,
    /// Server reported an error code
    UpstreamError(u16),
}

pub struct Session<'a, M: RawMutex> {
    state: &'a SharedState<M>,
    timer_id: &'a str,
    probe: TimeProbe,
}

impl<'a, M: RawMutex> Session<'a, M> {
    pub fn new(state: &'a SharedState<M>, timer_id: &'a str) -> Self {
        Self {
            state,
            timer_id,
            probe: TimeProbe::new(),
        }
    }

    /// A connection was established; returns the length of the `Hello`
    /// frame written to `buf`.
    pub fn on_connected(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        self.probe.reset();
        self.state.set_server_connected(true);
        info!("Timer server connected");
        protocol::encode_hello(self.timer_id, buf)
    }

    /// The connection is gone. Configuration and offset survive, so the
    /// display keeps counting down while reconnecting.
    pub fn on_disconnected(&mut self) {
        self.probe.reset();
        self.state.set_server_connected(false);
        info!("Timer server disconnected");
    }

    pub fn poll(&mut self, now: u64, buf: &mut [u8]) -> SessionAction {
        match self.probe.poll(now) {
            ProbeAction::Idle => SessionAction::Idle,
            ProbeAction::Stalled => {
                warn!("No time reply for {} ms, reconnecting", crate::probe::STALL_TIMEOUT_MS);
                SessionAction::Reconnect
            }
            ProbeAction::Send => match protocol::encode_get_time(buf) {
                Ok(len) => SessionAction::Send(len),
                Err(e) => {
                    warn!("Failed to encode time probe: {}", e);
                    SessionAction::Idle
                }
            },
        }
    }

    /// Decode one inbound text frame received at local time `now` and apply
    /// it. On error nothing in the shared state has changed.
    pub fn on_text(&mut self, frame: &[u8], now: u64) -> Result<Applied, ProtocolError> {
        let message = protocol::decode(frame).inspect_err(|e| {
            warn!("Dropping inbound frame ({} bytes): {}", frame.len(), e);
        })?;

        match message {
            Inbound::Timer(payload) => {
                let config = TimerConfig::from_wire(&payload).inspect_err(|e| {
                    warn!("Rejecting timer with {} segments: {}", payload.segments.len(), e);
                })?;
                let segments = config.segments.len();
                self.state.replace_config(config);
                self.state.clear_error();
                info!("Timer updated: {} segments", segments);
                Ok(Applied::Timer { segments })
            }
            Inbound::Timestamp(server_time) => match self.probe.on_response(now) {
                Some((sent_at, received_at)) => {
                    let verdict = self
                        .state
                        .record_round_trip(server_time, sent_at, received_at);
                    debug!("Time sample: rtt {} ms, {}", received_at - sent_at, verdict);
                    Ok(Applied::Sample(verdict))
                }
                None => {
                    debug!("Ignoring unsolicited timestamp");
                    Ok(Applied::Unsolicited)
                }
            },
            Inbound::Error(code) => {
                warn!("Timer server error {}", code);
                self.state.set_error(code);
                Ok(Applied::UpstreamError(code))
            }
        }
    }
}
