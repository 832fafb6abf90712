//! Platform-agnostic core logic for the countdown display firmware
//!
//! This crate contains everything that does not touch hardware: the
//! server-clock offset estimator, the segment scheduler, the timer data model
//! and wire protocol, and the session/render state machines the board drives.
//! It has NO hardware dependencies and its unit tests run on the host.
//!
//! ## Data flow
//!
//! ```text
//! network actor ──frames──▶ Session ──┬─▶ OffsetEstimator ─┐
//!                                     └─▶ TimerConfig ─────┤ SharedState
//!                                                          │
//! render tick ◀── compute(TimerConfig, SyncedClock::now()) ◀┘
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

#[macro_use]
mod fmt;

pub mod clock;
pub mod color;
pub mod config;
pub mod error;
pub mod label;
pub mod offset;
pub mod probe;
pub mod protocol;
pub mod render;
pub mod schedule;
pub mod session;
pub mod state;
pub mod ws;

pub use clock::{SyncedClock, SyncedInstant};
pub use color::Rgb;
pub use config::{PreStartBehavior, Segment, TimerConfig, MAX_SEGMENTS};
pub use error::{ProtocolError, WsError};
pub use offset::OffsetEstimator;
pub use render::render;
pub use schedule::{compute, ActiveSegment, Phase};
pub use session::{Applied, Session, SessionAction};
pub use state::{SharedState, SyncStatus};
