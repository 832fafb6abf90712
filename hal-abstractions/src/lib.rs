//! Hardware abstraction traits for the countdown display firmware
//!
//! This crate defines traits that abstract over hardware differences
//! between boards. BSPs implement these traits; `timer-core` consumes them.

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod display;

pub use clock::MonotonicClock;
pub use display::{CountdownView, LinkIndicator, TimerDisplay};
