#![deny(unsafe_code)]
#![deny(warnings)]
//! Log console display
//!
//! Stands in for a panel until one is wired up: every screen change is
//! written to the defmt log. The render tick runs every 10 ms but the
//! countdown only changes once a second, so unchanged screens are skipped.

use defmt::{info, warn};
use hal_abstractions::{CountdownView, LinkIndicator, TimerDisplay};

/// Display configuration
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Whole-hour offset from UTC for the clock of day
    pub utc_offset_hours: i8,
    /// Render tick period in milliseconds
    pub tick_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 0,
            tick_ms: 10,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Screen {
    Waiting,
    Error(u16),
    Countdown { minutes: u32, seconds: u8, color: u32 },
}

/// `TimerDisplay` that prints to the defmt log
pub struct ConsoleDisplay {
    last: Option<(Screen, LinkIndicator)>,
}

impl ConsoleDisplay {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Record `screen` and report whether it differs from the last one
    fn changed(&mut self, screen: Screen, link: LinkIndicator) -> bool {
        let next = Some((screen, link));
        if self.last == next {
            return false;
        }
        self.last = next;
        true
    }
}

impl TimerDisplay for ConsoleDisplay {
    fn show_waiting(&mut self, link: LinkIndicator) {
        if self.changed(Screen::Waiting, link) {
            info!("[{}] waiting for timer", link);
        }
    }

    fn show_error(&mut self, code: u16, link: LinkIndicator) {
        if self.changed(Screen::Error(code), link) {
            warn!("[{}] timer server error {}", link, code);
        }
    }

    fn show_countdown(&mut self, view: &CountdownView<'_>, link: LinkIndicator) {
        let screen = Screen::Countdown {
            minutes: view.minutes,
            seconds: view.seconds,
            color: view.color,
        };
        if !self.changed(screen, link) {
            return;
        }

        match view.clock {
            Some((hour, minute)) => info!(
                "[{}] {=[u8]:a} {}:{=u8:02} #{=u32:06x} | {=u8:02}:{=u8:02}",
                link, view.label, view.minutes, view.seconds, view.color, hour, minute
            ),
            None => info!(
                "[{}] {=[u8]:a} {}:{=u8:02} #{=u32:06x}",
                link, view.label, view.minutes, view.seconds, view.color
            ),
        }
    }
}
