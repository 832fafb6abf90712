//! Rendering collaborator
//!
//! The panel technology (HUB75 matrix, NeoPixel tiles, a log console) is
//! hidden behind [`TimerDisplay`]. Implementors only draw; every decision
//! about *what* to show is made before these methods are called.

/// Connectivity indicator drawn in the corner of every screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkIndicator {
    /// Network up and timer server connected
    Online,
    /// Network up, timer server not reachable
    ServerUnreachable,
    /// No network link
    Offline,
}

/// One frame of the countdown screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownView<'a> {
    /// Segment label, already transliterated to code page 437 glyph indices
    pub label: &'a [u8],
    pub minutes: u32,
    pub seconds: u8,
    /// Packed 0xRRGGBB
    pub color: u32,
    /// Clock of day `(hour, minute)` when the timer asks for it
    pub clock: Option<(u8, u8)>,
}

/// Trait for the device's display
///
/// Called from the render tick, which has a soft deadline of about 10 ms.
/// Implementations must not block on I/O.
pub trait TimerDisplay {
    /// Nothing to show yet: not synchronized or no timer configured
    fn show_waiting(&mut self, link: LinkIndicator);

    /// Upstream error code (e.g. 404 = timer not found)
    fn show_error(&mut self, code: u16, link: LinkIndicator);

    /// Active segment countdown
    fn show_countdown(&mut self, view: &CountdownView<'_>, link: LinkIndicator);
}
