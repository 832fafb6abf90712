//! Render tick
//!
//! Decides what the display shows right now and makes exactly one call on
//! the [`TimerDisplay`]. Priority: upstream error, then "waiting" while there
//! is nothing to count down, then the active segment.

use embassy_sync::blocking_mutex::raw::RawMutex;
use hal_abstractions::{CountdownView, MonotonicClock, TimerDisplay};

use crate::clock::{clock_of_day, SyncedClock};
use crate::label;
use crate::schedule::{self, Phase};
use crate::state::SharedState;

/// Draw one frame
pub fn render<C, M, D>(
    state: &SharedState<M>,
    clock: &SyncedClock<'_, C, M>,
    display: &mut D,
    utc_offset_hours: i8,
) where
    C: MonotonicClock,
    M: RawMutex,
    D: TimerDisplay,
{
    let link = state.link();

    if let Some(code) = state.error() {
        display.show_error(code, link);
        return;
    }

    let now = clock.now();
    let (active, show_clock) =
        state.with_config(|config| (schedule::compute(config, now), config.show_clock));

    if active.phase == Phase::Unconfigured {
        display.show_waiting(link);
        return;
    }

    let glyphs = label::transliterate_cp437(&active.label);
    let remaining = active.remaining_seconds.max(0) as u64;
    let view = CountdownView {
        label: &glyphs,
        minutes: u32::try_from(remaining / 60).unwrap_or(u32::MAX),
        seconds: (remaining % 60) as u8,
        color: active.color.0,
        clock: show_clock.then(|| clock_of_day(active.reference_instant, utc_offset_hours)),
    };
    display.show_countdown(&view, link);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::config::{Segment, TimerConfig};
    use core::cell::Cell;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use hal_abstractions::LinkIndicator;

    type State = SharedState<CriticalSectionRawMutex>;

    struct FakeClock(Cell<u64>);

    impl MonotonicClock for FakeClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    #[derive(Debug, PartialEq)]
    enum Shown {
        Nothing,
        Waiting(LinkIndicator),
        Error(u16, LinkIndicator),
        Countdown {
            label: heapless::Vec<u8, 31>,
            minutes: u32,
            seconds: u8,
            color: u32,
            clock: Option<(u8, u8)>,
            link: LinkIndicator,
        },
    }

    struct Recorder(Shown);

    impl TimerDisplay for Recorder {
        fn show_waiting(&mut self, link: LinkIndicator) {
            self.0 = Shown::Waiting(link);
        }

        fn show_error(&mut self, code: u16, link: LinkIndicator) {
            self.0 = Shown::Error(code, link);
        }

        fn show_countdown(&mut self, view: &CountdownView<'_>, link: LinkIndicator) {
            self.0 = Shown::Countdown {
                label: heapless::Vec::from_slice(view.label).unwrap(),
                minutes: view.minutes,
                seconds: view.seconds,
                color: view.color,
                clock: view.clock,
                link,
            };
        }
    }

    /// Synchronized so that local 0 is server time 1_700_000_000_000
    /// (22:13:20 UTC), with a 90 s "Prüfung" segment starting there.
    fn configured_state(show_clock: bool) -> State {
        let state = State::new();
        state.record_round_trip(1_700_000_000_000, 0, 0);
        let mut config = TimerConfig {
            valid: true,
            start_at: 1_700_000_000_000,
            show_clock,
            ..TimerConfig::unconfigured()
        };
        config
            .segments
            .push(Segment {
                duration_ms: 90_000,
                count_to_offset_ms: 0,
                plays_sound: false,
                color: Rgb(0x123456),
                label: label::truncate("Prüfung"),
            })
            .unwrap();
        state.replace_config(config);
        state
    }

    fn draw(state: &State, local_ms: u64, utc_offset_hours: i8) -> Shown {
        let local = FakeClock(Cell::new(local_ms));
        let clock = SyncedClock::new(&local, state);
        let mut display = Recorder(Shown::Nothing);
        render(state, &clock, &mut display, utc_offset_hours);
        display.0
    }

    #[test]
    fn test_waiting_until_synchronized() {
        let state = State::new();
        state.replace_config(configured_state(false).with_config(|c| c.clone()));
        assert_eq!(draw(&state, 0, 0), Shown::Waiting(LinkIndicator::Offline));
    }

    #[test]
    fn test_waiting_without_config() {
        let state = State::new();
        state.record_round_trip(1_700_000_000_000, 0, 0);
        state.set_network_up(true);
        assert_eq!(
            draw(&state, 0, 0),
            Shown::Waiting(LinkIndicator::ServerUnreachable)
        );
    }

    #[test]
    fn test_error_takes_priority() {
        let state = configured_state(false);
        state.set_error(404);
        state.set_network_up(true);
        state.set_server_connected(true);
        assert_eq!(draw(&state, 0, 0), Shown::Error(404, LinkIndicator::Online));
    }

    #[test]
    fn test_countdown() {
        let state = configured_state(false);
        // 10.5 s in: 79.5 s left
        let shown = draw(&state, 10_500, 0);
        assert_eq!(
            shown,
            Shown::Countdown {
                label: heapless::Vec::from_slice(b"Pr\x81fung").unwrap(),
                minutes: 1,
                seconds: 19,
                color: 0x123456,
                clock: None,
                link: LinkIndicator::Offline,
            }
        );
    }

    #[test]
    fn test_countdown_with_clock() {
        let state = configured_state(true);
        let Shown::Countdown { clock, .. } = draw(&state, 60_000, 1) else {
            panic!("expected countdown");
        };
        assert_eq!(clock, Some((23, 14)));
    }
}
