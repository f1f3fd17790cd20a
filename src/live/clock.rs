use crate::live::error::{LiveError, LiveResult};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClockMode {
    #[default]
    Regulation,
    Timeout,
    Halftime,
    Overtime,
}

impl fmt::Display for ClockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClockMode::Regulation => "REGULATION",
            ClockMode::Timeout => "TIMEOUT",
            ClockMode::Halftime => "HALFTIME",
            ClockMode::Overtime => "OVERTIME",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Clock stopped, or the tick came from a superseded tick source.
    Ignored,
    Running,
    /// The clock just reached zero and stopped itself.
    Expired,
}

/// Countdown clock driven by external one-second ticks.
///
/// Every start or stop bumps the epoch. A tick only counts when it carries the
/// current epoch, so at most one tick source is ever effective and ticks still
/// queued from before a pause are dropped.
#[derive(Debug, Clone, Default)]
pub struct GameClock {
    remaining: u32,
    running: bool,
    mode: ClockMode,
    epoch: u64,
}

impl GameClock {
    pub fn new(remaining: u32, mode: ClockMode) -> Self {
        Self { remaining, running: false, mode, epoch: 0 }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ClockMode) {
        self.mode = mode;
    }

    /// Epoch a tick source must present, while the clock runs.
    pub fn tick_epoch(&self) -> Option<u64> {
        self.running.then_some(self.epoch)
    }

    /// Returns false when already running or when there is nothing left to count.
    pub fn start(&mut self) -> bool {
        if self.running || self.remaining == 0 {
            return false;
        }
        self.running = true;
        self.epoch += 1;
        true
    }

    pub fn pause(&mut self) {
        if self.running {
            self.running = false;
            self.epoch += 1;
        }
    }

    pub fn reset(&mut self, to_secs: u32) {
        self.pause();
        self.remaining = to_secs;
    }

    pub fn adjust(&mut self, delta_secs: i64) {
        let next = i64::from(self.remaining).saturating_add(delta_secs);
        self.remaining = next.clamp(0, i64::from(u32::MAX)) as u32;
    }

    pub fn edit_absolute(&mut self, minutes: i64, seconds: i64) -> LiveResult<()> {
        if minutes < 0 || !(0..60).contains(&seconds) {
            return Err(LiveError::InvalidTime { minutes, seconds });
        }
        let total = minutes.saturating_mul(60).saturating_add(seconds);
        self.remaining = total.min(i64::from(u32::MAX)) as u32;
        Ok(())
    }

    pub fn tick(&mut self, epoch: u64) -> TickOutcome {
        if !self.running || epoch != self.epoch {
            return TickOutcome::Ignored;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.pause();
            return TickOutcome::Expired;
        }
        TickOutcome::Running
    }

    pub fn display(&self) -> String {
        format_clock(self.remaining)
    }
}

pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Parses operator input such as "7:05", "07:05" or "45" (seconds only).
pub fn parse_clock(input: &str) -> LiveResult<(i64, i64)> {
    let input = input.trim();
    let unreadable = || LiveError::UnreadableTime(input.to_string());
    let number = |s: &str| s.trim().parse::<i64>().map_err(|_| unreadable());
    match input.split_once(':') {
        Some((m, s)) => Ok((number(m)?, number(s)?)),
        None => Ok((0, number(input)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_clock(secs: u32) -> (GameClock, u64) {
        let mut clock = GameClock::new(secs, ClockMode::Regulation);
        assert!(clock.start());
        let epoch = clock.tick_epoch().unwrap();
        (clock, epoch)
    }

    #[test]
    fn tick_decrements_by_one_while_running() {
        let (mut clock, epoch) = running_clock(10);
        assert_eq!(clock.tick(epoch), TickOutcome::Running);
        assert_eq!(clock.remaining(), 9);
    }

    #[test]
    fn paused_clock_ignores_ticks() {
        let (mut clock, epoch) = running_clock(10);
        clock.pause();
        for _ in 0..5 {
            assert_eq!(clock.tick(epoch), TickOutcome::Ignored);
        }
        assert_eq!(clock.remaining(), 10);
        assert_eq!(clock.tick_epoch(), None);
    }

    #[test]
    fn double_start_keeps_a_single_tick_source() {
        let (mut clock, epoch) = running_clock(10);
        assert!(!clock.start());
        assert_eq!(clock.tick_epoch(), Some(epoch));
        clock.tick(epoch);
        assert_eq!(clock.remaining(), 9);
    }

    #[test]
    fn ticks_from_a_superseded_source_are_dropped() {
        let (mut clock, old) = running_clock(10);
        clock.pause();
        clock.start();
        assert_eq!(clock.tick(old), TickOutcome::Ignored);
        let current = clock.tick_epoch().unwrap();
        assert_eq!(clock.tick(current), TickOutcome::Running);
        assert_eq!(clock.remaining(), 9);
    }

    #[test]
    fn expiry_fires_once_and_stops() {
        let (mut clock, epoch) = running_clock(2);
        assert_eq!(clock.tick(epoch), TickOutcome::Running);
        assert_eq!(clock.tick(epoch), TickOutcome::Expired);
        assert!(!clock.is_running());
        assert_eq!(clock.remaining(), 0);
        assert_eq!(clock.tick(epoch), TickOutcome::Ignored);
        assert!(!clock.start(), "cannot restart an expired clock");
    }

    #[test]
    fn reset_pauses() {
        let (mut clock, _) = running_clock(30);
        clock.reset(600);
        assert!(!clock.is_running());
        assert_eq!(clock.remaining(), 600);
    }

    #[test]
    fn adjust_clamps_at_zero() {
        let mut clock = GameClock::new(5, ClockMode::Regulation);
        clock.adjust(-10);
        assert_eq!(clock.remaining(), 0);
        clock.adjust(65);
        assert_eq!(clock.display(), "01:05");
    }

    #[test]
    fn edit_absolute_validates_range() {
        let mut clock = GameClock::new(5, ClockMode::Regulation);
        assert!(matches!(clock.edit_absolute(3, 60), Err(LiveError::InvalidTime { .. })));
        assert!(matches!(clock.edit_absolute(-1, 0), Err(LiveError::InvalidTime { .. })));
        assert!(matches!(clock.edit_absolute(0, -1), Err(LiveError::InvalidTime { .. })));
        assert_eq!(clock.remaining(), 5);
        clock.edit_absolute(7, 59).unwrap();
        assert_eq!(clock.remaining(), 7 * 60 + 59);
    }

    #[test]
    fn parse_clock_input() {
        assert_eq!(parse_clock("7:05").unwrap(), (7, 5));
        assert_eq!(parse_clock(" 45 ").unwrap(), (0, 45));
        assert!(parse_clock("x:10").is_err());
    }
}
