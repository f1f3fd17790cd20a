pub const REGULATION_PERIODS: u8 = 4;
pub const TIMEOUTS_PER_GAME: u8 = 3;
pub const FOUL_LIMIT: u8 = 5;
pub const LINEUP_SIZE: usize = 5;

/// Durations of the match clock phases, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    pub quarter_secs: u32,
    pub overtime_secs: u32,
    pub halftime_secs: u32,
    pub timeout_secs: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            quarter_secs: 10 * 60,
            overtime_secs: 5 * 60,
            halftime_secs: 15 * 60,
            timeout_secs: 60,
        }
    }
}

impl GameRules {
    pub fn period_secs(&self, period: u8) -> u32 {
        if is_overtime(period) {
            self.overtime_secs
        } else {
            self.quarter_secs
        }
    }
}

pub fn is_overtime(period: u8) -> bool {
    period > REGULATION_PERIODS
}

/// "Q3", "OT1", "OT2"...
pub fn period_label(period: u8) -> String {
    if is_overtime(period) {
        format!("OT{}", period - REGULATION_PERIODS)
    } else {
        format!("Q{period}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overtime_periods_use_overtime_duration() {
        let rules = GameRules::default();
        assert_eq!(rules.period_secs(4), 600);
        assert_eq!(rules.period_secs(5), 300);
        assert_eq!(rules.period_secs(7), 300);
    }

    #[test]
    fn labels() {
        assert_eq!(period_label(1), "Q1");
        assert_eq!(period_label(5), "OT1");
        assert_eq!(period_label(6), "OT2");
    }
}
