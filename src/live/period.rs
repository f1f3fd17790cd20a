use crate::live::error::{LiveError, LiveResult};
use crate::live::rules::{REGULATION_PERIODS, is_overtime, period_label};
use courtside_api::Side;
use std::cmp::Ordering;
use std::fmt;

/// High-level phases of a refereed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Starting fives are being picked; the clock cannot run.
    SelectingRosters,
    Regulation,
    Halftime,
    Overtime,
    /// A team timeout is running; the interrupted phase is saved by the session.
    Timeout,
    /// Terminal. `winner` is `None` only for results imported level from the backend.
    Finished { winner: Option<Side> },
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GamePhase::SelectingRosters => f.write_str("roster selection"),
            GamePhase::Regulation => f.write_str("regulation"),
            GamePhase::Halftime => f.write_str("halftime"),
            GamePhase::Overtime => f.write_str("overtime"),
            GamePhase::Timeout => f.write_str("a timeout"),
            GamePhase::Finished { .. } => f.write_str("the finished match"),
        }
    }
}

/// What a period boundary (clock expiry or manual advance) led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Q1 or Q3 is over; the clock stays at zero until the operator advances.
    PeriodOver { period: u8 },
    HalftimeStarted,
    /// The halftime clock ran out; waiting for the operator.
    HalftimeOver,
    PeriodStarted { period: u8 },
    OvertimeStarted { period: u8 },
    Finished { winner: Side },
}

/// Tie-break at the end of the fourth period or any overtime.
pub fn settle(period: u8, local: u32, visitor: u32) -> Transition {
    match local.cmp(&visitor) {
        Ordering::Equal => Transition::OvertimeStarted { period: period.saturating_add(1) },
        Ordering::Greater => Transition::Finished { winner: Side::Local },
        Ordering::Less => Transition::Finished { winner: Side::Visitor },
    }
}

#[derive(Debug, Clone)]
pub struct PeriodMachine {
    phase: GamePhase,
    period: u8,
    awaiting_advance: bool,
}

impl Default for PeriodMachine {
    fn default() -> Self {
        Self { phase: GamePhase::SelectingRosters, period: 1, awaiting_advance: false }
    }
}

impl PeriodMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks up a match the backend already reports as running.
    pub fn resume(period: u8) -> Self {
        let period = period.max(1);
        let phase = if is_overtime(period) { GamePhase::Overtime } else { GamePhase::Regulation };
        Self { phase, period, awaiting_advance: false }
    }

    pub fn finished(period: u8, winner: Option<Side>) -> Self {
        Self { phase: GamePhase::Finished { winner }, period: period.max(1), awaiting_advance: false }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn period(&self) -> u8 {
        self.period
    }

    pub fn awaiting_advance(&self) -> bool {
        self.awaiting_advance
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Finished { .. })
    }

    pub fn label(&self) -> String {
        match self.phase {
            GamePhase::SelectingRosters => "PRE".to_string(),
            GamePhase::Halftime => "HALF".to_string(),
            GamePhase::Finished { .. } => "FINAL".to_string(),
            _ => period_label(self.period),
        }
    }

    pub fn begin(&mut self) -> LiveResult<()> {
        if self.phase != GamePhase::SelectingRosters {
            return Err(LiveError::InvalidPhase { action: "start the match", phase: self.phase });
        }
        self.phase = GamePhase::Regulation;
        self.period = 1;
        self.awaiting_advance = false;
        Ok(())
    }

    /// Evaluates a period boundary after the clock ran out.
    pub fn on_clock_expired(&mut self, local: u32, visitor: u32) -> Option<Transition> {
        match self.phase {
            GamePhase::Regulation if self.period == 2 => Some(self.enter_halftime()),
            GamePhase::Regulation if self.period < REGULATION_PERIODS => {
                self.awaiting_advance = true;
                Some(Transition::PeriodOver { period: self.period })
            }
            GamePhase::Regulation | GamePhase::Overtime => Some(self.apply_settle(local, visitor)),
            GamePhase::Halftime => {
                self.awaiting_advance = true;
                Some(Transition::HalftimeOver)
            }
            // The timeout one-shot restores the clock, not the countdown itself.
            GamePhase::Timeout | GamePhase::SelectingRosters | GamePhase::Finished { .. } => None,
        }
    }

    /// Operator-triggered "next period".
    ///
    /// From the fourth period on, regulation can only end through clock expiry. In
    /// overtime the advance runs the same tie-break as expiry.
    pub fn advance(&mut self, local: u32, visitor: u32) -> LiveResult<Transition> {
        match self.phase {
            GamePhase::Finished { .. } => Err(LiveError::MatchFinished),
            GamePhase::SelectingRosters | GamePhase::Timeout => {
                Err(LiveError::InvalidPhase { action: "advance the period", phase: self.phase })
            }
            GamePhase::Halftime => {
                self.phase = GamePhase::Regulation;
                self.period = 3;
                self.awaiting_advance = false;
                Ok(Transition::PeriodStarted { period: 3 })
            }
            GamePhase::Regulation if self.period >= REGULATION_PERIODS => {
                Err(LiveError::AdvanceBlocked { period: self.period })
            }
            GamePhase::Regulation if self.period == 2 => Ok(self.enter_halftime()),
            GamePhase::Regulation => {
                self.period += 1;
                self.awaiting_advance = false;
                Ok(Transition::PeriodStarted { period: self.period })
            }
            GamePhase::Overtime => Ok(self.apply_settle(local, visitor)),
        }
    }

    /// Returns the interrupted phase, to be handed back to [`Self::leave_timeout`].
    pub fn enter_timeout(&mut self) -> LiveResult<GamePhase> {
        match self.phase {
            GamePhase::Regulation | GamePhase::Overtime => {
                let prior = self.phase;
                self.phase = GamePhase::Timeout;
                Ok(prior)
            }
            GamePhase::Finished { .. } => Err(LiveError::MatchFinished),
            phase => Err(LiveError::InvalidPhase { action: "call a timeout", phase }),
        }
    }

    pub fn leave_timeout(&mut self, prior: GamePhase) {
        if self.phase == GamePhase::Timeout {
            self.phase = prior;
        }
    }

    fn enter_halftime(&mut self) -> Transition {
        self.phase = GamePhase::Halftime;
        self.awaiting_advance = false;
        Transition::HalftimeStarted
    }

    fn apply_settle(&mut self, local: u32, visitor: u32) -> Transition {
        let transition = settle(self.period, local, visitor);
        match transition {
            Transition::OvertimeStarted { period } => {
                self.phase = GamePhase::Overtime;
                self.period = period;
            }
            Transition::Finished { winner } => {
                self.phase = GamePhase::Finished { winner: Some(winner) };
            }
            _ => {}
        }
        self.awaiting_advance = false;
        transition
    }
}
