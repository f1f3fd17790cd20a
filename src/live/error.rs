use crate::live::period::GamePhase;
use courtside_api::{PlayerId, Side};
use thiserror::Error;

pub type LiveResult<T> = Result<T, LiveError>;

/// Operator input rejected before anything reaches the backend. State is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveError {
    #[error("invalid clock time {minutes}:{seconds:02} (minutes >= 0, seconds 0-59)")]
    InvalidTime { minutes: i64, seconds: i64 },
    #[error("cannot read \"{0}\" as mm:ss")]
    UnreadableTime(String),
    #[error("correction of {delta} would leave a negative score")]
    NegativeScore { delta: i32 },
    #[error("{0} is not a valid point value (use 1, 2 or 3)")]
    InvalidPointValue(i32),
    #[error("{name} already has {fouls} fouls")]
    FoulLimitReached { name: String, fouls: u8 },
    #[error("{0} already has five starters selected")]
    LineupFull(Side),
    #[error("{side} has {selected} of 5 starters selected")]
    LineupIncomplete { side: Side, selected: usize },
    #[error("both teams must confirm their starting five first")]
    LineupsNotConfirmed,
    #[error("player {player} is not on the {side} roster")]
    UnknownPlayer { side: Side, player: PlayerId },
    #[error("{0} is not on the court")]
    PlayerNotOnCourt(String),
    #[error("{0} is not on the bench")]
    PlayerNotOnBench(String),
    #[error("{0} has fouled out")]
    PlayerFouledOut(String),
    #[error("{0} has no timeouts left")]
    NoTimeoutsLeft(Side),
    #[error("cannot advance past period {period} by hand; wait for the clock to expire")]
    AdvanceBlocked { period: u8 },
    #[error("cannot {action} during {phase}")]
    InvalidPhase { action: &'static str, phase: GamePhase },
    #[error("the match is finished")]
    MatchFinished,
    #[error("nothing is waiting for confirmation")]
    NothingToConfirm,
}
