pub mod client;
pub mod identity;
pub mod realtime;
pub mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use client::{ApiError, ApiResult, LeagueApi};
pub use identity::{Identity, User};
pub use realtime::{GameUpdate, SyncMessage};

pub type MatchId = u64;
pub type TeamId = u64;
pub type PlayerId = u64;
pub type TournamentId = u64;

// ---------------------------------------------------------------------------
// Domain types, independent of the backend wire format
// ---------------------------------------------------------------------------

/// Which bench a team sits on for this match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Local,
    Visitor,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Local => Side::Visitor,
            Side::Visitor => Side::Local,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Side::Local => "Local",
            Side::Visitor => "Visitor",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    InProgress,
    Finished,
}

impl MatchStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "Scheduled",
            MatchStatus::InProgress => "Live",
            MatchStatus::Finished => "Final",
        }
    }
}

/// Team line of a match listing: who is playing and the running score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamScore {
    pub id: TeamId,
    pub name: String,
    pub logo: Option<String>,
    pub points: u32,
}

/// One scheduled game as shown on the scoreboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSummary {
    pub id: MatchId,
    pub tournament_id: Option<TournamentId>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub court: Option<String>,
    pub status: MatchStatus,
    pub local: TeamScore,
    pub visitor: TeamScore,
    pub period: Option<u8>,
    pub remaining_seconds: Option<u32>,
}

impl MatchSummary {
    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::InProgress
    }

    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    pub fn team(&self, side: Side) -> &TeamScore {
        match side {
            Side::Local => &self.local,
            Side::Visitor => &self.visitor,
        }
    }

    /// Higher score wins; `None` while unfinished or level.
    pub fn winner(&self) -> Option<Side> {
        if !self.is_finished() {
            return None;
        }
        match self.local.points.cmp(&self.visitor.points) {
            std::cmp::Ordering::Greater => Some(Side::Local),
            std::cmp::Ordering::Less => Some(Side::Visitor),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterPlayer {
    pub id: PlayerId,
    pub name: String,
    pub number: u16,
    pub on_court: bool,
    pub points: u32,
    pub fouls: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamRoster {
    pub id: TeamId,
    pub name: String,
    pub logo: Option<String>,
    pub points: u32,
    pub fouls: u32,
    pub timeouts_remaining: Option<u8>,
    pub players: Vec<RosterPlayer>,
}

/// Full live state of one match: both rosters plus score, period and clock hints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSnapshot {
    pub id: MatchId,
    pub tournament_id: Option<TournamentId>,
    pub status: MatchStatus,
    pub period: Option<u8>,
    pub remaining_seconds: Option<u32>,
    pub local: TeamRoster,
    pub visitor: TeamRoster,
}

impl MatchSnapshot {
    pub fn team(&self, side: Side) -> &TeamRoster {
        match side {
            Side::Local => &self.local,
            Side::Visitor => &self.visitor,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandingRow {
    pub position: u16,
    pub team_id: TeamId,
    pub team_name: String,
    pub played: u16,
    pub won: u16,
    pub lost: u16,
    pub points_for: u32,
    pub points_against: u32,
    pub standing_points: u32,
}

impl StandingRow {
    pub fn point_difference(&self) -> i64 {
        i64::from(self.points_for) - i64::from(self.points_against)
    }
}
