/// League backend raw wire types: serde shapes for backend requests and responses.
/// These map to the clean domain types in `client.rs`.
use crate::{PlayerId, Side};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Matches  (GET /matches/{id}, GET /tournaments/{id}/matches)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct MatchWire {
    pub id: u64,
    pub tournament: Option<u64>,
    /// "2026-03-14"
    pub date: Option<String>,
    /// "18:30" or "18:30:00"
    pub time: Option<String>,
    pub court: Option<String>,
    pub status: Option<String>,
    pub team_local: Option<TeamRefWire>,
    pub team_visitor: Option<TeamRefWire>,
    pub points_local: Option<u32>,
    pub points_visitor: Option<u32>,
    pub current_period: Option<u8>,
    pub remaining_seconds: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TeamRefWire {
    pub id: u64,
    pub name: Option<String>,
    pub logo: Option<String>,
}

/// Some list endpoints paginate, others return a bare array.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum ListWire<T> {
    Paged { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Default for ListWire<T> {
    fn default() -> Self {
        ListWire::Bare(Vec::new())
    }
}

impl<T> ListWire<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListWire::Paged { results } => results,
            ListWire::Bare(items) => items,
        }
    }
}

// ---------------------------------------------------------------------------
// Live match  (GET /matches/{id}/live)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LiveMatchWire {
    #[serde(rename = "match")]
    pub match_info: MatchWire,
    pub local: Option<TeamRosterWire>,
    pub visitor: Option<TeamRosterWire>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TeamRosterWire {
    pub id: u64,
    pub name: Option<String>,
    pub logo: Option<String>,
    pub points: Option<u32>,
    pub fouls: Option<u32>,
    pub timeouts_remaining: Option<u8>,
    #[serde(default)]
    pub players: Vec<PlayerWire>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PlayerWire {
    pub id: u64,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub number: Option<u16>,
    #[serde(default)]
    pub on_court: bool,
    pub points: Option<u32>,
    pub fouls: Option<u8>,
}

// ---------------------------------------------------------------------------
// Standings  (GET /tournaments/{id}/standings)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct StandingWire {
    pub position: Option<u16>,
    pub team: TeamRefWire,
    pub played: Option<u16>,
    pub won: Option<u16>,
    pub lost: Option<u16>,
    pub points_for: Option<u32>,
    pub points_against: Option<u32>,
    /// League table points, not basket points.
    pub points: Option<u32>,
}

// ---------------------------------------------------------------------------
// Action submission bodies  (POST /matches/{id}/...)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PointsPayload {
    pub team: Side,
    pub player: PlayerId,
    pub points: i32,
    pub period: u8,
    pub clock_seconds: u32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FoulPayload {
    pub team: Side,
    pub player: PlayerId,
    pub period: u8,
    pub clock_seconds: u32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SubstitutionPayload {
    pub team: Side,
    pub player_out: PlayerId,
    pub player_in: PlayerId,
    pub period: u8,
    pub clock_seconds: u32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LineupsPayload {
    pub local: Vec<PlayerId>,
    pub visitor: Vec<PlayerId>,
}
