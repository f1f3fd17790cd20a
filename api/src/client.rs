use crate::identity::Identity;
use crate::wire::{
    FoulPayload, LineupsPayload, ListWire, LiveMatchWire, MatchWire, PlayerWire, PointsPayload,
    StandingWire, SubstitutionPayload, TeamRefWire, TeamRosterWire,
};
use crate::{
    MatchId, MatchSnapshot, MatchStatus, MatchSummary, PlayerId, RosterPlayer, Side, StandingRow,
    TeamRoster, TeamScore, TournamentId,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// League backend client: match snapshots, standings and referee action submission.
#[derive(Debug, Clone)]
pub struct LeagueApi {
    client: Client,
    base_url: String,
    identity: Identity,
    timeout: Duration,
}

impl Default for LeagueApi {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Identity::anonymous())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error for {1}: {0}")]
    Network(#[source] reqwest::Error, String),
    #[error("API error for {1}: {0}")]
    Api(#[source] reqwest::Error, String),
    #[error("Parse error for {1}: {0}")]
    Parsing(#[source] reqwest::Error, String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Error: {0}")]
    Other(String),
}

impl LeagueApi {
    pub fn new(base_url: impl Into<String>, identity: Identity) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("courtside/", env!("CARGO_PKG_VERSION"), " (referee console)"))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Snapshot fetching
    // -----------------------------------------------------------------------

    /// Fetch the full live state of a match: both rosters, score, period and clock hints.
    pub async fn get_live_match(&self, match_id: MatchId) -> ApiResult<MatchSnapshot> {
        let url = format!("{}/matches/{match_id}/live", self.base_url);
        let raw: LiveMatchWire = self.get(&url).await?;
        Ok(map_live_match(raw))
    }

    pub async fn get_match(&self, match_id: MatchId) -> ApiResult<MatchSummary> {
        let url = format!("{}/matches/{match_id}", self.base_url);
        let raw: MatchWire = self.get(&url).await?;
        Ok(map_match(&raw))
    }

    /// Every match of a tournament, used to refresh the scoreboard view.
    pub async fn list_matches(&self, tournament_id: TournamentId) -> ApiResult<Vec<MatchSummary>> {
        let url = format!("{}/tournaments/{tournament_id}/matches", self.base_url);
        let raw: ListWire<MatchWire> = self.get(&url).await?;
        Ok(raw.into_vec().iter().map(map_match).collect())
    }

    /// Standings are always pulled fresh; pushed payloads are never trusted for them.
    pub async fn get_standings(&self, tournament_id: TournamentId) -> ApiResult<Vec<StandingRow>> {
        let url = format!("{}/tournaments/{tournament_id}/standings", self.base_url);
        let raw: ListWire<StandingWire> = self.get(&url).await?;
        let mut rows: Vec<StandingRow> = raw
            .into_vec()
            .into_iter()
            .enumerate()
            .map(|(idx, s)| map_standing(idx, s))
            .collect();
        rows.sort_by_key(|r| r.position);
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Action submission
    // -----------------------------------------------------------------------

    pub async fn submit_points(
        &self,
        match_id: MatchId,
        side: Side,
        player: PlayerId,
        delta: i32,
        period: u8,
        clock_seconds: u32,
    ) -> ApiResult<()> {
        let url = format!("{}/matches/{match_id}/actions/points", self.base_url);
        let body = PointsPayload { team: side, player, points: delta, period, clock_seconds };
        self.post(&url, &body).await
    }

    pub async fn submit_foul(
        &self,
        match_id: MatchId,
        side: Side,
        player: PlayerId,
        period: u8,
        clock_seconds: u32,
    ) -> ApiResult<()> {
        let url = format!("{}/matches/{match_id}/actions/fouls", self.base_url);
        let body = FoulPayload { team: side, player, period, clock_seconds };
        self.post(&url, &body).await
    }

    pub async fn submit_substitution(
        &self,
        match_id: MatchId,
        side: Side,
        player_out: PlayerId,
        player_in: PlayerId,
        period: u8,
        clock_seconds: u32,
    ) -> ApiResult<()> {
        let url = format!("{}/matches/{match_id}/actions/substitutions", self.base_url);
        let body = SubstitutionPayload { team: side, player_out, player_in, period, clock_seconds };
        self.post(&url, &body).await
    }

    pub async fn submit_lineups(
        &self,
        match_id: MatchId,
        local: &[PlayerId],
        visitor: &[PlayerId],
    ) -> ApiResult<()> {
        let url = format!("{}/matches/{match_id}/lineups", self.base_url);
        let body = LineupsPayload { local: local.to_vec(), visitor: visitor.to_vec() };
        self.post(&url, &body).await
    }

    /// Report the final result; the backend becomes authoritative for it.
    pub async fn finalize_match(&self, match_id: MatchId) -> ApiResult<()> {
        let url = format!("{}/matches/{match_id}/finalize", self.base_url);
        self.post(&url, &serde_json::json!({})).await
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.identity.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .authorize(self.client.get(url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        check_status(response, url)?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parsing(e, url.to_owned()))
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> ApiResult<()> {
        let response = self
            .authorize(self.client.post(url))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        check_status(response, url).map(|_| ())
    }
}

fn check_status(response: reqwest::Response, url: &str) -> ApiResult<reqwest::Response> {
    match response.status() {
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(url.to_owned())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ApiError::Unauthorized(format!("{} for {url}", response.status())))
        }
        _ => response
            .error_for_status()
            .map_err(|e| ApiError::Api(e, url.to_owned())),
    }
}

// ---------------------------------------------------------------------------
// Mapping: backend wire types → clean domain types
// ---------------------------------------------------------------------------

/// Backend statuses come in a few spellings; unknown values read as scheduled.
pub fn parse_status(s: &str) -> MatchStatus {
    match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
        "IN_PROGRESS" | "LIVE" | "EN_CURSO" => MatchStatus::InProgress,
        "FINISHED" | "FINAL" | "FINALIZADO" => MatchStatus::Finished,
        _ => MatchStatus::Scheduled,
    }
}

fn parse_schedule(date: Option<&str>, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date?.trim(), "%Y-%m-%d").ok()?;
    let time = time
        .and_then(|t| {
            NaiveTime::parse_from_str(t.trim(), "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(t.trim(), "%H:%M"))
                .ok()
        })
        .unwrap_or_default();
    Some(date.and_time(time).and_utc())
}

fn map_team_ref(team: Option<&TeamRefWire>, points: Option<u32>) -> TeamScore {
    let Some(team) = team else {
        return TeamScore { name: "TBD".into(), points: points.unwrap_or(0), ..Default::default() };
    };
    TeamScore {
        id: team.id,
        name: team.name.clone().unwrap_or_else(|| format!("Team {}", team.id)),
        logo: team.logo.clone(),
        points: points.unwrap_or(0),
    }
}

fn map_match(raw: &MatchWire) -> MatchSummary {
    MatchSummary {
        id: raw.id,
        tournament_id: raw.tournament,
        scheduled_at: parse_schedule(raw.date.as_deref(), raw.time.as_deref()),
        court: raw.court.clone().filter(|c| !c.trim().is_empty()),
        status: raw.status.as_deref().map(parse_status).unwrap_or_default(),
        local: map_team_ref(raw.team_local.as_ref(), raw.points_local),
        visitor: map_team_ref(raw.team_visitor.as_ref(), raw.points_visitor),
        period: raw.current_period.filter(|p| *p > 0),
        remaining_seconds: raw.remaining_seconds,
    }
}

fn map_player(raw: PlayerWire) -> RosterPlayer {
    let name = raw
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            let full = [raw.first_name.as_deref(), raw.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            (!full.trim().is_empty()).then_some(full)
        })
        .unwrap_or_else(|| format!("Player {}", raw.id));
    RosterPlayer {
        id: raw.id,
        name,
        number: raw.number.unwrap_or(0),
        on_court: raw.on_court,
        points: raw.points.unwrap_or(0),
        fouls: raw.fouls.unwrap_or(0),
    }
}

/// Roster totals fall back to the sum of player lines when the backend omits them.
fn map_roster(raw: Option<TeamRosterWire>, fallback: &TeamScore) -> TeamRoster {
    let Some(raw) = raw else {
        return TeamRoster {
            id: fallback.id,
            name: fallback.name.clone(),
            logo: fallback.logo.clone(),
            points: fallback.points,
            ..Default::default()
        };
    };
    let players: Vec<RosterPlayer> = raw.players.into_iter().map(map_player).collect();
    let points = raw
        .points
        .unwrap_or_else(|| players.iter().map(|p| p.points).sum::<u32>().max(fallback.points));
    let fouls = raw
        .fouls
        .unwrap_or_else(|| players.iter().map(|p| u32::from(p.fouls)).sum());
    TeamRoster {
        id: raw.id,
        name: raw.name.unwrap_or_else(|| fallback.name.clone()),
        logo: raw.logo.or_else(|| fallback.logo.clone()),
        points,
        fouls,
        timeouts_remaining: raw.timeouts_remaining,
        players,
    }
}

fn map_live_match(raw: LiveMatchWire) -> MatchSnapshot {
    let summary = map_match(&raw.match_info);
    MatchSnapshot {
        id: summary.id,
        tournament_id: summary.tournament_id,
        status: summary.status,
        period: summary.period,
        remaining_seconds: summary.remaining_seconds,
        local: map_roster(raw.local, &summary.local),
        visitor: map_roster(raw.visitor, &summary.visitor),
    }
}

fn map_standing(idx: usize, raw: StandingWire) -> StandingRow {
    StandingRow {
        position: raw.position.unwrap_or((idx + 1) as u16),
        team_id: raw.team.id,
        team_name: raw.team.name.unwrap_or_else(|| format!("Team {}", raw.team.id)),
        played: raw.played.unwrap_or(0),
        won: raw.won.unwrap_or(0),
        lost: raw.lost.unwrap_or(0),
        points_for: raw.points_for.unwrap_or(0),
        points_against: raw.points_against.unwrap_or(0),
        standing_points: raw.points.unwrap_or(0),
    }
}
