use crate::live::error::{LiveError, LiveResult};
use crate::live::rules::{FOUL_LIMIT, TIMEOUTS_PER_GAME};
use chrono::{DateTime, Utc};
use courtside_api::{PlayerId, RosterPlayer, Side, TeamId, TeamRoster};

pub type ActionId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub number: u16,
    pub on_court: bool,
    pub points: u32,
    pub fouls: u8,
    /// Set by the foul that reached the limit; a refused foul never clears it.
    disqualified: bool,
}

impl PlayerState {
    pub fn fouled_out(&self) -> bool {
        self.disqualified
    }
}

impl From<&RosterPlayer> for PlayerState {
    fn from(p: &RosterPlayer) -> Self {
        let fouls = p.fouls.min(FOUL_LIMIT);
        let disqualified = fouls >= FOUL_LIMIT;
        Self {
            id: p.id,
            name: p.name.clone(),
            number: p.number,
            on_court: p.on_court && !disqualified,
            points: p.points,
            fouls,
            disqualified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamState {
    pub id: TeamId,
    pub name: String,
    pub logo: Option<String>,
    pub points: u32,
    pub fouls: u32,
    pub timeouts: u8,
    pub players: Vec<PlayerState>,
}

impl From<&TeamRoster> for TeamState {
    fn from(roster: &TeamRoster) -> Self {
        let mut players: Vec<PlayerState> = roster.players.iter().map(PlayerState::from).collect();
        players.sort_by_key(|p| p.number);
        Self {
            id: roster.id,
            name: roster.name.clone(),
            logo: roster.logo.clone(),
            points: roster.points,
            fouls: roster.fouls,
            timeouts: roster.timeouts_remaining.unwrap_or(TIMEOUTS_PER_GAME).min(TIMEOUTS_PER_GAME),
            players,
        }
    }
}

impl TeamState {
    pub fn active_five(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().filter(|p| p.on_court)
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Signed: negative values correct earlier awards.
    Points { delta: i32 },
    Foul,
    Substitution { out: PlayerId, into: PlayerId },
}

/// Something that happened on court. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: ActionId,
    pub kind: ActionKind,
    pub side: Side,
    /// `None` for team-level events.
    pub player: Option<PlayerId>,
    pub period: u8,
    pub clock_secs: u32,
    pub recorded_at: DateTime<Utc>,
}

impl Action {
    pub fn describe(&self, ledger: &Ledger) -> String {
        let team = ledger.team(self.side);
        let name = |id: PlayerId| {
            team.player(id)
                .map(|p| format!("#{} {}", p.number, p.name))
                .unwrap_or_else(|| format!("player {id}"))
        };
        match self.kind {
            ActionKind::Points { delta } => {
                let who = self.player.map(name).unwrap_or_else(|| team.name.clone());
                format!("{who} {delta:+}")
            }
            ActionKind::Foul => {
                let who = self.player.map(name).unwrap_or_else(|| team.name.clone());
                format!("foul on {who}")
            }
            ActionKind::Substitution { out, into } => {
                format!("{} in for {}", name(into), name(out))
            }
        }
    }
}

/// Running per-team and per-player point and foul counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    local: TeamState,
    visitor: TeamState,
}

impl Ledger {
    pub fn new(local: TeamState, visitor: TeamState) -> Self {
        Self { local, visitor }
    }

    pub fn team(&self, side: Side) -> &TeamState {
        match side {
            Side::Local => &self.local,
            Side::Visitor => &self.visitor,
        }
    }

    pub(crate) fn team_mut(&mut self, side: Side) -> &mut TeamState {
        match side {
            Side::Local => &mut self.local,
            Side::Visitor => &mut self.visitor,
        }
    }

    pub fn points(&self, side: Side) -> u32 {
        self.team(side).points
    }

    pub fn player(&self, side: Side, id: PlayerId) -> LiveResult<&PlayerState> {
        self.team(side)
            .player(id)
            .ok_or(LiveError::UnknownPlayer { side, player: id })
    }

    /// Adds 1-3 points, or takes back up to what the player and team already hold.
    pub fn add_points(&mut self, side: Side, player: PlayerId, delta: i32) -> LiveResult<()> {
        if !(1..=3).contains(&delta.abs()) {
            return Err(LiveError::InvalidPointValue(delta));
        }
        let current = self.player(side, player)?.points;
        let team = self.team_mut(side);
        if delta < 0 {
            let amount = delta.unsigned_abs();
            if current < amount || team.points < amount {
                return Err(LiveError::NegativeScore { delta });
            }
        }
        apply_points(team, player, delta);
        Ok(())
    }

    /// Returns true when this foul removed the player from the court.
    pub fn add_foul(&mut self, side: Side, player: PlayerId) -> LiveResult<bool> {
        let state = self.player(side, player)?;
        if state.fouled_out() {
            return Err(LiveError::FoulLimitReached { name: state.name.clone(), fouls: state.fouls });
        }
        let team = self.team_mut(side);
        team.fouls += 1;
        let Some(state) = team.player_mut(player) else {
            return Err(LiveError::UnknownPlayer { side, player });
        };
        state.fouls += 1;
        if state.fouls >= FOUL_LIMIT {
            state.disqualified = true;
            state.on_court = false;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn substitute(&mut self, side: Side, out: PlayerId, into: PlayerId) -> LiveResult<()> {
        let leaving = self.player(side, out)?;
        if !leaving.on_court {
            return Err(LiveError::PlayerNotOnCourt(leaving.name.clone()));
        }
        let entering = self.player(side, into)?;
        if entering.on_court {
            return Err(LiveError::PlayerNotOnBench(entering.name.clone()));
        }
        if entering.fouled_out() {
            return Err(LiveError::PlayerFouledOut(entering.name.clone()));
        }
        swap_court(self.team_mut(side), out, into);
        Ok(())
    }

    /// Puts exactly the given players on court, everyone else on the bench.
    pub fn set_active_five(&mut self, side: Side, starters: &[PlayerId]) {
        for player in &mut self.team_mut(side).players {
            player.on_court = starters.contains(&player.id) && !player.fouled_out();
        }
    }

    pub fn use_timeout(&mut self, side: Side) -> LiveResult<u8> {
        let team = self.team_mut(side);
        if team.timeouts == 0 {
            return Err(LiveError::NoTimeoutsLeft(side));
        }
        team.timeouts -= 1;
        Ok(team.timeouts)
    }

    pub fn reset_timeouts(&mut self) {
        self.local.timeouts = TIMEOUTS_PER_GAME;
        self.visitor.timeouts = TIMEOUTS_PER_GAME;
    }

    /// Applies the inverse of an action the backend refused.
    ///
    /// A foul-out is not undone: the player keeps the corrected foul count and stays
    /// disqualified for the rest of the match.
    pub fn revert(&mut self, action: &Action) {
        let team = self.team_mut(action.side);
        match (action.kind, action.player) {
            (ActionKind::Points { delta }, Some(player)) => {
                let player_points = team.player(player).map(|p| p.points).unwrap_or(0);
                let undo = if delta > 0 {
                    -(delta.min(player_points as i32).min(team.points as i32))
                } else {
                    -delta
                };
                apply_points(team, player, undo);
            }
            (ActionKind::Foul, Some(player)) => {
                team.fouls = team.fouls.saturating_sub(1);
                if let Some(state) = team.player_mut(player) {
                    state.fouls = state.fouls.saturating_sub(1);
                }
            }
            (ActionKind::Substitution { out, into }, _) => {
                let back_on = team.player(out).is_some_and(|p| !p.on_court && !p.fouled_out());
                let still_on = team.player(into).is_some_and(|p| p.on_court);
                if back_on && still_on {
                    swap_court(team, into, out);
                }
            }
            _ => {}
        }
    }
}

fn apply_points(team: &mut TeamState, player: PlayerId, delta: i32) {
    team.points = team.points.saturating_add_signed(delta);
    if let Some(state) = team.player_mut(player) {
        state.points = state.points.saturating_add_signed(delta);
    }
}

fn swap_court(team: &mut TeamState, out: PlayerId, into: PlayerId) {
    for player in &mut team.players {
        if player.id == out {
            player.on_court = false;
        } else if player.id == into {
            player.on_court = true;
        }
    }
}
