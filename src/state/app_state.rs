use crate::app::MenuItem;
use crate::live::LiveSession;
use chrono::Local;
use courtside_api::{GameUpdate, MatchSummary, PlayerId, Side, StandingRow};
use std::collections::VecDeque;

const MAX_ALERTS: usize = 100;

// ---------------------------------------------------------------------------
// Live view state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct LiveViewState {
    pub session: Option<LiveSession>,
    /// Team whose roster the cursor is in.
    pub focus: Side,
    /// Index into the focused team's player list.
    pub cursor: usize,
    /// Player picked to leave the court, waiting for the one coming in.
    pub sub_out: Option<PlayerId>,
    /// Clock edit in progress (`mm:ss` as typed so far).
    pub clock_input: Option<String>,
    /// Why the live view refuses operator input, if it does.
    pub locked: Option<String>,
}

impl LiveViewState {
    pub fn roster_len(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.ledger().team(self.focus).players.len())
            .unwrap_or(0)
    }

    pub fn selected_player(&self) -> Option<PlayerId> {
        let session = self.session.as_ref()?;
        session.ledger().team(self.focus).players.get(self.cursor).map(|p| p.id)
    }

    pub fn cursor_down(&mut self) {
        let max = self.roster_len().saturating_sub(1);
        if self.cursor < max {
            self.cursor += 1;
        }
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn switch_focus(&mut self) {
        self.focus = self.focus.other();
        self.cursor = self.cursor.min(self.roster_len().saturating_sub(1));
        self.sub_out = None;
    }
}

// ---------------------------------------------------------------------------
// Scoreboard state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScoreFilter {
    #[default]
    All,
    Live,
    Scheduled,
    Finished,
}

impl ScoreFilter {
    pub fn next(self) -> Self {
        match self {
            ScoreFilter::All => ScoreFilter::Live,
            ScoreFilter::Live => ScoreFilter::Scheduled,
            ScoreFilter::Scheduled => ScoreFilter::Finished,
            ScoreFilter::Finished => ScoreFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreFilter::All => "All",
            ScoreFilter::Live => "Live",
            ScoreFilter::Scheduled => "Scheduled",
            ScoreFilter::Finished => "Finished",
        }
    }

    pub fn matches(&self, m: &MatchSummary) -> bool {
        match self {
            ScoreFilter::All => true,
            ScoreFilter::Live => m.is_live(),
            ScoreFilter::Scheduled => !m.is_live() && !m.is_finished(),
            ScoreFilter::Finished => m.is_finished(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScoreboardState {
    pub matches: Vec<MatchSummary>,
    pub filter: ScoreFilter,
    pub selected: usize,
    pub updated_at: Option<String>,
}

impl ScoreboardState {
    pub fn load(&mut self, matches: Vec<MatchSummary>) {
        self.matches = matches;
        self.updated_at = Some(Local::now().format("%H:%M:%S").to_string());
        self.clamp_selection();
    }

    /// Merges a pushed score change into the cached match. Returns false when the
    /// match is not in the cache.
    pub fn merge_update(&mut self, update: &GameUpdate) -> bool {
        let Some(m) = self.matches.iter_mut().find(|m| m.id == update.id) else {
            return false;
        };
        m.local.points = update.points_local;
        m.visitor.points = update.points_visitor;
        m.status = update.status;
        self.clamp_selection();
        true
    }

    pub fn visible(&self) -> Vec<&MatchSummary> {
        self.matches.iter().filter(|m| self.filter.matches(m)).collect()
    }

    pub fn live_count(&self) -> usize {
        self.matches.iter().filter(|m| m.is_live()).count()
    }

    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
        self.selected = 0;
    }

    pub fn select_next(&mut self) {
        let max = self.visible().len().saturating_sub(1);
        if self.selected < max {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.visible().len().saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// Standings and sync status
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StandingsState {
    pub rows: Vec<StandingRow>,
    /// Set by a `standings_update` push until the re-fetch lands.
    pub stale: bool,
    pub updated_at: Option<String>,
}

impl StandingsState {
    pub fn load(&mut self, rows: Vec<StandingRow>) {
        self.rows = rows;
        self.stale = false;
        self.updated_at = Some(Local::now().format("%H:%M:%S").to_string());
    }
}

#[derive(Debug, Default)]
pub struct SyncState {
    pub connected: bool,
    pub status: String,
    pub clients: Option<u32>,
    pub gave_up: bool,
    /// True once the channel has connected at least once; later connects are reconnections.
    pub ever_connected: bool,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub at: String,
    pub level: AlertLevel,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub live: LiveViewState,
    pub scoreboard: ScoreboardState,
    pub standings: StandingsState,
    pub sync: SyncState,
    pub alerts: VecDeque<Alert>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            sync: SyncState { status: "not connected".to_string(), ..SyncState::default() },
            ..Self::default()
        }
    }

    pub fn push_alert(&mut self, level: AlertLevel, text: impl Into<String>) {
        let text = text.into();
        if let Some(last) = self.alerts.back()
            && last.level == level
            && last.text == text
        {
            return;
        }
        self.alerts.push_back(Alert { at: Local::now().format("%H:%M:%S").to_string(), level, text });
        while self.alerts.len() > MAX_ALERTS {
            self.alerts.pop_front();
        }
    }
}
