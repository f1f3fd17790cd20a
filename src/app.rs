use crate::live::{
    ActionId, GamePhase, LiveError, LiveResult, LiveSession, Outbound, Step, parse_clock,
};
use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AlertLevel, AppState};
use crate::state::messages::NetworkRequest;
use crate::state::sync::SyncEvent;
use courtside_api::{MatchId, MatchSnapshot, MatchSummary, StandingRow, SyncMessage};
use log::{debug, error, info, warn};
use std::time::Duration;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Live,
    Scoreboard,
    Standings,
    Help,
}

/// Live View Controller: turns operator intents, network answers and sync events
/// into session operations and view-state updates.
pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
    pub should_quit: bool,
    outbox: Vec<NetworkRequest>,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        Self { settings, state: AppState::new(), should_quit: false, outbox: Vec::new() }
    }

    /// Requests queued since the last call, in the order they were made.
    pub fn take_requests(&mut self) -> Vec<NetworkRequest> {
        std::mem::take(&mut self.outbox)
    }

    pub fn clock_epoch(&self) -> Option<u64> {
        self.state.live.session.as_ref().and_then(LiveSession::clock_epoch)
    }

    pub fn pending_timeout(&self) -> Option<(u64, Duration)> {
        self.state.live.session.as_ref().and_then(LiveSession::pending_timeout)
    }

    pub fn on_started(&mut self) {
        match self.settings.match_id {
            _ if self.state.live.locked.is_some() => {}
            Some(match_id) => self.outbox.push(NetworkRequest::LoadLiveMatch { match_id }),
            None => self.alert(AlertLevel::Warning, "No match selected; pass --match <id>"),
        }
        self.refresh_tournament();
    }

    /// Keeps the live view read-only; scoreboard and standings stay available.
    pub fn lock_live(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("live view locked: {reason}");
        self.alert(AlertLevel::Warning, reason.clone());
        self.state.live.locked = Some(reason);
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_live_match_loaded(&mut self, snapshot: MatchSnapshot) {
        self.state.last_error = None;
        if self.settings.tournament_id.is_none()
            && let Some(tournament_id) = snapshot.tournament_id
        {
            info!("match {} belongs to tournament {tournament_id}", snapshot.id);
            self.settings.tournament_id = Some(tournament_id);
            self.refresh_tournament();
        }

        let replace = self
            .state
            .live
            .session
            .as_ref()
            .is_none_or(|s| s.phase() == GamePhase::SelectingRosters);
        if !replace {
            debug!("keeping local session for match {}; snapshot ignored", snapshot.id);
            return;
        }
        let session = LiveSession::from_snapshot(&snapshot, self.settings.rules, self.settings.rollback);
        info!(
            "match {} loaded: {} vs {} ({})",
            snapshot.id,
            snapshot.local.name,
            snapshot.visitor.name,
            session.phase()
        );
        self.state.live.session = Some(session);
        self.state.live.cursor = 0;
        self.state.live.sub_out = None;
    }

    pub fn on_scoreboard_loaded(&mut self, matches: Vec<MatchSummary>) {
        self.state.scoreboard.load(matches);
    }

    pub fn on_standings_loaded(&mut self, rows: Vec<StandingRow>) {
        self.state.standings.load(rows);
    }

    pub fn on_action_acked(&mut self, id: ActionId) {
        if let Some(session) = self.state.live.session.as_mut() {
            let step = session.on_action_acked(id);
            self.apply_step(step);
        }
    }

    pub fn on_action_rejected(&mut self, id: ActionId, reason: String) {
        if let Some(session) = self.state.live.session.as_mut() {
            let step = session.on_action_failed(id, &reason);
            self.apply_step(step);
        }
    }

    pub fn on_lineups_submitted(&mut self) {
        info!("starting fives accepted by the backend");
    }

    pub fn on_match_finalized(&mut self, match_id: MatchId) {
        self.alert(AlertLevel::Info, format!("Result of match {match_id} reported"));
        self.refresh_tournament();
    }

    pub fn on_error(&mut self, message: String) {
        error!("Network error: {message}");
        self.alert(AlertLevel::Error, message.clone());
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Sync channel events
    // -----------------------------------------------------------------------

    pub fn on_sync_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Connected => {
                let reconnected = self.state.sync.ever_connected;
                let sync = &mut self.state.sync;
                sync.connected = true;
                sync.gave_up = false;
                sync.ever_connected = true;
                sync.status = "connected".to_string();
                if reconnected {
                    self.alert(AlertLevel::Info, "Live updates reconnected");
                    self.refresh_tournament();
                }
            }
            SyncEvent::Message(message) => self.on_sync_message(message),
            SyncEvent::Error(message) => warn!("{message}"),
            SyncEvent::Reconnecting { attempt, of } => {
                self.state.sync.connected = false;
                self.state.sync.status = format!("reconnecting {attempt}/{of}");
            }
            SyncEvent::Closed => {
                self.state.sync.connected = false;
                self.state.sync.status = "closed".to_string();
            }
            SyncEvent::GaveUp => {
                self.state.sync.connected = false;
                self.state.sync.gave_up = true;
                self.state.sync.status = "offline".to_string();
                self.alert(AlertLevel::Warning, "Live updates lost; local scoring continues");
            }
        }
    }

    fn on_sync_message(&mut self, message: SyncMessage) {
        match message {
            SyncMessage::ConnectionInfo { message, connected_clients } => {
                self.state.sync.connected = true;
                self.state.sync.clients = Some(connected_clients);
                if !message.is_empty() {
                    self.state.sync.status = message;
                }
            }
            // Another client's scores only touch the scoreboard cache, never the session.
            SyncMessage::GameUpdate { data } => {
                if !self.state.scoreboard.merge_update(&data) {
                    debug!("game_update for match {} not on the scoreboard", data.id);
                }
            }
            SyncMessage::StandingsUpdate => {
                self.state.standings.stale = true;
                if let Some(tournament_id) = self.settings.tournament_id {
                    self.outbox.push(NetworkRequest::LoadStandings { tournament_id });
                }
            }
            SyncMessage::Pong => debug!("heartbeat acknowledged"),
            SyncMessage::Unknown => {}
        }
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    pub fn on_clock_tick(&mut self, epoch: u64) {
        if let Some(session) = self.state.live.session.as_mut() {
            let step = session.tick(epoch);
            self.apply_step(step);
        }
    }

    pub fn on_timeout_elapsed(&mut self, token: u64) {
        if let Some(session) = self.state.live.session.as_mut() {
            let step = session.finish_timeout(token);
            self.apply_step(step);
        }
    }

    // -----------------------------------------------------------------------
    // Live view intents
    // -----------------------------------------------------------------------

    /// Space: pick/unpick a starter before tip-off, start/stop the clock afterwards.
    pub fn live_space(&mut self) {
        let selecting = self
            .state
            .live
            .session
            .as_ref()
            .is_some_and(|s| s.phase() == GamePhase::SelectingRosters);
        if selecting {
            let side = self.state.live.focus;
            if let Some(player) = self.state.live.selected_player() {
                self.run(|s| s.toggle_starter(side, player));
            }
        } else {
            self.run(LiveSession::toggle_clock);
        }
    }

    pub fn live_confirm_lineup(&mut self) {
        let side = self.state.live.focus;
        self.run(|s| s.confirm_lineup(side));
    }

    pub fn live_begin(&mut self) {
        self.run(LiveSession::begin);
    }

    pub fn live_points(&mut self, delta: i32) {
        let side = self.state.live.focus;
        if let Some(player) = self.state.live.selected_player() {
            self.run(|s| s.record_points(side, player, delta));
        }
    }

    pub fn live_foul(&mut self) {
        let side = self.state.live.focus;
        if let Some(player) = self.state.live.selected_player() {
            self.run(|s| s.record_foul(side, player));
        }
    }

    /// First press marks the player leaving, second press (on a bench player) completes it.
    pub fn live_substitution(&mut self) {
        let side = self.state.live.focus;
        let Some(player) = self.state.live.selected_player() else {
            return;
        };
        match self.state.live.sub_out.take() {
            None => {
                self.state.live.sub_out = Some(player);
            }
            Some(out) if out == player => {}
            Some(out) => self.run(|s| s.substitute(side, out, player)),
        }
    }

    pub fn live_timeout(&mut self) {
        let side = self.state.live.focus;
        self.run(|s| s.use_timeout(side));
    }

    pub fn live_next_period(&mut self) {
        self.run(LiveSession::next_period);
    }

    pub fn live_adjust_clock(&mut self, delta_secs: i64) {
        self.run(|s| s.adjust_clock(delta_secs));
    }

    pub fn live_request_reset(&mut self) {
        self.run(|s| {
            let to = s.full_clock();
            s.request_clock_reset(to)
        });
    }

    pub fn live_confirm_reset(&mut self) {
        self.run(LiveSession::confirm_clock_reset);
    }

    pub fn live_cancel_reset(&mut self) {
        self.run(LiveSession::cancel_clock_reset);
    }

    pub fn reset_pending(&self) -> bool {
        self.state.live.session.as_ref().and_then(LiveSession::reset_request).is_some()
    }

    pub fn start_clock_edit(&mut self) {
        if self.state.live.session.is_some() {
            self.state.live.clock_input = Some(String::new());
        }
    }

    pub fn clock_edit_push(&mut self, c: char) {
        if let Some(input) = self.state.live.clock_input.as_mut()
            && (c.is_ascii_digit() || c == ':')
            && input.len() < 6
        {
            input.push(c);
        }
    }

    pub fn clock_edit_backspace(&mut self) {
        if let Some(input) = self.state.live.clock_input.as_mut() {
            input.pop();
        }
    }

    pub fn cancel_clock_edit(&mut self) {
        self.state.live.clock_input = None;
    }

    pub fn submit_clock_edit(&mut self) {
        let Some(input) = self.state.live.clock_input.take() else {
            return;
        };
        match parse_clock(&input) {
            Ok((minutes, seconds)) => self.run(|s| s.edit_clock(minutes, seconds)),
            Err(e) => self.reject(e),
        }
    }

    // -----------------------------------------------------------------------
    // Tab management and navigation
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    pub fn quit(&mut self) {
        if let Some(session) = self.state.live.session.as_mut() {
            session.close();
        }
        self.should_quit = true;
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    /// Scoreboard and standings pull for the known tournament.
    fn refresh_tournament(&mut self) {
        if let Some(tournament_id) = self.settings.tournament_id {
            self.outbox.push(NetworkRequest::LoadScoreboard { tournament_id });
            self.outbox.push(NetworkRequest::LoadStandings { tournament_id });
        }
    }

    fn run<F>(&mut self, op: F)
    where
        F: FnOnce(&mut LiveSession) -> LiveResult<Step>,
    {
        if let Some(reason) = &self.state.live.locked {
            self.state.last_error = Some(reason.clone());
            return;
        }
        let Some(session) = self.state.live.session.as_mut() else {
            self.state.last_error = Some("No match loaded".to_string());
            return;
        };
        match op(session) {
            Ok(step) => {
                self.state.last_error = None;
                self.apply_step(step);
            }
            Err(e) => self.reject(e),
        }
    }

    fn reject(&mut self, e: LiveError) {
        warn!("rejected: {e}");
        self.alert(AlertLevel::Warning, e.to_string());
        self.state.last_error = Some(e.to_string());
    }

    fn apply_step(&mut self, step: Step) {
        let Some(match_id) = self.state.live.session.as_ref().map(LiveSession::match_id) else {
            return;
        };
        for outbound in step.outbound {
            let request = match outbound {
                Outbound::Action(action) => NetworkRequest::SubmitAction { match_id, action },
                Outbound::Lineups { local, visitor } => {
                    NetworkRequest::SubmitLineups { match_id, local, visitor }
                }
                Outbound::Finalize => NetworkRequest::FinalizeMatch { match_id },
            };
            self.outbox.push(request);
        }
        for notice in step.notices {
            let level = if notice.is_warning() { AlertLevel::Warning } else { AlertLevel::Info };
            info!("{notice}");
            self.alert(level, notice.to_string());
        }
    }

    fn alert(&mut self, level: AlertLevel, text: impl Into<String>) {
        self.state.push_alert(level, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_api::{
        GameUpdate, MatchStatus, RosterPlayer, Side, TeamRoster, TeamScore,
    };

    fn roster(id: u64, first: u64) -> TeamRoster {
        TeamRoster {
            id,
            name: format!("Team {id}"),
            players: (0..7)
                .map(|i| RosterPlayer {
                    id: first + i,
                    name: format!("P{}", first + i),
                    number: (i + 1) as u16,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn snapshot(status: MatchStatus) -> MatchSnapshot {
        MatchSnapshot {
            id: 5,
            tournament_id: Some(2),
            status,
            period: Some(1),
            remaining_seconds: None,
            local: roster(1, 100),
            visitor: roster(2, 200),
        }
    }

    fn app() -> App {
        let mut app = App::new(AppSettings { match_id: Some(5), ..AppSettings::default() });
        app.on_started();
        app.on_live_match_loaded(snapshot(MatchStatus::Scheduled));
        app.take_requests();
        app
    }

    /// Picks the first five of each roster and starts the match.
    fn started() -> App {
        let mut app = app();
        for side in [Side::Local, Side::Visitor] {
            if app.state.live.focus != side {
                app.state.live.switch_focus();
            }
            app.state.live.cursor = 0;
            for _ in 0..5 {
                app.live_space();
                app.state.live.cursor_down();
            }
            app.live_confirm_lineup();
        }
        app.live_begin();
        app.state.live.switch_focus();
        app.state.live.cursor = 0;
        app
    }

    #[test]
    fn startup_loads_match_then_tournament() {
        let mut app = App::new(AppSettings { match_id: Some(5), ..AppSettings::default() });
        app.on_started();
        assert!(matches!(app.take_requests().as_slice(), [NetworkRequest::LoadLiveMatch { match_id: 5 }]));
        app.on_live_match_loaded(snapshot(MatchStatus::Scheduled));
        assert_eq!(app.settings.tournament_id, Some(2));
        assert!(matches!(
            app.take_requests().as_slice(),
            [NetworkRequest::LoadScoreboard { tournament_id: 2 }, NetworkRequest::LoadStandings { tournament_id: 2 }]
        ));
    }

    #[test]
    fn begin_queues_lineups() {
        let mut app = started();
        let requests = app.take_requests();
        let Some(NetworkRequest::SubmitLineups { local, visitor, .. }) = requests.last() else {
            panic!("expected lineups, got {requests:?}");
        };
        assert_eq!(local, &vec![100, 101, 102, 103, 104]);
        assert_eq!(visitor, &vec![200, 201, 202, 203, 204]);
        assert!(app.state.last_error.is_none());
    }

    #[test]
    fn validation_errors_surface_without_requests() {
        let mut app = app();
        app.live_begin();
        assert!(app.take_requests().is_empty());
        assert_eq!(app.state.last_error.as_deref(), Some(LiveError::LineupsNotConfirmed.to_string().as_str()));
        assert_eq!(app.state.alerts.back().map(|a| a.level), Some(AlertLevel::Warning));
    }

    #[test]
    fn scoring_queues_action_and_rejection_rolls_back() {
        let mut app = started();
        app.take_requests();
        app.live_points(3);
        let requests = app.take_requests();
        let [NetworkRequest::SubmitAction { match_id: 5, action }] = requests.as_slice() else {
            panic!("expected one action, got {requests:?}");
        };
        let session = app.state.live.session.as_ref().unwrap();
        assert_eq!(session.ledger().points(Side::Local), 3);

        app.on_action_rejected(action.id, "HTTP 503".into());
        let session = app.state.live.session.as_ref().unwrap();
        assert_eq!(session.ledger().points(Side::Local), 0);
    }

    #[test]
    fn substitution_takes_two_presses() {
        let mut app = started();
        app.take_requests();
        app.live_substitution();
        assert_eq!(app.state.live.sub_out, Some(100));
        app.state.live.cursor = 6;
        app.live_substitution();
        assert!(matches!(app.take_requests().as_slice(), [NetworkRequest::SubmitAction { .. }]));
        let ledger = app.state.live.session.as_ref().unwrap().ledger();
        assert!(ledger.player(Side::Local, 106).unwrap().on_court);
        assert!(!ledger.player(Side::Local, 100).unwrap().on_court);
    }

    #[test]
    fn game_update_never_touches_the_session() {
        let mut app = started();
        app.on_scoreboard_loaded(vec![MatchSummary {
            id: 5,
            status: MatchStatus::InProgress,
            local: TeamScore::default(),
            visitor: TeamScore::default(),
            ..Default::default()
        }]);
        app.on_sync_event(SyncEvent::Message(SyncMessage::GameUpdate {
            data: GameUpdate { id: 5, points_local: 40, points_visitor: 38, status: MatchStatus::InProgress },
        }));
        assert_eq!(app.state.scoreboard.matches[0].local.points, 40);
        let session = app.state.live.session.as_ref().unwrap();
        assert_eq!(session.ledger().points(Side::Local), 0);
    }

    #[test]
    fn standings_push_and_reconnect_trigger_refetch() {
        let mut app = app();
        app.on_sync_event(SyncEvent::Connected);
        assert!(app.take_requests().is_empty(), "first connect is not a reconnection");
        app.on_sync_event(SyncEvent::Message(SyncMessage::StandingsUpdate));
        assert!(app.state.standings.stale);
        assert!(matches!(app.take_requests().as_slice(), [NetworkRequest::LoadStandings { tournament_id: 2 }]));

        app.on_sync_event(SyncEvent::Reconnecting { attempt: 1, of: 5 });
        assert!(!app.state.sync.connected);
        app.on_sync_event(SyncEvent::Connected);
        assert_eq!(app.take_requests().len(), 2);
    }

    #[test]
    fn gave_up_marks_channel_offline() {
        let mut app = app();
        app.on_sync_event(SyncEvent::GaveUp);
        assert!(!app.state.sync.connected);
        assert!(app.state.sync.gave_up);
    }

    #[test]
    fn snapshot_does_not_replace_a_running_session() {
        let mut app = started();
        app.live_points(2);
        app.on_live_match_loaded(snapshot(MatchStatus::InProgress));
        let session = app.state.live.session.as_ref().unwrap();
        assert_eq!(session.ledger().points(Side::Local), 2);
    }

    #[test]
    fn clock_edit_parses_operator_input() {
        let mut app = started();
        app.start_clock_edit();
        for c in "7:3x5".chars() {
            app.clock_edit_push(c);
        }
        app.submit_clock_edit();
        assert_eq!(app.state.live.session.as_ref().unwrap().clock().remaining(), 7 * 60 + 35);

        app.start_clock_edit();
        for c in "4:75".chars() {
            app.clock_edit_push(c);
        }
        app.submit_clock_edit();
        assert!(app.state.last_error.is_some());
        assert_eq!(app.state.live.session.as_ref().unwrap().clock().remaining(), 455);
    }

    #[test]
    fn reset_goes_through_confirmation() {
        let mut app = started();
        app.live_adjust_clock(-60);
        app.live_request_reset();
        assert!(app.reset_pending());
        app.live_confirm_reset();
        assert!(!app.reset_pending());
        assert_eq!(app.state.live.session.as_ref().unwrap().clock().remaining(), 600);
    }

    #[test]
    fn locked_live_view_skips_match_and_refuses_input() {
        let mut app = App::new(AppSettings {
            match_id: Some(5),
            tournament_id: Some(2),
            ..AppSettings::default()
        });
        app.lock_live("Not signed in");
        app.on_started();
        let requests = app.take_requests();
        assert!(!requests.iter().any(|r| matches!(r, NetworkRequest::LoadLiveMatch { .. })));
        assert_eq!(requests.len(), 2);
        app.live_begin();
        assert_eq!(app.state.last_error.as_deref(), Some("Not signed in"));
    }

    #[test]
    fn quit_stops_the_clock() {
        let mut app = started();
        app.live_space();
        assert!(app.clock_epoch().is_some());
        app.quit();
        assert!(app.should_quit);
        assert!(app.clock_epoch().is_none());
    }
}
