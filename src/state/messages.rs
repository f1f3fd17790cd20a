use crate::live::{Action, ActionId};
use crate::state::network::LoadingState;
use courtside_api::{MatchId, MatchSnapshot, MatchSummary, PlayerId, StandingRow, TournamentId};
use crossterm::event::KeyEvent;

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    LoadLiveMatch { match_id: MatchId },
    LoadScoreboard { tournament_id: TournamentId },
    LoadStandings { tournament_id: TournamentId },
    SubmitAction { match_id: MatchId, action: Action },
    SubmitLineups { match_id: MatchId, local: Vec<PlayerId>, visitor: Vec<PlayerId> },
    FinalizeMatch { match_id: MatchId },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    LiveMatchLoaded { snapshot: MatchSnapshot },
    ScoreboardLoaded { matches: Vec<MatchSummary> },
    StandingsLoaded { rows: Vec<StandingRow> },
    ActionAcked { id: ActionId },
    /// The backend refused a ledger action; the session decides what to undo.
    ActionRejected { id: ActionId, reason: String },
    LineupsSubmitted,
    MatchFinalized { match_id: MatchId },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
    /// One second from the clock ticker armed for `epoch`.
    ClockTick { epoch: u64 },
    /// The timeout one-shot armed for `token` fired.
    TimeoutElapsed { token: u64 },
}
