use crate::live::{Action, ActionKind};
use crate::state::messages::{NetworkRequest, NetworkResponse};
use courtside_api::{ApiError, LeagueApi, MatchId};
use log::{debug, error, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

/// Runs backend requests one at a time, in the order the controller queued them.
pub struct NetworkWorker {
    client: LeagueApi,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
}

impl NetworkWorker {
    pub fn new(
        client: LeagueApi,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self { client, requests, responses, is_loading: Arc::new(AtomicBool::new(false)) }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            self.start_loading_animation().await;

            let result = match request {
                NetworkRequest::LoadLiveMatch { match_id } => self.handle_load_live_match(match_id).await,
                NetworkRequest::LoadScoreboard { tournament_id } => {
                    debug!("refreshing scoreboard for tournament {tournament_id}");
                    self.client
                        .list_matches(tournament_id)
                        .await
                        .map(|matches| NetworkResponse::ScoreboardLoaded { matches })
                }
                NetworkRequest::LoadStandings { tournament_id } => {
                    debug!("refreshing standings for tournament {tournament_id}");
                    self.client
                        .get_standings(tournament_id)
                        .await
                        .map(|rows| NetworkResponse::StandingsLoaded { rows })
                }
                NetworkRequest::SubmitAction { match_id, action } => {
                    Ok(self.handle_submit_action(match_id, action).await)
                }
                NetworkRequest::SubmitLineups { match_id, local, visitor } => {
                    debug!("submitting starting fives for match {match_id}");
                    self.client
                        .submit_lineups(match_id, &local, &visitor)
                        .await
                        .map(|()| NetworkResponse::LineupsSubmitted)
                }
                NetworkRequest::FinalizeMatch { match_id } => {
                    debug!("finalizing match {match_id}");
                    self.client
                        .finalize_match(match_id)
                        .await
                        .map(|()| NetworkResponse::MatchFinalized { match_id })
                }
            };

            let response = result.unwrap_or_else(|err| NetworkResponse::Error {
                message: err.to_string(),
            });
            let is_ok = !matches!(
                response,
                NetworkResponse::Error { .. } | NetworkResponse::ActionRejected { .. }
            );
            debug!("network request complete");
            self.stop_loading_animation(is_ok).await;

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_load_live_match(&self, match_id: MatchId) -> Result<NetworkResponse, ApiError> {
        debug!("loading live snapshot for match {match_id}");
        let snapshot = self.client.get_live_match(match_id).await?;
        Ok(NetworkResponse::LiveMatchLoaded { snapshot })
    }

    /// Submission failures are answered per action so the session can settle them.
    async fn handle_submit_action(&self, match_id: MatchId, action: Action) -> NetworkResponse {
        debug!("submitting action {} for match {match_id}: {:?}", action.id, action.kind);
        let result = match (action.kind, action.player) {
            (ActionKind::Points { delta }, Some(player)) => {
                self.client
                    .submit_points(match_id, action.side, player, delta, action.period, action.clock_secs)
                    .await
            }
            (ActionKind::Foul, Some(player)) => {
                self.client
                    .submit_foul(match_id, action.side, player, action.period, action.clock_secs)
                    .await
            }
            (ActionKind::Substitution { out, into }, _) => {
                self.client
                    .submit_substitution(match_id, action.side, out, into, action.period, action.clock_secs)
                    .await
            }
            (_, None) => Err(ApiError::Other(format!("action {} has no player", action.id))),
        };
        match result {
            Ok(()) => NetworkResponse::ActionAcked { id: action.id },
            Err(err) => {
                warn!("action {} refused: {err}", action.id);
                NetworkResponse::ActionRejected { id: action.id, reason: err.to_string() }
            }
        }
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}
