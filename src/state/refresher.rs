use crate::state::messages::NetworkRequest;
use courtside_api::TournamentId;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Periodic scoreboard pull for the tournament being refereed.
/// Standings are only re-fetched when the sync channel says they changed.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    tournament_id: TournamentId,
    every: Duration,
}

impl PeriodicRefresher {
    pub fn new(
        network_requests: mpsc::Sender<NetworkRequest>,
        tournament_id: TournamentId,
        every: Duration,
    ) -> Self {
        Self { network_requests, tournament_id, every }
    }

    pub async fn run(self) {
        let mut scores_interval = interval(self.every);
        // Skip the immediate first tick so startup loading isn't double-triggered.
        scores_interval.tick().await;

        loop {
            scores_interval.tick().await;
            let request = NetworkRequest::LoadScoreboard { tournament_id: self.tournament_id };
            if self.network_requests.send(request).await.is_err() {
                break;
            }
        }
    }
}
