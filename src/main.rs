mod app;
mod components;
mod draw;
mod keys;
mod live;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::{AppSettings, CliCommand};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use crate::state::sync::{SyncChannel, SyncEvent};
use crate::state::timers::{ClockTicker, TimeoutTimer};
use courtside_api::LeagueApi;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::{info, warn};
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tui::{Terminal, backend::CrosstermBackend};

/// How long teardown waits for the sync channel's normal closure.
const SYNC_CLOSE_WAIT: Duration = Duration::from_millis(1000);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut settings = AppSettings::load();
    match settings.apply_args(std::env::args().skip(1)) {
        Ok(CliCommand::Run) => {}
        Ok(CliCommand::Help) => {
            println!("{}", usage_text());
            return Ok(());
        }
        Ok(CliCommand::Version) => {
            println!("courtside {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Err(message) => {
            eprintln!("{message}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    tui_logger::init_logger(settings.log_level)?;
    tui_logger::set_default_level(settings.log_level);
    for warning in &settings.warnings {
        warn!("{warning}");
    }

    let identity = settings.identity();
    let client = LeagueApi::new(settings.api_url.clone(), identity.clone());
    let mut app = App::new(settings);
    match identity.current_user() {
        Some(user) if identity.is_authenticated() => info!("signed in as {}", user.name),
        _ if identity.is_authenticated() => info!("signed in"),
        _ => app.lock_live("Not signed in; the live view is read-only"),
    }
    let app = Arc::new(Mutex::new(app));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);
    let (sync_evt_tx, sync_evt_rx) = mpsc::channel::<SyncEvent>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker = NetworkWorker::new(client, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    let services = Services::new(ui_event_tx.clone(), network_req_tx, sync_evt_tx);

    // Trigger the match load on startup
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    let mut services =
        main_ui_loop(terminal, app.clone(), services, ui_event_rx, network_resp_rx, sync_evt_rx).await;

    services.shutdown().await;
    input_handler.abort();
    network_task.abort();
    cleanup_terminal();

    Ok(())
}

fn usage_text() -> &'static str {
    "courtside - basketball referee console

Usage:
  courtside [--match <id>] [--tournament <id>]
  courtside --help
  courtside --version

Environment:
  COURTSIDE_API_URL      Backend REST base URL (default http://127.0.0.1:8000/api)
  COURTSIDE_WS_URL       Push channel base URL (default ws://127.0.0.1:8000/ws)
  COURTSIDE_MATCH_ID     Match to referee
  COURTSIDE_TOURNAMENT_ID
                         Tournament for scoreboard, standings and live updates
  COURTSIDE_TOKEN        Bearer token; without it the live view is read-only
  COURTSIDE_QUARTER_SECS, COURTSIDE_OVERTIME_SECS, COURTSIDE_HALFTIME_SECS,
  COURTSIDE_TIMEOUT_SECS Clock durations (600, 300, 900, 60)
  COURTSIDE_RECONNECT_DELAY_SECS, COURTSIDE_RECONNECT_ATTEMPTS,
  COURTSIDE_HEARTBEAT_SECS, COURTSIDE_REFRESH_SECS
  COURTSIDE_ROLLBACK     compensate (default) or keep
  COURTSIDE_LOG          error, warn, info (default), debug or trace"
}

/// Tasks and timers the controller's output drives.
struct Services {
    network_requests: mpsc::Sender<NetworkRequest>,
    sync_events: mpsc::Sender<SyncEvent>,
    ticker: ClockTicker,
    timeout_timer: TimeoutTimer,
    sync: Option<SyncChannel>,
    refresher: Option<JoinHandle<()>>,
}

impl Services {
    fn new(
        ui_events: mpsc::Sender<UiEvent>,
        network_requests: mpsc::Sender<NetworkRequest>,
        sync_events: mpsc::Sender<SyncEvent>,
    ) -> Self {
        Self {
            network_requests,
            sync_events,
            ticker: ClockTicker::new(ui_events.clone()),
            timeout_timer: TimeoutTimer::new(ui_events),
            sync: None,
            refresher: None,
        }
    }

    /// Sends queued requests in order, then lines timers and subscriptions up with the new state.
    async fn after_step(&mut self, app: &mut App) {
        for request in app.take_requests() {
            if self.network_requests.send(request).await.is_err() {
                warn!("network worker is gone; request dropped");
            }
        }
        self.ticker.sync(app.clock_epoch());
        self.timeout_timer.sync(app.pending_timeout());

        // One subscription per run; after a give-up or a normal closure it stays down.
        if self.sync.is_none()
            && let Some(url) = app.settings.channel_url()
        {
            let mut channel = SyncChannel::new(app.settings.reconnect);
            info!("subscribing to {url}");
            channel.open(url, self.sync_events.clone());
            self.sync = Some(channel);
        }

        if self.refresher.is_none()
            && let Some(tournament_id) = app.settings.tournament_id
        {
            let refresher = PeriodicRefresher::new(
                self.network_requests.clone(),
                tournament_id,
                app.settings.refresh_every,
            );
            self.refresher = Some(tokio::spawn(refresher.run()));
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut channel) = self.sync.take() {
            channel.close(SYNC_CLOSE_WAIT).await;
        }
        self.ticker.stop();
        self.timeout_timer.cancel();
        if let Some(refresher) = self.refresher.take() {
            refresher.abort();
        }
    }
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut services: Services,
    mut ui_events: mpsc::Receiver<UiEvent>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
    mut sync_events: mpsc::Receiver<SyncEvent>,
) -> Services {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                handle_ui_event(ui_event, &app).await;
            }

            Some(response) = network_responses.recv() => {
                handle_network_response(response, &app, &mut loading).await;
            }

            Some(sync_event) = sync_events.recv() => {
                let mut guard = app.lock().await;
                guard.on_sync_event(sync_event);
            }

            else => break,
        }

        let mut guard = app.lock().await;
        services.after_step(&mut guard).await;
        if guard.should_quit {
            break;
        }
        draw::draw(&mut terminal, &mut guard, loading);
    }

    services
}

async fn handle_ui_event(ui_event: UiEvent, app: &Arc<Mutex<App>>) {
    match ui_event {
        UiEvent::AppStarted => app.lock().await.on_started(),
        UiEvent::KeyPressed(key_event) => keys::handle_key_bindings(key_event, app).await,
        UiEvent::Resize => {}
        UiEvent::ClockTick { epoch } => app.lock().await.on_clock_tick(epoch),
        UiEvent::TimeoutElapsed { token } => app.lock().await.on_timeout_elapsed(token),
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    loading: &mut LoadingState,
) {
    let mut guard = app.lock().await;
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => *loading = loading_state,
        NetworkResponse::LiveMatchLoaded { snapshot } => guard.on_live_match_loaded(snapshot),
        NetworkResponse::ScoreboardLoaded { matches } => guard.on_scoreboard_loaded(matches),
        NetworkResponse::StandingsLoaded { rows } => guard.on_standings_loaded(rows),
        NetworkResponse::ActionAcked { id } => guard.on_action_acked(id),
        NetworkResponse::ActionRejected { id, reason } => guard.on_action_rejected(id, reason),
        NetworkResponse::LineupsSubmitted => guard.on_lineups_submitted(),
        NetworkResponse::MatchFinalized { match_id } => guard.on_match_finalized(match_id),
        NetworkResponse::Error { message } => guard.on_error(message),
    }
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        let read = tokio::task::spawn_blocking(crossterm_event::read).await;
        let Ok(Ok(event)) = read else {
            continue;
        };
        let ui_event = match event {
            Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
            Event::Resize(_, _) => Some(UiEvent::Resize),
            _ => None,
        };

        if let Some(ui_event) = ui_event
            && ui_events.send(ui_event).await.is_err()
        {
            break;
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    terminal::enable_raw_mode()
}

/// Best effort: also runs from the panic hook, where nothing can be reported.
pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
