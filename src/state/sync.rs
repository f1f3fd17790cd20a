use courtside_api::SyncMessage;
use courtside_api::realtime::HEARTBEAT_FRAME;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, interval_at, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
    pub heartbeat: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            max_attempts: 5,
            heartbeat: Duration::from_secs(30),
        }
    }
}

/// Counts reconnection attempts since the last successful open.
#[derive(Debug, Clone)]
pub struct ReconnectBudget {
    max_attempts: u32,
    used: u32,
}

impl ReconnectBudget {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts, used: 0 }
    }

    /// Called for every abnormal closure, including failed connects.
    /// Returns the attempt number to schedule, or `None` once the budget is spent.
    pub fn on_abnormal_close(&mut self) -> Option<u32> {
        if self.used >= self.max_attempts {
            return None;
        }
        self.used += 1;
        Some(self.used)
    }

    pub fn on_open(&mut self) {
        self.used = 0;
    }
}

#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// Close with the normal-closure code; no reconnection follows.
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Connected,
    Message(SyncMessage),
    Error(String),
    Reconnecting { attempt: u32, of: u32 },
    /// Normal closure, by us or by the server.
    Closed,
    /// Reconnection attempts exhausted; the channel stays down.
    GaveUp,
}

enum Outcome {
    Normal,
    Abnormal,
    /// The command side hung up; nobody is listening any more.
    Shutdown,
}

#[derive(Debug)]
pub struct SyncWorker {
    pub url: String,
    pub policy: ReconnectPolicy,
    pub commands: mpsc::Receiver<SyncCommand>,
    pub events: mpsc::Sender<SyncEvent>,
}

impl SyncWorker {
    pub async fn run(mut self) {
        let mut budget = ReconnectBudget::new(self.policy.max_attempts);
        loop {
            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                cmd = self.commands.recv() => {
                    if cmd.is_some() {
                        self.emit(SyncEvent::Closed).await;
                    }
                    return;
                }
            };

            let outcome = match connected {
                Ok((stream, _)) => {
                    info!("sync channel connected to {}", self.url);
                    budget.on_open();
                    self.emit(SyncEvent::Connected).await;
                    self.serve(stream).await
                }
                Err(e) => {
                    self.emit(SyncEvent::Error(format!("sync connect failed: {e}"))).await;
                    Outcome::Abnormal
                }
            };

            match outcome {
                Outcome::Normal => {
                    info!("sync channel closed normally");
                    self.emit(SyncEvent::Closed).await;
                    return;
                }
                Outcome::Shutdown => return,
                Outcome::Abnormal => {}
            }

            let Some(attempt) = budget.on_abnormal_close() else {
                warn!("sync channel gave up after {} attempts", self.policy.max_attempts);
                self.emit(SyncEvent::GaveUp).await;
                return;
            };
            let of = self.policy.max_attempts;
            debug!("sync reconnect {attempt}/{of} in {:?}", self.policy.delay);
            self.emit(SyncEvent::Reconnecting { attempt, of }).await;

            tokio::select! {
                _ = sleep(self.policy.delay) => {}
                cmd = self.commands.recv() => {
                    if cmd.is_some() {
                        self.emit(SyncEvent::Closed).await;
                    }
                    return;
                }
            }
        }
    }

    async fn serve(&mut self, stream: Socket) -> Outcome {
        let (mut write, mut read) = stream.split();
        let every = self.policy.heartbeat;
        let mut heartbeat = interval_at(Instant::now() + every, every);

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let frame = CloseFrame { code: CloseCode::Normal, reason: "referee left".into() };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    // Give the server a moment to answer the close handshake.
                    let _ = timeout(Duration::from_secs(1), async {
                        while let Some(Ok(msg)) = read.next().await {
                            if msg.is_close() {
                                break;
                            }
                        }
                    })
                    .await;
                    return match cmd {
                        Some(SyncCommand::Close) => Outcome::Normal,
                        None => Outcome::Shutdown,
                    };
                }
                _ = heartbeat.tick() => {
                    if let Err(e) = write.send(Message::Text(HEARTBEAT_FRAME.into())).await {
                        self.emit(SyncEvent::Error(format!("sync heartbeat failed: {e}"))).await;
                        return Outcome::Abnormal;
                    }
                }
                inbound = read.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => match SyncMessage::parse(&text) {
                            Ok(SyncMessage::Unknown) => debug!("ignoring sync frame: {}", text.as_str()),
                            Ok(msg) => self.emit(SyncEvent::Message(msg)).await,
                            Err(e) => {
                                self.emit(SyncEvent::Error(format!("sync parse error: {e}"))).await;
                            }
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let code = frame.as_ref().map(|f| f.code);
                            debug!("sync channel closed by server: {code:?}");
                            return if code == Some(CloseCode::Normal) {
                                Outcome::Normal
                            } else {
                                Outcome::Abnormal
                            };
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            self.emit(SyncEvent::Error(format!("sync read failed: {e}"))).await;
                            return Outcome::Abnormal;
                        }
                        None => return Outcome::Abnormal,
                    }
                }
            }
        }
    }

    async fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event).await;
    }
}

/// The one push subscription a view may hold.
pub struct SyncChannel {
    policy: ReconnectPolicy,
    commands: Option<mpsc::Sender<SyncCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl SyncChannel {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, commands: None, handle: None }
    }

    pub fn is_open(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts the subscription. Returns false, and changes nothing, when one is already running.
    pub fn open(&mut self, url: impl Into<String>, events: mpsc::Sender<SyncEvent>) -> bool {
        let url = url.into();
        if self.is_open() {
            debug!("sync channel already open; not opening {url}");
            return false;
        }
        let (tx, rx) = mpsc::channel(4);
        let worker = SyncWorker { url, policy: self.policy, commands: rx, events };
        self.commands = Some(tx);
        self.handle = Some(tokio::spawn(worker.run()));
        true
    }

    /// Closes with the normal-closure code, aborting the worker if it does not finish in time.
    pub async fn close(&mut self, wait: Duration) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(SyncCommand::Close).await;
        }
        if let Some(mut handle) = self.handle.take()
            && timeout(wait, &mut handle).await.is_err()
        {
            handle.abort();
        }
    }
}

impl Drop for SyncChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn quick_policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            delay: Duration::from_millis(20),
            max_attempts,
            heartbeat: Duration::from_millis(100),
        }
    }

    fn spawn_worker(url: String, policy: ReconnectPolicy) -> (mpsc::Sender<SyncCommand>, mpsc::Receiver<SyncEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (ev_tx, ev_rx) = mpsc::channel(64);
        tokio::spawn(SyncWorker { url, policy, commands: cmd_rx, events: ev_tx }.run());
        (cmd_tx, ev_rx)
    }

    /// Everything the worker emitted until it finished, without error chatter.
    async fn collect(mut events: mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
        let mut seen = Vec::new();
        while let Ok(Some(event)) = timeout(Duration::from_secs(5), events.recv()).await {
            if !matches!(event, SyncEvent::Error(_)) {
                seen.push(event);
            }
        }
        seen
    }

    async fn refused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{addr}/ws/tournaments/1")
    }

    #[test]
    fn budget_stops_after_max_consecutive_closures() {
        let mut budget = ReconnectBudget::new(5);
        let scheduled: Vec<_> = (0..5).map(|_| budget.on_abnormal_close()).collect();
        assert_eq!(scheduled, vec![Some(1), Some(2), Some(3), Some(4), Some(5)]);
        assert_eq!(budget.on_abnormal_close(), None);
        assert_eq!(budget.on_abnormal_close(), None);
    }

    #[test]
    fn successful_open_refills_budget() {
        let mut budget = ReconnectBudget::new(2);
        budget.on_abnormal_close();
        budget.on_abnormal_close();
        budget.on_open();
        assert_eq!(budget.on_abnormal_close(), Some(1));
        assert_eq!(budget.on_abnormal_close(), Some(2));
    }

    #[tokio::test]
    async fn delivers_messages_heartbeats_and_stops_on_normal_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Text(
                r#"{"type":"connection_info","message":"Connected","connected_clients":2}"#.into(),
            ))
            .await
            .unwrap();
            ws.send(Message::Text(r#"{"type":"mystery"}"#.into())).await.unwrap();
            ws.send(Message::Text(r#"{"type":"standings_update"}"#.into())).await.unwrap();
            let first = ws.next().await.unwrap().unwrap();
            ws.close(Some(CloseFrame { code: CloseCode::Normal, reason: "bye".into() }))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            first
        });

        let (_commands, events) = spawn_worker(format!("ws://{addr}/ws/tournaments/1"), quick_policy(5));
        let seen = collect(events).await;
        assert_eq!(
            seen,
            vec![
                SyncEvent::Connected,
                SyncEvent::Message(SyncMessage::ConnectionInfo {
                    message: "Connected".into(),
                    connected_clients: 2,
                }),
                SyncEvent::Message(SyncMessage::StandingsUpdate),
                SyncEvent::Closed,
            ]
        );
        assert_eq!(server.await.unwrap(), Message::Text(HEARTBEAT_FRAME.into()));
    }

    #[tokio::test]
    async fn reconnects_after_abnormal_drop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = accept_async(tcp).await.unwrap();
            drop(ws);
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.close(Some(CloseFrame { code: CloseCode::Normal, reason: "".into() }))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (_commands, events) = spawn_worker(format!("ws://{addr}/ws"), quick_policy(5));
        assert_eq!(
            collect(events).await,
            vec![
                SyncEvent::Connected,
                SyncEvent::Reconnecting { attempt: 1, of: 5 },
                SyncEvent::Connected,
                SyncEvent::Closed,
            ]
        );
    }

    #[tokio::test]
    async fn refused_connections_retry_a_bounded_number_of_times() {
        let (_commands, events) = spawn_worker(refused_url().await, quick_policy(3));
        assert_eq!(
            collect(events).await,
            vec![
                SyncEvent::Reconnecting { attempt: 1, of: 3 },
                SyncEvent::Reconnecting { attempt: 2, of: 3 },
                SyncEvent::Reconnecting { attempt: 3, of: 3 },
                SyncEvent::GaveUp,
            ]
        );
    }

    #[tokio::test]
    async fn close_command_ends_with_normal_closure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(frame))) => return frame.map(|f| f.code),
                    Some(Ok(_)) => continue,
                    _ => return None,
                }
            }
        });

        let (events_tx, mut events) = mpsc::channel(16);
        let mut channel = SyncChannel::new(quick_policy(5));
        assert!(channel.open(format!("ws://{addr}/ws"), events_tx.clone()));
        assert_eq!(events.recv().await, Some(SyncEvent::Connected));
        assert!(!channel.open(format!("ws://{addr}/other"), events_tx), "second open is a no-op");

        channel.close(Duration::from_secs(2)).await;
        assert!(!channel.is_open());
        assert_eq!(server.await.unwrap(), Some(CloseCode::Normal));
        let rest: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert_eq!(rest.last(), Some(&SyncEvent::Closed));
    }
}
