use crate::state::messages::UiEvent;
use log::debug;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};

const TICK: Duration = Duration::from_secs(1);

/// One-second tick source for the game clock.
///
/// At most one ticker task exists. It is keyed by the clock epoch, so after every
/// controller step [`ClockTicker::sync`] either keeps it, replaces it or stops it.
pub struct ClockTicker {
    events: mpsc::Sender<UiEvent>,
    epoch: Option<u64>,
    handle: Option<JoinHandle<()>>,
}

impl ClockTicker {
    pub fn new(events: mpsc::Sender<UiEvent>) -> Self {
        Self { events, epoch: None, handle: None }
    }

    pub fn sync(&mut self, epoch: Option<u64>) {
        if self.epoch == epoch {
            return;
        }
        self.stop();
        let Some(epoch) = epoch else {
            return;
        };
        debug!("clock ticker armed for epoch {epoch}");
        let events = self.events.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticks.tick().await;
                if events.send(UiEvent::ClockTick { epoch }).await.is_err() {
                    break;
                }
            }
        }));
        self.epoch = Some(epoch);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.epoch = None;
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cancellable one-shot that ends a team timeout.
pub struct TimeoutTimer {
    events: mpsc::Sender<UiEvent>,
    token: Option<u64>,
    handle: Option<JoinHandle<()>>,
}

impl TimeoutTimer {
    pub fn new(events: mpsc::Sender<UiEvent>) -> Self {
        Self { events, token: None, handle: None }
    }

    /// Arms the one-shot for `pending`, or cancels it when nothing is pending.
    pub fn sync(&mut self, pending: Option<(u64, Duration)>) {
        if self.token == pending.map(|(token, _)| token) {
            return;
        }
        self.cancel();
        let Some((token, after)) = pending else {
            return;
        };
        debug!("timeout one-shot {token} armed for {}s", after.as_secs());
        let events = self.events.clone();
        self.handle = Some(tokio::spawn(async move {
            sleep(after).await;
            let _ = events.send(UiEvent::TimeoutElapsed { token }).await;
        }));
        self.token = Some(token);
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.token = None;
    }
}

impl Drop for TimeoutTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<UiEvent>) -> Vec<UiEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn ticks(events: &[UiEvent]) -> Vec<u64> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::ClockTick { epoch } => Some(*epoch),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_for_current_epoch() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut ticker = ClockTicker::new(tx);
        ticker.sync(Some(1));
        ticker.sync(Some(1));
        sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks(&drain(&mut rx)), vec![1, 1, 1]);

        ticker.sync(Some(2));
        sleep(Duration::from_millis(2500)).await;
        assert_eq!(ticks(&drain(&mut rx)), vec![2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_ticker_stays_quiet() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut ticker = ClockTicker::new(tx);
        ticker.sync(Some(5));
        sleep(Duration::from_millis(1500)).await;
        ticker.sync(None);
        sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks(&drain(&mut rx)), vec![5]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_once_after_duration() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timer = TimeoutTimer::new(tx);
        timer.sync(Some((7, Duration::from_secs(60))));
        sleep(Duration::from_secs(59)).await;
        assert!(drain(&mut rx).is_empty());
        timer.sync(Some((7, Duration::from_secs(60))));
        sleep(Duration::from_secs(2)).await;
        let fired = drain(&mut rx);
        assert!(matches!(fired.as_slice(), [UiEvent::TimeoutElapsed { token: 7 }]));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timeout_never_fires() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timer = TimeoutTimer::new(tx);
        timer.sync(Some((1, Duration::from_secs(60))));
        sleep(Duration::from_secs(10)).await;
        timer.sync(None);
        sleep(Duration::from_secs(120)).await;
        assert!(drain(&mut rx).is_empty());
    }
}
