//! Process-wide shared state: the latest health snapshot and the client clock.
//!
//! Each has exactly one writer task and any number of readers. Both are
//! `watch` channels, so readers always see a whole value and a reader that
//! lags just skips to the newest one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::types::HealthSnapshot;

/// Display tick for the uptime clock.
pub const CLOCK_TICK: Duration = Duration::from_millis(1000);
/// Periodic health refresh.
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub type SharedSnapshot = Option<Arc<HealthSnapshot>>;

/// Latest health snapshot. `None` before the first poll and after a failure.
pub struct HealthState {
    tx: watch::Sender<SharedSnapshot>,
    refresh: Arc<Notify>,
}

impl HealthState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            refresh: Arc::new(Notify::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SharedSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SharedSnapshot {
        self.tx.borrow().clone()
    }

    /// Ask the poller for an immediate refresh (navigation, `r` key).
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Single assignment; never merged with the previous snapshot.
    pub fn publish(&self, snapshot: SharedSnapshot) {
        self.tx.send_replace(snapshot);
    }

    /// Poll `GET /health` every `period`, or sooner when a refresh is
    /// requested. The task ends once the state itself has been dropped.
    pub fn spawn_poller(self: &Arc<Self>, client: ApiClient, period: Duration) -> JoinHandle<()> {
        let state = Arc::downgrade(self);
        let refresh = self.refresh.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = refresh.notified() => ticker.reset(),
                }
                let result = client.health().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                match result {
                    Ok(snap) => {
                        debug!(uptime = %snap.uptime, "health snapshot");
                        state.publish(Some(Arc::new(snap)));
                    }
                    Err(e) => {
                        warn!(error = %e, "health poll failed");
                        state.publish(None);
                    }
                }
            }
        })
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock "now" advanced once per tick. Display only.
pub struct ClientClock {
    tx: watch::Sender<DateTime<Utc>>,
}

impl ClientClock {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Utc::now());
        Self { tx }
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DateTime<Utc>> {
        self.tx.subscribe()
    }

    pub fn advance(&self, now: DateTime<Utc>) {
        self.tx.send_replace(now);
    }

    pub fn spawn_ticker(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let clock = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(clock) = clock.upgrade() else {
                    break;
                };
                clock.advance(Utc::now());
            }
        })
    }
}

impl Default for ClientClock {
    fn default() -> Self {
        Self::new()
    }
}
