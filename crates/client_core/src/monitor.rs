//! Backend liveness polling and badge refresh.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{info, warn};

use crate::{metrics::refresh_map_badge, ClientHandle};

pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Unknown => "API: Checking...",
            ConnectionState::Connected => "API: Connected",
            ConnectionState::Disconnected => "API: Disconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Connectivity(ConnectionState),
    MapBadge(f64),
}

/// Single liveness probe against `/health`. Never retries.
pub async fn probe(client: &dyn ClientHandle) -> ConnectionState {
    match client.health().await {
        Ok(_) => ConnectionState::Connected,
        Err(err) => {
            warn!("health check failed: {err}");
            ConnectionState::Disconnected
        }
    }
}

pub struct ConnectivityMonitor {
    client: Arc<dyn ClientHandle>,
    interval: Duration,
    events: broadcast::Sender<MonitorEvent>,
}

impl ConnectivityMonitor {
    pub fn new(client: Arc<dyn ClientHandle>, interval: Duration) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            client,
            interval,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Probes the backend and publishes the result. A connected backend also
    /// gets its badge refreshed in the background.
    pub async fn check(self: &Arc<Self>) -> ConnectionState {
        let state = probe(self.client.as_ref()).await;
        info!(state = state.label(), "connectivity check");
        let _ = self.events.send(MonitorEvent::Connectivity(state));

        if state.is_connected() {
            let monitor = Arc::clone(self);
            tokio::spawn(async move {
                let value = refresh_map_badge(monitor.client.as_ref()).await;
                let _ = monitor.events.send(MonitorEvent::MapBadge(value));
            });
        }
        state
    }

    /// Polls on a fixed interval, starting immediately.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(monitor.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.check().await;
            }
        })
    }
}
