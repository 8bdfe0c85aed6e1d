use std::{
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    application::interfaces::{connectivity::ConnectivityCheck, sync_runner::SyncRunner},
    domain::{
        repositories::delivery_transport::DeliveryTransport,
        value_objects::{
            connectivity::{ConnectivityEvent, NetworkStatus},
            sync_results::SyncPassResult,
        },
    },
};

/// Backend reachability on top of the OS network state. An offline OS report
/// short-circuits to unreachable without a network call.
pub struct ReachabilityProbe {
    transport: Arc<dyn DeliveryTransport + Send + Sync>,
    os_online: AtomicBool,
}

impl ReachabilityProbe {
    pub fn new(transport: Arc<dyn DeliveryTransport + Send + Sync>) -> Self {
        Self {
            transport,
            os_online: AtomicBool::new(true),
        }
    }

    pub fn set_network_status(&self, status: NetworkStatus) {
        self.os_online
            .store(status == NetworkStatus::Online, Ordering::Release);
    }

    pub fn network_status(&self) -> NetworkStatus {
        if self.os_online.load(Ordering::Acquire) {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        }
    }
}

#[async_trait]
impl ConnectivityCheck for ReachabilityProbe {
    async fn check_connection(&self) -> bool {
        if self.network_status() == NetworkStatus::Offline {
            return false;
        }

        match self.transport.probe_health().await {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "connectivity_monitor: backend probe failed");
                false
            }
        }
    }
}

pub type ConnectivityListener = Arc<dyn Fn(ConnectivityEvent) + Send + Sync>;

type ListenerList = Mutex<Vec<(u64, ConnectivityListener)>>;

/// Unsubscribes its listener when dropped or on [`Subscription::unsubscribe`].
#[must_use = "dropping the subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

pub struct ConnectivityMonitor {
    probe: Arc<ReachabilityProbe>,
    runner: Arc<dyn SyncRunner + Send + Sync>,
    last_reachable: Mutex<Option<bool>>,
    listeners: Arc<ListenerList>,
    next_listener_id: AtomicU64,
    sync_task: Mutex<Option<JoinHandle<SyncPassResult>>>,
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<ReachabilityProbe>, runner: Arc<dyn SyncRunner + Send + Sync>) -> Self {
        Self {
            probe,
            runner,
            last_reachable: Mutex::new(None),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
            sync_task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self, listener: ConnectivityListener) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn last_reachable(&self) -> Option<bool> {
        *self
            .last_reachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Entry point for host OS network-state notifications.
    pub async fn handle_network_change(&self, status: NetworkStatus) -> ConnectivityEvent {
        info!(%status, "connectivity_monitor: network status reported");
        self.probe.set_network_status(status);
        self.evaluate().await
    }

    /// Probes the backend, notifies listeners and, on an unreachable to
    /// reachable transition with resumable records, starts one batch pass.
    pub async fn evaluate(&self) -> ConnectivityEvent {
        let reachable = self.probe.check_connection().await;
        let previously_reachable = self
            .last_reachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(reachable);

        let event = ConnectivityEvent {
            reachable,
            previously_reachable,
            observed_at: Utc::now(),
        };

        if previously_reachable != Some(reachable) {
            info!(reachable, ?previously_reachable, "connectivity_monitor: reachability changed");
            self.notify(event);
        }

        if event.is_restored() {
            self.trigger_sync().await;
        }

        event
    }

    fn notify(&self, event: ConnectivityEvent) {
        let listeners: Vec<ConnectivityListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    async fn trigger_sync(&self) {
        if !self.runner.has_resumable_records().await {
            debug!("connectivity_monitor: connection restored, nothing to sync");
            return;
        }

        let mut sync_task = self.sync_task.lock().unwrap_or_else(PoisonError::into_inner);
        if sync_task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("connectivity_monitor: batch pass already scheduled");
            return;
        }

        info!("connectivity_monitor: connection restored, starting batch pass");
        let runner = Arc::clone(&self.runner);
        *sync_task = Some(tokio::spawn(async move { runner.sync_all_pending().await }));
    }

    /// Waits for the batch pass started by the last restored transition, if any.
    pub async fn wait_for_sync(&self) -> Option<SyncPassResult> {
        let task = self
            .sync_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        match task.await {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(error = %err, "connectivity_monitor: batch pass task failed");
                None
            }
        }
    }
}

/// Polls reachability as a fallback for hosts that report no network changes.
pub async fn run_connectivity_loop(
    monitor: Arc<ConnectivityMonitor>,
    poll_interval: Duration,
) -> Result<()> {
    info!(poll_secs = poll_interval.as_secs(), "connectivity_monitor: polling loop started");
    loop {
        monitor.evaluate().await;
        tokio::time::sleep(poll_interval).await;
    }
}
