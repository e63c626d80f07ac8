// ── Polling coordinator ──
//
// Periodically refreshes the fan hierarchy and publishes snapshots to
// subscribers. A failed refresh keeps the previous systems and flips
// `last_update_success`, which entities fold into their availability.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use smartcocoon_api::{Fan, FanKey, SmartCocoonClient, System, UpdateOutcome};

use crate::error::CoreError;

/// Default time between refreshes.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(120);
/// Default upper bound for a single refresh.
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

// ── Configuration ────────────────────────────────────────────────

/// How a [`Coordinator`] polls.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Display name, e.g. `SmartCocoon (user@example.com)`.
    pub name: String,
    /// Restrict updates to these system ids. `None` fetches every system.
    pub systems: Option<Vec<i64>>,
    pub scan_interval: Duration,
    pub timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: "SmartCocoon".into(),
            systems: None,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            timeout: DEFAULT_UPDATE_TIMEOUT,
        }
    }
}

// ── Snapshot ─────────────────────────────────────────────────────

/// The state published after every refresh attempt.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Systems from the last successful refresh.
    pub systems: Vec<System>,
    /// Whether the most recent refresh succeeded.
    pub last_update_success: bool,
    /// Rendered error of the most recent refresh, if it failed.
    pub last_error: Option<String>,
    /// When the systems were last refreshed successfully.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn fan(&self, key: &FanKey) -> Option<Fan<'_>> {
        key.find(&self.systems)
    }

    /// A fan is available when the last refresh succeeded and the fan
    /// reports itself connected.
    pub fn is_available(&self, key: &FanKey) -> bool {
        self.last_update_success && self.fan(key).and_then(|f| f.connected()).unwrap_or(false)
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// Owns the client and drives periodic updates.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    client: SmartCocoonClient,
    config: CoordinatorConfig,
    snapshot: watch::Sender<Arc<Snapshot>>,
    refresh_requested: Notify,
}

impl Coordinator {
    pub fn new(client: SmartCocoonClient, config: CoordinatorConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            inner: Arc::new(CoordinatorInner {
                client,
                config,
                snapshot,
                refresh_requested: Notify::new(),
            }),
        }
    }

    pub fn client(&self) -> &SmartCocoonClient {
        &self.inner.client
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.snapshot.subscribe()
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.snapshot.borrow().last_update_success
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run one update bounded by the configured timeout and publish the
    /// result.
    ///
    /// On failure the previous systems stay in the snapshot and the error
    /// is returned.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let update = self.inner.client.update(config.systems.as_deref());

        let result = match tokio::time::timeout(config.timeout, update).await {
            Ok(Ok(UpdateOutcome::Refreshed(systems))) => Ok(systems),
            Ok(Ok(UpdateOutcome::Failed { error, .. })) => Err(CoreError::update_failed(&error)),
            Ok(Err(e)) => Err(CoreError::from(e)),
            Err(_) => Err(CoreError::Timeout {
                timeout_secs: config.timeout.as_secs(),
            }),
        };

        match result {
            Ok(systems) => {
                debug!(coordinator = %config.name, systems = systems.len(), "refresh complete");
                self.inner.snapshot.send_replace(Arc::new(Snapshot {
                    systems,
                    last_update_success: true,
                    last_error: None,
                    updated_at: Some(Utc::now()),
                }));
                Ok(())
            }
            Err(e) => {
                warn!(coordinator = %config.name, error = %e, "refresh failed");
                let previous = self.snapshot();
                self.inner.snapshot.send_replace(Arc::new(Snapshot {
                    systems: previous.systems.clone(),
                    last_update_success: false,
                    last_error: Some(e.to_string()),
                    updated_at: previous.updated_at,
                }));
                Err(e)
            }
        }
    }

    /// Ask the background task to refresh now instead of waiting for the
    /// next tick. Used after a fan mutation.
    pub fn request_refresh(&self) {
        self.inner.refresh_requested.notify_one();
    }

    /// Spawn the periodic refresh loop. Runs until `cancel` fires.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        info!(
            coordinator = %self.inner.config.name,
            interval_secs = self.inner.config.scan_interval.as_secs(),
            "starting refresh loop"
        );
        tokio::spawn(refresh_task(self.clone(), cancel))
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

// ── Background task ──────────────────────────────────────────────

async fn refresh_task(coordinator: Coordinator, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(coordinator.inner.config.scan_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = coordinator.inner.refresh_requested.notified() => {
                interval.reset();
            }
            _ = interval.tick() => {}
        }
        // Failures are already logged and published.
        let _ = coordinator.refresh().await;
    }
    debug!(coordinator = %coordinator.inner.config.name, "refresh loop stopped");
}
