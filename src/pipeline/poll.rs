//! Polling orchestrator.
//!
//! One [`Poller`] owns the persisted snapshot and drives a cycle per interval:
//! fetch, diff, format, deliver, purge, persist. Cycles never overlap.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::models::{Config, Snapshot};
use crate::pipeline::diff::diff;
use crate::pipeline::format::format_changes;
use crate::pipeline::normalize::fetch_and_normalize;
use crate::pipeline::purge::PurgeScheduler;
use crate::services::{DestinationFilter, Notifier, Presence, StatusSource};
use crate::storage::StateStorage;

pub const FOUND_NOTICE: &str = ":thumbsup: The server has been **found**.";
pub const UNREACHABLE_NOTICE: &str = ":man_shrugging: The server is **unreachable**.";
pub const OFFLINE_NOTICE: &str = ":tools: The server has gone **offline**.";

/// What the watcher last concluded about the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Nothing observed yet
    Unknown,
    Online,
    /// Reachable, but not running a game
    Offline,
    /// Feeds could not be fetched
    Unreachable,
}

impl ServerState {
    /// State implied by a stored snapshot.
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        if snapshot.server.unreachable {
            ServerState::Unreachable
        } else if snapshot.server.online {
            ServerState::Online
        } else {
            ServerState::Offline
        }
    }
}

/// Outcome of a single polling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub state: ServerState,
    /// Messages handed to the notifier successfully, in order
    pub notices: Vec<String>,
}

/// Drives the polling cycle over one persisted snapshot.
pub struct Poller {
    source: Arc<dyn StatusSource>,
    notifier: Arc<dyn Notifier>,
    storage: Arc<dyn StateStorage>,
    snapshot: Snapshot,
    state: ServerState,
    purge: PurgeScheduler,
    filter: DestinationFilter,
    suppress_unreachable_notices: bool,
    interval: std::time::Duration,
}

impl Poller {
    /// Create a poller, restoring the last snapshot from storage.
    ///
    /// A missing state file is created with defaults. An unreadable one is
    /// replaced by defaults with a warning.
    pub async fn load(
        config: &Config,
        source: Arc<dyn StatusSource>,
        notifier: Arc<dyn Notifier>,
        storage: Arc<dyn StateStorage>,
    ) -> Result<Self> {
        let (snapshot, state) = match storage.load().await {
            Ok(Some(snapshot)) => {
                let state = ServerState::from_snapshot(&snapshot);
                log::info!("Restored state: {:?}", state);
                (snapshot, state)
            }
            Ok(None) => {
                log::info!("No stored state, writing defaults");
                let snapshot = Snapshot::default();
                storage.save(&snapshot).await?;
                (snapshot, ServerState::Unknown)
            }
            Err(e) => {
                log::warn!("Stored state unreadable, using defaults: {}", e);
                (Snapshot::default(), ServerState::Unknown)
            }
        };

        let filter = DestinationFilter::from_config(&config.delivery);
        Ok(Self {
            source,
            notifier,
            storage,
            snapshot,
            state,
            purge: PurgeScheduler::new(config.purge.clone(), filter.clone()),
            filter,
            suppress_unreachable_notices: config.poll.suppress_unreachable_notices,
            interval: config.poll.interval(),
        })
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Wait for the notifier, then poll immediately and on every tick.
    ///
    /// Cycle errors are logged; the loop only ends if the notifier never
    /// becomes ready.
    pub async fn run(&mut self) -> Result<()> {
        self.notifier.ready().await?;
        log::info!("Notifier ready, polling every {:?}", self.interval);

        self.start(Utc::now()).await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick completes immediately.
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                log::error!("Polling cycle failed: {}", e);
            }
        }
    }

    /// Start the purge scheduler.
    pub async fn start(&mut self, now: DateTime<Utc>) {
        self.purge.start(now, self.notifier.as_ref()).await;
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one polling cycle as of `now`.
    ///
    /// Only a failure to persist the new state is returned as an error.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut notices = Vec::new();
        let previous_state = self.state;

        match fetch_and_normalize(self.source.as_ref(), &self.snapshot, now).await {
            Err(e) => {
                if e.is_transport() {
                    log::warn!("Server unreachable: {}", e);
                } else {
                    log::error!("Status source failed: {}", e);
                }
                self.snapshot.server.unreachable = true;
                self.state = ServerState::Unreachable;
                if previous_state != ServerState::Unreachable {
                    self.notify_unless_suppressed(UNREACHABLE_NOTICE, &mut notices)
                        .await;
                }
            }
            Ok(fetched) => {
                if previous_state == ServerState::Unreachable {
                    log::info!("Server found again");
                    self.notify_unless_suppressed(FOUND_NOTICE, &mut notices)
                        .await;
                }

                match fetched {
                    None => {
                        log::info!("Server is offline");
                        self.snapshot.server.online = false;
                        self.snapshot.server.unreachable = false;
                        self.snapshot.clear_slots();
                        self.state = ServerState::Offline;
                        if previous_state == ServerState::Online {
                            self.notify(OFFLINE_NOTICE, &mut notices).await;
                        }
                    }
                    Some(current) => {
                        let changes = diff(&self.snapshot, &current, now);
                        if changes.has_changes() {
                            log::debug!("Changes: {:?}", changes);
                        }
                        if let Some(message) = format_changes(&changes, &current) {
                            self.notify(&message, &mut notices).await;
                        }
                        self.snapshot = current;
                        self.state = ServerState::Online;
                    }
                }
            }
        }

        self.update_presence().await;
        self.purge
            .run_purge_pass(now, self.notifier.as_ref())
            .await;
        self.storage.save(&self.snapshot).await?;

        Ok(CycleReport {
            state: self.state,
            notices,
        })
    }

    async fn notify_unless_suppressed(&self, message: &str, notices: &mut Vec<String>) {
        if self.suppress_unreachable_notices {
            log::debug!("Suppressed notice: {}", message);
            return;
        }
        self.notify(message, notices).await;
    }

    async fn notify(&self, message: &str, notices: &mut Vec<String>) {
        match self.notifier.send(message, &self.filter).await {
            Ok(0) => log::warn!("No destination accepted the notification"),
            Ok(count) => {
                log::debug!("Notification sent to {} destination(s)", count);
                notices.push(message.to_string());
            }
            Err(e) => log::error!("Failed to send notification: {}", e),
        }
    }

    async fn update_presence(&self) {
        let presence = match self.state {
            ServerState::Online => Presence::Online {
                used: self.snapshot.slots.num_used,
                capacity: self.snapshot.slots.capacity,
            },
            ServerState::Offline => Presence::Offline,
            ServerState::Unknown | ServerState::Unreachable => Presence::Unknown,
        };
        if let Err(e) = self.notifier.set_presence(&presence).await {
            log::warn!("Failed to update presence: {}", e);
        }
    }
}
