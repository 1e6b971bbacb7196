//! Periodic cleanup of previously posted notifications.
//!
//! Purges run at most once per day at the configured UTC hour. The due time
//! lives only in memory and is re-derived on every start.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::models::PurgeConfig;
use crate::services::{DestinationFilter, Notifier, PurgeWindow};

/// Decides when a purge is due and triggers it through the notifier.
#[derive(Debug, Clone)]
pub struct PurgeScheduler {
    config: PurgeConfig,
    filter: DestinationFilter,
    next_due_at: Option<DateTime<Utc>>,
}

impl PurgeScheduler {
    pub fn new(config: PurgeConfig, filter: DestinationFilter) -> Self {
        Self {
            config,
            filter,
            next_due_at: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// When the next pass will fire, if one is scheduled.
    pub fn next_due_at(&self) -> Option<DateTime<Utc>> {
        self.next_due_at
    }

    /// Next occurrence of the configured hour strictly after `now`.
    pub fn compute_next_due_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let hour = NaiveTime::from_hms_opt(self.config.hour.min(23), 0, 0).unwrap_or_default();
        let today = now.date_naive().and_time(hour).and_utc();
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// Messages eligible for deletion as of `now`.
    ///
    /// An age limit reaching past the representable calendar keeps everything.
    pub fn window(&self, now: DateTime<Utc>) -> PurgeWindow {
        PurgeWindow {
            older_than: self.config.after_days.map(|days| {
                Duration::try_days(i64::from(days))
                    .and_then(|age| now.checked_sub_signed(age))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC)
            }),
            keep_latest: self.config.after_lines,
        }
    }

    /// Schedule the first pass, or run one right away when configured to.
    pub async fn start(&mut self, now: DateTime<Utc>, notifier: &dyn Notifier) {
        if !self.is_enabled() {
            return;
        }
        if self.config.on_startup {
            self.fire(now, notifier).await;
        } else {
            let first = self.compute_next_due_time(now);
            self.next_due_at = Some(first);
            log::info!("First purge will be {}", first);
        }
    }

    /// Run a purge if one is due. Returns whether a pass fired.
    ///
    /// Collaborator errors are logged and swallowed.
    pub async fn run_purge_pass(&mut self, now: DateTime<Utc>, notifier: &dyn Notifier) -> bool {
        if !self.is_enabled() {
            return false;
        }
        // A scheduler that was never started is due immediately.
        if self.next_due_at.is_some_and(|due| now < due) {
            return false;
        }
        self.fire(now, notifier).await;
        true
    }

    async fn fire(&mut self, now: DateTime<Utc>, notifier: &dyn Notifier) {
        let next = self.compute_next_due_time(now);
        self.next_due_at = Some(next);

        log::info!("Looking for messages to purge...");
        match notifier.purge(&self.window(now), &self.filter).await {
            Ok(count) => log::info!("Purged {} message(s)", count),
            Err(e) => log::error!("Purge failed: {}", e),
        }
        log::info!("Next purge will be {}", next);
    }
}
