// src/services/delivery.rs

//! Notification delivery seam.
//!
//! The chat platform itself lives behind [`Notifier`]. The watcher only hands
//! over finished message text, a destination filter and purge windows.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::DeliveryConfig;

/// Kind of a chat channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Other,
}

/// A channel the delivery backend could post to.
#[derive(Debug, Clone)]
pub struct Destination {
    pub server_name: String,
    pub channel_name: String,
    pub kind: ChannelKind,
    pub can_view: bool,
    pub can_send: bool,
}

/// Selects the channels that receive notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationFilter {
    pub server_name: Option<String>,
    pub channel_name: Option<String>,
}

impl DestinationFilter {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self {
            server_name: config.server_name.clone(),
            channel_name: config.channel_name.clone(),
        }
    }

    /// A destination is eligible when it matches the optional name filters,
    /// is a text channel, and can be viewed and posted to.
    pub fn accepts(&self, destination: &Destination) -> bool {
        let server_ok = self
            .server_name
            .as_ref()
            .is_none_or(|name| *name == destination.server_name);
        let channel_ok = self
            .channel_name
            .as_ref()
            .is_none_or(|name| *name == destination.channel_name);

        server_ok
            && channel_ok
            && destination.kind == ChannelKind::Text
            && destination.can_view
            && destination.can_send
    }
}

/// Which previously posted notifications a purge may delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeWindow {
    /// Delete messages posted before this instant
    pub older_than: Option<DateTime<Utc>>,

    /// Keep only this many of the newest messages
    pub keep_latest: Option<usize>,
}

impl PurgeWindow {
    /// Whether a message should be deleted.
    ///
    /// `position_from_newest` is 0 for the most recent message.
    pub fn should_purge(&self, posted_at: DateTime<Utc>, position_from_newest: usize) -> bool {
        let too_old = self.older_than.is_some_and(|cutoff| posted_at < cutoff);
        let too_many = self
            .keep_latest
            .is_some_and(|keep| position_from_newest >= keep);
        too_old || too_many
    }
}

/// Status line shown next to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Online { used: u32, capacity: u32 },
    Offline,
    Unknown,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::Online { used, capacity } => write!(f, "online: {used}/{capacity}"),
            Presence::Offline => write!(f, "offline"),
            Presence::Unknown => write!(f, "unknown"),
        }
    }
}

/// Delivery backend for notifications.
///
/// Backends that post to a chat platform resolve the [`DestinationFilter`]
/// against their channels with [`DestinationFilter::accepts`] and pick the
/// messages to delete with [`PurgeWindow::should_purge`]. Backends bound to a
/// single fixed destination, such as [`LogNotifier`] and [`WebhookNotifier`],
/// have nothing to filter.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Resolves once the backend can deliver messages.
    async fn ready(&self) -> Result<()> {
        Ok(())
    }

    /// Post a message to every destination the filter accepts.
    ///
    /// Returns the number of destinations posted to.
    async fn send(&self, message: &str, filter: &DestinationFilter) -> Result<usize>;

    /// Delete earlier notifications selected by the window.
    ///
    /// Returns the number of deleted messages.
    async fn purge(&self, window: &PurgeWindow, filter: &DestinationFilter) -> Result<usize>;

    /// Update the bot's status line.
    async fn set_presence(&self, _presence: &Presence) -> Result<()> {
        Ok(())
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str, _filter: &DestinationFilter) -> Result<usize> {
        log::info!("Notification:\n{}", message);
        Ok(1)
    }

    async fn purge(&self, window: &PurgeWindow, _filter: &DestinationFilter) -> Result<usize> {
        log::debug!("Nothing to purge from the log (window: {:?})", window);
        Ok(0)
    }

    async fn set_presence(&self, presence: &Presence) -> Result<()> {
        log::debug!("Presence: {}", presence);
        Ok(())
    }
}

/// Posts notifications to a chat webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &str, _filter: &DestinationFilter) -> Result<usize> {
        self.client
            .post(&self.url)
            .json(&json!({ "content": message }))
            .send()
            .await?
            .error_for_status()?;
        Ok(1)
    }

    async fn purge(&self, _window: &PurgeWindow, _filter: &DestinationFilter) -> Result<usize> {
        Err(AppError::delivery("webhooks cannot search message history"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Notifier that records everything it is asked to do.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<String>>,
        pub purges: Mutex<Vec<PurgeWindow>>,
        pub presence: Mutex<Vec<Presence>>,
        pub fail_purge: bool,
        pub fail_send: bool,
    }

    impl RecordingNotifier {
        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        pub fn purge_count(&self) -> usize {
            self.purges.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str, _filter: &DestinationFilter) -> Result<usize> {
            if self.fail_send {
                return Err(AppError::delivery("send failed"));
            }
            self.sent.lock().unwrap().push(message.to_string());
            Ok(1)
        }

        async fn purge(&self, window: &PurgeWindow, _filter: &DestinationFilter) -> Result<usize> {
            self.purges.lock().unwrap().push(window.clone());
            if self.fail_purge {
                return Err(AppError::delivery("purge failed"));
            }
            Ok(0)
        }

        async fn set_presence(&self, presence: &Presence) -> Result<()> {
            self.presence.lock().unwrap().push(*presence);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn text_channel(server: &str, channel: &str) -> Destination {
        Destination {
            server_name: server.to_string(),
            channel_name: channel.to_string(),
            kind: ChannelKind::Text,
            can_view: true,
            can_send: true,
        }
    }

    #[test]
    fn test_filter_without_names_accepts_writable_text_channels() {
        let filter = DestinationFilter::default();
        assert!(filter.accepts(&text_channel("Farm", "general")));

        let mut voice = text_channel("Farm", "voice");
        voice.kind = ChannelKind::Voice;
        assert!(!filter.accepts(&voice));

        let mut read_only = text_channel("Farm", "news");
        read_only.can_send = false;
        assert!(!filter.accepts(&read_only));

        let mut hidden = text_channel("Farm", "staff");
        hidden.can_view = false;
        assert!(!filter.accepts(&hidden));
    }

    #[test]
    fn test_filter_names() {
        let filter = DestinationFilter {
            server_name: Some("Farm".to_string()),
            channel_name: Some("status".to_string()),
        };
        assert!(filter.accepts(&text_channel("Farm", "status")));
        assert!(!filter.accepts(&text_channel("Farm", "general")));
        assert!(!filter.accepts(&text_channel("Other", "status")));
    }

    #[test]
    fn test_purge_window() {
        let cutoff = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 4, 30, 23, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

        let by_age = PurgeWindow {
            older_than: Some(cutoff),
            keep_latest: None,
        };
        assert!(by_age.should_purge(before, 0));
        assert!(!by_age.should_purge(after, 500));

        let by_count = PurgeWindow {
            older_than: None,
            keep_latest: Some(2),
        };
        assert!(!by_count.should_purge(before, 1));
        assert!(by_count.should_purge(after, 2));

        assert!(!PurgeWindow::default().should_purge(before, 1000));
    }

    #[test]
    fn test_presence_display() {
        assert_eq!(Presence::Online { used: 2, capacity: 16 }.to_string(), "online: 2/16");
        assert_eq!(Presence::Offline.to_string(), "offline");
        assert_eq!(Presence::Unknown.to_string(), "unknown");
    }

    #[tokio::test]
    async fn test_webhook_posts_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({ "content": "hello" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(reqwest::Client::new(), server.uri());
        let sent = notifier
            .send("hello", &DestinationFilter::default())
            .await
            .unwrap();
        assert_eq!(sent, 1);
    }

    #[tokio::test]
    async fn test_webhook_rejects_purge() {
        let notifier = WebhookNotifier::new(reqwest::Client::new(), "http://127.0.0.1:9/hook");
        let result = notifier
            .purge(&PurgeWindow::default(), &DestinationFilter::default())
            .await;
        assert!(matches!(result, Err(AppError::Delivery(_))));
    }
}
