// src/services/status.rs

//! Status feed acquisition.
//!
//! Downloads the server stats and career savegame documents concurrently and
//! parses both into XML trees.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join;

use crate::error::Result;
use crate::models::FetchConfig;
use crate::utils::http::{create_async_client, fetch_text_with_retry};
use crate::utils::xml::{XmlElement, parse_document};

/// Both feed documents as parsed trees.
///
/// A document that could not be parsed is `None`; that is a data-shape
/// problem, not a transport failure.
#[derive(Debug, Clone, Default)]
pub struct RawStatus {
    pub server_stats: Option<XmlElement>,
    pub career_savegame: Option<XmlElement>,
}

impl RawStatus {
    /// Parse both documents from their markup.
    pub fn from_markup(server_stats: &str, career_savegame: &str) -> Self {
        Self {
            server_stats: parse_document(server_stats),
            career_savegame: parse_document(career_savegame),
        }
    }
}

/// Where status documents come from.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Retrieve both documents.
    ///
    /// An `Err` means the server could not be reached.
    async fn fetch(&self) -> Result<RawStatus>;
}

/// Status source backed by the server's HTTP feeds.
pub struct HttpStatusSource {
    client: reqwest::Client,
    server_stats_url: String,
    career_savegame_url: String,
    retries: u32,
    retry_delay: Duration,
}

impl HttpStatusSource {
    /// Create a new HTTP status source from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            server_stats_url: config.server_stats_url.clone(),
            career_savegame_url: config.career_savegame_url.clone(),
            retries: config.retries(),
            retry_delay: config.retry_delay(),
        })
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self) -> Result<RawStatus> {
        let (stats, savegame) = try_join(
            fetch_text_with_retry(
                &self.client,
                &self.server_stats_url,
                self.retries,
                self.retry_delay,
            ),
            fetch_text_with_retry(
                &self.client,
                &self.career_savegame_url,
                self.retries,
                self.retry_delay,
            ),
        )
        .await?;

        log::debug!(
            "Fetched {} bytes of server stats, {} bytes of savegame",
            stats.len(),
            savegame.len()
        );
        Ok(RawStatus::from_markup(&stats, &savegame))
    }
}
