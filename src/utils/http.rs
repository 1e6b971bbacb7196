// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::FetchConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &FetchConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()?;
    Ok(client)
}

/// Fetch a document body, retrying transport failures.
///
/// `retries` counts the attempts made after the first one. HTTP error statuses
/// are not retried; their bodies are returned like any other.
pub async fn fetch_text_with_retry(
    client: &reqwest::Client,
    url: &str,
    retries: u32,
    delay: Duration,
) -> Result<String> {
    let attempts = retries.saturating_add(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match fetch_text(client, url).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                log::debug!("Fetch {} failed (attempt {}/{}): {}", url, attempt, attempts, e);
                last_error = Some(e);
            }
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }

    let message = last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string());
    Err(AppError::unreachable(url, attempts, message))
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> std::result::Result<String, reqwest::Error> {
    client.get(url).send().await?.text().await
}
