// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::Client;

use crate::error::Result;
use crate::models::HarvestConfig;

/// Create the shared asynchronous HTTP client.
///
/// The client timeout is the per-endpoint harvest timeout; callers needing a
/// different bound override it per request.
pub fn create_client(config: &HarvestConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// GET a URL and return the raw body; non-success statuses are errors.
pub async fn get_bytes(client: &Client, url: &str, timeout: Duration) -> reqwest::Result<Vec<u8>> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}
