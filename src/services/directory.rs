// src/services/directory.rs

//! Directory loader service.
//!
//! Fetches the mapping of community ids to API document URLs. Without it
//! there is nothing to harvest, so every failure here is fatal for the run.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::Directory;
use crate::utils::http;

/// Loads the community directory over HTTP or from a `file://` URL.
pub struct DirectoryLoader {
    client: Client,
}

impl DirectoryLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch and parse the directory at `url`.
    pub async fn load(&self, url: &str, timeout: Duration) -> Result<Directory> {
        let parsed = Url::parse(url).map_err(|e| AppError::directory(url, e))?;

        let bytes = if parsed.scheme() == "file" {
            let path = parsed
                .to_file_path()
                .map_err(|_| AppError::directory(url, "not a local file path"))?;
            tokio::time::timeout(timeout, tokio::fs::read(&path))
                .await
                .map_err(|_| AppError::directory(url, "timed out reading file"))?
                .map_err(|e| AppError::directory(url, e))?
        } else {
            http::get_bytes(&self.client, url, timeout)
                .await
                .map_err(|e| AppError::directory(url, e))?
        };

        let directory: Directory = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::directory(url, format!("not a community directory: {e}")))?;

        log::info!(
            "Loaded directory with {} communities from {}",
            directory.len(),
            url
        );
        log::debug!("Directory: {:?}", directory);

        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_load_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/directory.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"alpha": "http://a.example/api.json"}"#),
            )
            .mount(&server)
            .await;

        let loader = DirectoryLoader::new(Client::new());
        let url = format!("{}/directory.json", server.uri());
        let directory = loader.load(&url, TIMEOUT).await.unwrap();

        assert_eq!(directory.url("alpha"), Some("http://a.example/api.json"));
    }

    #[tokio::test]
    async fn test_load_from_file_url() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("directory.json");
        std::fs::write(&file, r#"{"beta": "http://b.example/api.json"}"#).unwrap();

        let loader = DirectoryLoader::new(Client::new());
        let url = Url::from_file_path(&file).unwrap();
        let directory = loader.load(url.as_str(), TIMEOUT).await.unwrap();

        assert!(directory.contains("beta"));
    }

    #[tokio::test]
    async fn test_server_error_is_directory_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let loader = DirectoryLoader::new(Client::new());
        let err = loader.load(&server.uri(), TIMEOUT).await.unwrap_err();

        assert!(matches!(err, AppError::DirectoryFetch { .. }));
    }

    #[tokio::test]
    async fn test_unparsable_body_is_directory_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"["alpha", "beta"]"#))
            .mount(&server)
            .await;

        let loader = DirectoryLoader::new(Client::new());
        let err = loader.load(&server.uri(), TIMEOUT).await.unwrap_err();

        match err {
            AppError::DirectoryFetch { message, .. } => {
                assert!(message.starts_with("not a community directory"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_slow_directory_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let loader = DirectoryLoader::new(Client::new());
        let err = loader
            .load(&server.uri(), Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DirectoryFetch { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let loader = DirectoryLoader::new(Client::new());
        let err = loader.load("not a url", TIMEOUT).await.unwrap_err();
        assert!(matches!(err, AppError::DirectoryFetch { .. }));
    }
}
