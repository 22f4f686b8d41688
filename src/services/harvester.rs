// src/services/harvester.rs

//! Community harvester service.
//!
//! Fetches one community API document. A failing endpoint never removes the
//! community: the harvester falls back to the previous cached record (or a
//! stub) and marks it with `etime`/`error` instead.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use serde_json::{Map, Value};

use crate::error::{CommunityFetchError, DecodeError, Result};
use crate::models::{CommunityRecord, HarvestConfig};
use crate::utils::http;
use crate::utils::time::Timestamp;

/// Service for fetching community API documents.
pub struct Harvester {
    client: Client,
    timeout: Duration,
    fallback: &'static Encoding,
    fetched_at: Timestamp,
}

impl Harvester {
    /// Create a harvester stamping every record with `fetched_at`.
    pub fn new(client: Client, config: &HarvestConfig, fetched_at: Timestamp) -> Result<Self> {
        Ok(Self {
            client,
            timeout: config.timeout(),
            fallback: config.fallback_encoding()?,
            fetched_at,
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timestamp written into `mtime` / `etime` by this harvester.
    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    /// Harvest one community, never failing.
    pub async fn fetch(
        &self,
        id: &str,
        url: &str,
        previous: Option<CommunityRecord>,
    ) -> CommunityRecord {
        log::debug!("Working on community {}: {}", id, url);

        match self.fetch_document(url).await {
            Ok(mut record) => {
                record.mark_fetched(self.fetched_at);
                record.normalize_locations();
                record
            }
            Err(error) => {
                log::warn!("Error reading community api file {} ({}): {}", url, id, error);
                CommunityRecord::stale(id, previous, self.fetched_at, &error)
            }
        }
    }

    /// Fetch and parse a community document, retrying once in the fallback
    /// charset when the body is not valid UTF-8.
    pub async fn fetch_document(
        &self,
        url: &str,
    ) -> std::result::Result<CommunityRecord, CommunityFetchError> {
        let body = match self.fetch_text(url, UTF_8).await {
            Err(CommunityFetchError::Decode(error)) => {
                log::warn!(
                    "Unicode error: {}: {}, trying {} instead",
                    url,
                    error,
                    self.fallback.name()
                );
                self.fetch_text(url, self.fallback).await?
            }
            other => other?,
        };

        let document: Map<String, Value> = serde_json::from_str(&body)?;
        Ok(CommunityRecord::from_document(document))
    }

    async fn fetch_text(
        &self,
        url: &str,
        encoding: &'static Encoding,
    ) -> std::result::Result<String, CommunityFetchError> {
        let bytes = http::get_bytes(&self.client, url, self.timeout)
            .await
            .map_err(|e| CommunityFetchError::from_reqwest(url, self.timeout, e))?;
        Ok(decode(&bytes, encoding)?)
    }
}

/// Strictly decode `bytes`; a leading byte order mark is dropped.
fn decode(bytes: &[u8], encoding: &'static Encoding) -> std::result::Result<String, DecodeError> {
    let text = if encoding == UTF_8 {
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| DecodeError {
                charset: UTF_8.name(),
                offset: e.valid_up_to(),
            })?
    } else {
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or(DecodeError {
                charset: encoding.name(),
                offset: 0,
            })?
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn harvester() -> Harvester {
        let config = HarvestConfig::default();
        let at = time::parse("2024-05-01 12:00:00").unwrap();
        Harvester::new(Client::new(), &config, at).unwrap()
    }

    async fn serve(body: ResponseTemplate) -> (MockServer, String) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api.json"))
            .respond_with(body)
            .mount(&server)
            .await;
        let url = format!("{}/api.json", server.uri());
        (server, url)
    }

    #[tokio::test]
    async fn test_success_stamps_and_normalizes() {
        let (_server, url) = serve(ResponseTemplate::new(200).set_body_string(
            r#"{"name":"Alpha","location":{"geoCode":{"lat":1.0,"lon":2.0},"city":"Alphaville"}}"#,
        ))
        .await;

        let record = harvester().fetch("alpha", &url, None).await;

        assert!(record.is_fresh());
        assert_eq!(record.mtime, time::parse("2024-05-01 12:00:00"));
        let location = record.location.unwrap();
        assert_eq!(location.lat, Some(json!(1.0)));
        assert_eq!(location.lon, Some(json!(2.0)));
        assert_eq!(location.city.as_deref(), Some("Alphaville"));
    }

    #[tokio::test]
    async fn test_latin2_body_is_retried_with_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"{\"name\":\"Krak\xf3w\"}".to_vec()),
            )
            .expect(2)
            .mount(&server)
            .await;
        let url = format!("{}/api.json", server.uri());

        let record = harvester().fetch("krakow", &url, None).await;

        assert!(record.is_fresh());
        assert_eq!(record.name.as_deref(), Some("Kraków"));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_record() {
        let (_server, url) = serve(ResponseTemplate::new(500)).await;
        let previous: CommunityRecord = serde_json::from_str(
            r#"{"name":"Foo","location":{"city":"Bar"},"mtime":"2024-04-01 12:00:00"}"#,
        )
        .unwrap();

        let record = harvester().fetch("foo", &url, Some(previous)).await;

        assert!(record.is_stale());
        assert_eq!(record.name.as_deref(), Some("Foo"));
        assert_eq!(record.city(), Some("Bar"));
        assert_eq!(record.etime, time::parse("2024-05-01 12:00:00"));
        assert!(record.error.unwrap().starts_with("StatusError "));
    }

    #[tokio::test]
    async fn test_timeout_without_previous_yields_stub() {
        let (_server, url) = serve(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let record = harvester()
            .with_timeout(Duration::from_millis(200))
            .fetch("alpha", &url, None)
            .await;

        assert!(record.is_stale());
        assert_eq!(record.name.as_deref(), Some("alpha"));
        assert_eq!(record.city(), Some("alpha"));
        assert!(record.error.unwrap().starts_with("TimeoutError "));
    }

    #[tokio::test]
    async fn test_odd_field_types_do_not_fail_the_fetch() {
        let documents = [
            json!({"name": "Alpha", "location": {"city": "Alphaville"}, "state": {"lastchange": 1700000000}}),
            json!({"name": "Alpha", "techDetails": {"firmware": "gluon"}}),
            json!({"name": "Alpha", "mtime": "last week", "error": ["upstream"]}),
        ];

        for document in documents {
            let (_server, url) = serve(ResponseTemplate::new(200).set_body_json(&document)).await;

            let record = harvester().fetch("alpha", &url, None).await;

            assert!(record.is_fresh(), "{document} was not accepted");
            assert_eq!(record.name.as_deref(), Some("Alpha"));
            assert_eq!(record.mtime, time::parse("2024-05-01 12:00:00"));
        }
    }

    #[tokio::test]
    async fn test_odd_field_types_are_written_back() {
        let (_server, url) = serve(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Alpha",
            "techDetails": {"firmware": "gluon"},
            "state": {"lastchange": 1700000000, "nodes": "many"}
        })))
        .await;

        let record = harvester().fetch("alpha", &url, None).await;
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["techDetails"]["firmware"], json!("gluon"));
        assert_eq!(value["state"]["lastchange"], json!(1700000000));
        assert_eq!(value["state"]["nodes"], json!("many"));
    }

    #[tokio::test]
    async fn test_non_object_document_is_parse_error() {
        let (_server, url) = serve(ResponseTemplate::new(200).set_body_string("[1, 2]")).await;

        let err = harvester().fetch_document(&url).await.unwrap_err();

        assert_eq!(err.kind(), "ParseError");
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let (_server, url) = serve(ResponseTemplate::new(200).set_body_string("<html>")).await;

        let err = harvester().fetch_document(&url).await.unwrap_err();

        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_decode_reports_offset() {
        let err = decode(b"ab\xff", UTF_8).unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.charset, "UTF-8");
    }

    #[test]
    fn test_decode_strips_bom() {
        let text = decode(b"\xef\xbb\xbf{}", UTF_8).unwrap();
        assert_eq!(text, "{}");
    }
}
