//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where the community directory lives
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// HTTP and harvesting behavior settings
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Cache and output file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Assets referenced by the rendered HTML table
    #[serde(default)]
    pub render: RenderConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.directory.url)
            .map_err(|e| AppError::validation(format!("directory.url is invalid: {e}")))?;
        if self.directory.timeout_secs == 0 {
            return Err(AppError::validation("directory.timeout_secs must be > 0"));
        }
        if self.harvest.user_agent.trim().is_empty() {
            return Err(AppError::validation("harvest.user_agent is empty"));
        }
        if self.harvest.timeout_secs == 0 {
            return Err(AppError::validation("harvest.timeout_secs must be > 0"));
        }
        if self.harvest.max_concurrent == 0 {
            return Err(AppError::validation("harvest.max_concurrent must be > 0"));
        }
        if self.harvest.deadline_secs == Some(0) {
            return Err(AppError::validation("harvest.deadline_secs must be > 0"));
        }
        self.harvest.fallback_encoding()?;
        if self.paths.summary.as_os_str().is_empty() {
            return Err(AppError::validation("paths.summary is empty"));
        }
        Ok(())
    }
}

/// Directory source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// URL of the directory document (`http(s)://` or `file://`)
    #[serde(default = "defaults::directory_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: defaults::directory_url(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// HTTP client and harvesting behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-endpoint request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent endpoint fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Upper bound for the whole harvest, unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,

    /// Charset label tried when a body is not valid UTF-8
    #[serde(default = "defaults::fallback_charset")]
    pub fallback_charset: String,
}

impl HarvestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Resolve the fallback charset label to an encoding.
    pub fn fallback_encoding(&self) -> Result<&'static encoding_rs::Encoding> {
        encoding_rs::Encoding::for_label(self.fallback_charset.trim().as_bytes()).ok_or_else(|| {
            AppError::validation(format!(
                "harvest.fallback_charset '{}' is not a known charset",
                self.fallback_charset
            ))
        })
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            deadline_secs: None,
            fallback_charset: defaults::fallback_charset(),
        }
    }
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Summary cache file
    #[serde(default = "defaults::summary")]
    pub summary: PathBuf,

    /// History snapshot directory, `history/` beside the summary when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_dir: Option<PathBuf>,

    /// GeoJSON output file
    #[serde(default = "defaults::geojson")]
    pub geojson: PathBuf,

    /// HTML table output file
    #[serde(default = "defaults::html_table")]
    pub html_table: PathBuf,
}

impl PathsConfig {
    /// Effective history directory.
    pub fn history_dir(&self) -> PathBuf {
        match &self.history_dir {
            Some(dir) => dir.clone(),
            None => self
                .summary
                .parent()
                .map(|p| p.join("history"))
                .unwrap_or_else(|| PathBuf::from("history")),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            summary: defaults::summary(),
            history_dir: None,
            geojson: defaults::geojson(),
            html_table: defaults::html_table(),
        }
    }
}

/// HTML table asset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "defaults::stylesheet_url")]
    pub stylesheet_url: String,

    #[serde(default = "defaults::script_url")]
    pub script_url: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            stylesheet_url: defaults::stylesheet_url(),
            script_url: defaults::script_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of `error`, `warn`, `info`, `debug`, `trace`
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Directory defaults
    pub fn directory_url() -> String {
        "https://raw.githubusercontent.com/freifunk/directory.api.freifunk.net/master/directory.json"
            .into()
    }
    pub fn timeout() -> u64 {
        10
    }

    // Harvest defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_9_3) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/35.0.1916.47 Safari/537.36".into()
    }
    pub fn max_concurrent() -> usize {
        8
    }
    pub fn fallback_charset() -> String {
        "ISO-8859-2".into()
    }

    // Path defaults
    pub fn summary() -> PathBuf {
        PathBuf::from("ffSummarizedDir.json")
    }
    pub fn geojson() -> PathBuf {
        PathBuf::from("ffGeoJson.json")
    }
    pub fn html_table() -> PathBuf {
        PathBuf::from("ffHtmlTable.html")
    }

    // Render defaults
    pub fn stylesheet_url() -> String {
        "//www.freifunk.net/map/community_map.css".into()
    }
    pub fn script_url() -> String {
        "//www.freifunk.net/map/sorttable.js".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
