//! Summary cache persistence.
//!
//! ## Storage Layout
//!
//! ```text
//! {dir}/
//! ├── ffSummarizedDir.json                  # Live cache, replaced atomically
//! └── history/                              # Append-only snapshots
//!     └── 20240501-12.00.00-ffSummarizedDir.json
//! ```
//!
//! A run loads the cache, snapshots the file as it was on disk, garbage
//! collects ids that left the directory, merges the harvest and persists.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CommunityRecord, Directory, PathsConfig, Summary};
use crate::utils::time::{self, Timestamp};
use crate::utils::to_pretty_json;

/// Filesystem store for the summary cache.
#[derive(Debug, Clone)]
pub struct SummaryStore {
    path: PathBuf,
    history_dir: PathBuf,
}

impl SummaryStore {
    /// Create a store for the cache at `path`, snapshotting into `history_dir`.
    pub fn new(path: impl Into<PathBuf>, history_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            history_dir: history_dir.into(),
        }
    }

    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(&paths.summary, paths.history_dir())
    }

    /// Location of the live cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache; a missing or empty file is an empty summary.
    ///
    /// Only unreadable JSON or a top level that is not an object fails. An
    /// entry that is not an object is dropped, to be fetched again.
    pub async fn load(&self) -> Result<Summary> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!(
                    "No summary cache at {}, starting empty",
                    self.path.display()
                );
                return Ok(Summary::new());
            }
            Err(e) => return Err(AppError::cache_load(&self.path, e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Summary::new());
        }

        let entries: Option<Map<String, Value>> =
            serde_json::from_slice(&bytes).map_err(|e| AppError::cache_load(&self.path, e))?;

        let mut summary = Summary::new();
        for (id, entry) in entries.unwrap_or_default() {
            match entry {
                Value::Object(object) => {
                    summary.insert(id, CommunityRecord::from(object));
                }
                other => log::warn!(
                    "Cached entry {} is not an object, dropped: {}",
                    id,
                    other
                ),
            }
        }
        log::debug!(
            "Loaded {} cached records from {}",
            summary.len(),
            self.path.display()
        );
        Ok(summary)
    }

    /// Copy the cache file verbatim into the history directory.
    ///
    /// Returns the snapshot path, or `None` when there is no cache yet.
    pub async fn snapshot(&self, at: &Timestamp) -> Result<Option<PathBuf>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(None);
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "summary.json".to_string());
        let target = self
            .history_dir
            .join(format!("{}{}", time::history_prefix(at), file_name));

        let snapshot_err = |source: std::io::Error| AppError::Snapshot {
            path: target.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.history_dir)
            .await
            .map_err(snapshot_err)?;

        let mut source = tokio::fs::File::open(&self.path)
            .await
            .map_err(snapshot_err)?;
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::warn!(
                    "Snapshot {} already exists, keeping it",
                    target.display()
                );
                return Ok(None);
            }
            Err(e) => return Err(snapshot_err(e)),
        };
        tokio::io::copy(&mut source, &mut file)
            .await
            .map_err(snapshot_err)?;
        file.sync_all().await.map_err(snapshot_err)?;

        Ok(Some(target))
    }

    /// Write the summary, replacing the previous file only once the new
    /// content is fully on disk.
    pub async fn persist(&self, summary: &Summary) -> Result<()> {
        let bytes = to_pretty_json(summary)?;
        self.write_bytes(&bytes)
            .await
            .map_err(|e| AppError::persistence(&self.path, e))?;
        log::info!(
            "Summary with {} records written to {}",
            summary.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        written
    }
}

/// Drop every record whose id is not in the directory. Returns removed ids.
///
/// Synthetic location ids are never directory keys, so they go too; they are
/// regenerated from their parent's fetch in the same run.
pub fn collect_garbage(summary: &mut Summary, directory: &Directory) -> Vec<String> {
    let removed: Vec<String> = summary
        .keys()
        .filter(|id| !directory.contains(id))
        .cloned()
        .collect();
    for id in &removed {
        summary.remove(id);
    }
    removed
}

/// Insert harvested records, overwriting existing ids.
pub fn merge(summary: &mut Summary, records: impl IntoIterator<Item = (String, CommunityRecord)>) {
    for (id, record) in records {
        summary.insert(id, record);
    }
}
