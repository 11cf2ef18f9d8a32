//! Short-lived cache of scraped embed links.
//!
//! Scraping a source page costs one proxied round trip and the page rarely
//! changes within a day, so providers may keep the extracted embed URLs for
//! [`CACHE_TTL_HOURS`]. Entries past that age read as misses and are dropped
//! by [`EmbedCache::purge`]. Resolution behaves the same with no cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const CACHE_TTL_HOURS: i64 = 12;

/// Embed links captured from one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub embed_urls: Vec<String>,
    pub title: String,
    pub captured_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(embed_urls: Vec<String>, title: impl Into<String>) -> Self {
        Self {
            embed_urls,
            title: title.into(),
            captured_at: Utc::now(),
        }
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.captured_at) < Duration::hours(CACHE_TTL_HOURS)
    }
}

/// In-memory cache with optional JSON persistence.
pub struct EmbedCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    path: Option<PathBuf>,
}

impl EmbedCache {
    /// Cache that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            path: None,
        }
    }

    /// Cache backed by a JSON file. An unreadable file starts an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Starting with empty embed cache: {e:#}");
                HashMap::new()
            }
        };
        Self {
            entries: Mutex::new(entries),
            path: Some(path),
        }
    }

    /// Default on-disk location under the user cache directory.
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("streamscout")
            .join("embeds.json")
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.get_at(key, Utc::now())
    }

    /// Fresh entry for `key` as of `now`; stale entries read as a miss.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        self.lock()
            .get(key)
            .filter(|entry| entry.is_fresh_at(now))
            .cloned()
    }

    /// Store `entry` and write the whole cache to disk when file-backed.
    pub fn insert(&self, key: impl Into<String>, entry: CacheEntry) {
        let snapshot = {
            let mut entries = self.lock();
            entries.insert(key.into(), entry);
            self.path.as_ref().map(|_| serde_json::to_string_pretty(&*entries))
        };
        match snapshot {
            Some(Ok(json)) => self.persist(json),
            Some(Err(e)) => warn!("Failed to serialize embed cache: {e}"),
            None => {}
        }
    }

    /// Drop stale entries from memory, returning how many were removed.
    ///
    /// The file is left alone; stale entries on disk read as misses and are
    /// overwritten by the next insert.
    pub fn purge(&self) -> usize {
        self.purge_at(Utc::now())
    }

    pub fn purge_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh_at(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Purged stale embed cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `json` outside the lock, on the blocking pool when called from
    /// inside a runtime.
    fn persist(&self, json: String) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let write = move || {
            if let Err(e) = save_entries(&path, &json) {
                warn!("Failed to write embed cache {}: {e:#}", path.display());
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }
}

fn load_entries(path: &Path) -> Result<HashMap<String, CacheEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn save_entries(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}
