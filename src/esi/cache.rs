// src/esi/cache.rs — File-backed ESI response cache
//
// Stores the body, ETag and Expires of every successful GET. A fresh entry
// is served without a request; a stale one is revalidated with If-None-Match.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub etag: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub body: String,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|e| now < e)
    }
}

pub struct EsiCache {
    dir: PathBuf,
}

impl EsiCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Entries are scoped to the token owner so characters never share data.
    pub fn key_for(method: &str, url: &str, character_id: Option<i64>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method);
        hasher.update(b"|");
        hasher.update(url);
        hasher.update(b"|");
        hasher.update(character_id.unwrap_or_default().to_string());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn load(&self, key: &str) -> Option<CacheEntry> {
        let data = std::fs::read_to_string(self.path_for(key)).ok()?;
        serde_json::from_str(&data).ok()
    }

    /// Save an entry (best-effort).
    pub fn save(&self, key: &str, entry: &CacheEntry) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!("Failed to create ESI cache dir {}: {e}", self.dir.display());
            return;
        }
        match serde_json::to_string(entry) {
            Ok(json) => {
                if let Err(e) = std::fs::write(self.path_for(key), json) {
                    tracing::warn!("Failed to write ESI cache entry {key}: {e}");
                }
            }
            Err(e) => tracing::warn!("Failed to serialize ESI cache entry {key}: {e}"),
        }
    }
}
