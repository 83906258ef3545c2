// src/api/cache.rs — Hashed-name file cache for XML API responses
//
// Each call is stored at {dir}/{sha256(key, scope, name, args)}.xml and
// served back while the document's own <cachedUntil> lies in the future.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::xml::XmlResult;

pub struct XmlCache {
    dir: PathBuf,
}

impl XmlCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache file name for a call. Argument order does not matter.
    pub fn key_for(
        key_id: Option<i64>,
        v_code: Option<&str>,
        scope: &str,
        name: &str,
        args: &[(&str, String)],
    ) -> String {
        let mut sorted: Vec<_> = args.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = Sha256::new();
        hasher.update(key_id.unwrap_or_default().to_string());
        hasher.update(b"|");
        hasher.update(v_code.unwrap_or_default());
        hasher.update(b"|");
        hasher.update(scope);
        hasher.update(b"|");
        hasher.update(name);
        for (k, v) in sorted {
            hasher.update(b"|");
            hasher.update(k);
            hasher.update(b"=");
            hasher.update(v);
        }
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.xml"))
    }

    /// Return the cached body if present, parseable, and still fresh at `now`.
    pub fn load(&self, key: &str, now: DateTime<Utc>) -> Option<XmlResult> {
        let body = std::fs::read_to_string(self.path_for(key)).ok()?;
        let result = XmlResult::parse(&body).ok()?;
        if result.is_fresh(now) {
            tracing::debug!("XML cache hit {key}");
            Some(result)
        } else {
            None
        }
    }

    /// Save a response body (best-effort).
    pub fn save(&self, key: &str, body: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!("Failed to create XML cache dir {}: {e}", self.dir.display());
            return;
        }
        if let Err(e) = std::fs::write(self.path_for(key), body) {
            tracing::warn!("Failed to write XML cache entry {key}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BODY: &str = r#"<eveapi version="2"><currentTime>2016-03-01 10:00:00</currentTime>
<result><rowset name="jobs"/></result><cachedUntil>2016-03-01 10:15:00</cachedUntil></eveapi>"#;

    #[test]
    fn test_key_ignores_argument_order() {
        let a = XmlCache::key_for(
            Some(1),
            Some("v"),
            "corp",
            "WalletJournal",
            &[("accountKey", "1000".into()), ("rowCount", "2560".into())],
        );
        let b = XmlCache::key_for(
            Some(1),
            Some("v"),
            "corp",
            "WalletJournal",
            &[("rowCount", "2560".into()), ("accountKey", "1000".into())],
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other_key = XmlCache::key_for(Some(2), Some("v"), "corp", "WalletJournal", &[]);
        assert_ne!(a, other_key);
    }

    #[test]
    fn test_load_respects_cached_until() {
        let dir = tempfile::tempdir().unwrap();
        let cache = XmlCache::new(dir.path());
        cache.save("k", BODY);

        let fresh = Utc.with_ymd_and_hms(2016, 3, 1, 10, 10, 0).unwrap();
        let stale = Utc.with_ymd_and_hms(2016, 3, 1, 11, 0, 0).unwrap();
        assert!(cache.load("k", fresh).is_some());
        assert!(cache.load("k", stale).is_none());
        assert!(cache.load("missing", fresh).is_none());
    }
}
