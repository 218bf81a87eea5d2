//! On-disk extraction cache.
//!
//! The [`ExtractionCache`] stores extracted [`RawDataset`]s as JSON files,
//! namespaced by pipeline id and keyed by the SHA-256 of the canonical source
//! identity:
//!
//! ```text
//! <cache_dir>/<pipeline-id>/<sha256(identity)>.json
//! ```
//!
//! **Access rules:**
//! - At most one writer per key at a time; writes go to a temp file and are
//!   renamed into place, so readers never see a partial entry.
//! - Entries written under another schema version are treated as misses.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use curator_shared::{CURRENT_SCHEMA_VERSION, CuratorError, RawDataset, Result, slugify};

/// How a dataset was obtained by [`ExtractionCache::get_or_fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from the cache without touching the source.
    Hit,
    /// No usable entry; fetched and stored.
    Miss,
    /// Forced refresh; fetched and overwrote any entry.
    Refreshed,
}

#[derive(Deserialize)]
struct CacheEntry {
    schema_version: u32,
    dataset: RawDataset,
}

#[derive(Serialize)]
struct CacheEntryRef<'a> {
    schema_version: u32,
    dataset: &'a RawDataset,
}

/// Extraction cache for one pipeline id.
#[derive(Debug, Clone)]
pub struct ExtractionCache {
    dir: PathBuf,
}

impl ExtractionCache {
    /// Open (creating if needed) the cache namespace for `pipeline_id` under `root`.
    pub fn open(root: &Path, pipeline_id: &str) -> Result<Self> {
        let namespace = match slugify(pipeline_id) {
            s if s.is_empty() => "default".to_string(),
            s => s,
        };
        let dir = root.join(namespace);
        std::fs::create_dir_all(&dir).map_err(|e| CuratorError::io(&dir, e))?;
        debug!(path = %dir.display(), "opened extraction cache");
        Ok(Self { dir })
    }

    /// Directory holding this pipeline's entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for a canonical source identity.
    pub fn entry_path(&self, identity: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entry_path(identity).is_file()
    }

    /// Read the entry for `identity`. Unreadable or outdated entries are misses.
    pub fn get(&self, identity: &str) -> Result<Option<RawDataset>> {
        let path = self.entry_path(identity);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CuratorError::io(&path, e)),
        };

        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                return Ok(None);
            }
        };

        if entry.schema_version != CURRENT_SCHEMA_VERSION {
            debug!(
                path = %path.display(),
                found = entry.schema_version,
                expected = CURRENT_SCHEMA_VERSION,
                "ignoring cache entry with other schema version"
            );
            return Ok(None);
        }

        if entry.dataset.fingerprint.identity != identity {
            warn!(
                path = %path.display(),
                stored = %entry.dataset.fingerprint.identity,
                requested = identity,
                "cache entry identity mismatch, ignoring"
            );
            return Ok(None);
        }

        Ok(Some(entry.dataset))
    }

    /// Store `dataset` under `identity`, replacing any existing entry atomically.
    pub fn put(&self, identity: &str, dataset: &RawDataset) -> Result<PathBuf> {
        let target = self.entry_path(identity);
        let entry = CacheEntryRef {
            schema_version: CURRENT_SCHEMA_VERSION,
            dataset,
        };
        let json = serde_json::to_vec(&entry)
            .map_err(|e| CuratorError::source_format(identity, format!("cache serialization failed: {e}")))?;

        let temp = self.dir.join(format!(".{}.tmp", Uuid::now_v7()));
        std::fs::write(&temp, json).map_err(|e| CuratorError::io(&temp, e))?;
        if let Err(e) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(CuratorError::io(&target, e));
        }

        debug!(path = %target.display(), records = dataset.len(), "wrote cache entry");
        Ok(target)
    }

    /// Remove the entry for `identity`. Returns whether one existed.
    pub fn invalidate(&self, identity: &str) -> Result<bool> {
        let path = self.entry_path(identity);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CuratorError::io(&path, e)),
        }
    }

    /// Cache policy for network-backed sources.
    ///
    /// Without `force`, a present entry is returned and `fetch` is not called.
    /// With `force`, or on a miss, `fetch` runs and its result overwrites the entry.
    pub fn get_or_fetch<F>(&self, identity: &str, force: bool, fetch: F) -> Result<(RawDataset, CacheOutcome)>
    where
        F: FnOnce() -> Result<RawDataset>,
    {
        if !force {
            if let Some(dataset) = self.get(identity)? {
                info!(identity, records = dataset.len(), "using cached extraction");
                return Ok((dataset, CacheOutcome::Hit));
            }
        }

        let dataset = fetch()?;
        self.put(identity, &dataset)?;

        let outcome = if force {
            CacheOutcome::Refreshed
        } else {
            CacheOutcome::Miss
        };
        info!(identity, records = dataset.len(), ?outcome, "cached fresh extraction");
        Ok((dataset, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    use curator_shared::{RawPayload, RawRecord, SourceFingerprint};

    const IDENTITY: &str = "google-sheets:ABC123";

    fn dataset(title: &str) -> RawDataset {
        let mut dataset = RawDataset::new(SourceFingerprint {
            identity: IDENTITY.into(),
            content_hash: format!("hash-{title}"),
            extracted_at: chrono::Utc::now(),
        });
        dataset.insert(RawRecord {
            class_name: "Work".into(),
            key: "w1".into(),
            payload: RawPayload::Row {
                cells: BTreeMap::from([("title".to_string(), title.to_string())]),
            },
        });
        dataset
    }

    fn test_cache() -> (tempfile::TempDir, ExtractionCache) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cache = ExtractionCache::open(tmp.path(), "Demo Site").expect("open cache");
        (tmp, cache)
    }

    #[test]
    fn open_namespaces_by_pipeline() {
        let (tmp, cache) = test_cache();
        assert_eq!(cache.dir(), tmp.path().join("demo-site"));
        assert!(cache.dir().is_dir());
    }

    #[test]
    fn put_then_get() {
        let (_tmp, cache) = test_cache();
        assert!(cache.get(IDENTITY).unwrap().is_none());

        cache.put(IDENTITY, &dataset("first")).unwrap();
        assert!(cache.contains(IDENTITY));
        let found = cache.get(IDENTITY).unwrap().expect("hit");
        assert_eq!(found, dataset_with_same_hash(&found, "first"));
    }

    fn dataset_with_same_hash(found: &RawDataset, title: &str) -> RawDataset {
        let mut expected = dataset(title);
        expected.fingerprint.extracted_at = found.fingerprint.extracted_at;
        expected
    }

    #[test]
    fn hit_skips_fetch() {
        let (_tmp, cache) = test_cache();
        cache.put(IDENTITY, &dataset("cached")).unwrap();

        let calls = Cell::new(0);
        let (found, outcome) = cache
            .get_or_fetch(IDENTITY, false, || {
                calls.set(calls.get() + 1);
                Ok(dataset("fresh"))
            })
            .unwrap();

        assert_eq!(outcome, CacheOutcome::Hit);
        assert_eq!(calls.get(), 0);
        assert_eq!(found.fingerprint.content_hash, "hash-cached");
    }

    #[test]
    fn miss_fetches_and_stores() {
        let (_tmp, cache) = test_cache();
        let (found, outcome) = cache
            .get_or_fetch(IDENTITY, false, || Ok(dataset("fresh")))
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Miss);
        assert_eq!(found.fingerprint.content_hash, "hash-fresh");
        assert!(cache.contains(IDENTITY));
    }

    #[test]
    fn force_overwrites_existing_entry() {
        let (_tmp, cache) = test_cache();
        cache.put(IDENTITY, &dataset("stale")).unwrap();

        let (found, outcome) = cache
            .get_or_fetch(IDENTITY, true, || Ok(dataset("fresh")))
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Refreshed);
        assert_eq!(found.fingerprint.content_hash, "hash-fresh");

        let stored = cache.get(IDENTITY).unwrap().expect("entry");
        assert_eq!(stored.fingerprint.content_hash, "hash-fresh");
    }

    #[test]
    fn failed_fetch_keeps_existing_entry() {
        let (_tmp, cache) = test_cache();
        cache.put(IDENTITY, &dataset("stale")).unwrap();

        let err = cache
            .get_or_fetch(IDENTITY, true, || {
                Err(CuratorError::source_not_found(IDENTITY, "HTTP 404"))
            })
            .unwrap_err();
        assert!(matches!(err, CuratorError::SourceNotFound { .. }));
        assert_eq!(
            cache.get(IDENTITY).unwrap().unwrap().fingerprint.content_hash,
            "hash-stale"
        );
    }

    #[test]
    fn corrupt_and_outdated_entries_are_misses() {
        let (_tmp, cache) = test_cache();
        std::fs::write(cache.entry_path(IDENTITY), "{not json").unwrap();
        assert!(cache.get(IDENTITY).unwrap().is_none());

        let outdated = serde_json::json!({
            "schema_version": CURRENT_SCHEMA_VERSION + 1,
            "dataset": dataset("old"),
        });
        std::fs::write(cache.entry_path(IDENTITY), outdated.to_string()).unwrap();
        assert!(cache.get(IDENTITY).unwrap().is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let (_tmp, cache) = test_cache();
        cache.put(IDENTITY, &dataset("x")).unwrap();
        assert!(cache.invalidate(IDENTITY).unwrap());
        assert!(!cache.invalidate(IDENTITY).unwrap());
        assert!(!cache.contains(IDENTITY));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (_tmp, cache) = test_cache();
        cache.put(IDENTITY, &dataset("x")).unwrap();
        for entry in std::fs::read_dir(cache.dir()).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }
    }
}
