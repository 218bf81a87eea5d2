//! Extraction cache in front of a network-backed extractor.

use std::path::PathBuf;

use tracing::debug;

use curator_cache::{CacheOutcome, ExtractionCache};
use curator_shared::{RawDataset, Result, RunIdentity};

use crate::Extractor;

/// Serves a remote extractor's dataset from the extraction cache.
///
/// Without `force`, a cached dataset for the same pipeline id and source
/// identity is returned and the inner extractor never runs. With `force`, the
/// inner extractor always runs and its result replaces the cached copy.
/// Local extractors pass straight through.
pub struct CachedExtractor {
    inner: Box<dyn Extractor>,
    cache_root: PathBuf,
    force: bool,
}

impl CachedExtractor {
    pub fn new(inner: Box<dyn Extractor>, cache_root: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            inner,
            cache_root: cache_root.into(),
            force,
        }
    }

    /// Extract, also reporting how the cache was used (`None` when it was bypassed).
    pub fn extract_with_outcome(&self, run: &RunIdentity) -> Result<(RawDataset, Option<CacheOutcome>)> {
        if !self.inner.is_remote() {
            debug!(extractor = self.inner.name(), "local source, cache bypassed");
            return Ok((self.inner.extract(run)?, None));
        }

        let cache = ExtractionCache::open(&self.cache_root, &run.pipeline_id)?;
        let (dataset, outcome) =
            cache.get_or_fetch(&self.inner.identity(), self.force, || self.inner.extract(run))?;
        Ok((dataset, Some(outcome)))
    }
}

impl Extractor for CachedExtractor {
    fn extract(&self, run: &RunIdentity) -> Result<RawDataset> {
        self.extract_with_outcome(run).map(|(dataset, _)| dataset)
    }

    fn identity(&self) -> String {
        self.inner.identity()
    }

    fn is_remote(&self) -> bool {
        self.inner.is_remote()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
