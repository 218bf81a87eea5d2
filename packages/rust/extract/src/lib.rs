//! Source extraction: turns an input location into a [`RawDataset`].
//!
//! This crate provides:
//! - [`Extractor`]: the extraction capability implemented per source kind
//! - [`MarkdownDirectoryExtractor`]: a directory of markdown documents with front matter
//! - [`GoogleSheetsExtractor`] / [`LocalWorkbookExtractor`]: spreadsheet sources
//! - [`SpreadsheetLocation`]: picks the spreadsheet variant from a location string
//! - [`CachedExtractor`]: wraps a network-backed extractor with the extraction cache

mod cached;
mod location;
mod markdown;
mod sheets;
mod workbook;

use sha2::{Digest, Sha256};

use curator_shared::{RawDataset, Result, RunIdentity};

pub use cached::CachedExtractor;
pub use location::SpreadsheetLocation;
pub use markdown::{MarkdownDirectoryExtractor, split_front_matter};
pub use sheets::{DEFAULT_EXPORT_BASE, GoogleSheetsExtractor, LocalWorkbookExtractor, export_url};
pub use workbook::parse_workbook;

/// User-Agent string for source requests.
pub(crate) const USER_AGENT: &str = concat!("Curator/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Reads one source and produces its raw records.
pub trait Extractor {
    /// Extract the source. Fails with `SourceNotFound` when the location does
    /// not exist or cannot be reached, `SourceFormat` when it cannot be parsed.
    fn extract(&self, run: &RunIdentity) -> Result<RawDataset>;

    /// Canonical identity of the source, used in fingerprints and cache keys.
    fn identity(&self) -> String;

    /// Whether reading the source costs network I/O worth caching.
    fn is_remote(&self) -> bool {
        false
    }

    /// Human-readable extractor name for tracing.
    fn name(&self) -> &str;
}

/// Hex SHA-256 of source bytes.
pub(crate) fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
