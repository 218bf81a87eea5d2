//! Core run, dataset and artifact types shared by every Curator crate.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for cache entries and site manifests.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline invocation (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identity handed to extractors: the stable pipeline id plus this run's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    /// Configured pipeline id; namespaces cache entries and entity IRIs.
    pub pipeline_id: String,
    /// Per-invocation id for log correlation and provenance.
    pub run_id: RunId,
}

// ---------------------------------------------------------------------------
// RawDataset
// ---------------------------------------------------------------------------

/// Identifies where a dataset came from and how fresh it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFingerprint {
    /// Canonical source identity (e.g. `google-sheets:<id>`, `markdown-dir:<path>`).
    pub identity: String,
    /// SHA-256 of the source bytes, used as the freshness marker.
    pub content_hash: String,
    /// When the source was read.
    pub extracted_at: DateTime<Utc>,
}

/// Payload of one raw record, in the shape its source produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawPayload {
    /// A markdown document: parsed front matter plus the markdown body.
    Document {
        front_matter: serde_json::Map<String, serde_json::Value>,
        body: String,
    },
    /// A spreadsheet row: header name → cell text.
    Row { cells: BTreeMap<String, String> },
}

/// One record extracted from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Class name as spelled by the source (directory or sheet name).
    pub class_name: String,
    /// Source-local key, unique within the class.
    pub key: String,
    pub payload: RawPayload,
}

impl RawRecord {
    /// Record identifier within a dataset: `<class_name>/<key>`.
    pub fn record_id(&self) -> String {
        format!("{}/{}", self.class_name, self.key)
    }
}

/// Records extracted from one source, keyed by record identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    pub fingerprint: SourceFingerprint,
    records: BTreeMap<String, RawRecord>,
}

impl RawDataset {
    pub fn new(fingerprint: SourceFingerprint) -> Self {
        Self {
            fingerprint,
            records: BTreeMap::new(),
        }
    }

    /// Insert a record, returning the previous record with the same identifier.
    pub fn insert(&mut self, record: RawRecord) -> Option<RawRecord> {
        self.records.insert(record.record_id(), record)
    }

    pub fn get(&self, record_id: &str) -> Option<&RawRecord> {
        self.records.get(record_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in identifier order.
    pub fn records(&self) -> impl Iterator<Item = &RawRecord> {
        self.records.values()
    }

    pub fn into_records(self) -> impl Iterator<Item = RawRecord> {
        self.records.into_values()
    }
}

// ---------------------------------------------------------------------------
// Deployment & output
// ---------------------------------------------------------------------------

/// Where and how a rendered site is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    /// Final site directory.
    pub path: PathBuf,
    /// Move a non-empty previous deployment aside to a timestamped backup.
    pub archive: bool,
    /// Copy instead of rename (source and target on different filesystems).
    pub copy: bool,
    /// Skip deployment and leave the rendered directory in place.
    pub dev: bool,
    /// URL path prefix the site is served under (`/collection`), if not root.
    pub base_url_path: Option<String>,
}

/// What a loader produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputArtifact {
    /// A single serialized graph file.
    GraphFile { path: PathBuf, format: String },
    /// A deployed site directory, with the archived prior deployment if any.
    Site {
        path: PathBuf,
        backup: Option<PathBuf>,
    },
    /// A rendered site left in the working directory (dev mode).
    DevSite { path: PathBuf },
}

/// `manifest.json` written at the root of every bundled site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteManifest {
    pub schema_version: u32,
    pub pipeline_id: String,
    pub run_id: RunId,
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub entity_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_path: Option<String>,
}
