//! Spreadsheet extractors: shared remote spreadsheets and local workbook files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, info, instrument};
use url::Url;

use curator_shared::{CuratorError, RawDataset, RawRecord, Result, RunIdentity, SourceFingerprint};

use crate::{Extractor, USER_AGENT, content_hash, parse_workbook};

/// Default origin serving spreadsheet exports.
pub const DEFAULT_EXPORT_BASE: &str = "https://docs.google.com";

/// Default timeout in seconds for export downloads.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Export URL of a spreadsheet as xlsx. The id is one encoded path segment.
pub fn export_url(export_base: &str, sheet_id: &str) -> Result<String> {
    let invalid = |msg: String| CuratorError::config(format!("invalid export base {export_base:?}: {msg}"));
    let mut url = Url::parse(export_base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("cannot hold a path".into()))?
        .pop_if_empty()
        .extend(["spreadsheets", "d", sheet_id, "export"]);
    url.set_query(Some("format=xlsx"));
    Ok(url.into())
}

fn dataset_from_records(identity: String, hash: String, records: Vec<RawRecord>) -> RawDataset {
    let mut dataset = RawDataset::new(SourceFingerprint {
        identity,
        content_hash: hash,
        extracted_at: Utc::now(),
    });
    for record in records {
        dataset.insert(record);
    }
    dataset
}

// ---------------------------------------------------------------------------
// Remote spreadsheet
// ---------------------------------------------------------------------------

/// Downloads a shared spreadsheet as an xlsx export.
#[derive(Debug, Clone)]
pub struct GoogleSheetsExtractor {
    sheet_id: String,
    export_base: String,
    timeout: Duration,
}

impl GoogleSheetsExtractor {
    pub fn new(sheet_id: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            export_base: DEFAULT_EXPORT_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Download from another origin (a mirror, or a mock server in tests).
    pub fn with_export_base(mut self, export_base: impl Into<String>) -> Self {
        self.export_base = export_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    fn download(&self) -> Result<Vec<u8>> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(|e| CuratorError::Network(format!("failed to build HTTP client: {e}")))?;

        let url = export_url(&self.export_base, &self.sheet_id)?;
        debug!(%url, "downloading spreadsheet export");

        let response = client
            .get(&url)
            .send()
            .map_err(|e| CuratorError::source_not_found(self.identity(), format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CuratorError::source_not_found(
                self.identity(),
                "spreadsheet does not exist or is not shared",
            ));
        }
        if !status.is_success() {
            return Err(CuratorError::source_not_found(
                self.identity(),
                format!("{url}: HTTP {status}"),
            ));
        }

        let bytes = response.bytes().map_err(|e| {
            CuratorError::source_not_found(self.identity(), format!("{url}: failed to read body: {e}"))
        })?;
        Ok(bytes.to_vec())
    }
}

impl Extractor for GoogleSheetsExtractor {
    #[instrument(skip_all, fields(sheet_id = %self.sheet_id, run_id = %run.run_id))]
    fn extract(&self, run: &RunIdentity) -> Result<RawDataset> {
        let bytes = self.download()?;
        let hash = content_hash(&bytes);
        let identity = self.identity();
        let records = parse_workbook(bytes, &identity)?;
        let dataset = dataset_from_records(identity, hash, records);
        info!(pipeline_id = %run.pipeline_id, records = dataset.len(), "extracted spreadsheet");
        Ok(dataset)
    }

    /// The URL and bare-id forms of one spreadsheet share this identity.
    fn identity(&self) -> String {
        format!("google-sheets:{}", self.sheet_id)
    }

    fn is_remote(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "google-sheets"
    }
}

// ---------------------------------------------------------------------------
// Local workbook
// ---------------------------------------------------------------------------

/// Reads a workbook file from disk.
#[derive(Debug, Clone)]
pub struct LocalWorkbookExtractor {
    path: PathBuf,
}

impl LocalWorkbookExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Extractor for LocalWorkbookExtractor {
    #[instrument(skip_all, fields(path = %self.path.display(), run_id = %run.run_id))]
    fn extract(&self, run: &RunIdentity) -> Result<RawDataset> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CuratorError::source_not_found(
                    self.path.display().to_string(),
                    "workbook file does not exist",
                ));
            }
            Err(e) => return Err(CuratorError::io(&self.path, e)),
        };
        let hash = content_hash(&bytes);
        let records = parse_workbook(bytes, &self.path.display().to_string())?;
        let dataset = dataset_from_records(self.identity(), hash, records);
        info!(pipeline_id = %run.pipeline_id, records = dataset.len(), "extracted workbook");
        Ok(dataset)
    }

    fn identity(&self) -> String {
        format!("workbook:{}", self.path.display())
    }

    fn name(&self) -> &str {
        "local-workbook"
    }
}
