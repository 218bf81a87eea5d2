//! Spreadsheet location dispatch.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Host serving shared spreadsheets.
const SHEETS_HOST: &str = "docs.google.com";

/// Workbook extensions read from the local filesystem.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

static SHEET_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/spreadsheets/d/([A-Za-z0-9_-]+)(?:/.*)?$").expect("valid regex"));

/// Which spreadsheet variant a location string selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetLocation {
    /// A shared spreadsheet URL; carries the id parsed from its path.
    ByUrl { id: String },
    /// An existing workbook file on disk.
    LocalFile(PathBuf),
    /// Anything else, taken verbatim as a spreadsheet id.
    ById(String),
}

impl SpreadsheetLocation {
    /// Resolve a location string. Rules are tried in order: shared URL,
    /// existing workbook file, verbatim id.
    pub fn resolve(location: &str) -> Self {
        if let Some(id) = sheet_id_from_url(location) {
            return Self::ByUrl { id };
        }
        let path = Path::new(location);
        if is_workbook_file(path) {
            return Self::LocalFile(path.to_path_buf());
        }
        Self::ById(location.to_string())
    }

    /// The remote spreadsheet id, for network-backed variants.
    pub fn sheet_id(&self) -> Option<&str> {
        match self {
            Self::ByUrl { id } | Self::ById(id) => Some(id),
            Self::LocalFile(_) => None,
        }
    }
}

fn sheet_id_from_url(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    if url.host_str() != Some(SHEETS_HOST) {
        return None;
    }
    SHEET_PATH_RE
        .captures(url.path())
        .map(|caps| caps[1].to_string())
}

fn is_workbook_file(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)));
    has_extension && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn edit_url_selects_by_url() {
        assert_eq!(
            SpreadsheetLocation::resolve("https://docs.google.com/spreadsheets/d/ABC123/edit"),
            SpreadsheetLocation::ByUrl { id: "ABC123".into() }
        );
        assert_eq!(
            SpreadsheetLocation::resolve("https://docs.google.com/spreadsheets/d/a_b-C?usp=sharing"),
            SpreadsheetLocation::ByUrl { id: "a_b-C".into() }
        );
    }

    #[test]
    fn other_hosts_are_ids() {
        let location = "https://example.com/spreadsheets/d/ABC123/edit";
        assert_eq!(
            SpreadsheetLocation::resolve(location),
            SpreadsheetLocation::ById(location.into())
        );
    }

    #[test]
    fn existing_workbook_selects_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.XLSX");
        std::fs::write(&path, b"not really a workbook").unwrap();
        let location = path.to_string_lossy().to_string();
        assert_eq!(
            SpreadsheetLocation::resolve(&location),
            SpreadsheetLocation::LocalFile(path)
        );
    }

    #[test]
    fn missing_workbook_falls_back_to_id() {
        assert_eq!(
            SpreadsheetLocation::resolve("/nope/missing.xlsx"),
            SpreadsheetLocation::ById("/nope/missing.xlsx".into())
        );
    }

    #[test]
    fn sheet_id_only_for_remote_variants() {
        assert_eq!(SpreadsheetLocation::ById("X".into()).sheet_id(), Some("X"));
        assert_eq!(SpreadsheetLocation::LocalFile("a.xlsx".into()).sheet_id(), None);
    }

    proptest! {
        #[test]
        fn plain_ids_resolve_verbatim(id in "[A-Za-z0-9_-]{1,44}") {
            prop_assert_eq!(SpreadsheetLocation::resolve(&id), SpreadsheetLocation::ById(id.clone()));
        }

        #[test]
        fn shared_urls_yield_their_id(id in "[A-Za-z0-9_-]{1,44}", suffix in "(|/|/edit|/edit#gid=0)") {
            let url = format!("https://docs.google.com/spreadsheets/d/{id}{suffix}");
            prop_assert_eq!(SpreadsheetLocation::resolve(&url), SpreadsheetLocation::ByUrl { id });
        }
    }
}
