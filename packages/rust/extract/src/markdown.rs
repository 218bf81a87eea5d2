//! Directory-of-documents extraction.
//!
//! Layout: `<root>/<class-dir>/**/<key>.md`. The first-level directory names the
//! class; the file stem (prefixed by any nested directories) is the key. Files
//! may open with a YAML front matter block delimited by `---` lines.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use curator_shared::{
    CuratorError, RawDataset, RawPayload, RawRecord, Result, RunIdentity, SourceFingerprint,
};

use crate::Extractor;

/// Reads every markdown document under a root directory.
#[derive(Debug, Clone)]
pub struct MarkdownDirectoryExtractor {
    root: PathBuf,
}

impl MarkdownDirectoryExtractor {
    /// Create an extractor for `root`. Fails with `SourceNotFound` unless it is a directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CuratorError::source_not_found(
                root.display().to_string(),
                "input directory does not exist",
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Extractor for MarkdownDirectoryExtractor {
    #[instrument(skip_all, fields(root = %self.root.display(), run_id = %run.run_id))]
    fn extract(&self, run: &RunIdentity) -> Result<RawDataset> {
        let mut documents = Vec::new();
        for entry in sorted_entries(&self.root)? {
            let name = file_name(&entry);
            if name.starts_with('.') {
                continue;
            }
            if entry.is_dir() {
                collect_documents(&entry, &name, &mut Vec::new(), &mut documents)?;
            } else if is_markdown(&entry) {
                warn!(path = %entry.display(), "skipping document outside a class directory");
            }
        }

        // Fingerprint covers relative paths as well as contents.
        let mut hasher = Sha256::new();
        let mut records = Vec::with_capacity(documents.len());
        for doc in documents {
            let content = std::fs::read_to_string(&doc.path).map_err(|e| CuratorError::io(&doc.path, e))?;
            hasher.update(doc.path.strip_prefix(&self.root).unwrap_or(&doc.path).to_string_lossy().as_bytes());
            hasher.update([0]);
            hasher.update(content.as_bytes());

            let (front_matter, body) = split_front_matter(&content)
                .map_err(|msg| CuratorError::source_format(doc.path.display().to_string(), msg))?;
            debug!(class = %doc.class_name, key = %doc.key, "read document");
            records.push(RawRecord {
                class_name: doc.class_name,
                key: doc.key,
                payload: RawPayload::Document {
                    front_matter,
                    body: body.to_string(),
                },
            });
        }

        let mut dataset = RawDataset::new(SourceFingerprint {
            identity: self.identity(),
            content_hash: format!("{:x}", hasher.finalize()),
            extracted_at: Utc::now(),
        });
        for record in records {
            dataset.insert(record);
        }

        info!(
            pipeline_id = %run.pipeline_id,
            records = dataset.len(),
            "extracted markdown directory"
        );
        Ok(dataset)
    }

    fn identity(&self) -> String {
        format!("markdown-dir:{}", self.root.display())
    }

    fn name(&self) -> &str {
        "markdown-directory"
    }
}

// ---------------------------------------------------------------------------
// Directory walk
// ---------------------------------------------------------------------------

struct DocumentPath {
    path: PathBuf,
    class_name: String,
    key: String,
}

fn collect_documents(
    dir: &Path,
    class_name: &str,
    prefix: &mut Vec<String>,
    out: &mut Vec<DocumentPath>,
) -> Result<()> {
    for entry in sorted_entries(dir)? {
        let name = file_name(&entry);
        if name.starts_with('.') {
            continue;
        }
        if entry.is_dir() {
            prefix.push(name);
            collect_documents(&entry, class_name, prefix, out)?;
            prefix.pop();
        } else if is_markdown(&entry) {
            let stem = entry
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let key = if prefix.is_empty() {
                stem
            } else {
                format!("{}/{stem}", prefix.join("/"))
            };
            out.push(DocumentPath {
                path: entry,
                class_name: class_name.to_string(),
                key,
            });
        } else {
            debug!(path = %entry.display(), "skipping non-markdown file");
        }
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(|e| CuratorError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| CuratorError::io(dir, e))?;
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_markdown(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

// ---------------------------------------------------------------------------
// Front matter
// ---------------------------------------------------------------------------

/// Split a document into its YAML front matter (as a JSON object) and body.
///
/// A document without an opening `---` line has empty front matter. An opening
/// delimiter without a closing `---` or `...` line is an error.
pub fn split_front_matter(
    content: &str,
) -> std::result::Result<(serde_json::Map<String, serde_json::Value>, &str), String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok((serde_json::Map::new(), content));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            let yaml = &rest[..offset];
            let body = rest[offset + line.len()..].trim_start_matches(['\r', '\n']);
            return Ok((parse_front_matter(yaml)?, body));
        }
        offset += line.len();
    }
    Err("front matter is not closed".into())
}

fn parse_front_matter(yaml: &str) -> std::result::Result<serde_json::Map<String, serde_json::Value>, String> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| format!("invalid front matter: {e}"))?;
    match value {
        serde_yaml::Value::Null => Ok(serde_json::Map::new()),
        serde_yaml::Value::Mapping(_) => match serde_json::to_value(value) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err("front matter must be a mapping".into()),
            Err(e) => Err(format!("unsupported front matter value: {e}")),
        },
        _ => Err("front matter must be a mapping".into()),
    }
}
