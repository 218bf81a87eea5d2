//! Graph-file loader: serializes the graph to a single file.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use uuid::Uuid;

use curator_shared::{CuratorError, ModelGraph, OutputArtifact, Result};

use crate::{GraphFormat, Loader};

/// Base name of the graph file written into a directory destination.
const DATA_FILE_STEM: &str = "data";

/// Writes `data.<ext>` into an existing directory, or the destination path itself.
#[derive(Debug, Clone)]
pub struct GraphFileLoader {
    destination: PathBuf,
    format: GraphFormat,
}

impl GraphFileLoader {
    pub fn new(destination: impl Into<PathBuf>, format: GraphFormat) -> Self {
        Self {
            destination: destination.into(),
            format,
        }
    }

    pub fn format(&self) -> GraphFormat {
        self.format
    }

    /// The file the graph will be written to.
    pub fn target_path(&self) -> PathBuf {
        if self.destination.is_dir() {
            self.destination
                .join(format!("{DATA_FILE_STEM}.{}", self.format.extension()))
        } else {
            self.destination.clone()
        }
    }
}

impl Loader for GraphFileLoader {
    #[instrument(skip_all, fields(destination = %self.destination.display(), format = self.format.extension()))]
    fn load(&self, graph: ModelGraph) -> Result<OutputArtifact> {
        let target = self.target_path();
        ensure_parent_dirs(&target)?;

        let content = self.format.serialize(&graph);
        write_atomic(&target, content.as_bytes())?;

        info!(
            path = %target.display(),
            entities = graph.len(),
            bytes = content.len(),
            "wrote graph file"
        );
        Ok(OutputArtifact::GraphFile {
            path: target,
            format: self.format.extension().to_string(),
        })
    }

    fn name(&self) -> &str {
        "graph-file"
    }
}

/// Create missing parent directories. An existing non-directory segment is a
/// `Filesystem` error.
fn ensure_parent_dirs(target: &Path) -> Result<()> {
    if target.is_dir() {
        return Err(CuratorError::filesystem(target, "destination is a directory"));
    }
    let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    for ancestor in parent.ancestors() {
        if ancestor.exists() && !ancestor.is_dir() {
            return Err(CuratorError::filesystem(ancestor, "path segment exists and is not a directory"));
        }
    }
    std::fs::create_dir_all(parent).map_err(|e| CuratorError::io(parent, e))?;
    Ok(())
}

/// Write to a temp sibling, then rename over the target.
pub(crate) fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| DATA_FILE_STEM.to_string());
    let temp = target.with_file_name(format!(".{file_name}.{}.tmp", Uuid::now_v7()));

    std::fs::write(&temp, content).map_err(|e| CuratorError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, target) {
        let _ = std::fs::remove_file(&temp);
        return Err(CuratorError::io(target, e));
    }
    debug!(path = %target.display(), "wrote file atomically");
    Ok(())
}
