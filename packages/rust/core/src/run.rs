//! Identity and working directory of one pipeline run.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use curator_shared::{CuratorError, InputDescriptor, OutputDescriptor, PipelineConfig, Result, RunId, RunIdentity};

/// Prefix of every run's working directory under the system temp dir.
const WORK_DIR_PREFIX: &str = "curator-run-";

/// One invocation of a pipeline.
///
/// The working directory belongs to the run alone and is removed when the run
/// is dropped, whichever way the pipeline ended. [`PipelineRun::keep`] is the
/// only way to hand it over.
#[derive(Debug)]
pub struct PipelineRun {
    identity: RunIdentity,
    input: InputDescriptor,
    output: OutputDescriptor,
    work_dir: TempDir,
}

impl PipelineRun {
    /// Assign a fresh run id and create the working directory.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let work_dir = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir()
            .map_err(|e| CuratorError::io(std::env::temp_dir(), e))?;
        let identity = RunIdentity {
            pipeline_id: config.id.clone(),
            run_id: RunId::new(),
        };
        debug!(run_id = %identity.run_id, work_dir = %work_dir.path().display(), "created run");
        Ok(Self {
            identity,
            input: config.input.clone(),
            output: config.output.clone(),
            work_dir,
        })
    }

    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    pub fn run_id(&self) -> &RunId {
        &self.identity.run_id
    }

    pub fn pipeline_id(&self) -> &str {
        &self.identity.pipeline_id
    }

    pub fn input(&self) -> &InputDescriptor {
        &self.input
    }

    pub fn output(&self) -> &OutputDescriptor {
        &self.output
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    /// Release the working directory without deleting it.
    pub fn keep(self) -> PathBuf {
        self.work_dir.keep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_shared::{AppConfig, PipelineOptions};

    fn config() -> PipelineConfig {
        PipelineOptions {
            id: Some("demo".into()),
            input_data: Some("content".into()),
            input_format: Some("markdown".into()),
            output_data: Some("out".into()),
            output_format: Some("rdf".into()),
            validate: true,
            cache_dir: Some("/tmp/curator-cache".into()),
            ..PipelineOptions::default()
        }
        .resolve(&AppConfig::default())
        .unwrap()
    }

    #[test]
    fn drop_removes_work_dir() {
        let run = PipelineRun::new(&config()).unwrap();
        let dir = run.work_dir().to_path_buf();
        assert!(dir.is_dir());
        assert_eq!(run.pipeline_id(), "demo");
        drop(run);
        assert!(!dir.exists());
    }

    #[test]
    fn keep_hands_over_work_dir() {
        let run = PipelineRun::new(&config()).unwrap();
        let dir = run.keep();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn runs_get_distinct_ids() {
        let a = PipelineRun::new(&config()).unwrap();
        let b = PipelineRun::new(&config()).unwrap();
        assert_ne!(a.run_id(), b.run_id());
        assert_ne!(a.work_dir(), b.work_dir());
    }
}
