//! Site builder delegating to an installed front-end app.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument};

use curator_shared::{CuratorError, ModelGraph, Result};

use super::{SiteBuilder, SiteContext};
use crate::codec::to_jsonld;
use crate::deploy::copy_dir_recursive;

/// Directory the app's build writes its static output to.
const APP_OUTPUT_DIR: &str = "out";

/// Runs an app's build command and collects its output directory.
///
/// The app reads its inputs from the environment:
/// `CURATOR_DATA_FILE` (JSON-LD graph), `CURATOR_BASE_URL_PATH`,
/// `CURATOR_CONFIGURATION_FILE`, `CURATOR_PIPELINE_ID` and `CURATOR_RUN_ID`.
#[derive(Debug, Clone)]
pub struct ExternalSiteBuilder {
    app_dir: PathBuf,
    command: Vec<String>,
}

impl ExternalSiteBuilder {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
            command: vec!["npm".into(), "run".into(), "build".into()],
        }
    }

    /// Replace the build command (program followed by arguments).
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }
}

impl SiteBuilder for ExternalSiteBuilder {
    #[instrument(skip_all, fields(app = %self.app_dir.display(), out_dir = %out_dir.display()))]
    fn build(&self, graph: &ModelGraph, ctx: &SiteContext, out_dir: &Path) -> Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(CuratorError::config("front-end build command is empty"));
        };

        // The data file lives beside the site directory, inside the run's working dir.
        let work_dir = out_dir.parent().unwrap_or(out_dir);
        let data_file = work_dir.join("data.jsonld");
        let jsonld = serde_json::to_string(&to_jsonld(graph))
            .map_err(|e| CuratorError::filesystem(&data_file, format!("JSON-LD serialization failed: {e}")))?;
        std::fs::write(&data_file, jsonld).map_err(|e| CuratorError::io(&data_file, e))?;

        let app_out = self.app_dir.join(APP_OUTPUT_DIR);
        if app_out.exists() {
            std::fs::remove_dir_all(&app_out).map_err(|e| CuratorError::io(&app_out, e))?;
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.app_dir)
            .env("CURATOR_DATA_FILE", &data_file)
            .env("CURATOR_BASE_URL_PATH", ctx.base_url_path.as_deref().unwrap_or(""))
            .env("CURATOR_PIPELINE_ID", &ctx.run.pipeline_id)
            .env("CURATOR_RUN_ID", ctx.run.run_id.to_string());
        if let Some(config) = &ctx.configuration_file {
            command.env("CURATOR_CONFIGURATION_FILE", config);
        }

        debug!(command = ?self.command, "running front-end build");
        let output = command.output().map_err(|e| CuratorError::io(&self.app_dir, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CuratorError::deployment(
                &self.app_dir,
                format!("front-end build failed ({}): {}", output.status, stderr.trim()),
            ));
        }

        if !app_out.is_dir() {
            return Err(CuratorError::deployment(
                &self.app_dir,
                format!("front-end build produced no {APP_OUTPUT_DIR}/ directory"),
            ));
        }
        copy_dir_recursive(&app_out, out_dir)?;

        info!("front-end build complete");
        Ok(())
    }

    fn name(&self) -> &str {
        "external"
    }
}
