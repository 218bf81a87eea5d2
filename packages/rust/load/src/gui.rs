//! GUI loader: render a site, then publish it through a [`Deployer`].

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use curator_shared::{CuratorError, DeploymentTarget, ModelGraph, OutputArtifact, Result};

use crate::Loader;
use crate::deploy::Deployer;
use crate::site::{SiteBuilder, SiteContext};

/// Name of the rendered site directory inside the working directory.
pub const SITE_DIR_NAME: &str = "site";

/// Renders into `<work_dir>/site` and deploys it, or leaves it in place in dev mode.
pub struct GuiLoader {
    builder: Box<dyn SiteBuilder>,
    deployer: Box<dyn Deployer>,
    work_dir: PathBuf,
    target: DeploymentTarget,
    ctx: SiteContext,
}

impl GuiLoader {
    pub fn new(
        builder: Box<dyn SiteBuilder>,
        deployer: Box<dyn Deployer>,
        work_dir: impl Into<PathBuf>,
        target: DeploymentTarget,
        ctx: SiteContext,
    ) -> Self {
        Self {
            builder,
            deployer,
            work_dir: work_dir.into(),
            target,
            ctx,
        }
    }

    pub fn site_dir(&self) -> PathBuf {
        self.work_dir.join(SITE_DIR_NAME)
    }

    pub fn target(&self) -> &DeploymentTarget {
        &self.target
    }
}

impl Loader for GuiLoader {
    #[instrument(skip_all, fields(builder = self.builder.name(), target = %self.target.path.display(), dev = self.target.dev))]
    fn load(&self, graph: ModelGraph) -> Result<OutputArtifact> {
        let site_dir = self.site_dir();
        prepare_empty_dir(&site_dir)?;

        self.builder.build(&graph, &self.ctx, &site_dir)?;

        if self.target.dev {
            info!(path = %site_dir.display(), "dev mode, leaving rendered site in place");
            return Ok(OutputArtifact::DevSite { path: site_dir });
        }

        let outcome = self.deployer.deploy(&site_dir, &self.target)?;
        Ok(OutputArtifact::Site {
            path: outcome.path,
            backup: outcome.backup,
        })
    }

    fn name(&self) -> &str {
        "gui"
    }
}

fn prepare_empty_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| CuratorError::io(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| CuratorError::io(dir, e))
}
