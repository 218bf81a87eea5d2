//! Persisting a graph: serialized graph files and deployed sites.
//!
//! This crate provides:
//! - [`Loader`]: the load capability
//! - [`GraphFileLoader`] with the [`GraphFormat`] codecs (Turtle, N-Triples, JSON-LD)
//! - [`GuiLoader`]: renders a site through a [`SiteBuilder`] and publishes it via a [`Deployer`]
//! - [`FsDeployer`]: staged, all-or-nothing publishing with archive/copy modes

pub mod codec;
pub mod deploy;
mod graph_file;
mod gui;
pub mod site;

use curator_shared::{ModelGraph, OutputArtifact, Result};

pub use codec::GraphFormat;
pub use deploy::{DeployOutcome, Deployer, FsDeployer, copy_dir_recursive};
pub use graph_file::GraphFileLoader;
pub use gui::{GuiLoader, SITE_DIR_NAME};
pub use site::{
    BundledSiteBuilder, DEFAULT_APP, ExternalSiteBuilder, SiteBuilder, SiteContext,
    resolve_site_builder,
};

/// Persists a graph and reports what was produced.
pub trait Loader {
    fn load(&self, graph: ModelGraph) -> Result<OutputArtifact>;

    /// Human-readable loader name for tracing.
    fn name(&self) -> &str;
}
