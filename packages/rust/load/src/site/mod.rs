//! Site rendering for the GUI loader.

mod bundled;
mod external;

use std::path::{Path, PathBuf};

use tracing::debug;

use curator_shared::{CuratorError, ModelGraph, Result, RunIdentity};

pub use bundled::BundledSiteBuilder;
pub use external::ExternalSiteBuilder;

/// Name of the front-end app selected by a bare `gui` output tag.
pub const DEFAULT_APP: &str = "default";

/// Inputs to a site build besides the graph.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub run: RunIdentity,
    /// Normalized URL path prefix, `None` when served from the root.
    pub base_url_path: Option<String>,
    /// Front-end configuration file to ship with the site.
    pub configuration_file: Option<PathBuf>,
}

impl SiteContext {
    /// Absolute site URL for a path relative to the site root.
    pub fn href(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        match &self.base_url_path {
            Some(base) => format!("{base}/{relative}"),
            None => format!("/{relative}"),
        }
    }
}

/// Renders a graph into a static site directory.
pub trait SiteBuilder {
    /// Render into `out_dir`, which exists and is empty.
    fn build(&self, graph: &ModelGraph, ctx: &SiteContext, out_dir: &Path) -> Result<()>;

    /// Human-readable builder name for tracing.
    fn name(&self) -> &str;
}

/// Pick the site builder for a front-end app name.
///
/// `./<app>` and then `<gui_root>/<app>` are tried as app directories. With no
/// app directory the `default` app falls back to the bundled renderer; any
/// other app is `UnsupportedFormat`.
pub fn resolve_site_builder(app: &str, gui_root: &Path) -> Result<Box<dyn SiteBuilder>> {
    let candidates = [PathBuf::from(".").join(app), gui_root.join(app)];
    if let Some(dir) = candidates.into_iter().find(|c| c.is_dir()) {
        debug!(app, dir = %dir.display(), "using external front-end app");
        return Ok(Box::new(ExternalSiteBuilder::new(dir)));
    }
    if app == DEFAULT_APP {
        debug!("no front-end app installed, using bundled renderer");
        return Ok(Box::new(BundledSiteBuilder));
    }
    Err(CuratorError::unsupported("output", format!("{app}-gui")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_shared::RunId;

    fn ctx(base: Option<&str>) -> SiteContext {
        SiteContext {
            run: RunIdentity {
                pipeline_id: "demo".into(),
                run_id: RunId::new(),
            },
            base_url_path: base.map(str::to_string),
            configuration_file: None,
        }
    }

    #[test]
    fn href_respects_base_url() {
        assert_eq!(ctx(None).href("entities/work/a.html"), "/entities/work/a.html");
        assert_eq!(ctx(Some("/collection")).href("/index.html"), "/collection/index.html");
    }

    #[test]
    fn default_app_falls_back_to_bundled() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = resolve_site_builder(DEFAULT_APP, tmp.path()).unwrap();
        assert_eq!(builder.name(), "bundled");
    }

    #[test]
    fn installed_app_is_external() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("gallery-app-under-test")).unwrap();
        let builder = resolve_site_builder("gallery-app-under-test", tmp.path()).unwrap();
        assert_eq!(builder.name(), "external");
    }

    #[test]
    fn unknown_app_is_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_site_builder("no-such-app-under-test", tmp.path())
            .err()
            .expect("unsupported");
        assert!(matches!(err, CuratorError::UnsupportedFormat { .. }));
    }
}
