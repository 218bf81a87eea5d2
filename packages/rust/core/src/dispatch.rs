//! Format dispatch: selects the concrete extractor, transformer and loader.
//!
//! Input and output tags are matched against ordered rule tables; the first
//! rule whose predicate accepts the tag builds the kind. Everything downstream
//! is a pure function of the resolved [`PipelineConfig`].

use std::path::Path;

use tracing::debug;

use curator_extract::{
    CachedExtractor, Extractor, GoogleSheetsExtractor, LocalWorkbookExtractor,
    MarkdownDirectoryExtractor, SpreadsheetLocation,
};
use curator_load::{
    DEFAULT_APP, FsDeployer, GraphFileLoader, GraphFormat, GuiLoader, Loader, SiteContext,
    resolve_site_builder,
};
use curator_shared::{CuratorError, DeploymentTarget, PipelineConfig, Result, RunIdentity};
use curator_transform::{DocumentSetTransformer, SpreadsheetTransformer, Transformer};

// ---------------------------------------------------------------------------
// Input kinds
// ---------------------------------------------------------------------------

/// Source family selected by `input_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A directory of markdown documents.
    Documents,
    /// A spreadsheet: remote by id or URL, or a local workbook file.
    Spreadsheet,
}

type InputRule = (fn(&str) -> bool, fn() -> InputKind);

const INPUT_RULES: &[InputRule] = &[
    (|tag| matches!(tag, "markdown" | "markdown_directory"), || InputKind::Documents),
    (
        |tag| matches!(tag, "spreadsheet" | "google_sheets" | "workbook" | "excel"),
        || InputKind::Spreadsheet,
    ),
];

impl InputKind {
    /// Resolve an `input_format` tag (case-insensitive).
    pub fn from_tag(tag: &str) -> Result<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        INPUT_RULES
            .iter()
            .find(|(accepts, _)| accepts(&tag))
            .map(|(_, build)| build())
            .ok_or_else(|| CuratorError::unsupported("input", tag))
    }
}

// ---------------------------------------------------------------------------
// Output kinds
// ---------------------------------------------------------------------------

/// Destination kind selected by `output_format`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    /// A serialized graph file.
    GraphFile(GraphFormat),
    /// A rendered site, built by the named front-end app.
    Gui { app: String },
}

type OutputRule = (fn(&str) -> bool, fn(&str) -> Result<OutputKind>);

const OUTPUT_RULES: &[OutputRule] = &[
    (|tag| tag == "rdf", |_| Ok(OutputKind::GraphFile(GraphFormat::Turtle))),
    (
        |tag| tag == "gui",
        |_| {
            Ok(OutputKind::Gui {
                app: DEFAULT_APP.to_string(),
            })
        },
    ),
    (
        |tag| prefixed(tag, "-rdf").is_some(),
        |tag| {
            let format = prefixed(tag, "-rdf").unwrap_or_default();
            GraphFormat::from_tag(format).map(OutputKind::GraphFile)
        },
    ),
    (
        |tag| prefixed(tag, "-gui").is_some(),
        |tag| {
            Ok(OutputKind::Gui {
                app: prefixed(tag, "-gui").unwrap_or_default().to_string(),
            })
        },
    ),
];

/// The non-empty part of `tag` before `suffix`.
fn prefixed<'a>(tag: &'a str, suffix: &str) -> Option<&'a str> {
    tag.strip_suffix(suffix).filter(|prefix| !prefix.is_empty())
}

impl OutputKind {
    /// Resolve an `output_format` tag (case-insensitive): `rdf`, `X-rdf`, `gui`, `X-gui`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        match OUTPUT_RULES.iter().find(|(accepts, _)| accepts(&tag)) {
            Some((_, build)) => build(&tag),
            None => Err(CuratorError::unsupported("output", tag)),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the extractor for a source. Directory sources must already exist.
pub fn build_extractor(kind: InputKind, config: &PipelineConfig) -> Result<CachedExtractor> {
    let location = config.input.location.as_str();
    let inner: Box<dyn Extractor> = match kind {
        InputKind::Documents => Box::new(MarkdownDirectoryExtractor::new(location)?),
        InputKind::Spreadsheet => match SpreadsheetLocation::resolve(location) {
            SpreadsheetLocation::LocalFile(path) => Box::new(LocalWorkbookExtractor::new(path)),
            SpreadsheetLocation::ByUrl { id } | SpreadsheetLocation::ById(id) => Box::new(
                GoogleSheetsExtractor::new(id).with_export_base(config.sheets_export_base.clone()),
            ),
        },
    };
    debug!(extractor = inner.name(), identity = %inner.identity(), "selected extractor");
    Ok(CachedExtractor::new(inner, &config.cache_dir, config.force_extract))
}

pub fn build_transformer(kind: InputKind, config: &PipelineConfig) -> Box<dyn Transformer> {
    let registry = config.registry.clone();
    match kind {
        InputKind::Documents => Box::new(DocumentSetTransformer::new(&config.id, registry)),
        InputKind::Spreadsheet => Box::new(SpreadsheetTransformer::new(&config.id, registry)),
    }
}

/// Build the loader for a destination. GUI loaders render into `work_dir`.
pub fn build_loader(
    kind: &OutputKind,
    config: &PipelineConfig,
    work_dir: &Path,
    run: &RunIdentity,
) -> Result<Box<dyn Loader>> {
    match kind {
        OutputKind::GraphFile(format) => Ok(Box::new(GraphFileLoader::new(
            &config.output.location,
            *format,
        ))),
        OutputKind::Gui { app } => {
            let builder = resolve_site_builder(app, &config.gui_root)?;
            debug!(app = %app, builder = builder.name(), "selected site builder");
            let target = DeploymentTarget {
                path: config.output.location.clone().into(),
                archive: config.archive,
                copy: config.copy,
                dev: config.dev,
                base_url_path: config.base_url_path.clone(),
            };
            let ctx = SiteContext {
                run: run.clone(),
                base_url_path: config.base_url_path.clone(),
                configuration_file: config.configuration_file_path.clone(),
            };
            Ok(Box::new(GuiLoader::new(
                builder,
                Box::new(FsDeployer),
                work_dir,
                target,
                ctx,
            )))
        }
    }
}
