//! CLI definition, config resolution, tracing setup and the pipeline run.

use std::path::{Path, PathBuf};

use clap::Parser;
use clap::builder::FalseyValueParser;
use color_eyre::eyre::{Result, WrapErr};
use curator_cache::CacheOutcome;
use curator_core::{Pipeline, PipelineState, ProgressReporter, RunReport};
use curator_shared::{AppConfig, OutputArtifact, PipelineConfig, PipelineOptions, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Config file picked up from the working directory when `-c` is not given.
const DEFAULT_CONFIG_FILE: &str = "curator.toml";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Curator: turn collection content into a graph file or a static site.
///
/// Every pipeline option can also be set through an `INPUT_<NAME>`
/// environment variable; flags win over the environment, which wins over the
/// config file.
#[derive(Parser, Debug)]
#[command(
    name = "curator",
    version,
    about = "Extract collection content, build a graph model, and publish it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// TOML config file with defaults and the class registry.
    #[arg(short = 'c', long = "config", env = "CURATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pipeline id (defaults to the repository name from GITHUB_REPOSITORY).
    #[arg(long, env = "INPUT_ID")]
    pub id: Option<String>,

    /// Source location: a directory, a spreadsheet id or URL, or a workbook file.
    #[arg(long, env = "INPUT_INPUT_DATA")]
    pub input_data: Option<String>,

    /// Source kind: markdown, markdown_directory, spreadsheet, google_sheets, workbook, excel.
    #[arg(long, env = "INPUT_INPUT_FORMAT")]
    pub input_format: Option<String>,

    /// Destination: a graph file or directory, or the site directory.
    #[arg(long, env = "INPUT_OUTPUT_DATA")]
    pub output_data: Option<String>,

    /// Destination kind: rdf, <format>-rdf, gui, <app>-gui.
    #[arg(long, env = "INPUT_OUTPUT_FORMAT")]
    pub output_format: Option<String>,

    /// Front-end configuration file shipped with the site.
    #[arg(long, env = "INPUT_CONFIGURATION_FILE_PATH")]
    pub configuration_file_path: Option<String>,

    /// URL path prefix the site is served under.
    #[arg(long, env = "INPUT_BASE_URL_PATH")]
    pub base_url_path: Option<String>,

    /// Re-read the source even when a cached copy exists.
    #[arg(long, env = "INPUT_FORCE_EXTRACT", value_parser = FalseyValueParser::new())]
    pub force_extract: bool,

    /// Render the site but leave it in the working directory.
    #[arg(long, env = "INPUT_DEV", value_parser = FalseyValueParser::new())]
    pub dev: bool,

    /// Debug logging.
    #[arg(long, env = "INPUT_DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Move a non-empty previous deployment to a timestamped backup.
    #[arg(long, env = "INPUT_ARCHIVE", value_parser = FalseyValueParser::new())]
    pub archive: bool,

    /// Copy instead of rename when publishing (target on another filesystem).
    #[arg(long, env = "INPUT_COPY", value_parser = FalseyValueParser::new())]
    pub copy: bool,

    /// Skip schema validation; dangling references are dropped instead.
    #[arg(long, env = "INPUT_NO_VALIDATE", value_parser = FalseyValueParser::new())]
    pub no_validate: bool,

    /// Extraction cache directory.
    #[arg(long, env = "INPUT_CACHE_DIR")]
    pub cache_dir: Option<String>,

    /// Directory holding installed front-end apps.
    #[arg(long, env = "INPUT_GUI_ROOT")]
    pub gui_root: Option<String>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

impl Cli {
    fn options(&self) -> PipelineOptions {
        PipelineOptions {
            id: self.id.clone(),
            input_data: self.input_data.clone(),
            input_format: self.input_format.clone(),
            output_data: self.output_data.clone(),
            output_format: self.output_format.clone(),
            configuration_file_path: self.configuration_file_path.clone(),
            base_url_path: self.base_url_path.clone(),
            force_extract: self.force_extract,
            dev: self.dev,
            debug: self.debug,
            archive: self.archive,
            copy: self.copy,
            validate: !self.no_validate,
            cache_dir: self.cache_dir.clone(),
            gui_root: self.gui_root.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config resolution
// ---------------------------------------------------------------------------

/// Merge flags and environment over the config file into a validated config.
pub(crate) fn resolve_config(cli: &Cli) -> Result<PipelineConfig> {
    let app = load_app_config(cli.config.as_deref())?;
    let config = cli.options().resolve(&app)?;
    Ok(config)
}

fn load_app_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => {
            load_config_from(path).wrap_err_with(|| format!("loading {}", path.display()))
        }
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            Ok(load_config_from(Path::new(DEFAULT_CONFIG_FILE))?)
        }
        None => Ok(AppConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing. `RUST_LOG` wins over the flags.
pub(crate) fn init_tracing(format: &LogFormat, verbose: u8, debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match (verbose, debug) {
        (0, false) => "curator=info",
        (0, true) | (1, _) => "curator=debug",
        _ => "curator=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

pub(crate) fn run(config: &PipelineConfig) -> Result<()> {
    info!(
        pipeline_id = %config.id,
        input = %config.input.location,
        input_format = %config.input.format,
        output = %config.output.location,
        output_format = %config.output.format,
        "running pipeline"
    );

    let reporter = CliProgress::new();
    let result =
        Pipeline::create(config, &reporter).and_then(|pipeline| pipeline.extract_transform_load(&reporter));
    reporter.finish();
    let report = result.wrap_err("pipeline failed")?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("  Pipeline complete.");
    println!("  Pipeline: {}", report.pipeline_id);
    println!("  Run:      {}", report.run_id);
    println!("  Entities: {}", report.entity_count);
    match &report.artifact {
        OutputArtifact::GraphFile { path, format } => {
            println!("  Output:   {} ({format})", path.display());
        }
        OutputArtifact::Site { path, backup } => {
            println!("  Site:     {}", path.display());
            if let Some(backup) = backup {
                println!("  Backup:   {}", backup.display());
            }
        }
        OutputArtifact::DevSite { path } => {
            println!("  Dev site: {}", path.display());
        }
    }
    if let Some(cache) = report.cache {
        let cache = match cache {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Refreshed => "refreshed",
        };
        println!("  Cache:    {cache}");
    }
    if report.pruned_references > 0 {
        println!("  Pruned:   {} dangling reference(s)", report.pruned_references);
    }
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn state(&self, state: PipelineState) {
        let message = match state {
            PipelineState::Created => "Preparing",
            PipelineState::Extracting => "Extracting source",
            PipelineState::Transforming => "Building graph",
            PipelineState::Validating => "Validating graph",
            PipelineState::Loading => "Writing output",
            PipelineState::Completed => "Done",
            PipelineState::Failed => "Failed",
        };
        self.spinner.set_message(message);
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
