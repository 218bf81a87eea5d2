//! Configuration for Curator.
//!
//! An optional TOML file (`-c curator.toml`) supplies defaults and the class
//! registry. CLI flags override environment variables, which override config
//! file values, which override built-in defaults. The merged result is a
//! validated, immutable [`PipelineConfig`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CuratorError, Result};
use crate::registry::{ClassRegistry, ClassSpec};

/// Environment variable whose last path segment supplies the default pipeline id.
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// App name used for the default cache directory.
const CACHE_DIR_NAME: &str = "curator";

// ---------------------------------------------------------------------------
// Config file structs (matching curator.toml schema)
// ---------------------------------------------------------------------------

/// Top-level config file, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Pipeline options; any of them may also come from flags or the environment.
    #[serde(default)]
    pub pipeline: PipelineFileConfig,

    /// Root class registry. Empty means the built-in registry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<ClassSpec>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Extraction cache root. Defaults to the user cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,

    /// Directory holding front-end applications, one subdirectory per app.
    #[serde(default = "default_gui_root")]
    pub gui_root: String,

    /// Run schema validation after transforming.
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Archive the previous deployment before publishing.
    #[serde(default)]
    pub archive: bool,

    /// Copy instead of rename when publishing.
    #[serde(default)]
    pub copy: bool,

    /// Base URL for spreadsheet exports.
    #[serde(default = "default_sheets_export_base")]
    pub sheets_export_base: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            gui_root: default_gui_root(),
            validate: true,
            archive: false,
            copy: false,
            sheets_export_base: default_sheets_export_base(),
        }
    }
}

fn default_gui_root() -> String {
    "/curator/gui/app".into()
}
fn default_true() -> bool {
    true
}
fn default_sheets_export_base() -> String {
    "https://docs.google.com".into()
}

/// `[pipeline]` section: the same options the CLI accepts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineFileConfig {
    pub id: Option<String>,
    pub input_data: Option<String>,
    pub input_format: Option<String>,
    pub output_data: Option<String>,
    pub output_format: Option<String>,
    pub configuration_file_path: Option<String>,
    pub base_url_path: Option<String>,
    pub force_extract: Option<bool>,
    pub dev: Option<bool>,
    pub debug: Option<bool>,
}

impl AppConfig {
    /// The configured class registry, or the built-in one when none is declared.
    pub fn registry(&self) -> Result<ClassRegistry> {
        if self.classes.is_empty() {
            Ok(ClassRegistry::builtin())
        } else {
            ClassRegistry::from_specs(self.classes.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + env + flags)
// ---------------------------------------------------------------------------

/// Source location plus kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptor {
    pub location: String,
    /// Lowercased `input_format` tag.
    pub format: String,
}

/// Destination location plus kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub location: String,
    /// Lowercased `output_format` tag.
    pub format: String,
}

/// Validated, immutable configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pipeline identity (cache namespace, entity IRIs, provenance).
    pub id: String,
    pub input: InputDescriptor,
    pub output: OutputDescriptor,
    /// Front-end configuration file, checked to exist.
    pub configuration_file_path: Option<PathBuf>,
    /// Normalized URL path prefix (`/collection`), `None` for root.
    pub base_url_path: Option<String>,
    pub force_extract: bool,
    pub dev: bool,
    pub debug: bool,
    pub archive: bool,
    pub copy: bool,
    pub validate: bool,
    pub cache_dir: PathBuf,
    pub gui_root: PathBuf,
    pub sheets_export_base: String,
    pub registry: ClassRegistry,
}

/// Unvalidated pipeline options, as collected by a front end.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub id: Option<String>,
    pub input_data: Option<String>,
    pub input_format: Option<String>,
    pub output_data: Option<String>,
    pub output_format: Option<String>,
    pub configuration_file_path: Option<String>,
    pub base_url_path: Option<String>,
    pub force_extract: bool,
    pub dev: bool,
    pub debug: bool,
    pub archive: bool,
    pub copy: bool,
    pub validate: bool,
    pub cache_dir: Option<String>,
    pub gui_root: Option<String>,
}

impl PipelineOptions {
    /// Fill unset options from the config file, then validate.
    pub fn resolve(self, app: &AppConfig) -> Result<PipelineConfig> {
        let file = &app.pipeline;

        let id = self
            .id
            .or_else(|| file.id.clone())
            .or_else(default_pipeline_id)
            .ok_or_else(|| {
                CuratorError::config(format!("no pipeline id given and {REPOSITORY_ENV} is not set"))
            })?;

        let input_data = required(self.input_data.or_else(|| file.input_data.clone()), "input_data")?;
        let input_format =
            required(self.input_format.or_else(|| file.input_format.clone()), "input_format")?;
        let output_data =
            required(self.output_data.or_else(|| file.output_data.clone()), "output_data")?;
        let output_format =
            required(self.output_format.or_else(|| file.output_format.clone()), "output_format")?;

        let configuration_file_path = self
            .configuration_file_path
            .or_else(|| file.configuration_file_path.clone())
            .filter(|p| !p.trim().is_empty())
            .map(|p| check_file_exists(Path::new(&p)))
            .transpose()?;

        let base_url_path = self
            .base_url_path
            .or_else(|| file.base_url_path.clone())
            .and_then(|p| normalize_base_url_path(&p));

        let cache_dir = match self.cache_dir.or_else(|| app.defaults.cache_dir.clone()) {
            Some(dir) => PathBuf::from(dir),
            None => default_cache_dir()?,
        };

        let gui_root = PathBuf::from(self.gui_root.unwrap_or_else(|| app.defaults.gui_root.clone()));

        let config = PipelineConfig {
            id: id.trim().to_string(),
            input: InputDescriptor {
                location: input_data,
                format: input_format.trim().to_lowercase(),
            },
            output: OutputDescriptor {
                location: output_data,
                format: output_format.trim().to_lowercase(),
            },
            configuration_file_path,
            base_url_path,
            force_extract: self.force_extract || file.force_extract.unwrap_or(false),
            dev: self.dev || file.dev.unwrap_or(false),
            debug: self.debug || file.debug.unwrap_or(false),
            archive: self.archive || app.defaults.archive,
            copy: self.copy || app.defaults.copy,
            validate: self.validate && app.defaults.validate,
            cache_dir,
            gui_root,
            sheets_export_base: app.defaults.sheets_export_base.clone(),
            registry: app.registry()?,
        };

        if config.id.is_empty() {
            return Err(CuratorError::config("pipeline id must not be empty"));
        }

        Ok(config)
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CuratorError::config(format!("{name} is required"))),
    }
}

fn check_file_exists(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(CuratorError::config(format!(
            "configuration file {} does not exist",
            path.display()
        )))
    }
}

/// Pipeline id from the repository name convention (`owner/name` → `name`).
pub fn default_pipeline_id() -> Option<String> {
    std::env::var(REPOSITORY_ENV)
        .ok()
        .and_then(|repo| repo.rsplit('/').next().map(str::to_string))
        .filter(|name| !name.is_empty())
}

/// Default extraction cache root (`<user cache dir>/curator`).
pub fn default_cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .ok_or_else(|| CuratorError::config("could not determine user cache directory"))?;
    Ok(base.join(CACHE_DIR_NAME))
}

/// Normalize a URL path prefix to `/a/b`; empty and `/` mean "serve from root".
pub fn normalize_base_url_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the config file from a specific path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CuratorError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| CuratorError::config(format!("failed to parse {}: {e}", path.display())))?;
    tracing::debug!(?path, classes = config.classes.len(), "loaded config file");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> PipelineOptions {
        PipelineOptions {
            id: Some("demo".into()),
            input_data: Some("content".into()),
            input_format: Some("Markdown".into()),
            output_data: Some("out".into()),
            output_format: Some("TTL-RDF".into()),
            validate: true,
            cache_dir: Some("/tmp/curator-cache".into()),
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("gui_root"));
        assert!(toml_str.contains("sheets_export_base"));
    }

    #[test]
    fn config_roundtrip() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert!(parsed.defaults.validate);
        assert_eq!(parsed.defaults.gui_root, "/curator/gui/app");
    }

    #[test]
    fn resolve_lowercases_formats() {
        let config = options().resolve(&AppConfig::default()).expect("resolve");
        assert_eq!(config.input.format, "markdown");
        assert_eq!(config.output.format, "ttl-rdf");
        assert!(config.validate);
        assert_eq!(config.registry, ClassRegistry::builtin());
    }

    #[test]
    fn file_values_fill_gaps_but_flags_win() {
        let app: AppConfig = toml::from_str(
            r#"
[defaults]
archive = true

[pipeline]
id = "from-file"
base_url_path = "/gallery/"
"#,
        )
        .expect("parse");

        let mut opts = options();
        opts.id = None;
        let config = opts.resolve(&app).expect("resolve");
        assert_eq!(config.id, "from-file");
        assert_eq!(config.base_url_path.as_deref(), Some("/gallery"));
        assert!(config.archive);

        let config = options().resolve(&app).expect("resolve");
        assert_eq!(config.id, "demo");
    }

    #[test]
    fn missing_input_rejected() {
        let mut opts = options();
        opts.input_data = None;
        let err = opts.resolve(&AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("input_data is required"));
    }

    #[test]
    fn missing_configuration_file_rejected() {
        let mut opts = options();
        opts.configuration_file_path = Some("/nonexistent/curator-gui.json".into());
        let err = opts.resolve(&AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn base_url_path_normalization() {
        assert_eq!(normalize_base_url_path("collection"), Some("/collection".into()));
        assert_eq!(normalize_base_url_path("/a/b/"), Some("/a/b".into()));
        assert_eq!(normalize_base_url_path("/"), None);
        assert_eq!(normalize_base_url_path("  "), None);
    }

    #[test]
    fn disabled_validation_in_file_wins_over_default_flag() {
        let app: AppConfig = toml::from_str("[defaults]\nvalidate = false\n").expect("parse");
        let config = options().resolve(&app).expect("resolve");
        assert!(!config.validate);
    }
}
