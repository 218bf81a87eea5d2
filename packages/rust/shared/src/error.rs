//! Error types for Curator.
//!
//! Library crates use [`CuratorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Curator operations.
#[derive(Debug, thiserror::Error)]
pub enum CuratorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The declared input location does not exist or is unreachable.
    #[error("source not found: {location}: {message}")]
    SourceNotFound { location: String, message: String },

    /// Source content could not be parsed into raw records.
    #[error("source format error in {location}: {message}")]
    SourceFormat { location: String, message: String },

    /// Domain schema violation while building or checking a model graph.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Unrecognized input/output kind tag or serialization format.
    #[error("unsupported {role} format: {tag:?}")]
    UnsupportedFormat { role: &'static str, tag: String },

    /// Path conflict (e.g. a file where a directory is required).
    #[error("filesystem error at {path:?}: {message}")]
    Filesystem { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Staging, copy or rename failure while publishing a site.
    #[error("deployment error at {path:?}: {message}")]
    Deployment { path: PathBuf, message: String },

    /// HTTP client construction or transport error that is not a missing source.
    #[error("network error: {0}")]
    Network(String),

    /// Failure attributed to one pipeline stage.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<CuratorError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CuratorError>;

impl CuratorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn source_not_found(location: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SourceNotFound {
            location: location.into(),
            message: msg.into(),
        }
    }

    pub fn source_format(location: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SourceFormat {
            location: location.into(),
            message: msg.into(),
        }
    }

    pub fn unsupported(role: &'static str, tag: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            role,
            tag: tag.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Filesystem {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn deployment(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Deployment {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attribute this error to a pipeline stage.
    pub fn in_stage(self, stage: &'static str) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The underlying error with any stage wrappers removed.
    pub fn root(&self) -> &CuratorError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}
