//! Shared types, error model, and configuration for Curator.
//!
//! This crate is the foundation depended on by all other Curator crates.
//! It provides:
//! - [`CuratorError`]: the unified error type
//! - Run and dataset types ([`RunId`], [`RawDataset`], [`OutputArtifact`], [`DeploymentTarget`])
//! - The graph model ([`ModelGraph`], [`Entity`], [`Term`])
//! - The root class registry ([`ClassRegistry`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod graph;
pub mod registry;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, InputDescriptor, OutputDescriptor, PipelineConfig,
    PipelineFileConfig, PipelineOptions, default_cache_dir, default_pipeline_id, load_config_from,
    normalize_base_url_path,
};
pub use error::{CuratorError, Result};
pub use graph::{
    DanglingReference, Datatype, Entity, Literal, ModelGraph, Term, Triple, entity_iri,
};
pub use registry::{
    ClassRegistry, ClassSpec, PropertyKind, PropertySpec, class_slug, normalize_class_name, slugify,
};
pub use types::{
    CURRENT_SCHEMA_VERSION, DeploymentTarget, OutputArtifact, RawDataset, RawPayload, RawRecord,
    RunId, RunIdentity, SiteManifest, SourceFingerprint,
};
