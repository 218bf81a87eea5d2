//! Mapping raw records into the unified graph model.
//!
//! Converts a [`RawDataset`] into a [`ModelGraph`] using a [`ClassRegistry`] of
//! recognized root classes, then optionally checks the graph against the
//! registry's property schemas.

mod builder;
mod document;
mod spreadsheet;
mod validate;

use curator_shared::{ModelGraph, RawDataset, Result};

pub use builder::{GraphBuilder, property_key};
pub use document::DocumentSetTransformer;
pub use spreadsheet::SpreadsheetTransformer;
pub use validate::{Violation, check_graph};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Maps one source kind's raw records into a graph.
pub trait Transformer {
    /// Structural mapping. A class absent from the registry is a `Validation` error.
    fn transform(&self, dataset: RawDataset) -> Result<ModelGraph>;

    /// Schema checks: required properties, literal types and reference targets.
    fn validate(&self, graph: &ModelGraph) -> Result<()>;

    /// Human-readable transformer name for tracing.
    fn name(&self) -> &str;
}
