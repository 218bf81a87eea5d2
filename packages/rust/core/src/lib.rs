//! Pipeline orchestration for Curator.
//!
//! This crate ties extraction, transformation and loading together into one
//! run: [`dispatch`] picks the concrete capabilities from configuration,
//! [`PipelineRun`] owns the run's identity and scoped working directory, and
//! [`Pipeline`] drives the Extract → Transform → Validate → Load state machine.

pub mod dispatch;
pub mod pipeline;
pub mod run;

pub use dispatch::{InputKind, OutputKind};
pub use pipeline::{Pipeline, PipelineState, ProgressReporter, RunReport, SilentProgress, StageTiming};
pub use run::PipelineRun;
