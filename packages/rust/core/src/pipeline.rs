//! End-to-end pipeline: source → raw dataset → graph → (validate) → output.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use curator_cache::CacheOutcome;
use curator_extract::{CachedExtractor, Extractor};
use curator_load::Loader;
use curator_shared::{OutputArtifact, PipelineConfig, Result, RunId};
use curator_transform::Transformer;

use crate::dispatch::{InputKind, OutputKind, build_extractor, build_loader, build_transformer};
use crate::run::PipelineRun;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Where a pipeline is in its single pass.
///
/// `Created → Extracting → Transforming → (Validating) → Loading → Completed`,
/// with `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Extracting,
    Transforming,
    Validating,
    Loading,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Stage name attached to errors raised in this state.
    pub fn stage(self) -> &'static str {
        match self {
            Self::Created => "create",
            Self::Extracting => "extract",
            Self::Transforming => "transform",
            Self::Validating => "validate",
            Self::Loading => "load",
            Self::Completed => "complete",
            Self::Failed => "fail",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Extracting => "extracting",
            Self::Transforming => "transforming",
            Self::Validating => "validating",
            Self::Loading => "loading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// Time spent in one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    pub state: PipelineState,
    pub elapsed: Duration,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub pipeline_id: String,
    pub artifact: OutputArtifact,
    /// Entities handed to the loader.
    pub entity_count: usize,
    /// How the extraction cache was used, `None` for local sources.
    pub cache: Option<CacheOutcome>,
    /// Dangling references dropped because validation was disabled.
    pub pruned_references: usize,
    pub timings: Vec<StageTiming>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called on every state transition.
    fn state(&self, state: PipelineState);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn state(&self, _state: PipelineState) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One configured run of Extract → Transform → (Validate) → Load.
///
/// Every capability is resolved at construction, so unsupported tags and
/// missing source directories fail before any work starts.
pub struct Pipeline {
    run: PipelineRun,
    state: PipelineState,
    extractor: CachedExtractor,
    transformer: Box<dyn Transformer>,
    loader: Box<dyn Loader>,
    validate: bool,
}

impl Pipeline {
    #[instrument(skip_all, fields(pipeline_id = %config.id))]
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let input_kind = InputKind::from_tag(&config.input.format)?;
        let output_kind = OutputKind::from_tag(&config.output.format)?;

        let extractor = build_extractor(input_kind, config)?;
        let transformer = build_transformer(input_kind, config);
        let run = PipelineRun::new(config)?;
        let loader = build_loader(&output_kind, config, run.work_dir(), run.identity())?;

        info!(
            run_id = %run.run_id(),
            input = ?input_kind,
            output = ?output_kind,
            extractor = extractor.name(),
            transformer = transformer.name(),
            loader = loader.name(),
            "pipeline created"
        );

        Ok(Self {
            run,
            state: PipelineState::Created,
            extractor,
            transformer,
            loader,
            validate: config.validate,
        })
    }

    /// [`Pipeline::new`] that reports a construction failure as the
    /// `Created → Failed` transition.
    pub fn create(config: &PipelineConfig, progress: &dyn ProgressReporter) -> Result<Self> {
        Self::new(config).inspect_err(|e| {
            progress.state(PipelineState::Failed);
            error!(error = %e, "pipeline construction failed");
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn run(&self) -> &PipelineRun {
        &self.run
    }

    /// Run every stage once. The working directory is released on both
    /// terminal states, except that a dev-mode site is handed over intact.
    #[instrument(skip_all, fields(run_id = %self.run.run_id(), pipeline_id = %self.run.pipeline_id()))]
    pub fn extract_transform_load(mut self, progress: &dyn ProgressReporter) -> Result<RunReport> {
        let start = Instant::now();
        info!(
            input = %self.run.input().location,
            output = %self.run.output().location,
            "starting pipeline"
        );

        let outcome = self.stages(progress, start);
        match outcome {
            Ok(report) => {
                self.enter(PipelineState::Completed, progress);
                if let OutputArtifact::DevSite { path } = &report.artifact {
                    let kept = self.run.keep();
                    debug!(work_dir = %kept.display(), site = %path.display(), "kept dev working directory");
                }
                progress.done(&report);
                info!(
                    entities = report.entity_count,
                    elapsed_ms = report.elapsed.as_millis(),
                    "pipeline complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.enter(PipelineState::Failed, progress);
                error!(error = %e, "pipeline failed");
                Err(e)
            }
        }
    }

    fn stages(&mut self, progress: &dyn ProgressReporter, start: Instant) -> Result<RunReport> {
        let mut timings = Vec::with_capacity(4);

        // --- Extracting ---
        let started = self.enter(PipelineState::Extracting, progress);
        let (dataset, cache) = self
            .extractor
            .extract_with_outcome(self.run.identity())
            .map_err(|e| e.in_stage(self.state.stage()))?;
        timings.push(self.timing(started));
        info!(records = dataset.len(), cache = ?cache, "extracted");

        // --- Transforming ---
        let started = self.enter(PipelineState::Transforming, progress);
        let graph = self
            .transformer
            .transform(dataset)
            .map_err(|e| e.in_stage(self.state.stage()))?;
        timings.push(self.timing(started));
        info!(entities = graph.len(), "transformed");

        // --- Validating ---
        let mut pruned_references = 0;
        let graph = if self.validate {
            let started = self.enter(PipelineState::Validating, progress);
            self.transformer
                .validate(&graph)
                .map_err(|e| e.in_stage(self.state.stage()))?;
            timings.push(self.timing(started));
            graph
        } else {
            let (graph, pruned) = graph.without_dangling();
            if pruned > 0 {
                warn!(pruned, "validation disabled, dropped dangling references");
            }
            pruned_references = pruned;
            graph
        };

        // --- Loading ---
        let started = self.enter(PipelineState::Loading, progress);
        let entity_count = graph.len();
        let artifact = self
            .loader
            .load(graph)
            .map_err(|e| e.in_stage(self.state.stage()))?;
        timings.push(self.timing(started));
        info!(artifact = ?artifact, "loaded");

        Ok(RunReport {
            run_id: self.run.run_id().clone(),
            pipeline_id: self.run.pipeline_id().to_string(),
            artifact,
            entity_count,
            cache,
            pruned_references,
            timings,
            elapsed: start.elapsed(),
        })
    }

    fn enter(&mut self, next: PipelineState, progress: &dyn ProgressReporter) -> Instant {
        debug_assert!(!self.state.is_terminal(), "pipeline already finished");
        debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
        progress.state(next);
        Instant::now()
    }

    fn timing(&self, started: Instant) -> StageTiming {
        StageTiming {
            state: self.state,
            elapsed: started.elapsed(),
        }
    }
}
