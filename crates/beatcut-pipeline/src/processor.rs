//! Montage run processor.
//!
//! Stages run strictly in order: analysis, planning, query embedding, clip
//! selection, duration reconciliation, rendering, report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::Instrument;

use beatcut_catalog::ClipRepository;
use beatcut_media::{probe_duration, MontageRenderer, RenderOutcome, RenderRequest};
use beatcut_ml_client::EmbeddingClient;
use beatcut_models::AudioAnalysis;
use beatcut_planner::{
    distinct_semantic_queries, reconcile_duration, ClipSelector, MontagePlanner, SelectionRng,
    StyleResolver, TimelineBuilder,
};

use crate::analysis::AudioAnalyzer;
use crate::config::PipelineConfig;
use crate::embeddings::{precompute_embeddings, SharedEmbeddings};
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::report::{ReportInput, RunReport};

/// One montage to produce.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub audio: PathBuf,
    pub output: PathBuf,
}

impl RunRequest {
    pub fn new(audio: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            audio: audio.into(),
            output: output.into(),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    pub report_path: PathBuf,
    pub render: RenderOutcome,
}

struct SemanticRanking {
    client: EmbeddingClient,
    cache: SharedEmbeddings,
}

/// Audio in, montage and report out.
pub struct MontagePipeline<R> {
    config: PipelineConfig,
    planner: MontagePlanner,
    selector: ClipSelector<R>,
    analyzer: Box<dyn AudioAnalyzer>,
    renderer: Box<dyn MontageRenderer>,
    semantic: Option<SemanticRanking>,
}

impl<R: ClipRepository> MontagePipeline<R> {
    /// Build a pipeline over `repository`.
    ///
    /// Fails when the configured timeline or style table is invalid.
    pub fn new(
        config: PipelineConfig,
        repository: R,
        analyzer: Box<dyn AudioAnalyzer>,
        renderer: Box<dyn MontageRenderer>,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let timeline = TimelineBuilder::new(config.beats_per_clip, config.duration_variation)?;
        let styles = StyleResolver::new(config.style_table(), config.thresholds())?;
        let selector = ClipSelector::new(repository, config.layout())
            .with_missing_file_policy(config.missing_file_policy);

        Ok(Self {
            planner: MontagePlanner::new(timeline, styles),
            selector,
            analyzer,
            renderer,
            semantic: None,
            config,
        })
    }

    /// Rank semantic queries with vectors from `client`.
    ///
    /// `cache` must be the handle attached to the repository.
    pub fn with_semantic_ranking(mut self, client: EmbeddingClient, cache: SharedEmbeddings) -> Self {
        self.semantic = Some(SemanticRanking { client, cache });
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce one montage.
    pub async fn run(&self, request: &RunRequest) -> PipelineResult<RunOutcome> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let logger = RunLogger::new(run_id, request.audio.display().to_string());
        let span = logger.create_span();

        let result = self.run_stages(request, &logger).instrument(span).await;
        match &result {
            Ok(outcome) => {
                metrics::record_run("success");
                logger.log_completion(&format!(
                    "{} ({} clips, {} fillers)",
                    outcome.render.output.display(),
                    outcome.report.selected_clips.len(),
                    outcome.report.counters.fillers
                ));
            }
            Err(e) => {
                metrics::record_run("failure");
                logger.log_error(&e.to_string());
            }
        }
        result
    }

    async fn run_stages(&self, request: &RunRequest, logger: &RunLogger) -> PipelineResult<RunOutcome> {
        if !request.audio.exists() {
            return Err(PipelineError::AudioNotFound(request.audio.clone()));
        }
        logger.log_start(&format!("output {}", request.output.display()));
        let mut rng = SelectionRng::from_optional_seed(self.config.seed);

        logger.log_stage("analysis", "analyzing audio");
        let analysis = self.analyzer.analyze(&request.audio).await?;
        let audio_duration = audio_duration(&analysis, &request.audio).await?;
        logger.log_stage(
            "analysis",
            &format!(
                "{:.1} BPM, {} beats, {} sections, {:.2}s",
                analysis.rhythm.tempo,
                analysis.rhythm.len(),
                analysis.structure.sections.len(),
                audio_duration
            ),
        );

        let plan = self.planner.create_plan(&analysis, &mut rng)?;
        let queries = distinct_semantic_queries(&plan);
        metrics::record_plan(plan.len(), queries.len());
        logger.log_stage("plan", &format!("{} slots", plan.len()));

        if !queries.is_empty() {
            match &self.semantic {
                Some(semantic) => {
                    let available = precompute_embeddings(&semantic.client, &queries, &semantic.cache).await;
                    logger.log_stage("embedding", &format!("{available}/{} queries embedded", queries.len()));
                }
                None => logger.log_warning(&format!(
                    "{} style descriptions ignored: no embedding service configured",
                    queries.len()
                )),
            }
        }

        let selection = self
            .selector
            .select_for_montage(&plan, self.config.avoid_repetition, &mut rng)?;
        metrics::record_selection(&selection.summary);
        if selection.all_missed() {
            return Err(PipelineError::NoClipsSelected { slots: plan.len() });
        }
        if selection.summary.misses > 0 {
            logger.log_warning(&format!(
                "{} of {} slots left without a clip",
                selection.summary.misses,
                plan.len()
            ));
        }
        logger.log_stage(
            "select",
            &format!(
                "{} hits ({} relaxed), {} misses",
                selection.summary.hits(),
                selection.summary.relaxed_hits,
                selection.summary.misses
            ),
        );

        let timeline = reconcile_duration(&selection.clips, audio_duration, self.config.filler_epsilon);
        metrics::record_fillers(&timeline, audio_duration);
        logger.log_stage(
            "reconcile",
            &format!(
                "planned {:.2}s, total {:.2}s, {} fillers",
                timeline.planned_duration, timeline.total_duration, timeline.filler_count
            ),
        );

        let render_request = RenderRequest {
            segments: timeline.segments.clone(),
            audio: request.audio.clone(),
            output: request.output.clone(),
            work_dir: self.config.work_dir_for(&request.output),
            profile: self.config.render.clone(),
        };
        logger.log_stage("render", &format!("{} segments", render_request.segments.len()));
        let started = Instant::now();
        let render = self.renderer.render(&render_request).await?;
        metrics::record_render(started.elapsed().as_secs_f64(), render.segments_skipped);
        if render.segments_skipped > 0 || render.fillers_dropped > 0 {
            logger.log_warning(&format!(
                "{} segments skipped, {} fillers dropped during render",
                render.segments_skipped, render.fillers_dropped
            ));
        }

        let report = RunReport::build(ReportInput {
            run_id: logger.run_id(),
            audio: &request.audio,
            output: &request.output,
            seed: rng.seed(),
            analysis: &analysis,
            audio_duration,
            plan: &plan,
            clips: &selection.clips,
            summary: &selection.summary,
            timeline: &timeline,
            segments_skipped: render.segments_skipped,
            fillers_dropped: render.fillers_dropped,
        });
        let report_path = report.write().await?;
        logger.log_stage("report", &report_path.display().to_string());

        Ok(RunOutcome {
            report,
            report_path,
            render,
        })
    }
}

/// Duration from the structure analysis, probing the file when it reports none.
async fn audio_duration(analysis: &AudioAnalysis, audio: &Path) -> PipelineResult<f64> {
    let duration = analysis.duration();
    if duration > 0.0 {
        return Ok(duration);
    }
    tracing::debug!(audio = %audio.display(), "Analysis has no duration, probing audio");
    Ok(probe_duration(audio).await?)
}
