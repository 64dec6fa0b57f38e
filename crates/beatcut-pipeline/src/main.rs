//! beatcut: cut a beat-synchronized montage from a tagged clip catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use beatcut_catalog::SqliteCatalog;
use beatcut_media::{FfmpegRenderer, FfmpegRunner};
use beatcut_ml_client::EmbeddingClient;
use beatcut_pipeline::{
    init_tracing, AudioAnalyzer, CommandAnalyzer, ConfigOverrides, JsonAnalysisFile, MontagePipeline,
    PipelineConfig, PipelineError, RunRequest, SharedEmbeddings,
};

/// Beat-synchronized montage generator
#[derive(Parser, Debug)]
#[command(name = "beatcut")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cut a montage to the beats and sections of an audio track")]
struct Cli {
    /// Audio track to cut to
    #[arg(short, long)]
    audio: PathBuf,

    /// Rendered montage; the JSON report is written next to it
    #[arg(short, long, default_value = "montage.mp4")]
    output: PathBuf,

    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Precomputed analysis JSON (defaults to <audio>.analysis.json)
    #[arg(long)]
    analysis: Option<PathBuf>,

    #[arg(long)]
    beats_per_clip: Option<usize>,

    /// Slot duration jitter fraction in [0, 1)
    #[arg(long)]
    duration_variation: Option<f64>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Do not reuse a clip while alternatives exist
    #[arg(long, conflicts_with = "allow_repetition")]
    avoid_repetition: bool,

    /// Allow clips to repeat
    #[arg(long)]
    allow_repetition: bool,

    /// Data directory holding clips/ and catalog.sqlite
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// SQLite catalog file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Scratch directory for trimmed segments
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Keep trimmed segments after rendering
    #[arg(long)]
    keep_temp: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let avoid_repetition = if self.allow_repetition {
            Some(false)
        } else if self.avoid_repetition {
            Some(true)
        } else {
            None
        };
        ConfigOverrides {
            beats_per_clip: self.beats_per_clip,
            duration_variation: self.duration_variation,
            seed: self.seed,
            avoid_repetition,
            database: self.database.clone(),
            data_dir: self.data_dir.clone(),
            work_dir: self.work_dir.clone(),
            keep_temp: self.keep_temp.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Invalid log filter: {e}");
        std::process::exit(2);
    }

    info!("Starting beatcut");

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        let code = e.downcast_ref::<PipelineError>().map_or(1, PipelineError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(&cli.overrides())?;
    info!("Pipeline config: {:?}", config);

    let analyzer: Box<dyn AudioAnalyzer> = match (&cli.analysis, CommandAnalyzer::from_config(&config.analysis)) {
        (Some(path), _) => Box::new(JsonAnalysisFile::at(path)),
        (None, Some(command)) => Box::new(command),
        (None, None) => Box::new(JsonAnalysisFile::sidecar()),
    };

    let mut runner = FfmpegRunner::new();
    if let Some(secs) = config.render.timeout_secs {
        runner = runner.with_timeout(secs);
    }
    let renderer = FfmpegRenderer::new(runner).keep_temp(config.keep_temp);

    let database = config.database_path();
    let embeddings = SharedEmbeddings::new();
    let catalog = SqliteCatalog::open(&database)
        .map_err(PipelineError::from)
        .with_context(|| format!("Failed to open catalog {}", database.display()))?
        .with_embedder(embeddings.as_embedder());

    let embedding_config = config.embedding_client_config();
    let mut pipeline = MontagePipeline::new(config, catalog, analyzer, Box::new(renderer))?;
    if let Some(embedding_config) = embedding_config {
        let client = EmbeddingClient::new(embedding_config).map_err(PipelineError::from)?;
        pipeline = pipeline.with_semantic_ranking(client, embeddings);
    }

    let outcome = pipeline.run(&RunRequest::new(cli.audio, cli.output)).await?;
    info!(
        output = %outcome.render.output.display(),
        report = %outcome.report_path.display(),
        "Montage complete"
    );
    Ok(())
}
