//! End-to-end runs with an in-memory catalog and a renderer that only records.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use beatcut_catalog::{InMemoryCatalog, TextEmbedder};
use beatcut_media::{MediaResult, MontageRenderer, RenderOutcome, RenderRequest};
use beatcut_ml_client::EmbeddingClient;
use beatcut_models::{
    AudioAnalysis, BeatAnalysis, ClipRecord, ClipSignals, Section, StructureAnalysis, StyleDescriptor,
    StyleTable,
};
use beatcut_pipeline::{
    sidecar_path, JsonAnalysisFile, MontagePipeline, PipelineConfig, PipelineError, RunRequest,
    SharedEmbeddings,
};

#[derive(Clone, Default)]
struct RecordingRenderer {
    requests: Arc<Mutex<Vec<RenderRequest>>>,
}

impl RecordingRenderer {
    fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MontageRenderer for RecordingRenderer {
    async fn render(&self, request: &RenderRequest) -> MediaResult<RenderOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::fs::write(&request.output, b"").await?;
        Ok(RenderOutcome {
            output: request.output.clone(),
            segments_rendered: request.segments.len(),
            segments_skipped: 0,
            fillers_dropped: 0,
            elapsed_secs: 0.0,
        })
    }
}

struct Workspace {
    dir: TempDir,
    audio: PathBuf,
    output: PathBuf,
}

impl Workspace {
    /// 120 beats every 0.5 s under a single "drop" section.
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("song.mp3");
        std::fs::write(&audio, b"not really audio").unwrap();

        let analysis = AudioAnalysis {
            rhythm: BeatAnalysis::constant(120.0, 120, 0.5),
            structure: StructureAnalysis {
                sections: vec![Section::new("drop", 0.0, 60.0)],
                energy: Vec::new(),
                duration: 60.0,
            },
        };
        std::fs::write(sidecar_path(&audio), serde_json::to_vec(&analysis).unwrap()).unwrap();

        let output = dir.path().join("out").join("montage.mp4");
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();
        Self { dir, audio, output }
    }

    fn clip(&self, id: &str, duration: f64) -> ClipRecord {
        let path = self.dir.path().join(format!("{id}.mp4"));
        std::fs::write(&path, b"").unwrap();
        ClipRecord::new(id, path.to_string_lossy().to_string(), duration, "archive")
            .with_tag("night vision", 0.9)
            .with_signals(ClipSignals {
                motion_score: 0.8,
                silence_ratio: 0.1,
                noise_level: 0.5,
                brightness_entropy: 0.4,
            })
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            beats_per_clip: 2,
            seed: Some(1234),
            ..Default::default()
        }
    }

    fn request(&self) -> RunRequest {
        RunRequest::new(&self.audio, &self.output)
    }
}

fn pipeline(
    config: PipelineConfig,
    catalog: InMemoryCatalog,
    renderer: &RecordingRenderer,
) -> MontagePipeline<InMemoryCatalog> {
    MontagePipeline::new(
        config,
        catalog,
        Box::new(JsonAnalysisFile::sidecar()),
        Box::new(renderer.clone()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_single_short_clip_fills_track_with_fillers() {
    let ws = Workspace::new();
    let catalog = InMemoryCatalog::from_records([ws.clip("only", 0.5)]);
    let renderer = RecordingRenderer::default();

    let outcome = pipeline(ws.config(), catalog, &renderer)
        .run(&ws.request())
        .await
        .unwrap();

    let report = &outcome.report;
    assert_eq!(report.counters.slots, 60);
    assert_eq!(report.counters.misses, 0);
    assert_eq!(report.selected_clips.len(), 60);
    for clip in &report.selected_clips {
        assert_eq!(clip.trim_start, 0.0);
        assert!((clip.trim_duration - 0.5).abs() < 1e-9);
        assert_eq!(clip.section_type.as_deref(), Some("drop"));
    }
    assert!((report.planned_duration - 30.0).abs() < 1e-6);
    assert!(report.total_duration >= 60.0 - 0.05);
    assert!(report.total_duration <= 60.0 + 1e-6);
    assert!(report.counters.fillers > 0);

    let requests = renderer.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.segments.len(), 60 + report.counters.fillers);
    assert!(request.segments[..60].iter().all(|s| !s.filler));
    assert!(request.segments[60..].iter().all(|s| s.filler));
    assert_eq!(request.work_dir, ws.output.parent().unwrap().join(".temp"));

    assert_eq!(outcome.report_path, ws.output.with_extension("json"));
    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&outcome.report_path).unwrap()).unwrap();
    assert_eq!(written["beats_count"], 120);
    assert_eq!(written["bpm"], 120.0);
    assert_eq!(written["seed"], 1234);
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() {
    let ws = Workspace::new();
    let records: Vec<ClipRecord> = (0..8).map(|i| ws.clip(&format!("c{i}"), 3.0)).collect();
    let renderer = RecordingRenderer::default();

    for _ in 0..2 {
        pipeline(ws.config(), InMemoryCatalog::from_records(records.clone()), &renderer)
            .run(&ws.request())
            .await
            .unwrap();
    }

    let requests = renderer.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].segments, requests[1].segments);
}

#[tokio::test]
async fn test_repetition_avoided_while_alternatives_exist() {
    let ws = Workspace::new();
    let records: Vec<ClipRecord> = (0..60).map(|i| ws.clip(&format!("c{i:02}"), 3.0)).collect();
    let renderer = RecordingRenderer::default();

    let outcome = pipeline(ws.config(), InMemoryCatalog::from_records(records), &renderer)
        .run(&ws.request())
        .await
        .unwrap();

    let mut ids: Vec<_> = outcome.report.selected_clips.iter().map(|c| c.clip_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 60);
}

#[tokio::test]
async fn test_empty_catalog_aborts_before_rendering() {
    let ws = Workspace::new();
    let renderer = RecordingRenderer::default();

    let err = pipeline(ws.config(), InMemoryCatalog::new(), &renderer)
        .run(&ws.request())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NoClipsSelected { slots: 60 }));
    assert_eq!(err.exit_code(), 1);
    assert!(renderer.requests().is_empty());
    assert!(!ws.output.with_extension("json").exists());
}

#[tokio::test]
async fn test_missing_audio() {
    let ws = Workspace::new();
    let renderer = RecordingRenderer::default();
    let request = RunRequest::new(ws.dir.path().join("absent.mp3"), &ws.output);

    let err = pipeline(ws.config(), InMemoryCatalog::new(), &renderer)
        .run(&request)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::AudioNotFound(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_invalid_configuration_rejected() {
    let config = PipelineConfig {
        beats_per_clip: 0,
        ..Default::default()
    };
    let result = MontagePipeline::new(
        config,
        InMemoryCatalog::new(),
        Box::new(JsonAnalysisFile::sidecar()),
        Box::new(RecordingRenderer::default()),
    );
    let err = result.err().unwrap();
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_style_descriptions_embedded_before_selection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed/text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [1.0, 0.0]})))
        .expect(1)
        .mount(&server)
        .await;

    let ws = Workspace::new();
    let mut style = StyleTable::new();
    style.insert(
        "drop",
        StyleDescriptor::default()
            .with_tags(["night vision"])
            .with_description("flashing lights at night"),
    );
    let config = PipelineConfig {
        style: Some(style),
        ..ws.config()
    };

    let embeddings = SharedEmbeddings::new();
    let mut catalog = InMemoryCatalog::from_records([ws.clip("near", 3.0), ws.clip("far", 3.0)])
        .with_embedder(embeddings.as_embedder());
    catalog.insert_embedding("near".into(), vec![0.9, 0.1]);
    catalog.insert_embedding("far".into(), vec![0.0, 1.0]);

    let client = EmbeddingClient::new(beatcut_ml_client::EmbeddingClientConfig::new(server.uri())).unwrap();
    let renderer = RecordingRenderer::default();
    let outcome = pipeline(config, catalog, &renderer)
        .with_semantic_ranking(client, embeddings.clone())
        .run(&ws.request())
        .await
        .unwrap();

    assert_eq!(embeddings.embed("flashing lights at night"), Some(vec![1.0, 0.0]));
    assert_eq!(outcome.report.counters.misses, 0);
}
