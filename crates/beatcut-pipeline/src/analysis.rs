//! Audio analysis collaborators.
//!
//! Beat tracking and section detection run outside this workspace. An
//! analyzer hands back the combined [`AudioAnalysis`] document either from a
//! precomputed JSON file or from an external program's stdout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use beatcut_models::AudioAnalysis;

use crate::config::AnalysisConfig;
use crate::error::{PipelineError, PipelineResult};

/// Suffix appended to the audio file name to find its sidecar analysis.
pub const SIDECAR_SUFFIX: &str = ".analysis.json";

/// Produces beat and structure analysis for an audio file.
#[async_trait]
pub trait AudioAnalyzer: Send + Sync {
    async fn analyze(&self, audio: &Path) -> PipelineResult<AudioAnalysis>;
}

/// Sidecar path for `audio`: `song.mp3` becomes `song.mp3.analysis.json`.
pub fn sidecar_path(audio: &Path) -> PathBuf {
    let mut name = audio.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

fn parse_analysis(bytes: &[u8], origin: &str) -> PipelineResult<AudioAnalysis> {
    let analysis: AudioAnalysis = serde_json::from_slice(bytes)
        .map_err(|e| PipelineError::analysis_failed(format!("{origin}: {e}")))?;
    analysis.validate()?;
    Ok(analysis)
}

/// Reads a precomputed analysis document.
#[derive(Debug, Clone, Default)]
pub struct JsonAnalysisFile {
    /// Fixed document; the audio's sidecar is used when unset
    path: Option<PathBuf>,
}

impl JsonAnalysisFile {
    /// Read `<audio>.analysis.json` next to each audio file.
    pub fn sidecar() -> Self {
        Self::default()
    }

    /// Always read `path`, whatever audio file is analyzed.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    fn document_for(&self, audio: &Path) -> PathBuf {
        self.path.clone().unwrap_or_else(|| sidecar_path(audio))
    }
}

#[async_trait]
impl AudioAnalyzer for JsonAnalysisFile {
    async fn analyze(&self, audio: &Path) -> PipelineResult<AudioAnalysis> {
        let document = self.document_for(audio);
        if !document.exists() {
            return Err(PipelineError::analysis_failed(format!(
                "analysis file not found: {}",
                document.display()
            )));
        }

        debug!(path = %document.display(), "Reading audio analysis");
        let bytes = tokio::fs::read(&document).await?;
        parse_analysis(&bytes, &document.display().to_string())
    }
}

/// Runs an external analyzer and parses its stdout.
///
/// The audio path is appended after the configured arguments.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
    timeout_secs: Option<u64>,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_secs: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Analyzer described by `config`, if a command is configured.
    pub fn from_config(config: &AnalysisConfig) -> Option<Self> {
        let program = config.command.as_ref()?;
        let mut analyzer = Self::new(program.clone()).with_args(config.args.iter().cloned());
        if let Some(secs) = config.timeout_secs {
            analyzer = analyzer.with_timeout(secs);
        }
        Some(analyzer)
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl AudioAnalyzer for CommandAnalyzer {
    async fn analyze(&self, audio: &Path) -> PipelineResult<AudioAnalysis> {
        let program = which::which(&self.program).map_err(|_| {
            PipelineError::analysis_failed(format!("analyzer not found: {}", self.program))
        })?;

        info!(program = %self.program, audio = %audio.display(), "Running audio analyzer");
        let child = Command::new(program)
            .args(&self.args)
            .arg(audio)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
                .await
                .map_err(|_| {
                    PipelineError::analysis_failed(format!("analyzer timed out after {secs} seconds"))
                })??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::analysis_failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        parse_analysis(&output.stdout, &self.program)
    }
}
