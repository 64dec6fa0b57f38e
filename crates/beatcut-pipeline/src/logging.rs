//! Tracing setup and structured run logging.

use tracing::{error, info, warn, Span};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directive applied on top of `RUST_LOG`.
pub const DEFAULT_DIRECTIVE: &str = "beatcut=info";

/// Install the global subscriber: colored output for dev, JSON when
/// `LOG_FORMAT=json`.
pub fn init_tracing() -> Result<(), ParseError> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive(DEFAULT_DIRECTIVE.parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

/// Run logger for structured logging with consistent formatting.
///
/// Every line carries the run id and the audio file being cut.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    audio: String,
}

impl RunLogger {
    pub fn new(run_id: impl Into<String>, audio: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            audio: audio.into(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, audio = %self.audio, "Run started: {}", message);
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: &str, message: &str) {
        info!(
            run_id = %self.run_id,
            audio = %self.audio,
            stage,
            "Stage {}: {}", stage, message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, audio = %self.audio, "Run warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(run_id = %self.run_id, audio = %self.audio, "Run error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, audio = %self.audio, "Run completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn audio(&self) -> &str {
        &self.audio
    }

    /// Span covering the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, audio = %self.audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let logger = RunLogger::new("run-123", "song.mp3");
        assert_eq!(logger.run_id(), "run-123");
        assert_eq!(logger.audio(), "song.mp3");
    }

    #[test]
    fn test_default_directive_parses() {
        assert!(DEFAULT_DIRECTIVE.parse::<tracing_subscriber::filter::Directive>().is_ok());
    }
}
