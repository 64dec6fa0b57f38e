//! Pipeline configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional config
//! file (YAML, TOML or JSON by extension), `BEATCUT_*` environment variables
//! with `__` separating nested keys, then command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use beatcut_catalog::DataLayout;
use beatcut_ml_client::EmbeddingClientConfig;
use beatcut_models::{RenderProfile, SelectionThresholds, StyleTable};
use beatcut_planner::{MissingFilePolicy, DEFAULT_FILLER_EPSILON};

use crate::error::{PipelineError, PipelineResult};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "BEATCUT";
/// Name of the scratch directory created next to the output.
pub const DEFAULT_WORK_DIR_NAME: &str = ".temp";

/// Catalog location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite file; defaults to `<data_dir>/catalog.sqlite`
    pub database: Option<PathBuf>,
    /// Data directory; defaults to `$DATA_DIR` or `./data`
    pub data_dir: Option<PathBuf>,
}

/// Embedding service used for semantic style descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Semantic ranking is enabled only when this is set
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// External audio analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Program printing the analysis JSON; the audio path is appended to `args`
    pub command: Option<String>,
    pub args: Vec<String>,
    pub timeout_secs: Option<u64>,
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub beats_per_clip: usize,
    /// Slot duration jitter as a fraction of the nominal duration
    pub duration_variation: f64,
    pub avoid_repetition: bool,
    /// Fixed seed for reproducible output
    pub seed: Option<u64>,
    pub min_tag_score: f64,
    pub min_entity_confidence: f64,
    /// Gap below which no filler is appended (seconds)
    pub filler_epsilon: f64,
    pub missing_file_policy: MissingFilePolicy,
    /// Section styles; the built-in table is used when absent
    pub style: Option<StyleTable>,
    pub catalog: CatalogConfig,
    pub embedding: EmbeddingConfig,
    pub analysis: AnalysisConfig,
    pub render: RenderProfile,
    /// Scratch directory; defaults to `<output dir>/.temp`
    pub work_dir: Option<PathBuf>,
    /// Keep trimmed segments after rendering
    pub keep_temp: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let thresholds = SelectionThresholds::default();
        Self {
            beats_per_clip: 1,
            duration_variation: 0.1,
            avoid_repetition: true,
            seed: None,
            min_tag_score: thresholds.min_tag_score,
            min_entity_confidence: thresholds.min_entity_confidence,
            filler_epsilon: DEFAULT_FILLER_EPSILON,
            missing_file_policy: MissingFilePolicy::default(),
            style: None,
            catalog: CatalogConfig::default(),
            embedding: EmbeddingConfig::default(),
            analysis: AnalysisConfig::default(),
            render: RenderProfile::default(),
            work_dir: None,
            keep_temp: false,
        }
    }
}

/// Values given on the command line; `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub beats_per_clip: Option<usize>,
    pub duration_variation: Option<f64>,
    pub seed: Option<u64>,
    pub avoid_repetition: Option<bool>,
    pub database: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub keep_temp: Option<bool>,
}

impl PipelineConfig {
    /// Load from an optional file plus `BEATCUT_*` environment variables.
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(PipelineError::config_error(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> PipelineResult<()> {
        if let Some(beats_per_clip) = overrides.beats_per_clip {
            self.beats_per_clip = beats_per_clip;
        }
        if let Some(duration_variation) = overrides.duration_variation {
            self.duration_variation = duration_variation;
        }
        if let Some(seed) = overrides.seed {
            self.seed = Some(seed);
        }
        if let Some(avoid_repetition) = overrides.avoid_repetition {
            self.avoid_repetition = avoid_repetition;
        }
        if let Some(database) = &overrides.database {
            self.catalog.database = Some(database.clone());
        }
        if let Some(data_dir) = &overrides.data_dir {
            self.catalog.data_dir = Some(data_dir.clone());
        }
        if let Some(work_dir) = &overrides.work_dir {
            self.work_dir = Some(work_dir.clone());
        }
        if let Some(keep_temp) = overrides.keep_temp {
            self.keep_temp = keep_temp;
        }
        self.validate()
    }

    /// Check ranges and the style table.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.beats_per_clip == 0 {
            return Err(PipelineError::config_error("beats_per_clip must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.duration_variation) {
            return Err(PipelineError::config_error(format!(
                "duration_variation must be in [0, 1), got {}",
                self.duration_variation
            )));
        }
        if !self.filler_epsilon.is_finite() || self.filler_epsilon < 0.0 {
            return Err(PipelineError::config_error(format!(
                "filler_epsilon must be non-negative, got {}",
                self.filler_epsilon
            )));
        }
        self.thresholds()
            .validate()
            .map_err(|e| PipelineError::config_error(e.to_string()))?;
        if let Some(style) = &self.style {
            style
                .validate()
                .map_err(|e| PipelineError::config_error(e.to_string()))?;
        }
        if self.render.width == 0 || self.render.height == 0 || self.render.fps == 0 {
            return Err(PipelineError::config_error(
                "render width, height and fps must be positive",
            ));
        }
        if let Some(base_url) = &self.embedding.base_url {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(PipelineError::config_error(format!(
                    "embedding.base_url must be an http(s) URL, got {base_url}"
                )));
            }
        }
        Ok(())
    }

    pub fn thresholds(&self) -> SelectionThresholds {
        SelectionThresholds {
            min_tag_score: self.min_tag_score,
            min_entity_confidence: self.min_entity_confidence,
        }
    }

    /// Configured style table, or the built-in one.
    pub fn style_table(&self) -> StyleTable {
        self.style.clone().unwrap_or_else(StyleTable::builtin)
    }

    pub fn layout(&self) -> DataLayout {
        match &self.catalog.data_dir {
            Some(dir) => DataLayout::new(dir),
            None => DataLayout::from_env(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.catalog
            .database
            .clone()
            .unwrap_or_else(|| self.layout().default_database())
    }

    /// Scratch directory for a render of `output`.
    pub fn work_dir_for(&self, output: &Path) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| {
            output
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_WORK_DIR_NAME)
        })
    }

    /// Embedding client settings when semantic ranking is enabled.
    pub fn embedding_client_config(&self) -> Option<EmbeddingClientConfig> {
        let base_url = self.embedding.base_url.as_ref()?;
        Some(
            EmbeddingClientConfig::new(base_url.clone())
                .with_timeout(Duration::from_secs(self.embedding.timeout_secs))
                .with_max_retries(self.embedding.max_retries),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.beats_per_clip, 1);
        assert!(config.avoid_repetition);
        assert_eq!(config.style_table().len(), 4);
        assert!(config.embedding_client_config().is_none());
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "montage.yaml",
            r#"
beats_per_clip: 2
seed: 42
missing_file_policy: next_candidate
style:
  drop:
    tags: [police]
    min_motion: 0.5
    description: flashing lights
render:
  crf: 20
"#,
        );
        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.beats_per_clip, 2);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.missing_file_policy, MissingFilePolicy::NextCandidate);
        assert_eq!(config.render.crf, 20);
        assert_eq!(config.render.width, 1920);
        let style = config.style_table();
        let drop = style.get("drop").unwrap();
        assert_eq!(drop.min_motion, Some(0.5));
        assert!(drop.max_motion.is_none());
        assert_eq!(style.len(), 1);
    }

    #[test]
    fn test_mixed_case_style_label_resolves() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "montage.yaml",
            "style:\n  Drop:\n    tags: [x]\n    min_motion: 0.6\n",
        );
        let config = PipelineConfig::load(Some(&path)).unwrap();
        let resolver =
            beatcut_planner::StyleResolver::new(config.style_table(), config.thresholds()).unwrap();

        for label in ["Drop", "drop"] {
            let query = resolver.resolve(Some(label));
            assert_eq!(query.tags, vec!["x".to_string()]);
            assert_eq!(query.min_motion, Some(0.6));
        }
    }

    #[test]
    fn test_unknown_style_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "bad.yaml",
            "style:\n  drop:\n    max_motoin: 0.3\n",
        );
        let err = PipelineConfig::load(Some(&path)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_out_of_range_style_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "bad.yaml", "style:\n  drop:\n    min_motion: 1.5\n");
        assert!(PipelineConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::load(Some(Path::new("/nope/beatcut.yaml"))).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_overrides() {
        let mut config = PipelineConfig::default();
        config
            .apply_overrides(&ConfigOverrides {
                beats_per_clip: Some(4),
                seed: Some(7),
                avoid_repetition: Some(false),
                data_dir: Some(PathBuf::from("/srv/data")),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.beats_per_clip, 4);
        assert_eq!(config.seed, Some(7));
        assert!(!config.avoid_repetition);
        assert_eq!(config.database_path(), PathBuf::from("/srv/data/catalog.sqlite"));

        let err = config
            .apply_overrides(&ConfigOverrides {
                beats_per_clip: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_work_dir_defaults_next_to_output() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.work_dir_for(Path::new("/renders/out.mp4")),
            PathBuf::from("/renders/.temp")
        );
    }

    #[test]
    fn test_embedding_config() {
        let config = PipelineConfig {
            embedding: EmbeddingConfig {
                base_url: Some("http://embed:8001".to_string()),
                timeout_secs: 5,
                max_retries: 0,
            },
            ..Default::default()
        };
        let client = config.embedding_client_config().unwrap();
        assert_eq!(client.base_url, "http://embed:8001");
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.max_retries, 0);
    }
}
