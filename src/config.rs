use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::resolver::Thresholds;

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_REUSE_THRESHOLD: f32 = 0.87;
const DEFAULT_REVIEW_FLOOR: f32 = 0.80;
const DEFAULT_HIGH_CONFIDENCE: f32 = 0.95;

/// Default embedding model for `vectors build`
const DEFAULT_EMBEDDING_MODEL: &str = "bge-small-en-v1.5";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_BATCH_SIZE: usize = 256;

const DEFAULT_SOURCE_URL: &str = "https://api.edamam.com/api/recipes/v2";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_NODE_TARGET: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is malformed: {0}")]
    Malformed(#[from] serde_yml::Error),

    #[error("config file is not valid utf8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Merge/create policy for ingredient resolution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Scores strictly above this reuse the existing ingredient
    #[serde(default = "default_reuse_threshold")]
    pub reuse_threshold: f32,

    /// Scores strictly above this (but not above reuse) are logged as near misses
    #[serde(default = "default_review_floor")]
    pub review_floor: f32,

    /// Reuses scored below this are logged as borderline
    #[serde(default = "default_high_confidence")]
    pub high_confidence: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            reuse_threshold: DEFAULT_REUSE_THRESHOLD,
            review_floor: DEFAULT_REVIEW_FLOOR,
            high_confidence: DEFAULT_HIGH_CONFIDENCE,
        }
    }
}

impl DedupConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            reuse: self.reuse_threshold,
            review_floor: self.review_floor,
            high_confidence: self.high_confidence,
        }
    }
}

fn default_reuse_threshold() -> f32 {
    DEFAULT_REUSE_THRESHOLD
}

fn default_review_floor() -> f32 {
    DEFAULT_REVIEW_FLOOR
}

fn default_high_confidence() -> f32 {
    DEFAULT_HIGH_CONFIDENCE
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Token vector table, relative to the base path
    #[serde(default = "default_vectors_file")]
    pub vectors: String,

    /// Optional phrase table, relative to the base path
    #[serde(default = "default_phrases_file")]
    pub phrases: String,

    /// Model name for `vectors build` (e.g., "bge-small-en-v1.5")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            vectors: default_vectors_file(),
            phrases: default_phrases_file(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn default_vectors_file() -> String {
    "vectors.bin".to_string()
}

fn default_phrases_file() -> String {
    "phrases.txt".to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Recipe search API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub base_url: String,

    /// Overridden by EDAMAM_APP_ID
    #[serde(default)]
    pub app_id: Option<String>,

    /// Overridden by EDAMAM_APP_KEY
    #[serde(default)]
    pub app_key: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            app_id: None,
            app_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// `build` stops once the graph holds more nodes than this
    #[serde(default = "default_node_target")]
    pub node_target: usize,

    #[serde(default = "default_cuisines")]
    pub cuisines: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            node_target: DEFAULT_NODE_TARGET,
            cuisines: default_cuisines(),
        }
    }
}

fn default_node_target() -> usize {
    DEFAULT_NODE_TARGET
}

fn default_cuisines() -> Vec<String> {
    [
        "American",
        "Asian",
        "British",
        "Caribbean",
        "Central Europe",
        "Chinese",
        "Eastern Europe",
        "French",
        "Indian",
        "Italian",
        "Japanese",
        "Kosher",
        "Mediterranean",
        "Mexican",
        "Middle Eastern",
        "Nordic",
        "South American",
        "South East Asian",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        let dedup = &self.dedup;
        for (name, value) in [
            ("dedup.reuse_threshold", dedup.reuse_threshold),
            ("dedup.review_floor", dedup.review_floor),
            ("dedup.high_confidence", dedup.high_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        if dedup.review_floor >= dedup.reuse_threshold {
            return Err(ConfigError::Invalid(format!(
                "dedup.review_floor ({}) must be below dedup.reuse_threshold ({})",
                dedup.review_floor, dedup.reuse_threshold
            )));
        }

        if dedup.reuse_threshold > dedup.high_confidence {
            return Err(ConfigError::Invalid(format!(
                "dedup.reuse_threshold ({}) must not exceed dedup.high_confidence ({})",
                dedup.reuse_threshold, dedup.high_confidence
            )));
        }

        if self.similarity.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "similarity.batch_size must be greater than 0".to_string(),
            ));
        }

        if self.similarity.download_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "similarity.download_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.source.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "source.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, creating it with defaults if missing.
    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(base_path)?;
        let path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !path.exists() {
            log::info!("Creating new config at {}", path.display());
            write_atomic(&path, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str = String::from_utf8(std::fs::read(&path)?)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        config.apply_env();

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let config_str = serde_yml::to_string(&self)?;
        write_atomic(&self.base_path.join(CONFIG_FILE), config_str.as_bytes())?;
        Ok(())
    }

    /// Path of a file named in the config, relative to the base path.
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    fn apply_env(&mut self) {
        if let Ok(app_id) = std::env::var("EDAMAM_APP_ID") {
            self.source.app_id = Some(app_id);
        }
        if let Ok(app_key) = std::env::var("EDAMAM_APP_KEY") {
            self.source.app_key = Some(app_key);
        }
        if let Ok(base_url) = std::env::var("EDAMAM_BASE_URL") {
            self.source.base_url = base_url;
        }
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("yaml-tmp");
    std::fs::write(&temp_path, data)?;
    std::fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with(tmp.path()).unwrap();

        assert!(tmp.path().join("config.yaml").exists());
        assert_eq!(config.dedup, DedupConfig::default());
        assert_eq!(config.dedup.thresholds(), Thresholds::default());
        assert_eq!(config.ingest.node_target, 5000);
        assert_eq!(config.resolve_path("vectors.bin"), tmp.path().join("vectors.bin"));
    }

    #[test]
    fn test_partial_config_gets_defaults_and_is_resaved() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.yaml"),
            "dedup:\n  reuse_threshold: 0.9\n",
        )
        .unwrap();

        let config = Config::load_with(tmp.path()).unwrap();
        assert_eq!(config.dedup.reuse_threshold, 0.9);
        assert_eq!(config.dedup.review_floor, 0.80);
        assert_eq!(config.similarity.batch_size, 256);

        let saved = std::fs::read_to_string(tmp.path().join("config.yaml")).unwrap();
        assert!(saved.contains("high_confidence"));
        assert!(saved.contains("node_target"));
    }

    #[test]
    fn test_threshold_order_validated() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.yaml"),
            "dedup:\n  reuse_threshold: 0.7\n  review_floor: 0.8\n",
        )
        .unwrap();

        assert!(matches!(
            Config::load_with(tmp.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_threshold_range_validated() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.yaml"),
            "dedup:\n  high_confidence: 1.5\n",
        )
        .unwrap();

        assert!(matches!(
            Config::load_with(tmp.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.yaml"),
            "similarity:\n  batch_size: 0\n",
        )
        .unwrap();

        assert!(matches!(
            Config::load_with(tmp.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_config() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("config.yaml"), "dedup: [1, 2").unwrap();

        assert!(matches!(
            Config::load_with(tmp.path()),
            Err(ConfigError::Malformed(_))
        ));
    }
}
