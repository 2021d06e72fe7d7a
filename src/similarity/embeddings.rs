//! Building a token vector table from a fastembed model.
//!
//! The resolver never embeds at query time; it only reads the frozen table
//! this module produces (`pantry vectors build`).

use fastembed::{InitOptions, TextEmbedding};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::time::Duration;

use crate::similarity::vectors::{TokenVectors, VectorTableError};

/// Model files can take a while to fetch on first use
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Accepted names, case-insensitive.
const MODELS: &[(&str, fastembed::EmbeddingModel)] = &[
    ("all-minilm-l6-v2", fastembed::EmbeddingModel::AllMiniLML6V2),
    ("bge-small-en-v1.5", fastembed::EmbeddingModel::BGESmallENV15),
    ("bge-base-en-v1.5", fastembed::EmbeddingModel::BGEBaseENV15),
    ("bge-large-en-v1.5", fastembed::EmbeddingModel::BGELargeENV15),
];

/// fastembed's `embed` takes `&mut self`, hence the mutex.
pub struct EmbeddingModel {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("failed to load model: {0}")]
    InitFailed(String),

    #[error("model download did not finish within {0:?}")]
    Timeout(Duration),

    #[error("failed to embed tokens: {0}")]
    EmbeddingFailed(String),

    #[error("unknown model '{0}', expected one of: {1}")]
    InvalidModel(String, String),

    #[error(transparent)]
    Table(#[from] VectorTableError),
}

impl EmbeddingModel {
    /// Load `model_name`, downloading it into `cache_dir/models` on first use.
    pub fn new(
        model_name: &str,
        cache_dir: PathBuf,
        download_timeout: Option<Duration>,
    ) -> Result<Self, EmbeddingError> {
        let kind = Self::lookup(model_name)?;
        let timeout = download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT);

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir)
            .map_err(|err| EmbeddingError::InitFailed(format!("{}: {err}", models_dir.display())))?;

        let options = InitOptions::new(kind)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        // the download itself has no deadline, so wait for it on a worker thread
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(TextEmbedding::try_new(options));
        });

        let mut model = match rx.recv_timeout(timeout) {
            Ok(result) => result.map_err(|err| EmbeddingError::InitFailed(err.to_string()))?,
            Err(RecvTimeoutError::Timeout) => return Err(EmbeddingError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(EmbeddingError::InitFailed("loader thread panicked".to_string()))
            }
        };

        let dimensions = Self::probe_dimensions(&mut model)?;
        log::debug!("loaded '{model_name}' ({dimensions} dimensions)");

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn name(&self) -> &str {
        &self.model_name
    }

    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::EmbeddingFailed("model lock poisoned".to_string()))?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|err| EmbeddingError::EmbeddingFailed(err.to_string()))
    }

    /// Embed every vocabulary token, `batch_size` at a time.
    ///
    /// Tokens are lowercased and deduplicated. Multi-word phrases should be
    /// given in their merged `a_b` form; underscores are replaced by spaces
    /// for the model input only.
    pub fn build_token_vectors(
        &self,
        vocabulary: &[String],
        batch_size: usize,
    ) -> Result<TokenVectors, EmbeddingError> {
        let mut tokens: Vec<String> = vocabulary
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tokens.sort();
        tokens.dedup();

        let mut table = TokenVectors::with_capacity(self.dimensions, tokens.len());

        let progress = ProgressBar::new(tokens.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} tokens ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for chunk in tokens.chunks(batch_size.max(1)) {
            let inputs: Vec<String> = chunk.iter().map(|t| t.replace('_', " ")).collect();
            let vectors = self.embed_batch(&inputs)?;

            for (token, vector) in chunk.iter().zip(vectors) {
                if let Err(err) = table.insert(token, vector) {
                    log::warn!("skipping token '{token}': {err}");
                }
            }
            progress.inc(chunk.len() as u64);
        }

        progress.finish_and_clear();
        log::info!(
            "embedded {} tokens with '{}' ({} dimensions)",
            table.len(),
            self.model_name,
            self.dimensions
        );

        Ok(table)
    }

    fn lookup(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        let wanted = name.to_lowercase();
        MODELS
            .iter()
            .find(|(known, _)| *known == wanted)
            .map(|(_, kind)| kind.clone())
            .ok_or_else(|| {
                let known: Vec<&str> = MODELS.iter().map(|(known, _)| *known).collect();
                EmbeddingError::InvalidModel(name.to_string(), known.join(", "))
            })
    }

    fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
        let probe = model
            .embed(vec!["tomato"], None)
            .map_err(|err| EmbeddingError::InitFailed(err.to_string()))?;

        match probe.first() {
            Some(vector) if !vector.is_empty() => Ok(vector.len()),
            _ => Err(EmbeddingError::InitFailed(
                "model returned an empty embedding".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_model_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = EmbeddingModel::new("nonexistent-model", temp_dir.path().to_path_buf(), None);
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(..))));

        let result = EmbeddingModel::new("Word2Vec", temp_dir.path().to_path_buf(), None);
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(name, _)) if name == "Word2Vec"));
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_build_token_vectors() {
        let temp_dir = tempfile::tempdir().unwrap();
        let model =
            EmbeddingModel::new("all-MiniLM-L6-v2", temp_dir.path().to_path_buf(), None).unwrap();

        let vocabulary = vec![
            "Tomato".to_string(),
            "tomato".to_string(),
            "olive_oil".to_string(),
            "paste".to_string(),
        ];
        let table = model.build_token_vectors(&vocabulary, 2).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.dimensions(), 384);
        assert!(table.contains("olive_oil"));
        assert!(table.similarity("tomato", "paste").is_some());
    }
}
