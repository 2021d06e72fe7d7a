//! Read-only token -> vector table.
//!
//! Loaded once at startup (from `vectors.bin` or a word2vec text export) and
//! shared behind an `Arc` for the lifetime of the process.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Errors raised while building a vector table.
#[derive(Debug, thiserror::Error)]
pub enum VectorTableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dimension mismatch for '{token}': expected {expected}, got {got}")]
    DimensionMismatch {
        token: String,
        expected: usize,
        got: usize,
    },

    #[error("Zero-norm vector for '{0}'")]
    ZeroNormVector(String),

    #[error("Malformed line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Token embedding table with cosine similarity lookups.
#[derive(Debug, Clone, Default)]
pub struct TokenVectors {
    entries: HashMap<String, Vec<f32>>,
    dimensions: usize,
}

impl TokenVectors {
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: HashMap::new(),
            dimensions,
        }
    }

    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            dimensions,
        }
    }

    /// A table with no vocabulary. Every non-identical token pair is skipped.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.entries.get(token).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Insert or replace a token vector.
    pub fn insert(&mut self, token: &str, vector: Vec<f32>) -> Result<(), VectorTableError> {
        if vector.len() != self.dimensions {
            return Err(VectorTableError::DimensionMismatch {
                token: token.to_string(),
                expected: self.dimensions,
                got: vector.len(),
            });
        }

        if l2_norm(&vector) < f32::EPSILON {
            return Err(VectorTableError::ZeroNormVector(token.to_string()));
        }

        self.entries.insert(token.to_string(), vector);
        Ok(())
    }

    /// Cosine similarity of two in-vocabulary tokens, `None` if either is unknown.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        let va = self.entries.get(a)?;
        let vb = self.entries.get(b)?;
        Some(cosine_similarity(va, vb))
    }

    /// Parse a word2vec text export.
    ///
    /// Each line is `token v1 v2 ... vn`. An optional first line `count dims`
    /// is accepted and skipped. Tokens are lowercased.
    pub fn from_word2vec_text<R: BufRead>(reader: R) -> Result<Self, VectorTableError> {
        let mut table: Option<TokenVectors> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(token) = parts.next() else {
                continue;
            };
            let values: Vec<&str> = parts.collect();

            // header line: "<count> <dims>"
            if idx == 0 && values.len() == 1 && token.parse::<usize>().is_ok() {
                continue;
            }

            let vector = values
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| VectorTableError::Malformed {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;

            let table = table.get_or_insert_with(|| TokenVectors::new(vector.len()));
            match table.insert(&token.to_lowercase(), vector) {
                Ok(()) => {}
                Err(VectorTableError::ZeroNormVector(token)) => {
                    log::debug!("skipping zero-norm vector for '{token}'");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(table.unwrap_or_default())
    }

    pub fn load_word2vec_text(path: &Path) -> Result<Self, VectorTableError> {
        let file = std::fs::File::open(path)?;
        Self::from_word2vec_text(std::io::BufReader::new(file))
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity between two vectors of equal length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}
