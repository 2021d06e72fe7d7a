//! Token-pair similarity scoring.

use std::sync::Arc;

use crate::similarity::{PhraseTable, TokenVectors};

/// Scores how likely two normalized names denote the same ingredient.
pub trait SimilarityOracle: Send + Sync {
    /// Returns a score in `[0, 1]`.
    fn similarity(&self, a: &[&str], b: &[&str]) -> f32;
}

/// Embedding-backed oracle.
///
/// Every token of one side is compared with every token of the other:
/// - identical tokens contribute 1.0
/// - tokens both in the vocabulary contribute their cosine similarity
/// - any other pair is skipped, it does not count towards the mean
///
/// The score is the mean of the contributions, or 0.0 if nothing contributed.
pub struct EmbeddingOracle {
    vectors: Arc<TokenVectors>,
    phrases: Option<Arc<PhraseTable>>,
}

impl EmbeddingOracle {
    pub fn new(vectors: Arc<TokenVectors>, phrases: Option<Arc<PhraseTable>>) -> Self {
        Self { vectors, phrases }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectors.len()
    }

    fn merge_phrases(&self, tokens: &[&str]) -> Vec<String> {
        match &self.phrases {
            Some(phrases) => phrases.apply(tokens),
            None => tokens.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl SimilarityOracle for EmbeddingOracle {
    fn similarity(&self, a: &[&str], b: &[&str]) -> f32 {
        let tokens_a = self.merge_phrases(a);
        let tokens_b = self.merge_phrases(b);

        let mut total = 0.0f32;
        let mut contributed = 0usize;

        for ta in &tokens_a {
            for tb in &tokens_b {
                let score = if ta == tb {
                    Some(1.0)
                } else {
                    self.vectors.similarity(ta, tb)
                };

                if let Some(score) = score {
                    total += score;
                    contributed += 1;
                }
            }
        }

        if contributed == 0 {
            return 0.0;
        }

        (total / contributed as f32).clamp(0.0, 1.0)
    }
}
