//! Similarity scoring between normalized ingredient names.
//!
//! # Architecture
//!
//! - `vectors`: Frozen token -> vector table with cosine similarity
//! - `phrases`: Bigram phrase merging applied before scoring
//! - `oracle`: Pairwise skip-not-penalize scoring over both
//! - `storage`: Binary file I/O for vectors.bin persistence
//! - `embeddings`: Builds a vector table with fastembed (feature `embed`)

#[cfg(feature = "embed")]
pub mod embeddings;
mod oracle;
mod phrases;
mod storage;
pub mod vectors;

pub use oracle::{EmbeddingOracle, SimilarityOracle};
pub use phrases::PhraseTable;
pub use storage::{model_id_hash, VectorStorage};
pub use vectors::TokenVectors;

/// Model id recorded for tables imported from word2vec text exports.
pub const WORD2VEC_MODEL: &str = "word2vec";
