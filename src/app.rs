use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use homedir::my_home;

use crate::audit::{AuditSink, FileAudit, MemoryAudit};
use crate::candidates::CandidateRetriever;
use crate::config::Config;
use crate::graph::{CsvGraph, GraphStore, Label};
use crate::ingest::scrape::HttpRecipeSource;
use crate::ingest::source::EdamamFeed;
use crate::ingest::Ingestor;
use crate::normalize::Normalizer;
use crate::resolver::DedupResolver;
use crate::similarity::{EmbeddingOracle, PhraseTable, SimilarityOracle, TokenVectors, VectorStorage};

pub struct AppPaths {
    pub base_path: PathBuf,
    pub graph_path: PathBuf,
}

/// Wired application components sharing one graph store.
pub struct App {
    pub config: Config,
    pub store: Arc<dyn GraphStore>,
    pub retriever: CandidateRetriever,
    pub resolver: Arc<DedupResolver>,
}

#[derive(Debug, serde::Serialize)]
pub struct GraphStats {
    pub ingredients: usize,
    pub recipes: usize,
    pub edges: usize,
}

impl App {
    pub fn stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            ingredients: self.store.count_nodes(Some(Label::Ingredient))?,
            recipes: self.store.count_nodes(Some(Label::Recipe))?,
            edges: self.store.count_edges()?,
        })
    }

    pub fn create_ingestor(&self) -> Result<Ingestor> {
        let timeout = Duration::from_secs(self.config.source.request_timeout_secs);
        let source = HttpRecipeSource::new(timeout).context("Failed to create recipe source")?;
        Ok(Ingestor::new(
            self.store.clone(),
            self.resolver.clone(),
            Arc::new(source),
        ))
    }

    pub fn create_feed(&self) -> Result<EdamamFeed> {
        EdamamFeed::new(&self.config.source).context("Failed to create recipe feed")
    }
}

/// Application factory for creating and configuring application components
pub struct AppFactory;

impl AppFactory {
    /// Get application paths, creating the base directory if needed
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;
        let graph_path = base_path.join("graph");

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths {
            base_path,
            graph_path,
        })
    }

    /// Create the application. With `dry_run` audit records stay in memory.
    pub fn create_app(paths: &AppPaths, dry_run: bool) -> Result<App> {
        let config = Config::load_with(&paths.base_path).context("Failed to load config")?;

        let store: Arc<dyn GraphStore> = Arc::new(
            CsvGraph::load(&paths.graph_path).context("Failed to load graph")?,
        );

        let audit: Arc<dyn AuditSink> = if dry_run {
            Arc::new(MemoryAudit::new())
        } else {
            Arc::new(FileAudit::new(&paths.base_path))
        };

        let oracle = Self::create_oracle(&config)?;

        let resolver = Arc::new(DedupResolver::new(
            store.clone(),
            oracle,
            audit,
            Normalizer::default(),
            config.dedup.thresholds(),
        ));

        Ok(App {
            retriever: CandidateRetriever::new(store.clone()),
            config,
            store,
            resolver,
        })
    }

    /// Load the vector and phrase tables once for the process lifetime.
    pub fn create_oracle(config: &Config) -> Result<Arc<dyn SimilarityOracle>> {
        let vectors_path = config.resolve_path(&config.similarity.vectors);
        let storage = VectorStorage::new(vectors_path.clone());

        let vectors = if storage.exists() {
            storage
                .load(None)
                .with_context(|| format!("Failed to load vectors from {}", vectors_path.display()))?
        } else {
            log::warn!(
                "no vector table at {}, similarity falls back to exact token overlap",
                vectors_path.display()
            );
            TokenVectors::empty()
        };

        let phrases = Self::load_phrases(&config.resolve_path(&config.similarity.phrases))?;

        let oracle = EmbeddingOracle::new(Arc::new(vectors), phrases.map(Arc::new));
        log::debug!("similarity vocabulary: {} tokens", oracle.vocabulary_size());

        Ok(Arc::new(oracle))
    }

    fn load_phrases(path: &Path) -> Result<Option<PhraseTable>> {
        if !path.exists() {
            log::debug!("no phrase table at {}", path.display());
            return Ok(None);
        }

        let phrases = PhraseTable::load(path)
            .with_context(|| format!("Failed to load phrases from {}", path.display()))?;
        log::debug!("loaded {} phrases", phrases.len());
        Ok(Some(phrases))
    }

    /// Get the base path for the application
    fn get_base_path() -> Result<PathBuf> {
        if let Ok(base_path) = std::env::var("PANTRY_BASE_PATH") {
            return Ok(PathBuf::from(base_path));
        }

        let home = my_home()
            .map_err(|err| anyhow::anyhow!("Could not determine home directory: {err:?}"))?
            .context("Home directory path is empty")?;
        Ok(home.join(".local/share/pantry"))
    }
}
