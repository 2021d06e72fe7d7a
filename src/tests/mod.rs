mod graph_csv;
mod ingest;

use std::collections::HashMap;
use std::sync::Arc;

use crate::audit::MemoryAudit;
use crate::graph::{GraphStore, IngredientNode, Label, MemoryGraph};
use crate::normalize::Normalizer;
use crate::resolver::{DedupResolver, Thresholds};
use crate::similarity::SimilarityOracle;

/// Returns preset scores for name pairs (in either order), 0.0 otherwise.
#[derive(Default)]
pub struct FixedOracle {
    scores: HashMap<(String, String), f32>,
}

impl FixedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, a: &str, b: &str, score: f32) -> Self {
        self.scores.insert((a.to_string(), b.to_string()), score);
        self
    }
}

impl SimilarityOracle for FixedOracle {
    fn similarity(&self, a: &[&str], b: &[&str]) -> f32 {
        let a = a.join(" ");
        let b = b.join(" ");
        self.scores
            .get(&(a.clone(), b.clone()))
            .or_else(|| self.scores.get(&(b, a)))
            .copied()
            .unwrap_or(0.0)
    }
}

pub struct Fixture {
    pub store: Arc<MemoryGraph>,
    pub audit: Arc<MemoryAudit>,
    pub resolver: Arc<DedupResolver>,
}

pub fn fixture(oracle: impl SimilarityOracle + 'static) -> Fixture {
    let store = Arc::new(MemoryGraph::new());
    let audit = Arc::new(MemoryAudit::new());
    let resolver = Arc::new(DedupResolver::new(
        store.clone(),
        Arc::new(oracle),
        audit.clone(),
        Normalizer::default(),
        Thresholds::default(),
    ));
    Fixture {
        store,
        audit,
        resolver,
    }
}

pub fn add_ingredient(store: &dyn GraphStore, name: &str) -> IngredientNode {
    let mut node = IngredientNode {
        id: 0,
        name: name.to_string(),
        category: None,
        image: None,
    };
    node.id = store
        .create_node(Label::Ingredient, node.to_properties())
        .unwrap();
    node
}
