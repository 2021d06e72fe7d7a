use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{add_ingredient, fixture, FixedOracle};
use crate::audit::MemoryAudit;
use crate::graph::{
    Edge, EdgeKind, EdgeProps, GraphError, GraphStore, Label, MemoryGraph, Node, NodeId,
    Properties, RecipeNode,
};
use crate::normalize::Normalizer;
use crate::resolver::{DedupResolver, Thresholds};
use crate::ingest::scrape::{RecipeDetails, RecipeSource};
use crate::ingest::source::{parse_search_response, RecipeFeed, RecipeRecord};
use crate::ingest::{IngestError, IngestOutcome, Ingestor, SourceError};

/// Serves details for known urls; every other url fails.
#[derive(Default)]
struct FakeSource {
    pages: HashMap<String, RecipeDetails>,
    requests: Mutex<Vec<String>>,
}

impl FakeSource {
    fn with(mut self, url: &str, steps: &[&str], total_time: Option<u32>) -> Self {
        self.pages.insert(
            url.to_string(),
            RecipeDetails {
                instructions: steps.iter().map(|s| s.to_string()).collect(),
                total_time,
            },
        );
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl RecipeSource for FakeSource {
    fn fetch_details(&self, url: &str) -> Result<RecipeDetails, SourceError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or(SourceError::NoRecipe)
    }
}

/// Returns the same page of recipes for every search; can be made to fail.
struct FakeFeed {
    records: Vec<RecipeRecord>,
    failing: Vec<String>,
}

impl RecipeFeed for FakeFeed {
    fn by_cuisine(&self, cuisine: &str) -> Result<Vec<RecipeRecord>, SourceError> {
        if self.failing.iter().any(|c| c == cuisine) {
            return Err(SourceError::Status(500));
        }
        Ok(self.records.clone())
    }

    fn by_ingredient(&self, _ingredient: &str) -> Result<Vec<RecipeRecord>, SourceError> {
        Ok(self.records.clone())
    }
}

fn records() -> Vec<RecipeRecord> {
    parse_search_response(
        r#"{"hits": [
            {"recipe": {
                "label": "Tomato Soup",
                "url": "https://example.com/soup",
                "cuisineType": ["british"],
                "ingredients": [
                    {"food": "Tomatoes", "foodCategory": "vegetables", "quantity": 4, "measure": "<unit>"},
                    {"food": "onion", "foodCategory": "vegetables", "quantity": 1, "measure": null},
                    {"food": "tomato", "foodCategory": "vegetables", "quantity": 2.5, "measure": "cup"}
                ]
            }},
            {"recipe": {
                "label": "Broken Page",
                "url": "https://example.com/broken",
                "ingredients": [
                    {"food": "basil", "foodCategory": "herbs", "quantity": 1, "measure": "bunch"}
                ]
            }},
            {"recipe": {
                "label": "Bruschetta",
                "url": "https://example.com/bruschetta",
                "ingredients": [
                    {"food": "tomatoes", "foodCategory": "vegetables", "quantity": 3, "measure": null},
                    {"food": " ", "foodCategory": "", "quantity": 1, "measure": null}
                ]
            }}
        ]}"#,
    )
    .unwrap()
}

fn source() -> FakeSource {
    FakeSource::default()
        .with("https://example.com/soup", &["Chop.", "Simmer."], Some(40))
        .with("https://example.com/bruschetta", &["Toast.", "Top."], None)
}

#[test]
fn test_ingest_creates_recipe_and_edges() {
    let f = fixture(FixedOracle::new());
    let ingestor = Ingestor::new(f.store.clone(), f.resolver.clone(), Arc::new(source()));
    let soup = &records()[0];

    let outcome = ingestor.ingest(soup).unwrap();
    let IngestOutcome::Created {
        recipe,
        attached,
        new_ingredients,
    } = outcome
    else {
        panic!("expected recipe to be created, got {outcome:?}");
    };
    assert_eq!(attached, 3);
    assert_eq!(new_ingredients, 2);

    let recipe_node = f
        .store
        .find_nodes_by_exact_property(Label::Recipe, "url", "https://example.com/soup")
        .unwrap();
    let recipe_node = RecipeNode::from_node(&recipe_node[0]).unwrap();
    assert_eq!(recipe_node.id, recipe);
    assert_eq!(recipe_node.total_time, Some(40));
    assert_eq!(recipe_node.instructions, vec!["Chop.", "Simmer."]);
    assert_eq!(recipe_node.cuisine_type, vec!["british"]);

    // "Tomatoes" and "tomato" share one node, each line keeps its own edge pair
    let tomato = f
        .store
        .find_nodes_by_exact_property(Label::Ingredient, "name", "tomato")
        .unwrap();
    assert_eq!(tomato.len(), 1);
    let tomato_id = tomato[0].id;

    let contains = f.store.edges_between(recipe, tomato_id).unwrap();
    let part_of = f.store.edges_between(tomato_id, recipe).unwrap();
    assert_eq!(contains.len(), 2);
    assert_eq!(part_of.len(), 2);
    assert!(contains.iter().all(|e| e.kind == EdgeKind::Contains));
    assert!(part_of.iter().all(|e| e.kind == EdgeKind::PartOf));
    assert_eq!(
        EdgeProps::from_properties(&contains[0].properties),
        Some(EdgeProps::new("4", "<unit>"))
    );
    assert_eq!(
        EdgeProps::from_properties(&part_of[1].properties),
        Some(EdgeProps::new("2.5", "cup"))
    );

    assert_eq!(f.store.count_edges().unwrap(), 6);
}

#[test]
fn test_unusable_recipe_is_skipped() {
    let f = fixture(FixedOracle::new());
    let ingestor = Ingestor::new(f.store.clone(), f.resolver.clone(), Arc::new(source()));

    let outcome = ingestor.ingest(&records()[1]).unwrap();
    assert!(matches!(outcome, IngestOutcome::Skipped { .. }));
    assert_eq!(f.store.count_nodes(None).unwrap(), 0);
    assert_eq!(f.store.count_edges().unwrap(), 0);
}

#[test]
fn test_existing_recipe_is_not_ingested_twice() {
    let f = fixture(FixedOracle::new());
    let source = Arc::new(source());
    let ingestor = Ingestor::new(f.store.clone(), f.resolver.clone(), source.clone());
    let soup = &records()[0];

    ingestor.ingest(soup).unwrap();
    let edges = f.store.count_edges().unwrap();

    let outcome = ingestor.ingest(soup).unwrap();
    assert!(matches!(outcome, IngestOutcome::AlreadyPresent { .. }));
    assert_eq!(f.store.count_edges().unwrap(), edges);
    assert_eq!(source.request_count(), 1);

    // same name under another url is also treated as present
    let mut moved = soup.clone();
    moved.url = "https://mirror.example.com/soup".to_string();
    assert!(matches!(
        ingestor.ingest(&moved).unwrap(),
        IngestOutcome::AlreadyPresent { .. }
    ));
}

#[test]
fn test_empty_ingredient_line_is_skipped() {
    let f = fixture(FixedOracle::new());
    let ingestor = Ingestor::new(f.store.clone(), f.resolver.clone(), Arc::new(source()));

    let outcome = ingestor.ingest(&records()[2]).unwrap();
    assert!(matches!(
        outcome,
        IngestOutcome::Created { attached: 1, .. }
    ));
}

#[test]
fn test_ingest_reuses_seeded_ingredient() {
    let f = fixture(FixedOracle::new());
    let tomato = add_ingredient(f.store.as_ref(), "tomato");
    let ingestor = Ingestor::new(f.store.clone(), f.resolver.clone(), Arc::new(source()));

    let outcome = ingestor.ingest(&records()[2]).unwrap();
    let IngestOutcome::Created {
        recipe,
        new_ingredients,
        ..
    } = outcome
    else {
        panic!("expected recipe to be created");
    };
    assert_eq!(new_ingredients, 0);
    assert_eq!(f.store.edges_between(recipe, tomato.id).unwrap().len(), 1);
}

#[test]
fn test_ingest_cuisine_stats() {
    let f = fixture(FixedOracle::new());
    let ingestor = Ingestor::new(f.store.clone(), f.resolver.clone(), Arc::new(source()));
    let feed = FakeFeed {
        records: records(),
        failing: vec![],
    };

    let stats = ingestor
        .ingest_cuisine(&feed, "British", &AtomicBool::new(false))
        .unwrap();
    assert_eq!(stats.recipes_created, 2);
    assert_eq!(stats.recipes_skipped, 1);
    assert_eq!(stats.recipes_present, 0);
    assert_eq!(stats.ingredients_attached, 4);
    assert_eq!(stats.ingredients_created, 2);
}

#[test]
fn test_stop_flag_halts_ingestion() {
    let f = fixture(FixedOracle::new());
    let ingestor = Ingestor::new(f.store.clone(), f.resolver.clone(), Arc::new(source()));
    let feed = FakeFeed {
        records: records(),
        failing: vec![],
    };

    let stats = ingestor
        .ingest_ingredient(&feed, "tomato", &AtomicBool::new(true))
        .unwrap();
    assert_eq!(stats.recipes_created, 0);
    assert_eq!(f.store.count_nodes(None).unwrap(), 0);
}

#[test]
fn test_build_stops_when_round_adds_nothing() {
    let f = fixture(FixedOracle::new());
    let ingestor = Ingestor::new(f.store.clone(), f.resolver.clone(), Arc::new(source()));
    let feed = FakeFeed {
        records: records(),
        failing: vec!["Nordic".to_string()],
    };
    let cuisines = vec!["British".to_string(), "Nordic".to_string()];

    let report = ingestor
        .build(&feed, &cuisines, 1000, &AtomicBool::new(false))
        .unwrap();

    // round 1 adds 2 recipes and 2 ingredients, round 2 adds nothing
    assert_eq!(report.rounds, 2);
    assert_eq!(report.node_count, 4);
    assert!(!report.stopped);
    assert_eq!(report.stats.recipes_created, 2);
    assert_eq!(report.stats.recipes_present, 2);
}

#[test]
fn test_build_stops_at_node_target() {
    let f = fixture(FixedOracle::new());
    let ingestor = Ingestor::new(f.store.clone(), f.resolver.clone(), Arc::new(source()));
    let feed = FakeFeed {
        records: records(),
        failing: vec![],
    };

    let report = ingestor
        .build(&feed, &["British".to_string()], 3, &AtomicBool::new(false))
        .unwrap();
    assert_eq!(report.rounds, 1);
    assert_eq!(report.node_count, 4);

    let report = ingestor
        .build(&feed, &["British".to_string()], 3, &AtomicBool::new(false))
        .unwrap();
    assert_eq!(report.rounds, 0);
}

/// Memory store whose first `failures` node-with-edges writes fail.
struct FailingStore {
    inner: MemoryGraph,
    failures: AtomicUsize,
}

impl FailingStore {
    fn new(failures: usize) -> Self {
        Self {
            inner: MemoryGraph::new(),
            failures: AtomicUsize::new(failures),
        }
    }
}

impl GraphStore for FailingStore {
    fn create_node(&self, label: Label, properties: Properties) -> Result<NodeId, GraphError> {
        self.inner.create_node(label, properties)
    }

    fn find_nodes_by_exact_property(
        &self,
        label: Label,
        key: &str,
        value: &str,
    ) -> Result<Vec<Node>, GraphError> {
        self.inner.find_nodes_by_exact_property(label, key, value)
    }

    fn find_nodes_by_property_contains_any(
        &self,
        label: Label,
        key: &str,
        words: &[String],
    ) -> Result<Vec<Node>, GraphError> {
        self.inner
            .find_nodes_by_property_contains_any(label, key, words)
    }

    fn create_edge(
        &self,
        from: NodeId,
        kind: EdgeKind,
        to: NodeId,
        properties: Properties,
    ) -> Result<(), GraphError> {
        self.inner.create_edge(from, kind, to, properties)
    }

    fn create_edge_pair(&self, forward: Edge, inverse: Edge) -> Result<(), GraphError> {
        self.inner.create_edge_pair(forward, inverse)
    }

    fn create_node_with_edges(
        &self,
        label: Label,
        properties: Properties,
        edges: Vec<Edge>,
    ) -> Result<NodeId, GraphError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(GraphError::IO(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.create_node_with_edges(label, properties, edges)
    }

    fn count_nodes(&self, label: Option<Label>) -> Result<usize, GraphError> {
        self.inner.count_nodes(label)
    }

    fn count_edges(&self) -> Result<usize, GraphError> {
        self.inner.count_edges()
    }

    fn edges_between(&self, from: NodeId, to: NodeId) -> Result<Vec<Edge>, GraphError> {
        self.inner.edges_between(from, to)
    }
}

#[test]
fn test_failed_recipe_write_leaves_no_partial_recipe() {
    let store = Arc::new(FailingStore::new(1));
    let resolver = Arc::new(DedupResolver::new(
        store.clone(),
        Arc::new(FixedOracle::new()),
        Arc::new(MemoryAudit::new()),
        Normalizer::default(),
        Thresholds::default(),
    ));
    let ingestor = Ingestor::new(store.clone(), resolver, Arc::new(source()));
    let soup = &records()[0];

    assert!(matches!(
        ingestor.ingest(soup),
        Err(IngestError::Graph(GraphError::IO(_)))
    ));
    assert_eq!(store.count_nodes(Some(Label::Recipe)).unwrap(), 0);
    assert_eq!(store.count_edges().unwrap(), 0);

    // the retry stores the whole recipe, reusing the ingredients created before
    let outcome = ingestor.ingest(soup).unwrap();
    assert!(matches!(
        outcome,
        IngestOutcome::Created {
            attached: 3,
            new_ingredients: 0,
            ..
        }
    ));
    assert_eq!(store.count_nodes(Some(Label::Recipe)).unwrap(), 1);
    assert_eq!(store.count_nodes(Some(Label::Ingredient)).unwrap(), 2);
    assert_eq!(store.count_edges().unwrap(), 6);
}
