//! Recipe ingestion: search a feed, fetch each recipe's details, resolve its
//! ingredients and link them to the recipe node.

pub mod scrape;
pub mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::graph::{GraphError, GraphStore, Label, NodeId, RecipeNode};
use crate::relationships::{IngredientUse, RelationshipBuilder};
use crate::resolver::{DedupResolver, ResolveError};
use scrape::RecipeSource;
use source::{RecipeFeed, RecipeRecord};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code {0}")]
    Status(u16),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid json: {0}")]
    InvalidJson(String),

    #[error("no Recipe found in JSON-LD")]
    NoRecipe,

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("recipe search credentials are not configured (EDAMAM_APP_ID, EDAMAM_APP_KEY)")]
    MissingCredentials,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Created {
        recipe: NodeId,
        attached: usize,
        new_ingredients: usize,
    },
    AlreadyPresent {
        recipe: NodeId,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStats {
    pub recipes_created: usize,
    pub recipes_present: usize,
    pub recipes_skipped: usize,
    pub ingredients_attached: usize,
    pub ingredients_created: usize,
}

impl IngestStats {
    fn add(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Created {
                attached,
                new_ingredients,
                ..
            } => {
                self.recipes_created += 1;
                self.ingredients_attached += attached;
                self.ingredients_created += new_ingredients;
            }
            IngestOutcome::AlreadyPresent { .. } => self.recipes_present += 1,
            IngestOutcome::Skipped { .. } => self.recipes_skipped += 1,
        }
    }

    fn merge(&mut self, other: &IngestStats) {
        self.recipes_created += other.recipes_created;
        self.recipes_present += other.recipes_present;
        self.recipes_skipped += other.recipes_skipped;
        self.ingredients_attached += other.ingredients_attached;
        self.ingredients_created += other.ingredients_created;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub rounds: usize,
    pub node_count: usize,
    pub stopped: bool,
    pub stats: IngestStats,
}

pub struct Ingestor {
    store: Arc<dyn GraphStore>,
    resolver: Arc<DedupResolver>,
    relationships: RelationshipBuilder,
    source: Arc<dyn RecipeSource>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn GraphStore>,
        resolver: Arc<DedupResolver>,
        source: Arc<dyn RecipeSource>,
    ) -> Self {
        Self {
            relationships: RelationshipBuilder::new(store.clone()),
            store,
            resolver,
            source,
        }
    }

    /// Ingest one recipe. Recipes whose details cannot be fetched are skipped
    /// without writing anything.
    pub fn ingest(&self, record: &RecipeRecord) -> Result<IngestOutcome, IngestError> {
        let span = tracing::info_span!("recipe", name = %record.label);
        let _enter = span.enter();

        if let Some(existing) = find_recipe(self.store.as_ref(), &record.url, &record.label)? {
            log::debug!("recipe already present as {}", existing.id);
            return Ok(IngestOutcome::AlreadyPresent {
                recipe: existing.id,
            });
        }

        let details = match self.source.fetch_details(&record.url) {
            Ok(details) => details,
            Err(err) => {
                log::warn!("skipping recipe '{}': {err}", record.label);
                return Ok(IngestOutcome::Skipped {
                    reason: err.to_string(),
                });
            }
        };

        let recipe = RecipeNode {
            id: 0,
            name: record.label.clone(),
            url: record.url.clone(),
            total_time: details.total_time,
            cuisine_type: record.cuisine_type.clone(),
            instructions: details.instructions,
            image: record.image.clone(),
        };

        // resolve every line first so the recipe is only stored complete
        let mut lines = Vec::with_capacity(record.ingredients.len());
        let mut new_ingredients = 0;

        for line in &record.ingredients {
            let mention = line.mention();
            let resolution = match self.resolver.resolve(&mention) {
                Ok(resolution) => resolution,
                Err(ResolveError::EmptyName(name)) => {
                    log::warn!("skipping ingredient line with empty name '{name}'");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if resolution.created() {
                new_ingredients += 1;
            }

            lines.push(IngredientUse {
                ingredient: resolution.node,
                quantity: mention.quantity,
                measure: mention.measure,
            });
        }

        let recipe_id = self.relationships.create_recipe(&recipe, &lines)?;
        let attached = lines.len();

        log::info!(
            "created recipe {} with {} ingredients ({} new)",
            recipe_id,
            attached,
            new_ingredients
        );

        Ok(IngestOutcome::Created {
            recipe: recipe_id,
            attached,
            new_ingredients,
        })
    }

    /// Ingest records until done or `stop` is raised.
    pub fn ingest_all(
        &self,
        records: &[RecipeRecord],
        stop: &AtomicBool,
    ) -> Result<IngestStats, IngestError> {
        let mut stats = IngestStats::default();
        for record in records {
            if stop.load(Ordering::SeqCst) {
                log::info!("stop requested");
                break;
            }
            let outcome = self.ingest(record)?;
            stats.add(&outcome);
        }
        Ok(stats)
    }

    pub fn ingest_cuisine(
        &self,
        feed: &dyn RecipeFeed,
        cuisine: &str,
        stop: &AtomicBool,
    ) -> Result<IngestStats, IngestError> {
        let records = feed.by_cuisine(cuisine)?;
        log::info!("found {} recipes for {cuisine}", records.len());
        self.ingest_all(&records, stop)
    }

    pub fn ingest_ingredient(
        &self,
        feed: &dyn RecipeFeed,
        ingredient: &str,
        stop: &AtomicBool,
    ) -> Result<IngestStats, IngestError> {
        let records = feed.by_ingredient(ingredient)?;
        log::info!("found {} recipes for {ingredient}", records.len());
        self.ingest_all(&records, stop)
    }

    /// Cycle through `cuisines` until the graph holds more than `node_target`
    /// nodes, a round adds no nodes, or `stop` is raised. A failing search
    /// only skips that cuisine.
    pub fn build(
        &self,
        feed: &dyn RecipeFeed,
        cuisines: &[String],
        node_target: usize,
        stop: &AtomicBool,
    ) -> Result<BuildReport, IngestError> {
        let mut report = BuildReport {
            node_count: self.store.count_nodes(None)?,
            ..Default::default()
        };

        if cuisines.is_empty() {
            log::warn!("no cuisines configured");
            return Ok(report);
        }

        while report.node_count <= node_target {
            if stop.load(Ordering::SeqCst) {
                report.stopped = true;
                break;
            }

            let before = report.node_count;
            let start = Instant::now();
            report.rounds += 1;

            for cuisine in cuisines {
                if stop.load(Ordering::SeqCst) {
                    break;
                }

                let lap = Instant::now();
                match self.ingest_cuisine(feed, cuisine, stop) {
                    Ok(stats) => report.stats.merge(&stats),
                    Err(IngestError::Source(err)) => {
                        log::warn!("search for {cuisine} failed: {err}");
                    }
                    Err(err) => return Err(err),
                }
                log::info!(
                    "time to build {cuisine}: {}",
                    pretty_duration(lap.elapsed())
                );
            }

            report.node_count = self.store.count_nodes(None)?;
            log::info!("current node count: {}", report.node_count);
            log::info!(
                "time to build round {}: {}",
                report.rounds,
                pretty_duration(start.elapsed())
            );

            if report.node_count == before && !stop.load(Ordering::SeqCst) {
                log::warn!("round {} added no nodes, stopping", report.rounds);
                break;
            }
        }

        report.stopped |= stop.load(Ordering::SeqCst);
        Ok(report)
    }
}

/// Existing recipe with the same url, or failing that the same name.
pub fn find_recipe(
    store: &dyn GraphStore,
    url: &str,
    name: &str,
) -> Result<Option<RecipeNode>, GraphError> {
    let mut found = store.find_nodes_by_exact_property(Label::Recipe, RecipeNode::URL_KEY, url)?;
    if found.is_empty() {
        found = store.find_nodes_by_exact_property(Label::Recipe, RecipeNode::NAME_KEY, name)?;
    }

    found.first().map(RecipeNode::from_node).transpose()
}

pub fn pretty_duration(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    if seconds < 60.0 {
        format!("{seconds:.1} seconds")
    } else if seconds < 3600.0 {
        format!("{:.1} minutes", seconds / 60.0)
    } else {
        format!("{:.1} hours", seconds / 3600.0)
    }
}
