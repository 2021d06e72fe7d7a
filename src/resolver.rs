//! Ingredient identity resolution.
//!
//! A mention is normalized, matched against existing ingredient nodes and
//! either reuses one of them or creates a new node:
//!
//! - exact name match: reuse, no scoring
//! - best fuzzy score above `reuse`: reuse; below `high_confidence` the merge is
//!   recorded as "dodgy"
//! - best fuzzy score in `(review_floor, reuse]`: create, recorded as "avoided"
//! - otherwise: create

use std::sync::Arc;

use serde::Serialize;

use crate::audit::{AuditSink, DedupKind, DedupRecord};
use crate::candidates::{CandidateRetriever, Candidates};
use crate::graph::{GraphError, GraphStore, IngredientNode, Label};
use crate::normalize::{NormalizedName, Normalizer};
use crate::similarity::SimilarityOracle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub reuse: f32,
    pub review_floor: f32,
    pub high_confidence: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            reuse: 0.87,
            review_floor: 0.80,
            high_confidence: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngredientMention {
    pub food_name: String,
    pub category: String,
    pub quantity: String,
    pub measure: String,
}

impl IngredientMention {
    pub fn new(food_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            food_name: food_name.into(),
            category: category.into(),
            quantity: String::new(),
            measure: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub node: IngredientNode,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Reuse {
        candidate: ScoredCandidate,
        /// Merged with less than high confidence.
        borderline: bool,
    },
    CreateNew,
    CreateNewWithReviewFlag {
        nearest: ScoredCandidate,
    },
}

/// Threshold policy over the best-scoring fuzzy candidate.
pub fn decide(best: Option<ScoredCandidate>, thresholds: &Thresholds) -> Decision {
    let Some(best) = best else {
        return Decision::CreateNew;
    };

    if best.score > thresholds.reuse {
        let borderline = best.score < thresholds.high_confidence;
        Decision::Reuse {
            candidate: best,
            borderline,
        }
    } else if best.score > thresholds.review_floor {
        Decision::CreateNewWithReviewFlag { nearest: best }
    } else {
        Decision::CreateNew
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    ExactMatch,
    Merged { score: f32 },
    Created,
    CreatedAfterNearMiss { score: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub node: IngredientNode,
    #[serde(flatten)]
    pub outcome: ResolutionOutcome,
}

impl Resolution {
    pub fn created(&self) -> bool {
        matches!(
            self.outcome,
            ResolutionOutcome::Created | ResolutionOutcome::CreatedAfterNearMiss { .. }
        )
    }
}

/// What `resolve` would do, without writing anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub normalized: NormalizedName,
    pub exact: Vec<IngredientNode>,
    pub candidates: usize,
    pub decision: Option<Decision>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("ingredient name '{0}' is empty after normalization")]
    EmptyName(String),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

pub struct DedupResolver {
    store: Arc<dyn GraphStore>,
    retriever: CandidateRetriever,
    oracle: Arc<dyn SimilarityOracle>,
    audit: Arc<dyn AuditSink>,
    normalizer: Normalizer,
    thresholds: Thresholds,
}

enum Evaluation {
    /// All exact matches, in store order.
    Exact(Vec<IngredientNode>),
    Scored {
        candidates: usize,
        decision: Decision,
    },
}

impl DedupResolver {
    pub fn new(
        store: Arc<dyn GraphStore>,
        oracle: Arc<dyn SimilarityOracle>,
        audit: Arc<dyn AuditSink>,
        normalizer: Normalizer,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            retriever: CandidateRetriever::new(store.clone()),
            store,
            oracle,
            audit,
            normalizer,
            thresholds,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Resolve a mention to an ingredient node, creating one if nothing matches.
    pub fn resolve(&self, mention: &IngredientMention) -> Result<Resolution, ResolveError> {
        let normalized = self.normalize_checked(&mention.food_name)?;

        let decision = match self.evaluate(&normalized)? {
            Evaluation::Exact(mut nodes) => {
                return Ok(Resolution {
                    node: nodes.swap_remove(0),
                    outcome: ResolutionOutcome::ExactMatch,
                })
            }
            Evaluation::Scored { decision, .. } => decision,
        };

        match decision {
            Decision::Reuse {
                candidate,
                borderline,
            } => {
                if borderline {
                    log::info!(
                        "borderline merge '{}' -> '{}' ({:.3})",
                        mention.food_name,
                        candidate.node.name,
                        candidate.score
                    );
                    self.audit_record(DedupKind::Dodgy, &mention.food_name, &candidate);
                }
                Ok(Resolution {
                    node: candidate.node,
                    outcome: ResolutionOutcome::Merged {
                        score: candidate.score,
                    },
                })
            }
            Decision::CreateNewWithReviewFlag { nearest } => {
                log::debug!(
                    "avoided merge '{}' -> '{}' ({:.3})",
                    mention.food_name,
                    nearest.node.name,
                    nearest.score
                );
                self.audit_record(DedupKind::Avoided, &mention.food_name, &nearest);
                let node = self.create(normalized, &mention.category)?;
                Ok(Resolution {
                    node,
                    outcome: ResolutionOutcome::CreatedAfterNearMiss {
                        score: nearest.score,
                    },
                })
            }
            Decision::CreateNew => {
                let node = self.create(normalized, &mention.category)?;
                Ok(Resolution {
                    node,
                    outcome: ResolutionOutcome::Created,
                })
            }
        }
    }

    /// Dry run of `resolve`: no node is created and nothing is audited.
    pub fn preview(&self, food_name: &str) -> Result<Preview, ResolveError> {
        let normalized = self.normalize_checked(food_name)?;

        let preview = match self.evaluate(&normalized)? {
            Evaluation::Exact(exact) => Preview {
                normalized,
                exact,
                candidates: 0,
                decision: None,
            },
            Evaluation::Scored {
                candidates,
                decision,
            } => Preview {
                normalized,
                exact: vec![],
                candidates,
                decision: Some(decision),
            },
        };

        Ok(preview)
    }

    /// Create a node for `name` without looking for duplicates.
    pub fn force_create(
        &self,
        name: &str,
        category: &str,
    ) -> Result<IngredientNode, ResolveError> {
        let normalized = self.normalize_checked(name)?;
        self.create(normalized, category)
    }

    fn normalize_checked(&self, food_name: &str) -> Result<NormalizedName, ResolveError> {
        let normalized = self.normalizer.normalize(food_name);
        if normalized.is_empty() {
            return Err(ResolveError::EmptyName(food_name.to_string()));
        }
        Ok(normalized)
    }

    fn evaluate(&self, normalized: &NormalizedName) -> Result<Evaluation, ResolveError> {
        let fuzzy = match self.retriever.find_candidates(normalized)? {
            Candidates::Exact(nodes) => {
                if nodes.len() > 1 {
                    let ids: Vec<_> = nodes.iter().map(|n| n.id).collect();
                    log::warn!(
                        "ambiguous ingredient '{}': {} exact matches {:?}, using {}",
                        normalized,
                        nodes.len(),
                        ids,
                        ids[0]
                    );
                }
                return Ok(Evaluation::Exact(nodes));
            }
            Candidates::Fuzzy(nodes) => nodes,
        };

        let candidates = fuzzy.len();
        let best = self.best_candidate(normalized, fuzzy);
        let decision = decide(best, &self.thresholds);

        Ok(Evaluation::Scored {
            candidates,
            decision,
        })
    }

    /// Highest-scoring candidate; the first one wins ties.
    fn best_candidate(
        &self,
        normalized: &NormalizedName,
        candidates: Vec<IngredientNode>,
    ) -> Option<ScoredCandidate> {
        let tokens = normalized.tokens();
        let mut best: Option<ScoredCandidate> = None;

        for node in candidates {
            let candidate_name = self.normalizer.normalize(&node.name);
            let score = self.oracle.similarity(&tokens, &candidate_name.tokens());
            log::trace!("'{}' vs '{}': {:.3}", normalized, candidate_name, score);

            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(ScoredCandidate { node, score });
            }
        }

        best
    }

    fn create(
        &self,
        normalized: NormalizedName,
        category: &str,
    ) -> Result<IngredientNode, ResolveError> {
        let mut node = IngredientNode {
            id: 0,
            name: normalized.into(),
            category: if category.is_empty() {
                None
            } else {
                Some(category.to_string())
            },
            image: None,
        };

        node.id = self
            .store
            .create_node(Label::Ingredient, node.to_properties())?;
        log::debug!("created ingredient {} '{}'", node.id, node.name);

        Ok(node)
    }

    fn audit_record(&self, kind: DedupKind, new_name: &str, matched: &ScoredCandidate) {
        let record = DedupRecord {
            kind,
            new_name: new_name.to_string(),
            matched_name: matched.node.name.clone(),
            score: matched.score,
        };
        if let Err(err) = self.audit.record(&record) {
            log::error!("failed to write {kind} dedup record '{record}': {err}");
        }
    }
}
