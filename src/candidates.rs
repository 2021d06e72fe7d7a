//! Candidate retrieval for ingredient resolution.
//!
//! Exact case-folded name match first; only if that finds nothing, every
//! ingredient whose name contains any word of the normalized name.

use std::sync::Arc;

use crate::graph::{GraphError, GraphStore, IngredientNode, Label};
use crate::normalize::NormalizedName;

#[derive(Debug, Clone, PartialEq)]
pub enum Candidates {
    /// Stored names equal to the normalized name. Never empty.
    Exact(Vec<IngredientNode>),
    /// Stored names sharing at least one word. May be empty.
    Fuzzy(Vec<IngredientNode>),
}

#[derive(Clone)]
pub struct CandidateRetriever {
    store: Arc<dyn GraphStore>,
}

impl CandidateRetriever {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub fn find_candidates(&self, normalized: &NormalizedName) -> Result<Candidates, GraphError> {
        let exact = self.find_exact(normalized)?;
        if !exact.is_empty() {
            return Ok(Candidates::Exact(exact));
        }

        let words = normalized.words();
        let nodes = self.store.find_nodes_by_property_contains_any(
            Label::Ingredient,
            IngredientNode::NAME_KEY,
            &words,
        )?;

        let fuzzy = nodes
            .iter()
            .map(IngredientNode::from_node)
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "{} fuzzy candidates for '{}' (words: {:?})",
            fuzzy.len(),
            normalized,
            words
        );

        Ok(Candidates::Fuzzy(fuzzy))
    }

    /// Exact phase only.
    pub fn find_exact(&self, normalized: &NormalizedName) -> Result<Vec<IngredientNode>, GraphError> {
        if normalized.is_empty() {
            return Ok(vec![]);
        }

        self.store
            .find_nodes_by_exact_property(
                Label::Ingredient,
                IngredientNode::NAME_KEY,
                normalized.as_str(),
            )?
            .iter()
            .map(IngredientNode::from_node)
            .collect()
    }
}
