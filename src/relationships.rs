use std::sync::Arc;

use crate::graph::{
    Edge, EdgeKind, EdgeProps, GraphError, GraphStore, IngredientNode, Label, NodeId, RecipeNode,
    NEW_NODE,
};

/// Links recipes and ingredients with a CONTAINS / PART_OF edge pair.
#[derive(Clone)]
pub struct RelationshipBuilder {
    store: Arc<dyn GraphStore>,
}

impl RelationshipBuilder {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Both edges carry the same quantity and measure and are written as one unit.
    pub fn attach(
        &self,
        recipe: &RecipeNode,
        ingredient: &IngredientNode,
        quantity: &str,
        measure: &str,
    ) -> Result<(), GraphError> {
        let (contains, part_of) = edge_pair(recipe.id, ingredient.id, quantity, measure);
        self.store.create_edge_pair(contains, part_of)?;
        log::trace!(
            "attached '{}' to '{}' ({} {})",
            ingredient.name,
            recipe.name,
            quantity,
            measure
        );
        Ok(())
    }

    /// Store `recipe` together with an edge pair per ingredient line. Either
    /// the recipe and all of its edges are stored or nothing is.
    pub fn create_recipe(
        &self,
        recipe: &RecipeNode,
        lines: &[IngredientUse],
    ) -> Result<NodeId, GraphError> {
        let mut edges = Vec::with_capacity(lines.len() * 2);
        for line in lines {
            let (contains, part_of) =
                edge_pair(NEW_NODE, line.ingredient.id, &line.quantity, &line.measure);
            edges.push(contains);
            edges.push(part_of);
        }

        let id = self
            .store
            .create_node_with_edges(Label::Recipe, recipe.to_properties(), edges)?;
        log::trace!("stored recipe {id} '{}' with {} ingredients", recipe.name, lines.len());
        Ok(id)
    }
}

/// One resolved ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientUse {
    pub ingredient: IngredientNode,
    pub quantity: String,
    pub measure: String,
}

fn edge_pair(recipe: NodeId, ingredient: NodeId, quantity: &str, measure: &str) -> (Edge, Edge) {
    let properties = EdgeProps::new(quantity, measure).to_properties();

    let contains = Edge {
        from: recipe,
        kind: EdgeKind::Contains,
        to: ingredient,
        properties: properties.clone(),
    };
    let part_of = Edge {
        from: ingredient,
        kind: EdgeKind::PartOf,
        to: recipe,
        properties,
    };
    (contains, part_of)
}
