//! Property-graph store interface.
//!
//! The resolver and ingestion driver only talk to `GraphStore`; the concrete
//! backend is picked at startup (`MemoryGraph` or the file-backed `CsvGraph`).

mod csv;
mod memory;
pub mod records;

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use self::csv::CsvGraph;
pub use memory::MemoryGraph;
pub use records::{EdgeProps, IngredientNode, RecipeNode};

pub type NodeId = u64;

/// Edge endpoint placeholder for the node passed to `create_node_with_edges`.
/// Stored ids start at 1, so 0 never names a real node.
pub const NEW_NODE: NodeId = 0;
pub type Properties = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Ingredient,
    Recipe,
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Ingredient => write!(f, "Ingredient"),
            Label::Recipe => write!(f, "Recipe"),
        }
    }
}

impl FromStr for Label {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ingredient" => Ok(Label::Ingredient),
            "Recipe" => Ok(Label::Recipe),
            _ => Err(GraphError::Corrupt(format!("unknown label '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// recipe -> ingredient
    Contains,
    /// ingredient -> recipe
    PartOf,
}

impl Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::Contains => write!(f, "CONTAINS"),
            EdgeKind::PartOf => write!(f, "PART_OF"),
        }
    }
}

impl FromStr for EdgeKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONTAINS" => Ok(EdgeKind::Contains),
            "PART_OF" => Ok(EdgeKind::PartOf),
            _ => Err(GraphError::Corrupt(format!("unknown edge type '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: Label,
    pub properties: Properties,
}

impl Node {
    /// String value of a property, if present and a string.
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub kind: EdgeKind,
    pub to: NodeId,
    pub properties: Properties,
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("invalid {label} record {id}: {reason}")]
    InvalidRecord {
        label: Label,
        id: NodeId,
        reason: String,
    },

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt graph data: {0}")]
    Corrupt(String),

    #[error("graph lock poisoned")]
    Poisoned,
}

pub trait GraphStore: Send + Sync {
    fn create_node(&self, label: Label, properties: Properties) -> Result<NodeId, GraphError>;

    /// Nodes whose case-folded `key` property equals the case-folded `value`.
    fn find_nodes_by_exact_property(
        &self,
        label: Label,
        key: &str,
        value: &str,
    ) -> Result<Vec<Node>, GraphError>;

    /// Nodes whose case-folded `key` property contains any of `words` as a substring.
    fn find_nodes_by_property_contains_any(
        &self,
        label: Label,
        key: &str,
        words: &[String],
    ) -> Result<Vec<Node>, GraphError>;

    fn create_edge(
        &self,
        from: NodeId,
        kind: EdgeKind,
        to: NodeId,
        properties: Properties,
    ) -> Result<(), GraphError>;

    /// Create two edges as one unit: either both are stored or neither is.
    fn create_edge_pair(&self, forward: Edge, inverse: Edge) -> Result<(), GraphError>;

    /// Create a node and its edges as one unit. Endpoints equal to `NEW_NODE`
    /// refer to the new node. If any edge is invalid nothing is stored.
    fn create_node_with_edges(
        &self,
        label: Label,
        properties: Properties,
        edges: Vec<Edge>,
    ) -> Result<NodeId, GraphError>;

    fn count_nodes(&self, label: Option<Label>) -> Result<usize, GraphError>;

    fn count_edges(&self) -> Result<usize, GraphError>;

    /// Edges going from `from` to `to`, in creation order.
    fn edges_between(&self, from: NodeId, to: NodeId) -> Result<Vec<Edge>, GraphError>;
}
