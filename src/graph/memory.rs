use std::sync::RwLock;

use super::{Edge, EdgeKind, GraphError, GraphStore, Label, Node, NodeId, Properties, NEW_NODE};

/// Node and edge lists shared by the in-memory and CSV backends.
#[derive(Debug, Clone, Default)]
pub(super) struct GraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphData {
    pub fn next_id(&self) -> NodeId {
        self.nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1
    }

    pub fn insert_node(&mut self, label: Label, properties: Properties) -> NodeId {
        let id = self.next_id();
        self.nodes.push(Node {
            id,
            label,
            properties,
        });
        id
    }

    /// Validate `edges` against the node that would get the next id, then
    /// push the node and the edges. Returns the new id and the edge count
    /// before the insert, so callers can undo it.
    pub fn insert_node_with_edges(
        &mut self,
        label: Label,
        properties: Properties,
        edges: Vec<Edge>,
    ) -> Result<(NodeId, usize), GraphError> {
        let id = self.next_id();
        let edges: Vec<Edge> = edges
            .into_iter()
            .map(|edge| Edge {
                from: if edge.from == NEW_NODE { id } else { edge.from },
                to: if edge.to == NEW_NODE { id } else { edge.to },
                ..edge
            })
            .collect();

        for edge in &edges {
            for end in [edge.from, edge.to] {
                if end != id && !self.contains_node(end) {
                    return Err(GraphError::NodeNotFound(end));
                }
            }
        }

        let before = self.edges.len();
        self.nodes.push(Node {
            id,
            label,
            properties,
        });
        self.edges.extend(edges);
        Ok((id, before))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn check_edge(&self, edge: &Edge) -> Result<(), GraphError> {
        for id in [edge.from, edge.to] {
            if !self.contains_node(id) {
                return Err(GraphError::NodeNotFound(id));
            }
        }
        Ok(())
    }

    pub fn find_exact(&self, label: Label, key: &str, value: &str) -> Vec<Node> {
        let value = value.to_lowercase();
        self.nodes
            .iter()
            .filter(|n| n.label == label)
            .filter(|n| {
                n.str_property(key)
                    .map(|v| v.to_lowercase() == value)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn find_contains_any(&self, label: Label, key: &str, words: &[String]) -> Vec<Node> {
        let words: Vec<String> = words
            .iter()
            .map(|w| w.to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return vec![];
        }

        self.nodes
            .iter()
            .filter(|n| n.label == label)
            .filter(|n| match n.str_property(key) {
                Some(v) => {
                    let v = v.to_lowercase();
                    words.iter().any(|w| v.contains(w.as_str()))
                }
                None => false,
            })
            .cloned()
            .collect()
    }

    pub fn count_nodes(&self, label: Option<Label>) -> usize {
        match label {
            Some(label) => self.nodes.iter().filter(|n| n.label == label).count(),
            None => self.nodes.len(),
        }
    }

    pub fn edges_between(&self, from: NodeId, to: NodeId) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| e.from == from && e.to == to)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    data: RwLock<GraphData>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryGraph {
    fn create_node(&self, label: Label, properties: Properties) -> Result<NodeId, GraphError> {
        let mut data = self.data.write().map_err(|_| GraphError::Poisoned)?;
        Ok(data.insert_node(label, properties))
    }

    fn find_nodes_by_exact_property(
        &self,
        label: Label,
        key: &str,
        value: &str,
    ) -> Result<Vec<Node>, GraphError> {
        let data = self.data.read().map_err(|_| GraphError::Poisoned)?;
        Ok(data.find_exact(label, key, value))
    }

    fn find_nodes_by_property_contains_any(
        &self,
        label: Label,
        key: &str,
        words: &[String],
    ) -> Result<Vec<Node>, GraphError> {
        let data = self.data.read().map_err(|_| GraphError::Poisoned)?;
        Ok(data.find_contains_any(label, key, words))
    }

    fn create_edge(
        &self,
        from: NodeId,
        kind: EdgeKind,
        to: NodeId,
        properties: Properties,
    ) -> Result<(), GraphError> {
        let edge = Edge {
            from,
            kind,
            to,
            properties,
        };
        let mut data = self.data.write().map_err(|_| GraphError::Poisoned)?;
        data.check_edge(&edge)?;
        data.edges.push(edge);
        Ok(())
    }

    fn create_edge_pair(&self, forward: Edge, inverse: Edge) -> Result<(), GraphError> {
        let mut data = self.data.write().map_err(|_| GraphError::Poisoned)?;
        data.check_edge(&forward)?;
        data.check_edge(&inverse)?;
        data.edges.push(forward);
        data.edges.push(inverse);
        Ok(())
    }

    fn create_node_with_edges(
        &self,
        label: Label,
        properties: Properties,
        edges: Vec<Edge>,
    ) -> Result<NodeId, GraphError> {
        let mut data = self.data.write().map_err(|_| GraphError::Poisoned)?;
        let (id, _) = data.insert_node_with_edges(label, properties, edges)?;
        Ok(id)
    }

    fn count_nodes(&self, label: Option<Label>) -> Result<usize, GraphError> {
        let data = self.data.read().map_err(|_| GraphError::Poisoned)?;
        Ok(data.count_nodes(label))
    }

    fn count_edges(&self) -> Result<usize, GraphError> {
        let data = self.data.read().map_err(|_| GraphError::Poisoned)?;
        Ok(data.edges.len())
    }

    fn edges_between(&self, from: NodeId, to: NodeId) -> Result<Vec<Edge>, GraphError> {
        let data = self.data.read().map_err(|_| GraphError::Poisoned)?;
        Ok(data.edges_between(from, to))
    }
}
