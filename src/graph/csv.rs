use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Instant;

use super::memory::GraphData;
use super::{Edge, EdgeKind, GraphError, GraphStore, Label, Node, NodeId, Properties};

const NODE_HEADERS: [&str; 3] = ["id", "label", "properties"];
const EDGE_HEADERS: [&str; 4] = ["from", "type", "to", "properties"];

/// File-backed graph: `nodes.csv` and `edges.csv` in one directory,
/// rewritten after every mutation.
#[derive(Debug)]
pub struct CsvGraph {
    data: RwLock<GraphData>,
    nodes_path: PathBuf,
    edges_path: PathBuf,
}

impl CsvGraph {
    pub fn load(dir: &Path) -> Result<Self, GraphError> {
        std::fs::create_dir_all(dir)?;

        let nodes_path = dir.join("nodes.csv");
        let edges_path = dir.join("edges.csv");
        create_if_missing(&nodes_path, &NODE_HEADERS)?;
        create_if_missing(&edges_path, &EDGE_HEADERS)?;

        let now = Instant::now();
        let mut data = GraphData {
            nodes: read_nodes(&nodes_path)?,
            edges: read_edges(&edges_path)?,
        };

        let before = data.edges.len();
        let nodes: HashSet<NodeId> = data.nodes.iter().map(|n| n.id).collect();
        data.edges
            .retain(|e| nodes.contains(&e.from) && nodes.contains(&e.to));
        if data.edges.len() != before {
            log::warn!(
                "dropped {} edges to unknown nodes from {}",
                before - data.edges.len(),
                edges_path.display()
            );
        }

        log::debug!(
            "took {}ms to read graph ({} nodes, {} edges)",
            now.elapsed().as_micros() as f64 / 1000.0,
            data.nodes.len(),
            data.edges.len()
        );

        Ok(CsvGraph {
            data: RwLock::new(data),
            nodes_path,
            edges_path,
        })
    }

    fn save(&self, data: &GraphData) -> Result<(), GraphError> {
        let nodes_tmp = tmp_path(&self.nodes_path);
        let mut wrt = csv::Writer::from_path(&nodes_tmp)?;
        wrt.write_record(NODE_HEADERS)?;
        for node in &data.nodes {
            wrt.write_record([
                node.id.to_string(),
                node.label.to_string(),
                serde_json::to_string(&node.properties)?,
            ])?;
        }
        wrt.flush()?;

        let edges_tmp = tmp_path(&self.edges_path);
        let mut wrt = csv::Writer::from_path(&edges_tmp)?;
        wrt.write_record(EDGE_HEADERS)?;
        for edge in &data.edges {
            wrt.write_record([
                edge.from.to_string(),
                edge.kind.to_string(),
                edge.to.to_string(),
                serde_json::to_string(&edge.properties)?,
            ])?;
        }
        wrt.flush()?;

        // the two renames are not atomic together: edges go first, so a crash
        // in between leaves edges to unknown nodes, which `load` drops
        std::fs::rename(&edges_tmp, &self.edges_path)?;
        std::fs::rename(&nodes_tmp, &self.nodes_path)?;
        Ok(())
    }
}

impl GraphStore for CsvGraph {
    fn create_node(&self, label: Label, properties: Properties) -> Result<NodeId, GraphError> {
        let mut data = self.data.write().map_err(|_| GraphError::Poisoned)?;
        let id = data.insert_node(label, properties);

        if let Err(err) = self.save(&data) {
            data.nodes.pop();
            return Err(err);
        }
        Ok(id)
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

        if let Err(err) = self.save(&data) {
            data.edges.pop();
            return Err(err);
        }
        Ok(())
    }

    fn create_edge_pair(&self, forward: Edge, inverse: Edge) -> Result<(), GraphError> {
        let mut data = self.data.write().map_err(|_| GraphError::Poisoned)?;
        data.check_edge(&forward)?;
        data.check_edge(&inverse)?;

        let before = data.edges.len();
        data.edges.push(forward);
        data.edges.push(inverse);

        if let Err(err) = self.save(&data) {
            log::error!("failed to persist edge pair, rolling back: {err}");
            data.edges.truncate(before);
            return Err(err);
        }
        Ok(())
    }

    fn create_node_with_edges(
        &self,
        label: Label,
        properties: Properties,
        edges: Vec<Edge>,
    ) -> Result<NodeId, GraphError> {
        let mut data = self.data.write().map_err(|_| GraphError::Poisoned)?;
        let (id, before) = data.insert_node_with_edges(label, properties, edges)?;

        if let Err(err) = self.save(&data) {
            log::error!("failed to persist node {id} with its edges, rolling back: {err}");
            data.nodes.pop();
            data.edges.truncate(before);
            return Err(err);
        }
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

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("-tmp");
    PathBuf::from(name)
}

fn create_if_missing(path: &Path, headers: &[&str]) -> Result<(), GraphError> {
    if let Err(err) = std::fs::metadata(path) {
        match err.kind() {
            ErrorKind::NotFound => {
                log::info!("Creating new graph file at {}", path.display());
                let mut wrt = csv::Writer::from_path(path)?;
                wrt.write_record(headers)?;
                wrt.flush()?;
            }
            _ => Err(err)?,
        }
    }
    Ok(())
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, name: &str) -> Result<&'a str, GraphError> {
    record
        .get(idx)
        .ok_or_else(|| GraphError::Corrupt(format!("couldnt get record {name}")))
}

fn parse_id(value: &str) -> Result<NodeId, GraphError> {
    value
        .parse::<NodeId>()
        .map_err(|err| GraphError::Corrupt(format!("invalid node id '{value}': {err}")))
}

fn read_nodes(path: &Path) -> Result<Vec<Node>, GraphError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut nodes = vec![];

    for record in reader.records() {
        let record = record?;
        nodes.push(Node {
            id: parse_id(field(&record, 0, "id")?)?,
            label: field(&record, 1, "label")?.parse()?,
            properties: serde_json::from_str(field(&record, 2, "properties")?)?,
        });
    }

    Ok(nodes)
}

fn read_edges(path: &Path) -> Result<Vec<Edge>, GraphError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut edges = vec![];

    for record in reader.records() {
        let record = record?;
        edges.push(Edge {
            from: parse_id(field(&record, 0, "from")?)?,
            kind: field(&record, 1, "type")?.parse()?,
            to: parse_id(field(&record, 2, "to")?)?,
            properties: serde_json::from_str(field(&record, 3, "properties")?)?,
        });
    }

    Ok(edges)
}
