use super::{write_atomic, GraphSink};
use crate::graph::NodeTable;
use crate::model::{Edge, Node, NodeKind};
use crate::qid::Qid;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Serialized form of a graph store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// An in-memory property graph, optionally persisted as a JSON snapshot.
///
/// Nodes merge through [`NodeTable`]; edges are a set. Edges whose endpoints
/// are not stored are refused.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    nodes: NodeTable,
    edges: BTreeSet<Edge>,
    path: Option<PathBuf>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store backed by `path`, loading the snapshot if one exists.
    pub fn open(path: &Path) -> Result<Self> {
        let mut store = MemoryGraphStore {
            path: Some(path.to_path_buf()),
            ..Default::default()
        };
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read graph snapshot {:?}", path))?;
            let snapshot: GraphSnapshot = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse graph snapshot {:?}", path))?;
            store.upsert_nodes(&snapshot.nodes)?;
            store.upsert_edges(&snapshot.edges)?;
            info!(
                "Loaded graph snapshot with {} nodes and {} edges",
                store.nodes.len(),
                store.edges.len()
            );
        }
        Ok(store)
    }

    pub fn node(&self, id: &crate::qid::Qid) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.count(kind)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.iter().cloned().collect(),
            edges: self.edges.iter().cloned().collect(),
        }
    }
}

impl GraphSink for MemoryGraphStore {
    fn upsert_nodes(&mut self, nodes: &[Node]) -> Result<usize> {
        for node in nodes {
            self.nodes.upsert(node.clone());
        }
        Ok(nodes.len())
    }

    fn upsert_edges(&mut self, edges: &[Edge]) -> Result<usize> {
        let mut accepted = 0;
        for edge in edges {
            if !self.nodes.contains(&edge.source) || !self.nodes.contains(&edge.target) {
                warn!("Refusing edge {} with an unknown endpoint", edge);
                continue;
            }
            self.edges.insert(edge.clone());
            accepted += 1;
        }
        Ok(accepted)
    }

    fn set_outgoing_edges(&mut self, sources: &[Qid], edges: &[Edge]) -> Result<usize> {
        let sources: HashSet<&Qid> = sources.iter().collect();
        let before = self.edges.len();
        self.edges.retain(|edge| !sources.contains(&edge.source));
        let removed = before - self.edges.len();
        if removed > 0 {
            debug!("Cleared {} outgoing edges of {} nodes", removed, sources.len());
        }
        self.upsert_edges(edges)
    }

    fn flush(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = self.snapshot();
        write_atomic(path, |w| {
            serde_json::to_writer_pretty(w, &snapshot)?;
            Ok(())
        })
    }
}
