use super::{write_atomic, GraphSink};
use crate::model::{Edge, Node, NodeKind};
use crate::qid::Qid;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Renders the graph as an idempotent Cypher script in the Memgraph dialect.
///
/// Nodes become `MERGE ... SET` statements and edges `MATCH ... MERGE`, so
/// replaying the script against a graph database upserts rather than
/// duplicates. Statements are buffered and written on flush, nodes before
/// edges, each group in key order.
pub struct CypherScriptSink {
    path: PathBuf,
    nodes: BTreeMap<(NodeKind, String), String>,
    edges: BTreeSet<Edge>,
    kinds: BTreeMap<String, NodeKind>,
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn quote_list<S: AsRef<str>>(values: &[S]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote(v.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

fn node_properties(node: &Node) -> Vec<(&'static str, String)> {
    let mut props = Vec::new();
    match node {
        Node::Artist(a) => {
            props.push(("name", quote(&a.name)));
            if let Some(country) = &a.country {
                props.push(("country", quote(country)));
            }
            props.push(("aliases", quote_list(&a.aliases)));
            props.push(("tags", quote_list(&a.tags)));
        }
        Node::Album(a) => {
            props.push(("title", quote(&a.title)));
            if let Some(year) = a.year {
                props.push(("year", year.to_string()));
            }
        }
        Node::Track(t) => {
            props.push(("title", quote(&t.title)));
            if let Some(n) = t.track_number {
                props.push(("track_number", n.to_string()));
            }
        }
        Node::Genre(g) => {
            props.push(("name", quote(&g.name)));
            props.push(("aliases", quote_list(&g.aliases)));
        }
    }
    props
}

/// `MERGE` statement for one node.
pub fn node_statement(node: &Node) -> String {
    let sets: Vec<String> = node_properties(node)
        .into_iter()
        .map(|(key, value)| format!("n.{} = {}", key, value))
        .collect();
    format!(
        "MERGE (n:{} {{id: {}}}) SET {};",
        node.kind().label(),
        quote(node.id().as_str()),
        sets.join(", ")
    )
}

/// `MATCH ... MERGE` statement for one edge.
pub fn edge_statement(edge: &Edge) -> String {
    let (source_kind, target_kind) = edge.kind.endpoints();
    format!(
        "MATCH (a:{} {{id: {}}}), (b:{} {{id: {}}}) MERGE (a)-[:{}]->(b);",
        source_kind.label(),
        quote(edge.source.as_str()),
        target_kind.label(),
        quote(edge.target.as_str()),
        edge.kind.as_label()
    )
}

impl CypherScriptSink {
    pub fn new(path: &Path) -> Self {
        CypherScriptSink {
            path: path.to_path_buf(),
            nodes: BTreeMap::new(),
            edges: BTreeSet::new(),
            kinds: BTreeMap::new(),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        let mut out: Vec<String> = [
            NodeKind::Artist,
            NodeKind::Album,
            NodeKind::Track,
            NodeKind::Genre,
        ]
        .iter()
        .map(|kind| format!("CREATE INDEX ON :{}(id);", kind.label()))
        .collect();
        out.extend(self.nodes.values().cloned());
        out.extend(self.edges.iter().map(edge_statement));
        out
    }
}

impl GraphSink for CypherScriptSink {
    fn upsert_nodes(&mut self, nodes: &[Node]) -> Result<usize> {
        for node in nodes {
            let id = node.id().to_string();
            // A QID that changed label drops its old statement.
            if let Some(previous) = self.kinds.insert(id.clone(), node.kind()) {
                if previous != node.kind() {
                    self.nodes.remove(&(previous, id.clone()));
                }
            }
            self.nodes.insert((node.kind(), id), node_statement(node));
        }
        Ok(nodes.len())
    }

    fn upsert_edges(&mut self, edges: &[Edge]) -> Result<usize> {
        self.edges.extend(edges.iter().cloned());
        Ok(edges.len())
    }

    fn set_outgoing_edges(&mut self, sources: &[Qid], edges: &[Edge]) -> Result<usize> {
        self.edges.retain(|edge| !sources.contains(&edge.source));
        self.upsert_edges(edges)
    }

    fn flush(&mut self) -> Result<()> {
        let statements = self.statements();
        write_atomic(&self.path, |w| {
            for statement in statements {
                writeln!(w, "{}", statement)?;
            }
            Ok(())
        })
    }
}
