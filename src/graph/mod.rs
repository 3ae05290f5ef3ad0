//! Typed entity graph: node table, builder and integrity checks.

mod builder;
pub mod validation;

pub use builder::{GraphBuilder, GraphOutput, MergeStats};

use crate::model::{Node, NodeKind};
use crate::qid::Qid;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::warn;

/// What an upsert did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    /// Same variant already present; incoming properties won.
    Merged,
    /// A node of another variant held the QID and was replaced.
    Replaced,
}

/// QID → node map owned by a single writer.
///
/// Merges are last-write-wins per property: a present value from the later
/// node overwrites the stored one, an absent or empty value leaves it alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTable {
    nodes: BTreeMap<Qid, Node>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, node: Node) -> Upsert {
        match self.nodes.entry(node.id().clone()) {
            Entry::Vacant(entry) => {
                entry.insert(node);
                Upsert::Inserted
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.kind() != node.kind() {
                    warn!(
                        "{} was a {}, replaced by a {}",
                        node.id(),
                        existing.kind(),
                        node.kind()
                    );
                    *existing = node;
                    return Upsert::Replaced;
                }
                merge_into(existing, node);
                Upsert::Merged
            }
        }
    }

    pub fn get(&self, id: &Qid) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &Qid) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in QID order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|n| n.kind() == kind).count()
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes.into_values().collect()
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn overwrite_list<T>(slot: &mut Vec<T>, value: Vec<T>) {
    if !value.is_empty() {
        *slot = value;
    }
}

fn merge_into(existing: &mut Node, incoming: Node) {
    match (existing, incoming) {
        (Node::Artist(old), Node::Artist(new)) => {
            old.name = new.name;
            overwrite(&mut old.country, new.country);
            overwrite_list(&mut old.aliases, new.aliases);
            overwrite_list(&mut old.tags, new.tags);
            overwrite_list(&mut old.genres, new.genres);
            overwrite_list(&mut old.similar_artists, new.similar_artists);
        }
        (Node::Album(old), Node::Album(new)) => {
            old.title = new.title;
            overwrite(&mut old.year, new.year);
            overwrite(&mut old.artist_id, new.artist_id);
        }
        (Node::Track(old), Node::Track(new)) => {
            old.title = new.title;
            overwrite(&mut old.album_id, new.album_id);
            overwrite(&mut old.track_number, new.track_number);
        }
        (Node::Genre(old), Node::Genre(new)) => {
            old.name = new.name;
            overwrite_list(&mut old.aliases, new.aliases);
        }
        (slot, other) => *slot = other,
    }
}
