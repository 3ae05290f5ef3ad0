use super::validation::{
    validate_album, validate_artist, validate_edge, validate_genre, validate_track,
    ValidationError,
};
use super::{NodeTable, Upsert};
use crate::model::{ArtistRef, Edge, EdgeKind, EntityFacts, Node, NodeKind};
use crate::qid::Qid;
use crate::report::{IssueLog, PipelineIssue};
use crate::text::normalize_name;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub merged: usize,
    pub rejected: usize,
}

impl MergeStats {
    fn add(&mut self, other: MergeStats) {
        self.inserted += other.inserted;
        self.merged += other.merged;
        self.rejected += other.rejected;
    }
}

/// Final graph payload: nodes ordered by QID, edges by (kind, source, target).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphOutput {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphOutput {
    pub fn node_counts(&self) -> BTreeMap<NodeKind, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn edge_counts(&self) -> BTreeMap<EdgeKind, usize> {
        let mut counts = BTreeMap::new();
        for edge in &self.edges {
            *counts.entry(edge.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// Maps entity facts into the node table and derives edges from it.
///
/// Merging is single-writer: callers own the [`NodeTable`] and hand it in by
/// `&mut`. Edges are derived only once every node has been merged.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    resolve_similar_by_name: bool,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        GraphBuilder {
            resolve_similar_by_name: true,
        }
    }
}

impl GraphBuilder {
    pub fn new(resolve_similar_by_name: bool) -> Self {
        GraphBuilder {
            resolve_similar_by_name,
        }
    }

    /// Merges one artist's facts. Genres go in first, then the artist, its
    /// albums and their tracks.
    pub fn merge(
        &self,
        table: &mut NodeTable,
        facts: &EntityFacts,
        issues: &mut IssueLog,
    ) -> MergeStats {
        let mut stats = MergeStats::default();
        let mut apply = |result: Result<Node, ValidationError>, stats: &mut MergeStats| match result {
            Ok(node) => match table.upsert(node) {
                Upsert::Inserted => stats.inserted += 1,
                Upsert::Merged | Upsert::Replaced => stats.merged += 1,
            },
            Err(err) => {
                stats.rejected += 1;
                issues.record(err.into_issue());
            }
        };

        for genre in &facts.genres {
            apply(validate_genre(genre).map(Node::Genre), &mut stats);
        }
        if let Some(artist) = &facts.artist {
            apply(validate_artist(artist).map(Node::Artist), &mut stats);
        }
        for album in &facts.albums {
            apply(validate_album(album).map(Node::Album), &mut stats);
        }
        for track in &facts.tracks {
            apply(validate_track(track).map(Node::Track), &mut stats);
        }
        stats
    }

    /// Derives every edge implied by node references, dropping and reporting
    /// those whose endpoints are not in the table.
    pub fn edges(&self, table: &NodeTable, issues: &mut IssueLog) -> Vec<Edge> {
        let names = if self.resolve_similar_by_name {
            artist_name_index(table)
        } else {
            HashMap::new()
        };

        let mut candidates: BTreeSet<Edge> = BTreeSet::new();
        for node in table.iter() {
            match node {
                Node::Artist(artist) => {
                    for genre in &artist.genres {
                        candidates.insert(Edge::new(
                            EdgeKind::HasGenre,
                            artist.id.clone(),
                            genre.clone(),
                        ));
                    }
                    for similar in &artist.similar_artists {
                        let target = match similar {
                            ArtistRef::Id(qid) => Some(qid.clone()),
                            ArtistRef::Name(name) => names.get(&normalize_name(name)).cloned(),
                        };
                        match target {
                            Some(target) if target == artist.id => {
                                debug!("{}: ignoring self reference in similar artists", artist.id)
                            }
                            Some(target) => {
                                candidates.insert(Edge::new(
                                    EdgeKind::SimilarTo,
                                    artist.id.clone(),
                                    target,
                                ));
                            }
                            None => issues.record(PipelineIssue::DanglingEdge {
                                edge: format!(
                                    "({})-[:{}]->('{}')",
                                    artist.id,
                                    EdgeKind::SimilarTo,
                                    similar
                                ),
                                reason: if self.resolve_similar_by_name {
                                    "no artist with that name".to_string()
                                } else {
                                    "name references are not resolved".to_string()
                                },
                            }),
                        }
                    }
                }
                Node::Album(album) => {
                    if let Some(artist_id) = &album.artist_id {
                        candidates.insert(Edge::new(
                            EdgeKind::PerformedBy,
                            album.id.clone(),
                            artist_id.clone(),
                        ));
                    }
                }
                Node::Track(track) => {
                    if let Some(album_id) = &track.album_id {
                        candidates.insert(Edge::new(
                            EdgeKind::ContainsTrack,
                            album_id.clone(),
                            track.id.clone(),
                        ));
                    }
                }
                Node::Genre(_) => {}
            }
        }

        candidates
            .into_iter()
            .filter(|edge| match validate_edge(edge, table) {
                Ok(()) => true,
                Err(err) => {
                    issues.record(err.into_issue());
                    false
                }
            })
            .collect()
    }

    /// Merges every facts bundle into a fresh table, then derives edges.
    pub fn build<'a>(
        &self,
        facts: impl IntoIterator<Item = &'a EntityFacts>,
        issues: &mut IssueLog,
    ) -> GraphOutput {
        let mut table = NodeTable::new();
        let mut stats = MergeStats::default();
        for bundle in facts {
            stats.add(self.merge(&mut table, bundle, issues));
        }
        let edges = self.edges(&table, issues);
        info!(
            "Graph: {} nodes ({} merged, {} rejected), {} edges",
            table.len(),
            stats.merged,
            stats.rejected,
            edges.len()
        );
        GraphOutput {
            nodes: table.into_nodes(),
            edges,
        }
    }
}

/// Normalized artist name → QID. Names win over aliases; on collisions the
/// lowest QID wins.
fn artist_name_index(table: &NodeTable) -> HashMap<String, Qid> {
    let mut index = HashMap::new();
    let artists = || {
        table.iter().filter_map(|n| match n {
            Node::Artist(a) => Some(a),
            _ => None,
        })
    };
    for artist in artists() {
        let key = normalize_name(&artist.name);
        if !key.is_empty() {
            index.entry(key).or_insert_with(|| artist.id.clone());
        }
    }
    for artist in artists() {
        for alias in &artist.aliases {
            let key = normalize_name(alias);
            if !key.is_empty() {
                index.entry(key).or_insert_with(|| artist.id.clone());
            }
        }
    }
    index
}
