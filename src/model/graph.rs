use crate::qid::Qid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node variants of the music graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Artist,
    Album,
    Track,
    Genre,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Artist => "Artist",
            NodeKind::Album => "Album",
            NodeKind::Track => "Track",
            NodeKind::Genre => "Genre",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "Artist" => Some(NodeKind::Artist),
            "Album" => Some(NodeKind::Album),
            "Track" => Some(NodeKind::Track),
            "Genre" => Some(NodeKind::Genre),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A soft reference to another artist: a QID when known, otherwise a name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtistRef {
    Id(Qid),
    Name(String),
}

impl From<String> for ArtistRef {
    fn from(value: String) -> Self {
        match Qid::parse(&value) {
            Ok(qid) => ArtistRef::Id(qid),
            Err(_) => ArtistRef::Name(value.trim().to_string()),
        }
    }
}

impl From<ArtistRef> for String {
    fn from(value: ArtistRef) -> Self {
        match value {
            ArtistRef::Id(qid) => qid.to_string(),
            ArtistRef::Name(name) => name,
        }
    }
}

impl fmt::Display for ArtistRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtistRef::Id(qid) => write!(f, "{}", qid),
            ArtistRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistNode {
    pub id: Qid,
    pub name: String,
    pub country: Option<String>,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    pub genres: Vec<Qid>,
    pub similar_artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumNode {
    pub id: Qid,
    pub title: String,
    pub year: Option<i32>,
    pub artist_id: Option<Qid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackNode {
    pub id: Qid,
    pub title: String,
    pub album_id: Option<Qid>,
    pub track_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreNode {
    pub id: Qid,
    pub name: String,
    pub aliases: Vec<String>,
}

/// A typed graph node keyed by QID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Artist(ArtistNode),
    Album(AlbumNode),
    Track(TrackNode),
    Genre(GenreNode),
}

impl Node {
    pub fn id(&self) -> &Qid {
        match self {
            Node::Artist(n) => &n.id,
            Node::Album(n) => &n.id,
            Node::Track(n) => &n.id,
            Node::Genre(n) => &n.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Artist(_) => NodeKind::Artist,
            Node::Album(_) => NodeKind::Album,
            Node::Track(_) => NodeKind::Track,
            Node::Genre(_) => NodeKind::Genre,
        }
    }

    /// Artist/genre name or album/track title.
    pub fn display_name(&self) -> &str {
        match self {
            Node::Artist(n) => &n.name,
            Node::Album(n) => &n.title,
            Node::Track(n) => &n.title,
            Node::Genre(n) => &n.name,
        }
    }
}

/// Relationship types of the music graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    HasGenre,
    PerformedBy,
    ContainsTrack,
    SimilarTo,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 4] = [
        EdgeKind::HasGenre,
        EdgeKind::PerformedBy,
        EdgeKind::ContainsTrack,
        EdgeKind::SimilarTo,
    ];

    pub fn as_label(&self) -> &'static str {
        match self {
            EdgeKind::HasGenre => "HAS_GENRE",
            EdgeKind::PerformedBy => "PERFORMED_BY",
            EdgeKind::ContainsTrack => "CONTAINS_TRACK",
            EdgeKind::SimilarTo => "SIMILAR_TO",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        EdgeKind::ALL.into_iter().find(|k| k.as_label() == s)
    }

    /// Required (source, target) node variants.
    pub fn endpoints(&self) -> (NodeKind, NodeKind) {
        match self {
            EdgeKind::HasGenre => (NodeKind::Artist, NodeKind::Genre),
            EdgeKind::PerformedBy => (NodeKind::Album, NodeKind::Artist),
            EdgeKind::ContainsTrack => (NodeKind::Album, NodeKind::Track),
            EdgeKind::SimilarTo => (NodeKind::Artist, NodeKind::Artist),
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A typed relation between two nodes. Ordering is (kind, source, target).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub source: Qid,
    pub target: Qid,
}

impl Edge {
    pub fn new(kind: EdgeKind, source: Qid, target: Qid) -> Self {
        Edge {
            kind,
            source,
            target,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[:{}]->({})", self.source, self.kind, self.target)
    }
}
