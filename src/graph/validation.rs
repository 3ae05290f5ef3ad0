//! Validation for graph entities.
//!
//! Converts raw entity facts into typed nodes, rejecting records that cannot
//! be keyed or named, and checks edge endpoints against the node table.

use super::NodeTable;
use crate::model::{
    AlbumFacts, AlbumNode, ArtistFacts, ArtistNode, ArtistRef, Edge, GenreFacts, GenreNode,
    TrackFacts, TrackNode,
};
use crate::qid::Qid;
use crate::report::PipelineIssue;
use crate::text::clean_label;
use std::fmt;
use tracing::debug;

/// Validation error types
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField {
        entity_type: &'static str,
        id: String,
        field: &'static str,
    },
    InvalidId {
        entity_type: &'static str,
        value: String,
    },
    MissingEndpoint {
        edge: Edge,
        id: Qid,
    },
    WrongEndpointType {
        edge: Edge,
        id: Qid,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField {
                entity_type,
                id,
                field,
            } => {
                write!(f, "{} '{}': field '{}' is required but was empty", entity_type, id, field)
            }
            ValidationError::InvalidId { entity_type, value } => {
                write!(f, "{} has an invalid QID '{}'", entity_type, value)
            }
            ValidationError::MissingEndpoint { edge, id } => {
                write!(f, "Edge {} references missing node '{}'", edge, id)
            }
            ValidationError::WrongEndpointType {
                edge,
                id,
                expected,
                found,
            } => write!(
                f,
                "Edge {} expects {} '{}' but found {}",
                edge, expected, id, found
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Maps the failure onto the run's issue taxonomy.
    pub fn into_issue(self) -> PipelineIssue {
        let reason = self.to_string();
        match self {
            ValidationError::InvalidId { entity_type, value } => {
                PipelineIssue::MissingIdentifier {
                    record: format!("{} '{}'", entity_type, value),
                    field: "id",
                }
            }
            ValidationError::EmptyField {
                entity_type,
                id,
                field,
            } => PipelineIssue::IncompleteMetadata {
                record: format!("{} {}", entity_type, id),
                field,
            },
            ValidationError::MissingEndpoint { edge, .. }
            | ValidationError::WrongEndpointType { edge, .. } => PipelineIssue::DanglingEdge {
                edge: edge.to_string(),
                reason,
            },
        }
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

fn parse_id(entity_type: &'static str, value: &str) -> ValidationResult<Qid> {
    Qid::parse(value).map_err(|_| ValidationError::InvalidId {
        entity_type,
        value: value.to_string(),
    })
}

fn required(
    entity_type: &'static str,
    id: &Qid,
    field: &'static str,
    value: &str,
) -> ValidationResult<String> {
    let value = clean_label(value);
    if value.is_empty() {
        return Err(ValidationError::EmptyField {
            entity_type,
            id: id.to_string(),
            field,
        });
    }
    Ok(value)
}

/// An optional reference. Blank and malformed references count as absent.
fn reference(owner: &Qid, field: &str, value: &str) -> Option<Qid> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match Qid::parse(value) {
        Ok(qid) => Some(qid),
        Err(_) => {
            debug!("{}: ignoring malformed {} '{}'", owner, field, value);
            None
        }
    }
}

/// Trimmed, non-empty, sorted unique labels.
fn labels(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = values
        .iter()
        .map(|v| clean_label(v))
        .filter(|v| !v.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Validate an artist and convert it to a node
pub fn validate_artist(artist: &ArtistFacts) -> ValidationResult<ArtistNode> {
    let id = parse_id("Artist", &artist.id)?;
    let name = required("Artist", &id, "name", &artist.name)?;

    let mut genres: Vec<Qid> = artist
        .genres
        .iter()
        .filter_map(|g| reference(&id, "genre", g))
        .collect();
    genres.sort();
    genres.dedup();

    let mut similar_artists: Vec<ArtistRef> = Vec::new();
    for raw in &artist.similar_artists {
        let cleaned = clean_label(raw);
        if cleaned.is_empty() {
            continue;
        }
        let r = ArtistRef::from(cleaned);
        if !similar_artists.contains(&r) {
            similar_artists.push(r);
        }
    }

    Ok(ArtistNode {
        id,
        name,
        country: artist
            .country
            .as_deref()
            .map(clean_label)
            .filter(|c| !c.is_empty()),
        aliases: labels(&artist.aliases),
        tags: labels(&artist.tags),
        genres,
        similar_artists,
    })
}

/// Validate an album and convert it to a node
pub fn validate_album(album: &AlbumFacts) -> ValidationResult<AlbumNode> {
    let id = parse_id("Album", &album.id)?;
    let title = required("Album", &id, "title", &album.title)?;
    let artist_id = reference(&id, "artist_id", &album.artist_id);
    Ok(AlbumNode {
        id,
        title,
        year: album.year,
        artist_id,
    })
}

/// Validate a track and convert it to a node
pub fn validate_track(track: &TrackFacts) -> ValidationResult<TrackNode> {
    let id = parse_id("Track", &track.id)?;
    let title = required("Track", &id, "title", &track.title)?;
    let album_id = reference(&id, "album_id", &track.album_id);
    Ok(TrackNode {
        id,
        title,
        album_id,
        track_number: track.track_number.filter(|n| *n > 0),
    })
}

/// Validate a genre and convert it to a node
pub fn validate_genre(genre: &GenreFacts) -> ValidationResult<GenreNode> {
    let id = parse_id("Genre", &genre.id)?;
    let name = required("Genre", &id, "name", &genre.name)?;
    Ok(GenreNode {
        id,
        name,
        aliases: labels(&genre.aliases),
    })
}

/// Check that both endpoints of `edge` exist with the variants its kind requires.
pub fn validate_edge(edge: &Edge, table: &NodeTable) -> ValidationResult<()> {
    let (source_kind, target_kind) = edge.kind.endpoints();
    for (id, expected) in [(&edge.source, source_kind), (&edge.target, target_kind)] {
        match table.get(id) {
            None => {
                return Err(ValidationError::MissingEndpoint {
                    edge: edge.clone(),
                    id: id.clone(),
                })
            }
            Some(node) if node.kind() != expected => {
                return Err(ValidationError::WrongEndpointType {
                    edge: edge.clone(),
                    id: id.clone(),
                    expected: expected.label(),
                    found: node.kind().label(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeKind, Node};

    fn qid(s: &str) -> Qid {
        Qid::parse(s).unwrap()
    }

    fn make_valid_artist() -> ArtistFacts {
        ArtistFacts {
            id: "Q1299".to_string(),
            name: "The  Beatles".to_string(),
            country: Some("United Kingdom".to_string()),
            aliases: vec!["Fab Four".to_string(), " ".to_string(), "Fab Four".to_string()],
            tags: vec!["rock".to_string(), "60s".to_string()],
            genres: vec![
                "Q11399".to_string(),
                "http://www.wikidata.org/entity/Q37073".to_string(),
                "garbage".to_string(),
            ],
            similar_artists: vec![
                "The Rolling Stones".to_string(),
                "Q15935".to_string(),
                "The Rolling Stones".to_string(),
            ],
            inception_year: Some(1960),
        }
    }

    fn make_valid_album() -> AlbumFacts {
        AlbumFacts {
            id: "Q173643".to_string(),
            title: "Abbey Road".to_string(),
            year: Some(1969),
            artist_id: "Q1299".to_string(),
        }
    }

    fn make_valid_track() -> TrackFacts {
        TrackFacts {
            id: "Q1057036".to_string(),
            title: "Come Together".to_string(),
            album_id: "Q173643".to_string(),
            track_number: Some(1),
        }
    }

    #[test]
    fn test_valid_artist() {
        let node = validate_artist(&make_valid_artist()).unwrap();
        assert_eq!(node.name, "The Beatles");
        assert_eq!(node.aliases, vec!["Fab Four"]);
        assert_eq!(node.tags, vec!["60s", "rock"]);
        assert_eq!(node.genres, vec![qid("Q11399"), qid("Q37073")]);
        assert_eq!(
            node.similar_artists,
            vec![
                ArtistRef::Name("The Rolling Stones".to_string()),
                ArtistRef::Id(qid("Q15935")),
            ]
        );
    }

    #[test]
    fn test_artist_invalid_id() {
        let mut artist = make_valid_artist();
        artist.id = "".to_string();
        let result = validate_artist(&artist);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidId {
                entity_type: "Artist",
                ..
            })
        ));
        assert!(matches!(
            result.unwrap_err().into_issue(),
            PipelineIssue::MissingIdentifier { .. }
        ));
    }

    #[test]
    fn test_artist_empty_name() {
        let mut artist = make_valid_artist();
        artist.name = "   ".to_string();
        let result = validate_artist(&artist);
        assert!(matches!(
            result,
            Err(ValidationError::EmptyField { field: "name", .. })
        ));
        assert!(matches!(
            result.unwrap_err().into_issue(),
            PipelineIssue::IncompleteMetadata { field: "name", .. }
        ));
    }

    #[test]
    fn test_valid_album_and_track() {
        let album = validate_album(&make_valid_album()).unwrap();
        assert_eq!(album.artist_id, Some(qid("Q1299")));
        let track = validate_track(&make_valid_track()).unwrap();
        assert_eq!(track.album_id, Some(qid("Q173643")));
        assert_eq!(track.track_number, Some(1));
    }

    #[test]
    fn test_album_malformed_reference_is_absent() {
        let mut album = make_valid_album();
        album.artist_id = "The Beatles".to_string();
        assert_eq!(validate_album(&album).unwrap().artist_id, None);
    }

    #[test]
    fn test_track_empty_title() {
        let mut track = make_valid_track();
        track.title = "".to_string();
        assert!(matches!(
            validate_track(&track),
            Err(ValidationError::EmptyField { field: "title", .. })
        ));
    }

    #[test]
    fn test_genre_validation() {
        let genre = GenreFacts {
            id: "Q11399".to_string(),
            name: "rock music".to_string(),
            aliases: vec!["rock".to_string()],
        };
        assert_eq!(validate_genre(&genre).unwrap().name, "rock music");
        let bad = GenreFacts {
            id: "rock".to_string(),
            ..genre
        };
        assert!(validate_genre(&bad).is_err());
    }

    #[test]
    fn test_validate_edge_endpoints() {
        let mut table = NodeTable::new();
        table.upsert(Node::Artist(validate_artist(&make_valid_artist()).unwrap()));
        table.upsert(Node::Album(validate_album(&make_valid_album()).unwrap()));

        let ok = Edge::new(EdgeKind::PerformedBy, qid("Q173643"), qid("Q1299"));
        assert!(validate_edge(&ok, &table).is_ok());

        let missing = Edge::new(EdgeKind::HasGenre, qid("Q1299"), qid("Q11399"));
        assert!(matches!(
            validate_edge(&missing, &table),
            Err(ValidationError::MissingEndpoint { .. })
        ));

        let wrong = Edge::new(EdgeKind::PerformedBy, qid("Q1299"), qid("Q173643"));
        let err = validate_edge(&wrong, &table).unwrap_err();
        assert!(matches!(err, ValidationError::WrongEndpointType { .. }));
        assert!(matches!(
            err.into_issue(),
            PipelineIssue::DanglingEdge { .. }
        ));
    }
}
