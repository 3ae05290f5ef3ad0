//! Cached Last.fm `artist.getInfo` responses.
//!
//! Responses are stored as `<dir>/<sha256(lowercase name)>.json`.

use super::{read_json, SourceError};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

pub const DEFAULT_TOP_N: usize = 5;

/// Tags and similar artists for one artist, trimmed to the top N of each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastFmInfo {
    pub tags: Vec<String>,
    pub similar: Vec<String>,
}

#[derive(Deserialize)]
struct ArtistInfoResponse {
    artist: Option<ArtistInfo>,
    error: Option<i64>,
}

#[derive(Deserialize)]
struct ArtistInfo {
    tags: Option<TagsContainer>,
    similar: Option<SimilarContainer>,
}

#[derive(Deserialize)]
struct TagsContainer {
    #[serde(default, deserialize_with = "one_or_many")]
    tag: Vec<Named>,
}

#[derive(Deserialize)]
struct SimilarContainer {
    #[serde(default, deserialize_with = "one_or_many")]
    artist: Vec<Named>,
}

#[derive(Deserialize)]
struct Named {
    name: Option<String>,
}

// Last.fm collapses single-element lists into a bare object.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Named>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Named>),
        One(Named),
        None(()),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(list) => list,
        OneOrMany::One(named) => vec![named],
        OneOrMany::None(_) => Vec::new(),
    })
}

fn top_names(list: Vec<Named>, n: usize) -> Vec<String> {
    list.into_iter()
        .filter_map(|named| named.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .take(n)
        .collect()
}

pub struct LastFmCache {
    dir: PathBuf,
    top_n: usize,
}

impl LastFmCache {
    pub fn new(dir: impl Into<PathBuf>, top_n: usize) -> Self {
        LastFmCache {
            dir: dir.into(),
            top_n,
        }
    }

    pub fn cache_key(artist_name: &str) -> String {
        let digest = Sha256::digest(artist_name.trim().to_lowercase().as_bytes());
        format!("{:x}", digest)
    }

    /// Returns `None` when the cached response is a Last.fm error payload
    /// (e.g. unknown artist).
    pub fn lookup(&self, artist_name: &str) -> Result<Option<LastFmInfo>, SourceError> {
        let path = self
            .dir
            .join(format!("{}.json", Self::cache_key(artist_name)));
        let value = read_json(&path)?;
        let response: ArtistInfoResponse =
            serde_json::from_value(value).map_err(|e| SourceError::Malformed {
                path,
                message: e.to_string(),
            })?;
        if response.error.is_some() {
            return Ok(None);
        }
        Ok(response.artist.map(|artist| LastFmInfo {
            tags: top_names(artist.tags.map(|t| t.tag).unwrap_or_default(), self.top_n),
            similar: top_names(
                artist.similar.map(|s| s.artist).unwrap_or_default(),
                self.top_n,
            ),
        }))
    }
}
