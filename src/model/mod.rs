//! Records flowing through the pipeline: articles, chunks, entity facts and graph elements.

mod article;
mod chunk;
mod facts;
mod graph;

pub use article::{Article, ArtistIndexRecord, RawArticle};
pub use chunk::{Chunk, ChunkMetadata, VectorRecord};
pub use facts::{AlbumFacts, ArtistFacts, EntityFacts, GenreFacts, TrackFacts};
pub use graph::{
    AlbumNode, ArtistNode, ArtistRef, Edge, EdgeKind, GenreNode, Node, NodeKind, TrackNode,
};

use serde::{Deserialize, Deserializer};

/// Treats an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `"a"`, `["a", "b"]`, `"a|b"` or `null`.
pub(crate) fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<Option<String>>),
    }

    let values = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => s.split('|').map(str::to_string).collect(),
        Some(OneOrMany::Many(v)) => v.into_iter().flatten().collect(),
    };
    Ok(values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

/// Accepts a year as a number, a bare year string or an ISO-8601 date.
pub(crate) fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearValue {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<YearValue>::deserialize(deserializer)? {
        None => None,
        Some(YearValue::Number(n)) => i32::try_from(n).ok(),
        Some(YearValue::Text(s)) => crate::text::parse_inception_year(&s),
    })
}

/// Accepts a count as a number or a numeric string.
pub(crate) fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CountValue {
        Number(u64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<CountValue>::deserialize(deserializer)? {
        None => None,
        Some(CountValue::Number(n)) => Some(n),
        Some(CountValue::Float(f)) if f >= 0.0 => Some(f as u64),
        Some(CountValue::Float(_)) => None,
        Some(CountValue::Text(s)) => s.trim().parse().ok(),
    })
}
