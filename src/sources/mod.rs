//! Readers for the artifacts produced by the upstream fetchers.
//!
//! Network access is out of scope here: every source reads the on-disk
//! caches and JSONL datasets the fetchers leave behind, keyed by QID.

mod enrich;
mod jsonl;
pub mod lastfm;
mod wikipedia;
pub mod wikidata;

pub use enrich::EnrichedFacts;
pub use jsonl::{load_artist_index, read_jsonl, FactsPaths, JsonlFacts, JsonlRead};
pub use lastfm::{LastFmCache, LastFmInfo};
pub use wikidata::{WikidataCache, WikidataEntity};
pub use wikipedia::WikipediaCache;

use crate::model::{ArtistIndexRecord, EntityFacts};
use crate::qid::Qid;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} is empty")]
    Empty(String),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed payload in {path:?}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Provides raw article text for an artist index row.
pub trait ArticleSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn fetch_text(&self, record: &ArtistIndexRecord) -> Result<String, SourceError>;
}

/// Provides entity facts for an artist QID.
pub trait FactsSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn facts(&self, qid: &Qid) -> Result<EntityFacts, SourceError>;
}

/// A facts source that knows nothing. Every lookup returns empty facts.
pub struct NullFactsSource;

impl FactsSource for NullFactsSource {
    fn name(&self) -> &'static str {
        "null"
    }

    fn facts(&self, _qid: &Qid) -> Result<EntityFacts, SourceError> {
        Ok(EntityFacts::default())
    }
}

pub(crate) fn read_file(path: &std::path::Path) -> Result<String, SourceError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SourceError::NotFound(format!("{:?}", path)))
        }
        Err(e) => Err(SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub(crate) fn read_json(path: &std::path::Path) -> Result<serde_json::Value, SourceError> {
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|e| SourceError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
