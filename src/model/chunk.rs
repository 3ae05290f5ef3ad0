use crate::qid::Qid;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// A bounded span of an article's cleaned text.
///
/// `start` and `end` are char offsets into the cleaned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub article_id: Qid,
    pub index: usize,
    pub total: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Flat metadata attached to each chunk in the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub title: String,
    pub artist_name: String,
    pub genres: BTreeSet<String>,
    pub inception_year: Option<i32>,
    pub wikipedia_url: String,
    pub wikidata_entity: String,
    pub relevance_score: f64,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A document ready for the vector sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    #[serde(alias = "article")]
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl VectorRecord {
    pub fn new(text: String, metadata: ChunkMetadata) -> Self {
        let id = Self::record_id(&metadata.wikidata_entity, metadata.chunk_index);
        VectorRecord { id, text, metadata }
    }

    /// Stable id for a chunk, so re-runs overwrite the same document.
    pub fn record_id(wikidata_entity: &str, chunk_index: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", wikidata_entity, chunk_index).as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
