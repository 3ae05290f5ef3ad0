//! Builds the flat per-chunk metadata records for the vector store.

use crate::model::{Article, Chunk, ChunkMetadata};
use crate::qid::Qid;
use crate::report::PipelineIssue;
use crate::text::title_from_url;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

pub const UNKNOWN_GENRE: &str = "Unknown Genre";

/// Article-level facts shared by every chunk of the article.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFacts {
    pub genres: BTreeSet<String>,
    pub inception_year: Option<i32>,
    pub relevance_score: f64,
}

/// Maps genre QIDs to their labels.
#[derive(Debug, Clone, Default)]
pub struct GenreLabels {
    labels: HashMap<Qid, String>,
}

impl GenreLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later inserts replace earlier labels.
    pub fn insert(&mut self, qid: Qid, label: String) {
        let label = label.trim().to_string();
        if !label.is_empty() {
            self.labels.insert(qid, label);
        }
    }

    pub fn get(&self, qid: &Qid) -> Option<&str> {
        self.labels.get(qid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Resolves genre references. QIDs map through the table and are
    /// skipped when unknown; anything else is taken as a literal label.
    pub fn resolve(&self, refs: &[String]) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for r in refs {
            match Qid::parse(r) {
                Ok(qid) => match self.get(&qid) {
                    Some(label) => {
                        out.insert(label.to_string());
                    }
                    None => debug!("No label for genre {}", qid),
                },
                Err(_) => {
                    let label = r.trim();
                    if !label.is_empty() {
                        out.insert(label.to_string());
                    }
                }
            }
        }
        out
    }
}

/// Min-max normalised link counts, aligned with `linkcounts`.
///
/// When all present counts are equal every article scores 0.5. Articles
/// without a count score 0.0.
pub fn relevance_scores(linkcounts: &[Option<u64>]) -> Vec<f64> {
    let present = linkcounts.iter().flatten();
    let min = present.clone().min().copied();
    let max = present.max().copied();
    let (min, max) = match (min, max) {
        (Some(min), Some(max)) => (min, max),
        _ => return vec![0.0; linkcounts.len()],
    };

    linkcounts
        .iter()
        .map(|count| match count {
            None => 0.0,
            Some(_) if max == min => 0.5,
            Some(c) => (c - min) as f64 / (max - min) as f64,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataAssembler {
    enrich_text: bool,
}

impl MetadataAssembler {
    pub fn new(enrich_text: bool) -> Self {
        MetadataAssembler { enrich_text }
    }

    /// The article title, falling back to the title encoded in its Wikipedia URL.
    pub fn resolve_title(article: &Article) -> Option<String> {
        article
            .title
            .as_ref()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| title_from_url(&article.url))
    }

    pub fn assemble(
        &self,
        article: &Article,
        facts: &ResolvedFacts,
        chunk: &Chunk,
    ) -> Result<ChunkMetadata, PipelineIssue> {
        let record = format!("{} chunk {}", article.qid, chunk.index);
        let title = Self::resolve_title(article).ok_or(PipelineIssue::IncompleteMetadata {
            record: record.clone(),
            field: "title",
        })?;
        let artist_name = article
            .artist_name
            .as_ref()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(PipelineIssue::IncompleteMetadata {
                record,
                field: "artist_name",
            })?;

        Ok(ChunkMetadata {
            title,
            artist_name,
            genres: facts.genres.clone(),
            inception_year: article.inception_year.or(facts.inception_year),
            wikipedia_url: article.url.clone(),
            wikidata_entity: article.qid.to_string(),
            relevance_score: facts.relevance_score,
            chunk_index: chunk.index,
            total_chunks: chunk.total,
        })
    }

    /// The text stored alongside the metadata, prefixed with title and genres
    /// when enrichment is on.
    pub fn document_text(&self, metadata: &ChunkMetadata, chunk: &Chunk) -> String {
        if !self.enrich_text {
            return chunk.text.clone();
        }
        let genres = if metadata.genres.is_empty() {
            UNKNOWN_GENRE.to_string()
        } else {
            metadata
                .genres
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Title: {}\nGenre: {}\nContent: {}",
            metadata.artist_name, genres, chunk.text
        )
    }
}
