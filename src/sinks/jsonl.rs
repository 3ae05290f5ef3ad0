use super::{write_atomic, VectorSink};
use crate::model::VectorRecord;
use crate::qid::Qid;
use crate::sources::read_jsonl;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A JSONL vector store: one record per line, grouped by article.
///
/// Existing records are loaded on open. An upsert replaces an article's
/// whole chunk set, so chunks an article no longer produces disappear. The
/// file is rewritten atomically once `batch_size` records are pending and on
/// flush. Lines are ordered by entity and chunk index.
pub struct JsonlVectorSink {
    path: PathBuf,
    batch_size: usize,
    articles: BTreeMap<String, Vec<VectorRecord>>,
    pending: usize,
}

fn sort_chunks(records: &mut [VectorRecord]) {
    records.sort_by(|a, b| {
        a.metadata
            .chunk_index
            .cmp(&b.metadata.chunk_index)
            .then_with(|| a.id.cmp(&b.id))
    });
}

impl JsonlVectorSink {
    pub fn open(path: &Path, batch_size: usize) -> Result<Self> {
        let mut articles: BTreeMap<String, Vec<VectorRecord>> = BTreeMap::new();
        if path.exists() {
            let read = read_jsonl::<VectorRecord>(path)?;
            if !read.malformed.is_empty() {
                warn!(
                    "Dropping {} malformed lines from {:?}",
                    read.malformed.len(),
                    path
                );
            }
            for record in read.records {
                let chunks = articles
                    .entry(record.metadata.wikidata_entity.clone())
                    .or_default();
                chunks.retain(|r| r.id != record.id);
                chunks.push(record);
            }
            for chunks in articles.values_mut() {
                sort_chunks(chunks);
            }
            info!(
                "Loaded {} existing vector records for {} articles from {:?}",
                articles.values().map(Vec::len).sum::<usize>(),
                articles.len(),
                path
            );
        }
        Ok(JsonlVectorSink {
            path: path.to_path_buf(),
            batch_size: batch_size.max(1),
            articles,
            pending: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.articles.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&VectorRecord> {
        self.articles.values().flatten().find(|r| r.id == id)
    }

    fn write_all(&mut self) -> Result<()> {
        let articles = &self.articles;
        write_atomic(&self.path, |w| {
            for record in articles.values().flatten() {
                serde_json::to_writer(&mut *w, record)?;
                w.write_all(b"\n")?;
            }
            Ok(())
        })?;
        debug!("Wrote {} vector records to {:?}", self.len(), self.path);
        self.pending = 0;
        Ok(())
    }
}

impl VectorSink for JsonlVectorSink {
    fn upsert(&mut self, entity: &Qid, records: &[VectorRecord]) -> Result<usize> {
        let mut chunks = records.to_vec();
        sort_chunks(&mut chunks);
        let previous = if chunks.is_empty() {
            self.articles.remove(entity.as_str())
        } else {
            self.articles.insert(entity.to_string(), chunks)
        };
        if let Some(previous) = previous {
            if previous.len() > records.len() {
                debug!(
                    "{}: dropped {} stale chunks",
                    entity,
                    previous.len() - records.len()
                );
            }
        }
        self.pending += records.len();
        if self.pending >= self.batch_size {
            self.write_all()?;
        }
        Ok(records.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.write_all()
    }
}
