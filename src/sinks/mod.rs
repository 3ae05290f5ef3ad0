//! Output sinks for vector documents and graph entities.
//!
//! Every sink upserts: writing the same id twice leaves one entry holding the
//! later value. Chunks are replaced per article and outgoing edges per source
//! node, so a re-run converges on the current input even when it yields fewer
//! chunks or facts than before.

mod cypher;
mod graph_store;
mod jsonl;

pub use cypher::CypherScriptSink;
pub use graph_store::{GraphSnapshot, MemoryGraphStore};
pub use jsonl::JsonlVectorSink;

use crate::model::{Edge, Node, VectorRecord};
use crate::qid::Qid;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Stores chunk documents grouped by article.
pub trait VectorSink: Send {
    /// Makes `records` the complete chunk set of `entity`. Stored chunks of
    /// that article missing from `records` are removed. Returns how many were
    /// accepted.
    fn upsert(&mut self, entity: &Qid, records: &[VectorRecord]) -> Result<usize>;

    /// Makes every accepted record durable.
    fn flush(&mut self) -> Result<()>;
}

/// Stores graph nodes keyed by QID and edges keyed by (kind, source, target).
pub trait GraphSink: Send {
    fn upsert_nodes(&mut self, nodes: &[Node]) -> Result<usize>;

    fn upsert_edges(&mut self, edges: &[Edge]) -> Result<usize>;

    /// Replaces the stored outgoing edges of every node in `sources` with the
    /// ones in `edges`.
    fn set_outgoing_edges(&mut self, sources: &[Qid], edges: &[Edge]) -> Result<usize>;

    fn flush(&mut self) -> Result<()>;
}

/// Accepts and discards everything. Used for dry runs.
pub struct NullVectorSink;

impl VectorSink for NullVectorSink {
    fn upsert(&mut self, _entity: &Qid, records: &[VectorRecord]) -> Result<usize> {
        Ok(records.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct NullGraphSink;

impl GraphSink for NullGraphSink {
    fn upsert_nodes(&mut self, nodes: &[Node]) -> Result<usize> {
        Ok(nodes.len())
    }

    fn upsert_edges(&mut self, edges: &[Edge]) -> Result<usize> {
        Ok(edges.len())
    }

    fn set_outgoing_edges(&mut self, _sources: &[Qid], edges: &[Edge]) -> Result<usize> {
        Ok(edges.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes `path` through a temporary file in the same directory, so readers
/// never observe a half-written file.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
    {
        let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path)
        .with_context(|| format!("Failed to persist {:?}", path))?;
    Ok(())
}
