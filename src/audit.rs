//! Consistency audit of a vector JSONL output.

use crate::model::VectorRecord;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexViolation {
    IndexOutOfRange {
        entity: String,
        index: usize,
        total: usize,
    },
    InconsistentTotal {
        entity: String,
        totals: Vec<usize>,
    },
    MissingIndices {
        entity: String,
        missing: Vec<usize>,
    },
}

impl fmt::Display for IndexViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexViolation::IndexOutOfRange {
                entity,
                index,
                total,
            } => write!(f, "{}: chunk index {} is not below total {}", entity, index, total),
            IndexViolation::InconsistentTotal { entity, totals } => {
                write!(f, "{}: conflicting chunk totals {:?}", entity, totals)
            }
            IndexViolation::MissingIndices { entity, missing } => {
                write!(f, "{}: missing chunk indices {:?}", entity, missing)
            }
        }
    }
}

/// Findings of one audit.
#[derive(Debug, Default)]
pub struct ChunkAudit {
    pub rows: usize,
    pub malformed: Vec<(usize, String)>,
    /// (entity, chunk index) pairs stored more than once, with their count.
    pub logical_duplicates: Vec<((String, usize), usize)>,
    /// Text digests shared by more than one row, with their count.
    pub content_duplicates: Vec<(String, usize)>,
    /// Rows that repeat an earlier row byte for byte.
    pub full_row_duplicates: usize,
    pub index_violations: Vec<IndexViolation>,
}

impl ChunkAudit {
    pub fn problem_count(&self) -> usize {
        self.malformed.len()
            + self.logical_duplicates.len()
            + self.content_duplicates.len()
            + self.full_row_duplicates
            + self.index_violations.len()
    }

    pub fn is_clean(&self) -> bool {
        self.problem_count() == 0
    }
}

fn text_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

fn repeated<K: Ord>(counts: HashMap<K, usize>) -> Vec<(K, usize)> {
    let mut out: Vec<(K, usize)> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

/// Audits JSONL lines. Line numbers in findings are 1-based.
pub fn audit_lines<I, S>(lines: I) -> ChunkAudit
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut audit = ChunkAudit::default();
    let mut seen_rows: BTreeSet<String> = BTreeSet::new();
    let mut logical: HashMap<(String, usize), usize> = HashMap::new();
    let mut content: HashMap<String, usize> = HashMap::new();
    let mut by_entity: BTreeMap<String, (BTreeSet<usize>, BTreeSet<usize>)> = BTreeMap::new();

    for (i, line) in lines.into_iter().enumerate() {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        audit.rows += 1;
        if !seen_rows.insert(line.to_string()) {
            audit.full_row_duplicates += 1;
        }
        let record: VectorRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                audit.malformed.push((i + 1, e.to_string()));
                continue;
            }
        };
        let meta = &record.metadata;
        *logical
            .entry((meta.wikidata_entity.clone(), meta.chunk_index))
            .or_default() += 1;
        *content.entry(text_digest(&record.text)).or_default() += 1;

        if meta.chunk_index >= meta.total_chunks {
            audit.index_violations.push(IndexViolation::IndexOutOfRange {
                entity: meta.wikidata_entity.clone(),
                index: meta.chunk_index,
                total: meta.total_chunks,
            });
        }
        let (indices, totals) = by_entity.entry(meta.wikidata_entity.clone()).or_default();
        indices.insert(meta.chunk_index);
        totals.insert(meta.total_chunks);
    }

    for (entity, (indices, totals)) in by_entity {
        if totals.len() > 1 {
            audit.index_violations.push(IndexViolation::InconsistentTotal {
                entity,
                totals: totals.into_iter().collect(),
            });
            continue;
        }
        let total = totals.into_iter().next().unwrap_or(0);
        let missing: Vec<usize> = (0..total).filter(|i| !indices.contains(i)).collect();
        if !missing.is_empty() {
            audit
                .index_violations
                .push(IndexViolation::MissingIndices { entity, missing });
        }
    }

    audit.logical_duplicates = repeated(logical);
    audit.content_duplicates = repeated(content);
    audit
}

pub fn audit_file(path: &Path) -> Result<ChunkAudit> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let lines = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<String>>>()
        .with_context(|| format!("Failed to read {:?}", path))?;
    Ok(audit_lines(lines))
}
