//! Identity resolution for raw articles.
//!
//! Two records describe the same artist when they share a Wikipedia URL, a
//! Wikidata QID or (optionally) a normalized artist name. Within a group the
//! record with the longest text survives; on equal length the first one seen
//! wins. Keys of a dropped record keep pointing at the survivor, so chains of
//! partial matches collapse into a single article.

use crate::model::{Article, RawArticle};
use crate::qid::Qid;
use crate::report::{IssueLog, PipelineIssue};
use crate::text::normalize_name;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    Url(String),
    Qid(Qid),
    Name(String),
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Url(url) => write!(f, "url {}", url),
            IdentityKey::Qid(qid) => write!(f, "wikidata_id {}", qid),
            IdentityKey::Name(name) => write!(f, "artist name '{}'", name),
        }
    }
}

struct Candidate {
    seq: usize,
    qid: Qid,
    raw: RawArticle,
    keys: Vec<IdentityKey>,
}

impl Candidate {
    fn label(&self) -> String {
        match &self.raw.artist_name {
            Some(name) => format!("{} ({})", self.qid, name),
            None => self.qid.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DedupStats {
    pub seen: usize,
    pub kept: usize,
    pub duplicates: usize,
    pub missing_identifier: usize,
}

/// Incremental deduplicator. Feed records with [`Deduplicator::push`] and
/// collect survivors, in first-seen order, with [`Deduplicator::finish`].
pub struct Deduplicator {
    match_names: bool,
    slots: Vec<Option<Candidate>>,
    index: HashMap<IdentityKey, usize>,
    stats: DedupStats,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Deduplicator {
    pub fn new(match_names: bool) -> Self {
        Deduplicator {
            match_names,
            slots: Vec::new(),
            index: HashMap::new(),
            stats: DedupStats::default(),
        }
    }

    pub fn push(&mut self, raw: RawArticle, issues: &mut IssueLog) {
        let seq = self.stats.seen;
        self.stats.seen += 1;

        let url = normalize_url(&raw.url);
        if url.is_empty() {
            self.stats.missing_identifier += 1;
            issues.record(PipelineIssue::MissingIdentifier {
                record: raw_label(&raw, seq),
                field: "wikipedia_url",
            });
            return;
        }
        let qid = match Qid::parse(&raw.external_id) {
            Ok(qid) => qid,
            Err(_) => {
                self.stats.missing_identifier += 1;
                issues.record(PipelineIssue::MissingIdentifier {
                    record: raw_label(&raw, seq),
                    field: "wikidata_id",
                });
                return;
            }
        };

        let mut keys = vec![IdentityKey::Url(url), IdentityKey::Qid(qid.clone())];
        if self.match_names {
            if let Some(name) = raw.artist_name.as_deref().map(normalize_name) {
                if !name.is_empty() {
                    keys.push(IdentityKey::Name(name));
                }
            }
        }

        // Slots this record collides with, each with the first key that matched.
        let mut matched: Vec<(usize, IdentityKey)> = Vec::new();
        for key in &keys {
            if let Some(&slot) = self.index.get(key) {
                if !matched.iter().any(|(s, _)| *s == slot) {
                    matched.push((slot, key.clone()));
                }
            }
        }

        let candidate = Candidate {
            seq,
            qid,
            raw,
            keys,
        };

        if matched.is_empty() {
            let slot = self.slots.len();
            for key in &candidate.keys {
                self.index.insert(key.clone(), slot);
            }
            self.slots.push(Some(candidate));
            return;
        }

        matched.sort_by_key(|(slot, _)| *slot);
        let home = matched[0].0;
        let first_key = matched[0].1.clone();

        let mut group_keys = candidate.keys.clone();
        let mut contenders: Vec<(Candidate, IdentityKey)> = vec![(candidate, first_key)];
        for (slot, key) in matched {
            if let Some(existing) = self.slots[slot].take() {
                group_keys.extend(existing.keys.iter().cloned());
                contenders.push((existing, key));
            }
        }

        let winner_pos = contenders
            .iter()
            .enumerate()
            .max_by(|(_, (a, _)), (_, (b, _))| {
                a.raw
                    .text_len()
                    .cmp(&b.raw.text_len())
                    .then_with(|| b.seq.cmp(&a.seq))
            })
            .map(|(pos, _)| pos)
            .unwrap_or(0);
        let (mut winner, _) = contenders.swap_remove(winner_pos);

        for (loser, key) in contenders {
            self.stats.duplicates += 1;
            issues.record(PipelineIssue::DuplicateRecord {
                survivor: winner.label(),
                loser: loser.label(),
                key: key.to_string(),
            });
        }

        group_keys.sort_by_key(|k| k.to_string());
        group_keys.dedup();
        for key in &group_keys {
            self.index.insert(key.clone(), home);
        }
        winner.keys = group_keys;
        self.slots[home] = Some(winner);
    }

    pub fn stats(&self) -> DedupStats {
        let mut stats = self.stats;
        stats.kept = self.slots.iter().filter(|s| s.is_some()).count();
        stats
    }

    pub fn finish(self) -> Vec<Article> {
        let stats = self.stats();
        info!(
            "Deduplicated {} records: {} kept, {} duplicates, {} without identifier",
            stats.seen, stats.kept, stats.duplicates, stats.missing_identifier
        );
        self.slots
            .into_iter()
            .flatten()
            .map(|c| Article::from_raw(c.qid, c.raw))
            .collect()
    }
}

/// Convenience wrapper running a whole batch through a [`Deduplicator`].
pub fn deduplicate(
    records: Vec<RawArticle>,
    match_names: bool,
    issues: &mut IssueLog,
) -> Vec<Article> {
    let mut dedup = Deduplicator::new(match_names);
    for record in records {
        dedup.push(record, issues);
    }
    dedup.finish()
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn raw_label(raw: &RawArticle, seq: usize) -> String {
    if !raw.external_id.trim().is_empty() {
        raw.external_id.trim().to_string()
    } else if !raw.url.trim().is_empty() {
        raw.url.trim().to_string()
    } else if let Some(name) = &raw.artist_name {
        format!("record #{} ({})", seq, name)
    } else {
        format!("record #{}", seq)
    }
}
