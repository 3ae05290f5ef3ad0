//! Splits article text into bounded, ordered, optionally overlapping spans.
//!
//! Budgets and offsets are counted in chars. Consecutive spans either touch or
//! overlap by at most `overlap` chars, so the spans always cover the whole text.

use crate::model::Chunk;
use crate::qid::Qid;

/// Preferred break points, highest priority first.
pub const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkerConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    /// Snap span ends back to a separator found in the second half of the window.
    pub respect_separators: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            respect_separators: true,
        }
    }
}

impl ChunkerConfig {
    pub fn new(
        chunk_size: usize,
        overlap: usize,
        respect_separators: bool,
    ) -> Result<Self, ChunkerConfigError> {
        let config = ChunkerConfig {
            chunk_size,
            overlap,
            respect_separators,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChunkerConfigError> {
        if self.chunk_size == 0 {
            return Err(ChunkerConfigError::ZeroChunkSize);
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkerConfigError::OverlapTooLarge {
                overlap: self.overlap,
                chunk_size: self.chunk_size,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    separators: Vec<Vec<char>>,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkerConfigError> {
        config.validate()?;
        Ok(Chunker {
            config,
            separators: SEPARATORS.iter().map(|s| s.chars().collect()).collect(),
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Char ranges `(start, end)` of the spans for `text`. Empty text yields none.
    pub fn split(&self, text: &str) -> Vec<(usize, usize)> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut spans = Vec::new();
        if len == 0 {
            return spans;
        }

        let mut start = 0;
        loop {
            let hard_end = (start + self.config.chunk_size).min(len);
            let end = if hard_end < len && self.config.respect_separators {
                self.snap_to_separator(&chars, start, hard_end)
            } else {
                hard_end
            };
            spans.push((start, end));
            if end >= len {
                break;
            }
            let next = end.saturating_sub(self.config.overlap);
            start = if next > start { next } else { end };
        }
        spans
    }

    fn snap_to_separator(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let floor = start + (hard_end - start) / 2;
        for sep in &self.separators {
            if sep.len() > hard_end - floor {
                continue;
            }
            let last = hard_end - sep.len();
            if let Some(pos) = (floor..=last)
                .rev()
                .find(|&i| chars[i..i + sep.len()] == sep[..])
            {
                let end = pos + sep.len();
                if end > start {
                    return end;
                }
            }
        }
        hard_end
    }

    /// Splits `text` into chunks of the article `article_id`.
    pub fn chunk(&self, article_id: &Qid, text: &str) -> Vec<Chunk> {
        let spans = self.split(text);
        let total = spans.len();
        let byte_offsets: Vec<usize> = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();

        spans
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                article_id: article_id.clone(),
                index,
                total,
                start,
                end,
                text: text[byte_offsets[start]..byte_offsets[end]].to_string(),
            })
            .collect()
    }
}

/// Rebuilds the source text from ordered chunks, dropping overlapping prefixes.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered: usize = 0;
    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.start);
        out.extend(chunk.text.chars().skip(skip));
        covered = covered.max(chunk.end);
    }
    out
}
