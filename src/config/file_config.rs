use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub data_dir: Option<String>,
    pub output_dir: Option<String>,
    pub dry_run: Option<bool>,
    pub threads: Option<usize>,
    pub batch_size: Option<usize>,
    pub report_path: Option<String>,
    pub dedup_by_name: Option<bool>,
    pub resolve_similar_by_name: Option<bool>,

    // Stage configs
    pub chunking: Option<ChunkingConfig>,
    pub sources: Option<SourcesConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub respect_separators: Option<bool>,
    /// Prefix chunk text with artist and genre lines.
    pub enrich_text: Option<bool>,
}

/// Input locations. Relative paths are resolved against `data_dir`.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub artist_index: Option<String>,
    pub articles_dir: Option<String>,
    pub facts_dir: Option<String>,
    pub wikidata_dir: Option<String>,
    pub lastfm_dir: Option<String>,
    pub lastfm_top_n: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
