mod file_config;

pub use file_config::{ChunkingConfig, FileConfig, SourcesConfig};

use crate::chunker::{ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::sources::lastfm::DEFAULT_TOP_N;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub respect_separators: bool,
    pub enrich_text: bool,
    pub batch_size: usize,
    pub lastfm_top_n: usize,
    pub threads: Option<usize>,
    pub dry_run: bool,
    pub report_path: Option<PathBuf>,
    pub dedup_by_name: bool,
    pub resolve_similar_by_name: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            output_dir: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            respect_separators: true,
            enrich_text: true,
            batch_size: DEFAULT_BATCH_SIZE,
            lastfm_top_n: DEFAULT_TOP_N,
            threads: None,
            dry_run: false,
            report_path: None,
            dedup_by_name: true,
            resolve_similar_by_name: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub threads: Option<usize>,
    pub batch_size: usize,
    pub report_path: Option<PathBuf>,
    pub dedup_by_name: bool,
    pub resolve_similar_by_name: bool,

    // Stage settings
    pub chunking: ChunkingSettings,
    pub sources: SourceSettings,
}

#[derive(Debug, Clone)]
pub struct ChunkingSettings {
    pub chunker: ChunkerConfig,
    pub enrich_text: bool,
}

/// Resolved input locations. Optional caches are `None` when absent on disk.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub artist_index: PathBuf,
    pub articles_dir: PathBuf,
    pub facts_dir: PathBuf,
    pub wikidata_dir: Option<PathBuf>,
    pub lastfm_dir: Option<PathBuf>,
    pub lastfm_top_n: usize,
}

fn under(base: &Path, value: Option<String>, default: &str) -> PathBuf {
    let path = PathBuf::from(value.unwrap_or_else(|| default.to_string()));
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn existing_dir(path: PathBuf) -> Option<PathBuf> {
    path.is_dir().then_some(path)
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;

        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let output_dir = file
            .output_dir
            .map(PathBuf::from)
            .or_else(|| cli.output_dir.clone())
            .unwrap_or_else(|| data_dir.join("out"));

        let dry_run = file.dry_run.unwrap_or(cli.dry_run);
        let threads = file.threads.or(cli.threads);
        if threads == Some(0) {
            bail!("threads must be greater than zero");
        }
        let batch_size = file.batch_size.unwrap_or(cli.batch_size);
        if batch_size == 0 {
            bail!("batch_size must be greater than zero");
        }
        let report_path = file
            .report_path
            .map(PathBuf::from)
            .or_else(|| cli.report_path.clone());
        let dedup_by_name = file.dedup_by_name.unwrap_or(cli.dedup_by_name);
        let resolve_similar_by_name = file
            .resolve_similar_by_name
            .unwrap_or(cli.resolve_similar_by_name);

        // Chunking settings - merge file config with CLI values
        let chunking_file = file.chunking.unwrap_or_default();
        let chunker = match ChunkerConfig::new(
            chunking_file.chunk_size.unwrap_or(cli.chunk_size),
            chunking_file.chunk_overlap.unwrap_or(cli.chunk_overlap),
            chunking_file
                .respect_separators
                .unwrap_or(cli.respect_separators),
        ) {
            Ok(config) => config,
            Err(e) => bail!("Invalid chunking settings: {}", e),
        };
        let chunking = ChunkingSettings {
            chunker,
            enrich_text: chunking_file.enrich_text.unwrap_or(cli.enrich_text),
        };

        // Input locations, relative to data_dir
        let sources_file = file.sources.unwrap_or_default();
        let artist_index = under(&data_dir, sources_file.artist_index, "artist_index.jsonl");
        if !artist_index.is_file() {
            bail!("Artist index not found: {:?}", artist_index);
        }
        let sources = SourceSettings {
            artist_index,
            articles_dir: under(&data_dir, sources_file.articles_dir, "wikipedia_articles"),
            facts_dir: under(&data_dir, sources_file.facts_dir, "."),
            wikidata_dir: existing_dir(under(&data_dir, sources_file.wikidata_dir, "wikidata")),
            lastfm_dir: existing_dir(under(&data_dir, sources_file.lastfm_dir, "last_fm")),
            lastfm_top_n: sources_file.lastfm_top_n.unwrap_or(cli.lastfm_top_n),
        };

        Ok(Self {
            data_dir,
            output_dir,
            dry_run,
            threads,
            batch_size,
            report_path,
            dedup_by_name,
            resolve_similar_by_name,
            chunking,
            sources,
        })
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.output_dir.join("vectors.jsonl")
    }

    pub fn graph_snapshot_path(&self) -> PathBuf {
        self.output_dir.join("graph.json")
    }

    pub fn cypher_script_path(&self) -> PathBuf {
        self.output_dir.join("graph.cypher")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("artist_index.jsonl"), "").unwrap();
        dir
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_data_dir();
        let cli = CliConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            output_dir: Some(PathBuf::from("/tmp/etl-out")),
            chunk_size: 500,
            chunk_overlap: 50,
            respect_separators: false,
            enrich_text: false,
            batch_size: 8,
            lastfm_top_n: 3,
            threads: Some(2),
            dry_run: true,
            report_path: Some(PathBuf::from("/tmp/report.json")),
            dedup_by_name: false,
            resolve_similar_by_name: false,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(config.output_dir, PathBuf::from("/tmp/etl-out"));
        assert_eq!(config.chunking.chunker.chunk_size, 500);
        assert_eq!(config.chunking.chunker.overlap, 50);
        assert!(!config.chunking.chunker.respect_separators);
        assert!(!config.chunking.enrich_text);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.sources.lastfm_top_n, 3);
        assert_eq!(config.threads, Some(2));
        assert!(config.dry_run);
        assert_eq!(config.report_path, Some(PathBuf::from("/tmp/report.json")));
        assert!(!config.dedup_by_name);
        assert!(!config.resolve_similar_by_name);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_data_dir();
        let cli = CliConfig {
            data_dir: Some(PathBuf::from("/should/be/overridden")),
            chunk_size: 800,
            batch_size: 16,
            ..Default::default()
        };

        let file_config = FileConfig {
            data_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            dry_run: Some(true),
            chunking: Some(ChunkingConfig {
                chunk_size: Some(300),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(config.chunking.chunker.chunk_size, 300);
        assert!(config.dry_run);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.chunking.chunker.overlap, DEFAULT_CHUNK_OVERLAP);
    }

    #[test]
    fn test_resolve_defaults() {
        let temp_dir = make_temp_data_dir();
        let cli = CliConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.output_dir, temp_dir.path().join("out"));
        assert_eq!(config.chunking.chunker, ChunkerConfig::default());
        assert!(config.chunking.enrich_text);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.sources.lastfm_top_n, 5);
        assert_eq!(
            config.sources.articles_dir,
            temp_dir.path().join("wikipedia_articles")
        );
        assert!(config.sources.wikidata_dir.is_none());
        assert!(config.sources.lastfm_dir.is_none());
        assert!(config.threads.is_none());
        assert!(!config.dry_run);
    }

    #[test]
    fn test_resolve_detects_optional_caches() {
        let temp_dir = make_temp_data_dir();
        std::fs::create_dir(temp_dir.path().join("wikidata")).unwrap();
        let cli = CliConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(
            config.sources.wikidata_dir,
            Some(temp_dir.path().join("wikidata"))
        );
        assert!(config.sources.lastfm_dir.is_none());
    }

    #[test]
    fn test_resolve_missing_data_dir_error() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("data_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_data_dir_error() {
        let cli = CliConfig {
            data_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_data_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            data_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_missing_artist_index_error() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Artist index not found"));
    }

    #[test]
    fn test_resolve_invalid_chunking_error() {
        let temp_dir = make_temp_data_dir();
        let cli = CliConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid chunking settings"));
    }

    #[test]
    fn test_resolve_zero_batch_size_error() {
        let temp_dir = make_temp_data_dir();
        let cli = CliConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            batch_size: 0,
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("batch_size"));
    }

    #[test]
    fn test_output_path_helpers() {
        let temp_dir = make_temp_data_dir();
        let cli = CliConfig {
            data_dir: Some(temp_dir.path().to_path_buf()),
            output_dir: Some(PathBuf::from("/out")),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.vectors_path(), PathBuf::from("/out/vectors.jsonl"));
        assert_eq!(config.graph_snapshot_path(), PathBuf::from("/out/graph.json"));
        assert_eq!(config.cypher_script_path(), PathBuf::from("/out/graph.cypher"));
    }
}
