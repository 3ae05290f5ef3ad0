use anyhow::{Context, Result};
use clap::Parser;
use music_rag_etl::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use music_rag_etl::cli_style::{self, get_styles};
use music_rag_etl::config::{AppConfig, CliConfig, FileConfig, DEFAULT_BATCH_SIZE};
use music_rag_etl::pipeline::run_from_config;
use music_rag_etl::sources::lastfm::DEFAULT_TOP_N;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Builds vector documents and the music entity graph from cached artist data.
#[derive(Parser, Debug)]
#[command(styles = get_styles(), version = env!("APP_VERSION"))]
struct CliArgs {
    /// Directory holding the artist index, article cache and facts datasets.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// Optional TOML config file. Its values override command line flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Where vectors.jsonl, graph.json and graph.cypher are written.
    /// Defaults to <data-dir>/out.
    #[clap(long, value_parser = parse_path)]
    pub output_dir: Option<PathBuf>,

    /// Maximum chunk length in characters.
    #[clap(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[clap(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,

    /// Cut chunks at exact lengths instead of snapping to separators.
    #[clap(long)]
    pub no_separators: bool,

    /// Store raw chunk text without the title and genre prefix.
    #[clap(long)]
    pub no_enrich_text: bool,

    /// Vector records per sink write.
    #[clap(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Last.fm tags and similar artists kept per artist.
    #[clap(long, default_value_t = DEFAULT_TOP_N)]
    pub lastfm_top_n: usize,

    /// Worker threads. Defaults to one per core.
    #[clap(long)]
    pub threads: Option<usize>,

    /// Run every stage but write nothing.
    #[clap(long)]
    pub dry_run: bool,

    /// Only treat records as duplicates on URL or QID, not on artist name.
    #[clap(long)]
    pub no_name_dedup: bool,

    /// Only link similar artists given by QID.
    #[clap(long)]
    pub no_similar_by_name: bool,

    /// Write the run report as JSON to this path.
    #[clap(long, value_parser = parse_path)]
    pub report_json: Option<PathBuf>,

    /// Hide progress bars.
    #[clap(long)]
    pub no_progress: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            data_dir: self.data_dir.clone(),
            output_dir: self.output_dir.clone(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            respect_separators: !self.no_separators,
            enrich_text: !self.no_enrich_text,
            batch_size: self.batch_size,
            lastfm_top_n: self.lastfm_top_n,
            threads: self.threads,
            dry_run: self.dry_run,
            report_path: self.report_json.clone(),
            dedup_by_name: !self.no_name_dedup,
            resolve_similar_by_name: !self.no_similar_by_name,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = match AppConfig::resolve(&cli_args.to_cli_config(), file_config) {
        Ok(config) => config,
        Err(e) => {
            cli_style::print_error(&format!("{:#}", e));
            return Err(e);
        }
    };

    info!("Reading from {:?}", config.data_dir);
    if !config.dry_run {
        info!("Writing to {:?}", config.output_dir);
    }
    let (report, _issues) = run_from_config(&config, !cli_args.no_progress)?;

    cli_style::print_run_summary(&report);

    if let Some(path) = &config.report_path {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report to {:?}", path))?;
        cli_style::print_info(&format!("Report written to {}", path.display()));
    }

    Ok(())
}
