use anyhow::{bail, Context, Result};
use clap::Parser;
use music_rag_etl::audit::{audit_file, ChunkAudit};
use music_rag_etl::cli_style::{self, get_styles, TableBuilder};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Audits a vectors.jsonl output for duplicates and broken chunk numbering.
#[derive(Parser, Debug)]
#[command(styles = get_styles())]
struct CliArgs {
    /// Path to the vector JSONL file.
    pub path: PathBuf,

    /// How many findings of each kind to list.
    #[clap(long, default_value_t = 5)]
    pub max_examples: usize,
}

fn print_findings(audit: &ChunkAudit, max: usize) {
    cli_style::print_section_header("Chunk Audit");
    cli_style::print_key_value("Rows", &audit.rows.to_string());

    let mut table = TableBuilder::new(vec!["Check", "Findings"]);
    let counts = [
        ("Malformed rows", audit.malformed.len()),
        ("Logical duplicates", audit.logical_duplicates.len()),
        ("Content duplicates", audit.content_duplicates.len()),
        ("Full-row duplicates", audit.full_row_duplicates),
        ("Index violations", audit.index_violations.len()),
    ];
    let rendered: Vec<(&str, String)> = counts
        .iter()
        .map(|(name, count)| (*name, count.to_string()))
        .collect();
    for (name, count) in &rendered {
        table.add_row(vec![*name, count.as_str()]);
    }
    table.print();

    for (line, message) in audit.malformed.iter().take(max) {
        cli_style::print_key_value(&format!("line {}", line), message);
    }
    for ((entity, index), count) in audit.logical_duplicates.iter().take(max) {
        cli_style::print_key_value(
            &format!("{} chunk {}", entity, index),
            &format!("stored {} times", count),
        );
    }
    for (digest, count) in audit.content_duplicates.iter().take(max) {
        cli_style::print_key_value(
            &format!("text {}", &digest[..12.min(digest.len())]),
            &format!("shared by {} rows", count),
        );
    }
    for violation in audit.index_violations.iter().take(max) {
        cli_style::print_warning(&violation.to_string());
    }
    if audit.is_clean() {
        cli_style::print_empty_list("nothing to report");
    }
    cli_style::print_section_footer();
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

    info!("Auditing {:?}", cli_args.path);
    let audit = audit_file(&cli_args.path)?;
    print_findings(&audit, cli_args.max_examples);

    if !audit.is_clean() {
        cli_style::print_error(&format!("{} problems found", audit.problem_count()));
        bail!("{:?} failed the chunk audit", cli_args.path);
    }
    cli_style::print_success("All chunks consistent");
    Ok(())
}
