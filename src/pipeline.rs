//! One batch run: sources → dedup → chunks + metadata → graph → sinks.
//!
//! Per-article work (text fetch, facts lookup, chunking, metadata) fans out
//! over rayon and is collected in input order. The node table has a single
//! writer: graph merging runs sequentially after the parallel stages.

use crate::chunker::{Chunker, ChunkerConfig};
use crate::config::AppConfig;
use crate::dedup::deduplicate;
use crate::graph::GraphBuilder;
use crate::metadata::{relevance_scores, GenreLabels, MetadataAssembler, ResolvedFacts};
use crate::model::{Article, ArtistIndexRecord, Edge, EntityFacts, Node, RawArticle, VectorRecord};
use crate::qid::Qid;
use crate::report::{IssueLog, PipelineIssue, RunReport};
use crate::sinks::{
    CypherScriptSink, GraphSink, JsonlVectorSink, MemoryGraphStore, NullGraphSink,
    NullVectorSink, VectorSink,
};
use crate::sources::{
    load_artist_index, ArticleSource, EnrichedFacts, FactsPaths, FactsSource, JsonlFacts,
    LastFmCache, WikidataCache, WikipediaCache,
};
use crate::text::clean_text;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunker: ChunkerConfig,
    pub enrich_text: bool,
    pub dedup_by_name: bool,
    pub resolve_similar_by_name: bool,
    pub dry_run: bool,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            chunker: ChunkerConfig::default(),
            enrich_text: true,
            dedup_by_name: true,
            resolve_similar_by_name: true,
            dry_run: false,
            show_progress: false,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        PipelineOptions {
            chunker: config.chunking.chunker,
            enrich_text: config.chunking.enrich_text,
            dedup_by_name: config.dedup_by_name,
            resolve_similar_by_name: config.resolve_similar_by_name,
            dry_run: config.dry_run,
            show_progress: false,
        }
    }
}

/// Chunks produced for one article, with the issues raised along the way.
struct ArticleOutput {
    records: Vec<VectorRecord>,
    skipped: usize,
    issues: IssueLog,
}

pub struct Pipeline {
    options: PipelineOptions,
    chunker: Chunker,
    assembler: MetadataAssembler,
    articles: Box<dyn ArticleSource>,
    facts: Box<dyn FactsSource>,
}

fn create_progress_bar(len: usize, msg: &str, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if visible {
        let style = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        pb.set_style(style);
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_message(msg.to_string());
    pb
}

fn has_identifiers(record: &ArtistIndexRecord) -> bool {
    !record.wikipedia_url.trim().is_empty() && Qid::parse(&record.wikidata_id).is_ok()
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        articles: Box<dyn ArticleSource>,
        facts: Box<dyn FactsSource>,
    ) -> Result<Self> {
        let chunker = Chunker::new(options.chunker).context("Invalid chunker settings")?;
        Ok(Pipeline {
            assembler: MetadataAssembler::new(options.enrich_text),
            chunker,
            options,
            articles,
            facts,
        })
    }

    /// Fetches and cleans article text. Records without usable identifiers
    /// pass through with empty text so the deduplicator can report them.
    fn fetch_articles(
        &self,
        records: &[ArtistIndexRecord],
        issues: &mut IssueLog,
    ) -> Vec<RawArticle> {
        let pb = create_progress_bar(records.len(), "Reading articles", self.options.show_progress);
        let fetched: Vec<Result<RawArticle, PipelineIssue>> = records
            .par_iter()
            .map(|record| {
                let result = if has_identifiers(record) {
                    self.articles
                        .fetch_text(record)
                        .map(|text| RawArticle::from_index(record, clean_text(&text)))
                        .map_err(|e| PipelineIssue::SourceFetchFailure {
                            source_name: self.articles.name(),
                            record: record.wikidata_id.trim().to_string(),
                            message: e.to_string(),
                        })
                } else {
                    Ok(RawArticle::from_index(record, String::new()))
                };
                pb.inc(1);
                result
            })
            .collect();
        pb.finish_and_clear();

        let mut raws = Vec::with_capacity(fetched.len());
        for result in fetched {
            match result {
                Ok(raw) => raws.push(raw),
                Err(issue) => issues.record(issue),
            }
        }
        raws
    }

    /// Looks up facts per article. Lookup failures are reported and the
    /// article proceeds with empty facts.
    fn fetch_facts(&self, articles: &[Article], issues: &mut IssueLog) -> Vec<EntityFacts> {
        let fetched: Vec<(EntityFacts, Option<PipelineIssue>)> = articles
            .par_iter()
            .map(|article| match self.facts.facts(&article.qid) {
                Ok(facts) => (facts, None),
                Err(e) => (
                    EntityFacts::default(),
                    Some(PipelineIssue::SourceFetchFailure {
                        source_name: self.facts.name(),
                        record: article.qid.to_string(),
                        message: e.to_string(),
                    }),
                ),
            })
            .collect();

        fetched
            .into_iter()
            .map(|(facts, issue)| {
                if let Some(issue) = issue {
                    issues.record(issue);
                }
                facts
            })
            .collect()
    }

    fn process_article(
        &self,
        article: &Article,
        facts: &EntityFacts,
        relevance_score: f64,
        labels: &GenreLabels,
    ) -> ArticleOutput {
        let mut refs = article.genres.clone();
        if let Some(artist) = &facts.artist {
            refs.extend(artist.genres.iter().cloned());
        }
        let resolved = ResolvedFacts {
            genres: labels.resolve(&refs),
            inception_year: facts.artist.as_ref().and_then(|a| a.inception_year),
            relevance_score,
        };

        let mut output = ArticleOutput {
            records: Vec::new(),
            skipped: 0,
            issues: IssueLog::new(),
        };
        for chunk in self.chunker.chunk(&article.qid, &article.text) {
            match self.assembler.assemble(article, &resolved, &chunk) {
                Ok(metadata) => {
                    let text = self.assembler.document_text(&metadata, &chunk);
                    output.records.push(VectorRecord::new(text, metadata));
                }
                Err(issue) => {
                    output.skipped += 1;
                    output.issues.record(issue);
                }
            }
        }
        output
    }

    /// Runs one batch and writes the results to the sinks.
    pub fn run(
        &self,
        records: Vec<ArtistIndexRecord>,
        vectors: &mut dyn VectorSink,
        graph: &mut dyn GraphSink,
        issues: &mut IssueLog,
    ) -> Result<RunReport> {
        let mut report = RunReport::start(self.options.dry_run);
        report.records_read = records.len();

        let raws = self.fetch_articles(&records, issues);
        let articles = deduplicate(raws, self.options.dedup_by_name, issues);
        report.articles_kept = articles.len();

        let linkcounts: Vec<Option<u64>> = articles.iter().map(|a| a.linkcount).collect();
        let scores = relevance_scores(&linkcounts);
        let facts = self.fetch_facts(&articles, issues);

        let mut labels = GenreLabels::new();
        for genre in facts.iter().flat_map(|f| f.genres.iter()) {
            if let Ok(qid) = Qid::parse(&genre.id) {
                labels.insert(qid, genre.name.clone());
            }
        }
        debug!("Resolved {} genre labels", labels.len());

        let pb = create_progress_bar(articles.len(), "Chunking", self.options.show_progress);
        let outputs: Vec<ArticleOutput> = articles
            .par_iter()
            .zip(facts.par_iter())
            .zip(scores.par_iter())
            .map(|((article, facts), score)| {
                let output = self.process_article(article, facts, *score, &labels);
                pb.inc(1);
                output
            })
            .collect();
        pb.finish_and_clear();

        let mut groups = Vec::with_capacity(outputs.len());
        for (article, output) in articles.iter().zip(outputs) {
            report.chunks_skipped += output.skipped;
            issues.extend(output.issues);
            groups.push((&article.qid, output.records));
        }
        info!(
            "Chunked {} articles into {} documents ({} skipped)",
            articles.len(),
            groups.iter().map(|(_, records)| records.len()).sum::<usize>(),
            report.chunks_skipped
        );

        let builder = GraphBuilder::new(self.options.resolve_similar_by_name);
        let graph_output = builder.build(facts.iter(), issues);

        // Each article's chunk set is written whole, so chunks it no longer
        // produces are dropped from the sink.
        for (qid, records) in &groups {
            report.chunks_written += vectors.upsert(qid, records)?;
        }
        vectors.flush()?;
        report.nodes_written = graph.upsert_nodes(&graph_output.nodes)?;
        let sources: Vec<Qid> = graph_output.nodes.iter().map(|n| n.id().clone()).collect();
        report.edges_written = graph.set_outgoing_edges(&sources, &graph_output.edges)?;
        graph.flush()?;

        report.finish(issues);
        Ok(report)
    }
}

/// Wires sources and sinks from `config` and runs one batch.
pub fn run_from_config(config: &AppConfig, show_progress: bool) -> Result<(RunReport, IssueLog)> {
    let mut issues = IssueLog::new();
    let records = load_artist_index(&config.sources.artist_index, &mut issues)?;

    let base = JsonlFacts::load(&FactsPaths::in_dir(&config.sources.facts_dir), &mut issues)?;
    let mut facts = EnrichedFacts::new(Box::new(base));
    if let Some(dir) = &config.sources.wikidata_dir {
        info!("Using Wikidata cache at {:?}", dir);
        facts = facts.with_wikidata(WikidataCache::new(dir));
    }
    if let Some(dir) = &config.sources.lastfm_dir {
        info!("Using Last.fm cache at {:?}", dir);
        facts = facts.with_lastfm(LastFmCache::new(dir, config.sources.lastfm_top_n));
    }

    let options = PipelineOptions {
        show_progress,
        ..PipelineOptions::from_config(config)
    };
    let pipeline = Pipeline::new(
        options,
        Box::new(WikipediaCache::new(&config.sources.articles_dir)),
        Box::new(facts),
    )?;

    let (mut vectors, mut graph): (Box<dyn VectorSink>, Box<dyn GraphSink>) = if config.dry_run
    {
        info!("Dry run, nothing will be written");
        (Box::new(NullVectorSink), Box::new(NullGraphSink))
    } else {
        std::fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("Failed to create output dir {:?}", config.output_dir))?;
        (
            Box::new(JsonlVectorSink::open(&config.vectors_path(), config.batch_size)?),
            Box::new(GraphSinks {
                store: MemoryGraphStore::open(&config.graph_snapshot_path())?,
                script: CypherScriptSink::new(&config.cypher_script_path()),
            }),
        )
    };

    let run = || pipeline.run(records, vectors.as_mut(), graph.as_mut(), &mut issues);
    let report = match config.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("Failed to build thread pool")?
            .install(run)?,
        None => run()?,
    };
    report.log_summary();
    Ok((report, issues))
}

/// The snapshot store, mirrored into a Cypher script on flush.
struct GraphSinks {
    store: MemoryGraphStore,
    script: CypherScriptSink,
}

impl GraphSink for GraphSinks {
    fn upsert_nodes(&mut self, nodes: &[Node]) -> Result<usize> {
        self.store.upsert_nodes(nodes)
    }

    fn upsert_edges(&mut self, edges: &[Edge]) -> Result<usize> {
        self.store.upsert_edges(edges)
    }

    fn set_outgoing_edges(&mut self, sources: &[Qid], edges: &[Edge]) -> Result<usize> {
        self.store.set_outgoing_edges(sources, edges)
    }

    // The script is rendered from the store, so it covers earlier runs too.
    fn flush(&mut self) -> Result<()> {
        self.store.flush()?;
        let snapshot = self.store.snapshot();
        self.script.upsert_nodes(&snapshot.nodes)?;
        self.script.upsert_edges(&snapshot.edges)?;
        self.script.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlbumFacts, ArtistFacts, GenreFacts};
    use crate::report::IssueKind;
    use crate::sources::SourceError;
    use std::collections::HashMap;

    struct MapArticles(HashMap<String, String>);

    impl ArticleSource for MapArticles {
        fn name(&self) -> &'static str {
            "map"
        }

        fn fetch_text(&self, record: &ArtistIndexRecord) -> Result<String, SourceError> {
            self.0
                .get(&record.wikidata_id)
                .cloned()
                .ok_or_else(|| SourceError::NotFound(record.wikidata_id.clone()))
        }
    }

    fn make_record(qid: &str, name: &str) -> ArtistIndexRecord {
        ArtistIndexRecord {
            wikidata_id: qid.to_string(),
            artist: name.to_string(),
            wikipedia_url: format!("https://en.wikipedia.org/wiki/{}", name.replace(' ', "_")),
            genres: vec!["Q11399".to_string()],
            ..Default::default()
        }
    }

    fn make_facts() -> JsonlFacts {
        JsonlFacts::from_records(
            vec![ArtistFacts {
                id: "Q1".to_string(),
                name: "Alpha".to_string(),
                genres: vec!["Q11399".to_string()],
                ..Default::default()
            }],
            vec![AlbumFacts {
                id: "Q10".to_string(),
                title: "First".to_string(),
                year: Some(1999),
                artist_id: "Q1".to_string(),
            }],
            vec![],
            vec![GenreFacts {
                id: "Q11399".to_string(),
                name: "rock music".to_string(),
                aliases: vec![],
            }],
        )
    }

    fn make_pipeline(chunk_size: usize) -> Pipeline {
        let articles = MapArticles(HashMap::from([
            ("Q1".to_string(), "a".repeat(250)),
            ("Q2".to_string(), "b".repeat(40)),
        ]));
        let options = PipelineOptions {
            chunker: ChunkerConfig::new(chunk_size, 0, false).unwrap(),
            enrich_text: false,
            ..Default::default()
        };
        Pipeline::new(options, Box::new(articles), Box::new(make_facts())).unwrap()
    }

    #[test]
    fn test_run_chunks_and_builds_graph() {
        let pipeline = make_pipeline(100);
        let dir = tempfile::TempDir::new().unwrap();
        let mut vectors = JsonlVectorSink::open(&dir.path().join("v.jsonl"), 10).unwrap();
        let mut graph = MemoryGraphStore::new();
        let mut issues = IssueLog::new();

        let report = pipeline
            .run(
                vec![make_record("Q1", "Alpha"), make_record("Q2", "Beta")],
                &mut vectors,
                &mut graph,
                &mut issues,
            )
            .unwrap();

        assert_eq!(report.records_read, 2);
        assert_eq!(report.articles_kept, 2);
        // 250 chars → 3 chunks, 40 chars → 1 chunk
        assert_eq!(report.chunks_written, 4);
        assert_eq!(vectors.len(), 4);
        // Q2 has no facts
        assert_eq!(issues.count(IssueKind::SourceFetchFailure), 1);

        let first = vectors.get(&VectorRecord::record_id("Q1", 0)).unwrap();
        assert_eq!(first.metadata.total_chunks, 3);
        assert!(first.metadata.genres.contains("rock music"));

        // artist, album, genre; HAS_GENRE and PERFORMED_BY
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_missing_text_and_identifiers_are_reported() {
        let pipeline = make_pipeline(100);
        let mut issues = IssueLog::new();
        let mut missing_url = make_record("Q1", "Alpha");
        missing_url.wikipedia_url = String::new();

        let report = pipeline
            .run(
                vec![missing_url, make_record("Q3", "Gamma")],
                &mut NullVectorSink,
                &mut NullGraphSink,
                &mut issues,
            )
            .unwrap();

        assert_eq!(report.articles_kept, 0);
        assert_eq!(report.chunks_written, 0);
        assert_eq!(report.issue_count(IssueKind::MissingIdentifier), 1);
        assert_eq!(report.issue_count(IssueKind::SourceFetchFailure), 1);
    }

    #[test]
    fn test_incomplete_metadata_skips_chunks() {
        let pipeline = make_pipeline(100);
        let mut issues = IssueLog::new();
        let mut nameless = make_record("Q2", "Beta");
        nameless.artist = String::new();

        let report = pipeline
            .run(vec![nameless], &mut NullVectorSink, &mut NullGraphSink, &mut issues)
            .unwrap();

        assert_eq!(report.chunks_written, 0);
        assert_eq!(report.chunks_skipped, 1);
        assert_eq!(report.issue_count(IssueKind::IncompleteMetadata), 1);
    }

    #[test]
    fn test_rerun_with_fewer_chunks_drops_stale_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("v.jsonl");
        let records = || vec![make_record("Q1", "Alpha"), make_record("Q2", "Beta")];
        let mut graph = MemoryGraphStore::new();

        let mut vectors = JsonlVectorSink::open(&path, 10).unwrap();
        make_pipeline(100)
            .run(records(), &mut vectors, &mut graph, &mut IssueLog::new())
            .unwrap();
        assert_eq!(vectors.len(), 4);

        let mut vectors = JsonlVectorSink::open(&path, 10).unwrap();
        let report = make_pipeline(300)
            .run(records(), &mut vectors, &mut graph, &mut IssueLog::new())
            .unwrap();

        assert_eq!(report.chunks_written, 2);
        assert_eq!(vectors.len(), 2);
        assert!(vectors.get(&VectorRecord::record_id("Q1", 1)).is_none());
        let on_disk = crate::sources::read_jsonl::<VectorRecord>(&path).unwrap();
        assert_eq!(on_disk.records.len(), 2);
    }
}
