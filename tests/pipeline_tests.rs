//! End-to-end tests for a full batch run over a fixture data directory
//!
//! Tests cover the written outputs, the issue summary, re-runs and dry runs.

mod common;

use common::*;
use music_rag_etl::audit::audit_file;
use music_rag_etl::chunker::{Chunker, ChunkerConfig};
use music_rag_etl::config::AppConfig;
use music_rag_etl::dedup::deduplicate;
use music_rag_etl::model::{EdgeKind, Node, NodeKind, RawArticle, VectorRecord};
use music_rag_etl::sinks::MemoryGraphStore;
use music_rag_etl::sources::read_jsonl;
use music_rag_etl::{run_from_config, IssueKind, IssueLog, Qid};
use std::fs;

fn qid(value: &str) -> Qid {
    Qid::parse(value).unwrap()
}

// =============================================================================
// Full Run
// =============================================================================

#[test]
fn test_full_run_counts() {
    let (_dir, data_dir) = create_test_data_dir().unwrap();
    let config = AppConfig::resolve(&cli_config(&data_dir), None).unwrap();

    let (report, issues) = run_from_config(&config, false).unwrap();

    assert_eq!(report.records_read, 6);
    // The Beatles, Radiohead and the nameless act
    assert_eq!(report.articles_kept, 3);
    assert_eq!(report.chunks_written, EXPECTED_CHUNKS);
    assert_eq!(report.chunks_skipped, 1);
    assert_eq!(report.nodes_written, EXPECTED_NODES);
    assert_eq!(report.edges_written, EXPECTED_EDGES);

    assert_eq!(report.issue_count(IssueKind::MissingIdentifier), 1);
    assert_eq!(report.issue_count(IssueKind::DuplicateRecord), 1);
    assert_eq!(report.issue_count(IssueKind::SourceFetchFailure), 1);
    assert_eq!(report.issue_count(IssueKind::IncompleteMetadata), 1);
    assert_eq!(report.issue_count(IssueKind::DanglingEdge), 2);
    assert_eq!(report.total_issues(), issues.len());
}

#[test]
fn test_vector_output_is_consistent() {
    let (_dir, data_dir) = create_test_data_dir().unwrap();
    let config = AppConfig::resolve(&cli_config(&data_dir), None).unwrap();
    run_from_config(&config, false).unwrap();

    let read = read_jsonl::<VectorRecord>(&config.vectors_path()).unwrap();
    assert!(read.malformed.is_empty());
    assert_eq!(read.records.len(), EXPECTED_CHUNKS);

    let beatles: Vec<&VectorRecord> = read
        .records
        .iter()
        .filter(|r| r.metadata.wikidata_entity == BEATLES_QID)
        .collect();
    assert_eq!(beatles.len(), 3);
    for (i, record) in beatles.iter().enumerate() {
        assert_eq!(record.metadata.chunk_index, i);
        assert_eq!(record.metadata.total_chunks, 3);
        assert_eq!(record.metadata.title, "The Beatles");
        assert_eq!(record.metadata.artist_name, "The Beatles");
        assert_eq!(record.metadata.inception_year, Some(1960));
        assert!(record.metadata.genres.contains("rock music"));
    }
    // The duplicate's shorter article never made it into the store
    assert!(read
        .records
        .iter()
        .all(|r| r.metadata.wikidata_entity != BEATLES_DUPLICATE_QID
            && r.metadata.wikidata_entity != NAMELESS_QID));

    let audit = audit_file(&config.vectors_path()).unwrap();
    assert_eq!(audit.rows, EXPECTED_CHUNKS);
    assert!(audit.is_clean(), "audit findings: {:?}", audit);
}

#[test]
fn test_graph_output_has_no_dangling_edges() {
    let (_dir, data_dir) = create_test_data_dir().unwrap();
    let config = AppConfig::resolve(&cli_config(&data_dir), None).unwrap();
    run_from_config(&config, false).unwrap();

    let store = MemoryGraphStore::open(&config.graph_snapshot_path()).unwrap();
    assert_eq!(store.node_count(), EXPECTED_NODES);
    assert_eq!(store.edge_count(), EXPECTED_EDGES);
    assert_eq!(store.count(NodeKind::Artist), 3);
    assert_eq!(store.count(NodeKind::Album), 2);
    assert_eq!(store.count(NodeKind::Track), 1);
    assert_eq!(store.count(NodeKind::Genre), 1);

    for edge in store.edges() {
        assert!(store.node(&edge.source).is_some(), "missing {}", edge.source);
        assert!(store.node(&edge.target).is_some(), "missing {}", edge.target);
    }
    assert!(store.node(&qid(MISSING_GENRE_QID)).is_none());

    // Similar artists from Last.fm resolve by name
    let similar: Vec<(String, String)> = store
        .edges()
        .filter(|e| e.kind == EdgeKind::SimilarTo)
        .map(|e| (e.source.to_string(), e.target.to_string()))
        .collect();
    assert!(similar.contains(&(BEATLES_QID.to_string(), RADIOHEAD_QID.to_string())));
    assert!(similar.contains(&(RADIOHEAD_QID.to_string(), BEATLES_QID.to_string())));

    // Country comes from the Wikidata cache
    match store.node(&qid(RADIOHEAD_QID)) {
        Some(Node::Artist(artist)) => {
            assert_eq!(artist.country.as_deref(), Some("United Kingdom"));
            assert!(artist.aliases.contains(&"On a Friday".to_string()));
        }
        other => panic!("expected Radiohead artist node, got {:?}", other),
    }

    let script = fs::read_to_string(config.cypher_script_path()).unwrap();
    assert!(script.contains("MERGE (n:Artist {id: 'Q1299'})"));
    assert!(script.contains("MERGE (a)-[:CONTAINS_TRACK]->(b);"));
    assert!(!script.contains(MISSING_GENRE_QID));
}

// =============================================================================
// Re-runs and Dry Runs
// =============================================================================

#[test]
fn test_rerun_is_idempotent() {
    let (_dir, data_dir) = create_test_data_dir().unwrap();
    let config = AppConfig::resolve(&cli_config(&data_dir), None).unwrap();

    run_from_config(&config, false).unwrap();
    let vectors = fs::read_to_string(config.vectors_path()).unwrap();
    let graph = fs::read_to_string(config.graph_snapshot_path()).unwrap();
    let script = fs::read_to_string(config.cypher_script_path()).unwrap();

    let (report, _) = run_from_config(&config, false).unwrap();
    assert_eq!(report.chunks_written, EXPECTED_CHUNKS);
    assert_eq!(fs::read_to_string(config.vectors_path()).unwrap(), vectors);
    assert_eq!(fs::read_to_string(config.graph_snapshot_path()).unwrap(), graph);
    assert_eq!(fs::read_to_string(config.cypher_script_path()).unwrap(), script);
}

#[test]
fn test_rerun_with_larger_chunks_drops_stale_chunks() {
    let (_dir, data_dir) = create_test_data_dir().unwrap();
    let config = AppConfig::resolve(&cli_config(&data_dir), None).unwrap();
    run_from_config(&config, false).unwrap();

    let mut cli = cli_config(&data_dir);
    cli.chunk_size = TEST_CHUNK_SIZE * 4;
    let config = AppConfig::resolve(&cli, None).unwrap();
    let (report, _) = run_from_config(&config, false).unwrap();

    // Both articles now fit in a single chunk
    assert_eq!(report.chunks_written, 2);
    let read = read_jsonl::<VectorRecord>(&config.vectors_path()).unwrap();
    assert_eq!(read.records.len(), report.chunks_written);
    assert!(read.records.iter().all(|r| r.metadata.total_chunks == 1));

    let audit = audit_file(&config.vectors_path()).unwrap();
    assert!(audit.is_clean(), "audit findings: {:?}", audit);
}

#[test]
fn test_rerun_with_retracted_facts_drops_stale_edges() {
    let (_dir, data_dir) = create_test_data_dir().unwrap();
    let config = AppConfig::resolve(&cli_config(&data_dir), None).unwrap();
    run_from_config(&config, false).unwrap();

    // Radiohead loses its similar artists and the Last.fm cache goes away
    let artists = fs::read_to_string(data_dir.join("artists.jsonl")).unwrap();
    let artists: Vec<String> = artists
        .lines()
        .map(|line| {
            let mut value: serde_json::Value = serde_json::from_str(line).unwrap();
            value.as_object_mut().unwrap().remove("similar_artists");
            value.to_string()
        })
        .collect();
    fs::write(data_dir.join("artists.jsonl"), artists.join("\n") + "\n").unwrap();
    fs::remove_dir_all(data_dir.join("last_fm")).unwrap();

    let config = AppConfig::resolve(&cli_config(&data_dir), None).unwrap();
    assert!(config.sources.lastfm_dir.is_none());
    let (report, _) = run_from_config(&config, false).unwrap();
    assert_eq!(report.edges_written, EXPECTED_EDGES - 2);

    let store = MemoryGraphStore::open(&config.graph_snapshot_path()).unwrap();
    assert_eq!(store.edge_count(), EXPECTED_EDGES - 2);
    assert!(store.edges().all(|e| e.kind != EdgeKind::SimilarTo));

    let script = fs::read_to_string(config.cypher_script_path()).unwrap();
    assert!(!script.contains(":SIMILAR_TO"));
    assert!(script.contains(":PERFORMED_BY"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let (_dir, data_dir) = create_test_data_dir().unwrap();
    let mut cli = cli_config(&data_dir);
    cli.dry_run = true;
    let config = AppConfig::resolve(&cli, None).unwrap();

    let (report, _) = run_from_config(&config, false).unwrap();
    assert!(report.dry_run);
    assert_eq!(report.chunks_written, EXPECTED_CHUNKS);
    assert!(!config.output_dir.exists());
}

#[test]
fn test_single_thread_matches_parallel_run() {
    let (_dir, data_dir) = create_test_data_dir().unwrap();
    let parallel = AppConfig::resolve(&cli_config(&data_dir), None).unwrap();
    run_from_config(&parallel, false).unwrap();
    let expected = fs::read_to_string(parallel.vectors_path()).unwrap();

    let mut cli = cli_config(&data_dir);
    cli.threads = Some(1);
    cli.output_dir = Some(data_dir.join("single"));
    let single = AppConfig::resolve(&cli, None).unwrap();
    run_from_config(&single, false).unwrap();

    assert_eq!(fs::read_to_string(single.vectors_path()).unwrap(), expected);
}

#[test]
fn test_report_serializes() {
    let (_dir, data_dir) = create_test_data_dir().unwrap();
    let config = AppConfig::resolve(&cli_config(&data_dir), None).unwrap();
    let (report, _) = run_from_config(&config, false).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["chunks_written"], EXPECTED_CHUNKS);
    assert_eq!(json["issues"]["DanglingEdge"], 2);
    assert_eq!(json["issues"]["DuplicateRecord"], 1);
}

// =============================================================================
// Stage Examples
// =============================================================================

#[test]
fn test_longer_duplicate_wins() {
    let make = |qid: &str, len: usize| RawArticle {
        external_id: qid.to_string(),
        url: "https://en.wikipedia.org/wiki/The_Beatles".to_string(),
        artist_name: Some("The Beatles".to_string()),
        text: make_article("The Beatles", len),
        ..Default::default()
    };
    let mut issues = IssueLog::new();

    let kept = deduplicate(
        vec![make(BEATLES_DUPLICATE_QID, 300), make(BEATLES_QID, 500)],
        true,
        &mut issues,
    );

    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].qid, qid(BEATLES_QID));
    assert_eq!(kept[0].text.chars().count(), 500);
    assert_eq!(issues.count(IssueKind::DuplicateRecord), 1);
}

#[test]
fn test_chunk_lengths_cover_text() {
    let chunker = Chunker::new(ChunkerConfig::new(100, 0, false).unwrap()).unwrap();
    let text = make_article("Radiohead", 250);

    let chunks = chunker.chunk(&qid(RADIOHEAD_QID), &text);

    let lengths: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
    assert_eq!(lengths, vec![100, 100, 50]);
    assert_eq!(music_rag_etl::chunker::reassemble(&chunks), text);
}
