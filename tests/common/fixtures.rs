//! Test fixture creation
//!
//! Lays out a data directory the way the upstream fetchers leave it: an
//! artist index, cached article text, facts datasets, and the Wikidata and
//! Last.fm response caches.

use super::constants::*;
use anyhow::Result;
use music_rag_etl::config::CliConfig;
use music_rag_etl::sources::LastFmCache;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builds single-spaced article text of exactly `len` characters.
///
/// The text never ends in whitespace, so cleaning leaves its length intact.
pub fn make_article(subject: &str, len: usize) -> String {
    let mut text = String::new();
    let mut i = 0;
    while text.len() < len {
        text.push_str(&format!("{} fact number {}. ", subject, i));
        i += 1;
    }
    text.truncate(len);
    if text.ends_with(' ') {
        text.pop();
        text.push('.');
    }
    text
}

/// Config pointing at `data_dir`, with exact-length chunks of
/// [`TEST_CHUNK_SIZE`] characters.
pub fn cli_config(data_dir: &Path) -> CliConfig {
    CliConfig {
        data_dir: Some(data_dir.to_path_buf()),
        chunk_size: TEST_CHUNK_SIZE,
        chunk_overlap: 0,
        respect_separators: false,
        ..Default::default()
    }
}

fn write_lines(path: &Path, lines: &[serde_json::Value]) -> Result<()> {
    let content: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    fs::write(path, content.join("\n") + "\n")?;
    Ok(())
}

fn wiki_url(slug: &str) -> String {
    format!("https://en.wikipedia.org/wiki/{}", slug)
}

/// Creates a data directory with:
///
/// - The Beatles and Radiohead with full facts
/// - A shorter duplicate of The Beatles' article under another QID
/// - One index row without a URL and one without a cached article
/// - One artist without a name in the index
/// - A Radiohead genre with no record and a similar artist nobody knows
///
/// Returns the TempDir guard and the data directory path.
pub fn create_test_data_dir() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let data_dir = dir.path().to_path_buf();

    write_lines(
        &data_dir.join("artist_index.jsonl"),
        &[
            json!({"wikidata_id": BEATLES_QID, "artist": "The Beatles",
                "wikipedia_url": wiki_url("The_Beatles"), "inception": "1960-01-01T00:00:00Z",
                "linkcount": 400, "genres": [ROCK_QID]}),
            json!({"wikidata_id": BEATLES_DUPLICATE_QID, "artist": "The Beatles",
                "wikipedia_url": wiki_url("The_Beatles"), "linkcount": 10}),
            json!({"wikidata_id": RADIOHEAD_QID, "artist": "Radiohead",
                "wikipedia_url": wiki_url("Radiohead"), "inception": "1985",
                "linkcount": "250", "genres": format!("{}|{}", ROCK_QID, MISSING_GENRE_QID)}),
            json!({"wikidata_id": NO_URL_QID, "artist": "Nowhere Men", "wikipedia_url": ""}),
            json!({"wikidata_id": NO_ARTICLE_QID, "artist": "Lost Tapes",
                "wikipedia_url": wiki_url("Lost_Tapes")}),
            json!({"wikidata_id": NAMELESS_QID, "artist": null,
                "wikipedia_url": wiki_url("Mystery_Act"), "linkcount": 5}),
        ],
    )?;

    let articles = data_dir.join("wikipedia_articles");
    fs::create_dir_all(&articles)?;
    for (qid, subject, len) in [
        (BEATLES_QID, "The Beatles", BEATLES_ARTICLE_LEN),
        (BEATLES_DUPLICATE_QID, "The Fab Four", BEATLES_DUPLICATE_ARTICLE_LEN),
        (RADIOHEAD_QID, "Radiohead", RADIOHEAD_ARTICLE_LEN),
        (NAMELESS_QID, "The act", NAMELESS_ARTICLE_LEN),
    ] {
        fs::write(articles.join(format!("{}.txt", qid)), make_article(subject, len))?;
    }

    write_lines(
        &data_dir.join("artists.jsonl"),
        &[
            json!({"id": BEATLES_QID, "name": "The Beatles", "country": "United Kingdom",
                "genres": [ROCK_QID], "inception": 1960}),
            json!({"id": RADIOHEAD_QID, "name": "Radiohead",
                "genres": [ROCK_QID, MISSING_GENRE_QID],
                "similar_artists": [BEATLES_QID, "Nonexistent Band"]}),
            json!({"id": NAMELESS_QID, "name": "Mystery"}),
        ],
    )?;
    write_lines(
        &data_dir.join("albums.jsonl"),
        &[
            json!({"id": ABBEY_ROAD_QID, "title": "Abbey Road", "year": 1969,
                "artist_id": BEATLES_QID}),
            json!({"id": OK_COMPUTER_QID, "title": "OK Computer", "year": "1997",
                "artist_id": RADIOHEAD_QID}),
        ],
    )?;
    write_lines(
        &data_dir.join("tracks.jsonl"),
        &[json!({"id": COME_TOGETHER_QID, "title": "Come Together",
            "album_id": ABBEY_ROAD_QID, "track_number": 1})],
    )?;
    write_lines(
        &data_dir.join("genres.jsonl"),
        &[json!({"id": ROCK_QID, "genre_label": "rock music"})],
    )?;

    let wikidata = data_dir.join("wikidata");
    fs::create_dir_all(&wikidata)?;
    let radiohead = json!({
        "labels": {"en": {"value": "Radiohead"}},
        "aliases": {"en": [{"value": "On a Friday"}]},
        "claims": {"P495": [{"mainsnak": {"snaktype": "value",
            "datavalue": {"value": {"id": UK_QID}}}}]}
    });
    fs::write(
        wikidata.join(format!("{}.json", RADIOHEAD_QID)),
        radiohead.to_string(),
    )?;
    fs::write(
        wikidata.join(format!("{}.json", UK_QID)),
        json!({"labels": {"en": {"value": "United Kingdom"}}}).to_string(),
    )?;

    let lastfm = data_dir.join("last_fm");
    fs::create_dir_all(&lastfm)?;
    let beatles = json!({"artist": {
        "name": "The Beatles",
        "tags": {"tag": [{"name": "classic rock"}, {"name": "60s"}]},
        "similar": {"artist": [{"name": "Radiohead"}]}
    }});
    fs::write(
        lastfm.join(format!("{}.json", LastFmCache::cache_key("The Beatles"))),
        beatles.to_string(),
    )?;

    Ok((dir, data_dir))
}
