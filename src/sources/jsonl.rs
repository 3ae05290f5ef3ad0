use super::{FactsSource, SourceError};
use crate::model::{AlbumFacts, ArtistFacts, ArtistIndexRecord, EntityFacts, GenreFacts, TrackFacts};
use crate::qid::Qid;
use crate::report::{IssueLog, PipelineIssue};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Parsed records plus the lines that failed to parse, as (line number, error).
#[derive(Debug)]
pub struct JsonlRead<T> {
    pub records: Vec<T>,
    pub malformed: Vec<(usize, String)>,
}

/// Reads one JSON document per line, skipping blank lines.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<JsonlRead<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut records = Vec::new();
    let mut malformed = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {:?} line {}", path, i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => malformed.push((i + 1, e.to_string())),
        }
    }
    Ok(JsonlRead { records, malformed })
}

fn report_malformed(path: &Path, malformed: Vec<(usize, String)>, issues: &mut IssueLog) {
    for (line, message) in malformed {
        issues.record(PipelineIssue::SourceFetchFailure {
            source_name: "jsonl",
            record: format!("{}:{}", path.display(), line),
            message,
        });
    }
}

/// Loads the artist index from a JSONL file, or from a cached SPARQL result
/// document when the file ends in `.json`.
pub fn load_artist_index(path: &Path, issues: &mut IssueLog) -> Result<Vec<ArtistIndexRecord>> {
    let records = if path.extension().is_some_and(|ext| ext == "json") {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artist index {:?}", path))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artist index {:?}", path))?;
        super::wikidata::parse_artist_bindings(&value)
    } else {
        let read = read_jsonl::<ArtistIndexRecord>(path)?;
        report_malformed(path, read.malformed, issues);
        read.records
    };
    info!("Loaded {} artist index records from {:?}", records.len(), path);
    Ok(records)
}

/// Entity facts loaded from the artists, albums, tracks and genres JSONL files.
///
/// Missing files are treated as empty datasets.
#[derive(Debug, Default)]
pub struct JsonlFacts {
    artists: HashMap<Qid, ArtistFacts>,
    albums_by_artist: HashMap<Qid, Vec<AlbumFacts>>,
    tracks_by_album: HashMap<Qid, Vec<TrackFacts>>,
    genres: HashMap<Qid, GenreFacts>,
}

pub struct FactsPaths {
    pub artists: PathBuf,
    pub albums: PathBuf,
    pub tracks: PathBuf,
    pub genres: PathBuf,
}

impl FactsPaths {
    pub fn in_dir(dir: &Path) -> Self {
        FactsPaths {
            artists: dir.join("artists.jsonl"),
            albums: dir.join("albums.jsonl"),
            tracks: dir.join("tracks.jsonl"),
            genres: dir.join("genres.jsonl"),
        }
    }
}

fn load_optional<T: DeserializeOwned>(path: &Path, issues: &mut IssueLog) -> Result<Vec<T>> {
    if !path.exists() {
        warn!("{:?} not found, treating as empty", path);
        return Ok(Vec::new());
    }
    let read = read_jsonl::<T>(path)?;
    report_malformed(path, read.malformed, issues);
    Ok(read.records)
}

fn keyed<T>(records: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<(Qid, T)> {
    records
        .into_iter()
        .filter_map(|r| Qid::parse(key(&r)).ok().map(|q| (q, r)))
        .collect()
}

impl JsonlFacts {
    pub fn load(paths: &FactsPaths, issues: &mut IssueLog) -> Result<Self> {
        let artists: Vec<ArtistFacts> = load_optional(&paths.artists, issues)?;
        let albums: Vec<AlbumFacts> = load_optional(&paths.albums, issues)?;
        let tracks: Vec<TrackFacts> = load_optional(&paths.tracks, issues)?;
        let genres: Vec<GenreFacts> = load_optional(&paths.genres, issues)?;
        info!(
            "Loaded facts: {} artists, {} albums, {} tracks, {} genres",
            artists.len(),
            albums.len(),
            tracks.len(),
            genres.len()
        );
        Ok(Self::from_records(artists, albums, tracks, genres))
    }

    /// Indexes facts records. Records whose keys are not QIDs cannot be
    /// looked up; they are kept only when reachable through a parent.
    pub fn from_records(
        artists: Vec<ArtistFacts>,
        albums: Vec<AlbumFacts>,
        tracks: Vec<TrackFacts>,
        genres: Vec<GenreFacts>,
    ) -> Self {
        let mut facts = JsonlFacts::default();
        for (qid, artist) in keyed(artists, |a| a.id.as_str()) {
            facts.artists.insert(qid, artist);
        }
        for (artist_qid, album) in keyed(albums, |a| a.artist_id.as_str()) {
            facts.albums_by_artist.entry(artist_qid).or_default().push(album);
        }
        for (album_qid, track) in keyed(tracks, |t| t.album_id.as_str()) {
            facts.tracks_by_album.entry(album_qid).or_default().push(track);
        }
        for (qid, genre) in keyed(genres, |g| g.id.as_str()) {
            facts.genres.insert(qid, genre);
        }
        facts
    }
}

impl FactsSource for JsonlFacts {
    fn name(&self) -> &'static str {
        "jsonl-facts"
    }

    fn facts(&self, qid: &Qid) -> Result<EntityFacts, SourceError> {
        let artist = self
            .artists
            .get(qid)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("artist {}", qid)))?;

        let albums = self.albums_by_artist.get(qid).cloned().unwrap_or_default();
        let tracks = albums
            .iter()
            .filter_map(|album| Qid::parse(&album.id).ok())
            .filter_map(|album_qid| self.tracks_by_album.get(&album_qid))
            .flatten()
            .cloned()
            .collect();
        let genres = artist
            .genres
            .iter()
            .filter_map(|g| Qid::parse(g).ok())
            .filter_map(|g| self.genres.get(&g))
            .cloned()
            .collect();

        Ok(EntityFacts {
            artist: Some(artist),
            albums,
            tracks,
            genres,
        })
    }
}
