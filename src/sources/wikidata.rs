//! Parsing of cached Wikidata payloads: SPARQL result bindings and
//! `wbgetentities` entity documents.

use super::{read_json, SourceError};
use crate::model::ArtistIndexRecord;
use crate::qid::Qid;
use crate::text::clean_label;
use serde_json::Value;
use std::path::PathBuf;

/// Label languages tried in order before the unsuffixed label.
pub const LABEL_LANGUAGES: [&str; 4] = ["en", "es", "fr", "de"];

const PROP_COUNTRY_OF_ORIGIN: &str = "P495";
const PROP_CITIZENSHIP: &str = "P27";
const PROP_GENRE: &str = "P136";
const PROP_MUSICBRAINZ_ARTIST: &str = "P434";

fn binding<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)?.get("value")?.as_str()
}

fn best_label(item: &Value, base_key: &str) -> Option<String> {
    LABEL_LANGUAGES
        .iter()
        .filter_map(|lang| binding(item, &format!("{}_{}", base_key, lang)))
        .chain(binding(item, base_key))
        .map(clean_label)
        .find(|l| !l.is_empty())
}

fn split_values(value: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = value
        .unwrap_or_default()
        .split('|')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Converts SPARQL `results.bindings` into artist index records.
///
/// Bindings without an artist URI or any usable label are skipped.
pub fn parse_artist_bindings(doc: &Value) -> Vec<ArtistIndexRecord> {
    let Some(bindings) = doc
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    bindings
        .iter()
        .filter_map(|item| {
            let uri = binding(item, "artist")?;
            let artist = best_label(item, "artistLabel")?;
            let wikidata_id = Qid::parse(uri)
                .map(|q| q.to_string())
                .unwrap_or_else(|_| uri.to_string());
            Some(ArtistIndexRecord {
                wikidata_id,
                artist,
                wikipedia_url: binding(item, "wikipedia_url").unwrap_or_default().to_string(),
                title: None,
                inception: binding(item, "date").map(str::to_string),
                linkcount: binding(item, "linkcount").and_then(|c| c.trim().parse().ok()),
                genres: split_values(binding(item, "genres")),
            })
        })
        .collect()
}

/// The parts of a Wikidata entity the pipeline uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WikidataEntity {
    pub label: Option<String>,
    pub aliases: Vec<String>,
    pub country: Option<Qid>,
    pub genres: Vec<Qid>,
    pub musicbrainz_id: Option<String>,
}

fn claim_values<'a>(entity: &'a Value, property: &str) -> impl Iterator<Item = &'a Value> {
    entity
        .get("claims")
        .and_then(|c| c.get(property))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|claim| {
            let snak = claim.get("mainsnak")?;
            if snak.get("snaktype").and_then(Value::as_str) != Some("value") {
                return None;
            }
            snak.get("datavalue")?.get("value")
        })
}

fn claim_entity_ids(entity: &Value, property: &str) -> Vec<Qid> {
    claim_values(entity, property)
        .filter_map(|v| v.get("id").and_then(Value::as_str))
        .filter_map(|id| Qid::parse(id).ok())
        .collect()
}

impl WikidataEntity {
    /// Parses an entity document. Accepts a full `wbgetentities` response or
    /// the bare entity object.
    pub fn parse(doc: &Value, qid: &Qid) -> Option<Self> {
        let entity = match doc.get("entities") {
            Some(entities) => entities.get(qid.as_str())?,
            None => doc,
        };
        if entity.get("missing").is_some() {
            return None;
        }

        let label = entity
            .get("labels")
            .and_then(|labels| {
                LABEL_LANGUAGES
                    .iter()
                    .find_map(|lang| labels.get(*lang)?.get("value")?.as_str())
            })
            .map(clean_label)
            .filter(|l| !l.is_empty());

        let aliases = entity
            .get("aliases")
            .and_then(|a| a.get("en"))
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.get("value").and_then(Value::as_str))
                    .map(clean_label)
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let country = claim_entity_ids(entity, PROP_COUNTRY_OF_ORIGIN)
            .into_iter()
            .next()
            .or_else(|| claim_entity_ids(entity, PROP_CITIZENSHIP).into_iter().next());

        let mut genres = claim_entity_ids(entity, PROP_GENRE);
        genres.sort();
        genres.dedup();

        let musicbrainz_id = claim_values(entity, PROP_MUSICBRAINZ_ARTIST)
            .find_map(Value::as_str)
            .map(str::to_string);

        Some(WikidataEntity {
            label,
            aliases,
            country,
            genres,
            musicbrainz_id,
        })
    }
}

/// Entity documents cached as `<dir>/<QID>.json`.
pub struct WikidataCache {
    dir: PathBuf,
}

impl WikidataCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        WikidataCache { dir: dir.into() }
    }

    pub fn entity(&self, qid: &Qid) -> Result<WikidataEntity, SourceError> {
        let path = self.dir.join(format!("{}.json", qid));
        let doc = read_json(&path)?;
        WikidataEntity::parse(&doc, qid).ok_or_else(|| SourceError::Malformed {
            path,
            message: format!("no entity {}", qid),
        })
    }

    /// Label of any cached entity, e.g. a country.
    pub fn label(&self, qid: &Qid) -> Option<String> {
        self.entity(qid).ok().and_then(|e| e.label)
    }
}

/// Sorted, unique union of two genre QID lists.
pub fn merge_genre_qids(a: &[Qid], b: &[Qid]) -> Vec<Qid> {
    let mut out: Vec<Qid> = a.iter().chain(b).cloned().collect();
    out.sort();
    out.dedup();
    out
}
