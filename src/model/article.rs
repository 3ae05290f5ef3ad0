use crate::qid::Qid;
use serde::{Deserialize, Serialize};

/// One row of the artist index, as produced by the Wikidata extraction.
///
/// Every field is optional on the wire; missing identifiers are reported by
/// the deduplicator rather than rejected at parse time.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtistIndexRecord {
    #[serde(alias = "id", alias = "qid", deserialize_with = "super::null_as_default")]
    pub wikidata_id: String,
    #[serde(alias = "name", deserialize_with = "super::null_as_default")]
    pub artist: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub wikipedia_url: String,
    pub title: Option<String>,
    pub inception: Option<String>,
    #[serde(deserialize_with = "super::lenient_count")]
    pub linkcount: Option<u64>,
    #[serde(alias = "genre", deserialize_with = "super::string_or_list")]
    pub genres: Vec<String>,
}

/// An article before identity resolution. Identifiers are unvalidated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArticle {
    pub external_id: String,
    pub url: String,
    pub title: Option<String>,
    pub artist_name: Option<String>,
    pub text: String,
    pub inception_year: Option<i32>,
    pub linkcount: Option<u64>,
    pub genres: Vec<String>,
}

impl RawArticle {
    pub fn from_index(record: &ArtistIndexRecord, text: String) -> Self {
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        RawArticle {
            external_id: record.wikidata_id.trim().to_string(),
            url: record.wikipedia_url.trim().to_string(),
            title: record.title.as_deref().and_then(non_empty),
            artist_name: non_empty(&record.artist),
            text,
            inception_year: record
                .inception
                .as_deref()
                .and_then(crate::text::parse_inception_year),
            linkcount: record.linkcount,
            genres: record.genres.clone(),
        }
    }

    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A deduplicated article. URL and QID are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub qid: Qid,
    pub url: String,
    pub title: Option<String>,
    pub artist_name: Option<String>,
    pub text: String,
    pub inception_year: Option<i32>,
    pub linkcount: Option<u64>,
    /// Genre references: QIDs resolved against the genre table, or literal labels.
    pub genres: Vec<String>,
}

impl Article {
    pub(crate) fn from_raw(qid: Qid, raw: RawArticle) -> Self {
        Article {
            qid,
            url: raw.url,
            title: raw.title,
            artist_name: raw.artist_name,
            text: raw.text,
            inception_year: raw.inception_year,
            linkcount: raw.linkcount,
            genres: raw.genres,
        }
    }
}
