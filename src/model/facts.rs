use serde::{Deserialize, Serialize};

/// Artist facts as extracted from Wikidata and Last.fm. Identifiers are unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtistFacts {
    #[serde(alias = "wikidata_id", alias = "qid", deserialize_with = "super::null_as_default")]
    pub id: String,
    #[serde(alias = "artist", deserialize_with = "super::null_as_default")]
    pub name: String,
    pub country: Option<String>,
    #[serde(deserialize_with = "super::string_or_list")]
    pub aliases: Vec<String>,
    #[serde(deserialize_with = "super::string_or_list")]
    pub tags: Vec<String>,
    #[serde(alias = "genre", deserialize_with = "super::string_or_list")]
    pub genres: Vec<String>,
    #[serde(deserialize_with = "super::string_or_list")]
    pub similar_artists: Vec<String>,
    #[serde(alias = "inception", deserialize_with = "super::lenient_year")]
    pub inception_year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlbumFacts {
    #[serde(alias = "wikidata_id", alias = "qid", deserialize_with = "super::null_as_default")]
    pub id: String,
    #[serde(alias = "name", deserialize_with = "super::null_as_default")]
    pub title: String,
    #[serde(alias = "release_date", deserialize_with = "super::lenient_year")]
    pub year: Option<i32>,
    #[serde(deserialize_with = "super::null_as_default")]
    pub artist_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackFacts {
    #[serde(alias = "wikidata_id", alias = "qid", deserialize_with = "super::null_as_default")]
    pub id: String,
    #[serde(alias = "name", deserialize_with = "super::null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub album_id: String,
    #[serde(alias = "position")]
    pub track_number: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenreFacts {
    #[serde(alias = "wikidata_id", alias = "qid", deserialize_with = "super::null_as_default")]
    pub id: String,
    #[serde(alias = "genre_label", deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "super::string_or_list")]
    pub aliases: Vec<String>,
}

/// Everything the sources know about one artist: the artist itself, its
/// discography and the genres it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityFacts {
    pub artist: Option<ArtistFacts>,
    pub albums: Vec<AlbumFacts>,
    pub tracks: Vec<TrackFacts>,
    pub genres: Vec<GenreFacts>,
}

impl EntityFacts {
    pub fn is_empty(&self) -> bool {
        self.artist.is_none()
            && self.albums.is_empty()
            && self.tracks.is_empty()
            && self.genres.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_facts_null_tolerant() {
        let line = r#"{"id": "Q1299", "name": "The Beatles", "country": null,
            "aliases": null, "tags": ["rock", "60s"], "genres": ["Q11399"],
            "similar_artists": null}"#;
        let artist: ArtistFacts = serde_json::from_str(line).unwrap();
        assert_eq!(artist.country, None);
        assert!(artist.aliases.is_empty());
        assert!(artist.similar_artists.is_empty());
        assert_eq!(artist.tags, vec!["rock", "60s"]);
        assert_eq!(artist.inception_year, None);
    }

    #[test]
    fn test_album_year_accepts_strings_and_numbers() {
        let a: AlbumFacts =
            serde_json::from_str(r#"{"id": "Q1", "title": "Abbey Road", "year": "1969", "artist_id": "Q1299"}"#)
                .unwrap();
        let b: AlbumFacts =
            serde_json::from_str(r#"{"id": "Q2", "title": "Let It Be", "year": 1970, "artist_id": "Q1299"}"#)
                .unwrap();
        let c: AlbumFacts =
            serde_json::from_str(r#"{"id": "Q3", "name": "Help!", "release_date": "1965-08-06T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(a.year, Some(1969));
        assert_eq!(b.year, Some(1970));
        assert_eq!(c.year, Some(1965));
        assert_eq!(c.title, "Help!");
        assert_eq!(c.artist_id, "");
    }

    #[test]
    fn test_genre_label_alias() {
        let genre: GenreFacts =
            serde_json::from_str(r#"{"id": "Q11399", "genre_label": "rock music"}"#).unwrap();
        assert_eq!(genre.name, "rock music");
        assert!(genre.aliases.is_empty());
    }
}
