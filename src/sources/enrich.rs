use super::{FactsSource, LastFmCache, SourceError, WikidataCache, WikidataEntity};
use crate::model::{ArtistFacts, EntityFacts};
use crate::qid::Qid;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Overlays cached Wikidata entities and Last.fm info on top of a base
/// facts source.
///
/// Base values win where present. Wikidata contributes aliases, country and
/// genre QIDs; Last.fm fills tags and similar artists when the base has none.
pub struct EnrichedFacts {
    base: Box<dyn FactsSource>,
    wikidata: Option<WikidataCache>,
    lastfm: Option<LastFmCache>,
}

impl EnrichedFacts {
    pub fn new(base: Box<dyn FactsSource>) -> Self {
        EnrichedFacts {
            base,
            wikidata: None,
            lastfm: None,
        }
    }

    pub fn with_wikidata(mut self, cache: WikidataCache) -> Self {
        self.wikidata = Some(cache);
        self
    }

    pub fn with_lastfm(mut self, cache: LastFmCache) -> Self {
        self.lastfm = Some(cache);
        self
    }

    fn wikidata_entity(&self, qid: &Qid) -> Option<WikidataEntity> {
        let cache = self.wikidata.as_ref()?;
        match cache.entity(qid) {
            Ok(entity) => Some(entity),
            Err(SourceError::NotFound(_)) => {
                debug!("No cached Wikidata entity for {}", qid);
                None
            }
            Err(e) => {
                warn!("Ignoring Wikidata entity for {}: {}", qid, e);
                None
            }
        }
    }

    fn apply_wikidata(&self, artist: &mut ArtistFacts, entity: WikidataEntity) {
        if artist.name.trim().is_empty() {
            if let Some(label) = &entity.label {
                artist.name = label.clone();
            }
        }

        for alias in entity.aliases {
            if alias != artist.name && !artist.aliases.contains(&alias) {
                artist.aliases.push(alias);
            }
        }

        if artist.country.is_none() {
            if let Some(country) = entity.country {
                let label = self
                    .wikidata
                    .as_ref()
                    .and_then(|cache| cache.label(&country));
                artist.country = Some(label.unwrap_or_else(|| country.to_string()));
            }
        }

        let genres: BTreeSet<String> = artist
            .genres
            .drain(..)
            .chain(entity.genres.iter().map(Qid::to_string))
            .collect();
        artist.genres = genres.into_iter().collect();
    }

    fn apply_lastfm(&self, artist: &mut ArtistFacts) {
        let Some(cache) = self.lastfm.as_ref() else {
            return;
        };
        if artist.name.trim().is_empty() {
            return;
        }
        match cache.lookup(&artist.name) {
            Ok(Some(info)) => {
                if artist.tags.is_empty() {
                    artist.tags = info.tags;
                }
                if artist.similar_artists.is_empty() {
                    artist.similar_artists = info.similar;
                }
            }
            Ok(None) => debug!("Last.fm has no entry for '{}'", artist.name),
            Err(SourceError::NotFound(_)) => {
                debug!("No cached Last.fm info for '{}'", artist.name)
            }
            Err(e) => warn!("Ignoring Last.fm info for '{}': {}", artist.name, e),
        }
    }
}

impl FactsSource for EnrichedFacts {
    fn name(&self) -> &'static str {
        "enriched"
    }

    fn facts(&self, qid: &Qid) -> Result<EntityFacts, SourceError> {
        let entity = self.wikidata_entity(qid);
        let mut facts = match self.base.facts(qid) {
            Ok(facts) => facts,
            // A cached entity is enough to describe an artist the datasets lack.
            Err(SourceError::NotFound(_)) if entity.is_some() => EntityFacts::default(),
            Err(e) => return Err(e),
        };

        let artist = facts.artist.get_or_insert_with(|| ArtistFacts {
            id: qid.to_string(),
            ..Default::default()
        });
        if let Some(entity) = entity {
            self.apply_wikidata(artist, entity);
        }
        self.apply_lastfm(artist);
        Ok(facts)
    }
}
