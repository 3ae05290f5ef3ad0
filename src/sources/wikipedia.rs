use super::{read_file, ArticleSource, SourceError};
use crate::model::ArtistIndexRecord;
use crate::qid::Qid;
use std::path::PathBuf;

/// Article text cached as `<dir>/<QID>.txt`.
pub struct WikipediaCache {
    dir: PathBuf,
}

impl WikipediaCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        WikipediaCache { dir: dir.into() }
    }

    pub fn path_for(&self, wikidata_id: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", wikidata_id.trim()))
    }
}

impl ArticleSource for WikipediaCache {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn fetch_text(&self, record: &ArtistIndexRecord) -> Result<String, SourceError> {
        // Index rows may carry the full entity URI; the cache is keyed by bare QID.
        let qid = Qid::parse(&record.wikidata_id).map_err(|_| {
            SourceError::NotFound(format!("article for '{}'", record.wikipedia_url))
        })?;
        let path = self.path_for(qid.as_str());
        let text = read_file(&path)?;
        if text.trim().is_empty() {
            return Err(SourceError::Empty(format!("{:?}", path)));
        }
        Ok(text)
    }
}
