//! Shared constants for integration tests
//!
//! When the fixture dataset changes, update only this file.

// ============================================================================
// Artist QIDs
// ============================================================================

/// The Beatles, the article that survives deduplication
pub const BEATLES_QID: &str = "Q1299";

/// Radiohead
pub const RADIOHEAD_QID: &str = "Q44190";

/// Shorter article at The Beatles' URL under another QID
pub const BEATLES_DUPLICATE_QID: &str = "Q99999";

/// Index row without a Wikipedia URL
pub const NO_URL_QID: &str = "Q5";

/// Index row whose article is not cached
pub const NO_ARTICLE_QID: &str = "Q6";

/// Index row without an artist name
pub const NAMELESS_QID: &str = "Q7";

// ============================================================================
// Discography and Genres
// ============================================================================

/// Abbey Road by The Beatles
pub const ABBEY_ROAD_QID: &str = "Q173643";

/// OK Computer by Radiohead
pub const OK_COMPUTER_QID: &str = "Q213710";

/// Come Together, on Abbey Road
pub const COME_TOGETHER_QID: &str = "Q1057036";

/// Rock music, the only genre with a record
pub const ROCK_QID: &str = "Q11399";

/// Genre referenced by Radiohead but missing from genres.jsonl
pub const MISSING_GENRE_QID: &str = "Q1640319";

/// United Kingdom, resolved through the Wikidata cache
pub const UK_QID: &str = "Q145";

// ============================================================================
// Article Lengths (characters)
// ============================================================================

pub const BEATLES_ARTICLE_LEN: usize = 500;
pub const BEATLES_DUPLICATE_ARTICLE_LEN: usize = 300;
pub const RADIOHEAD_ARTICLE_LEN: usize = 450;
pub const NAMELESS_ARTICLE_LEN: usize = 150;

/// Chunk size used by the fixture config
pub const TEST_CHUNK_SIZE: usize = 200;

// ============================================================================
// Expected Results
// ============================================================================

/// 500 chars → 3 chunks, 450 chars → 3 chunks
pub const EXPECTED_CHUNKS: usize = 6;

/// Two artists, two albums, one track, one genre, plus the nameless artist
pub const EXPECTED_NODES: usize = 7;

/// 2 HAS_GENRE, 2 PERFORMED_BY, 1 CONTAINS_TRACK, 2 SIMILAR_TO
pub const EXPECTED_EDGES: usize = 7;
