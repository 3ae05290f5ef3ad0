//! Wikidata entity identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const WIKIDATA_ENTITY_URL: &str = "http://www.wikidata.org/entity/";

/// A validated Wikidata QID such as `Q1299`.
///
/// Ordering is numeric on the id rather than lexicographic, so `Q9 < Q10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qid(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid Wikidata QID: '{0}'")]
pub struct InvalidQid(pub String);

impl Qid {
    /// Parses a bare QID or an entity URI, keeping only the last path segment.
    pub fn parse(value: &str) -> Result<Self, InvalidQid> {
        let trimmed = value.trim().trim_end_matches('/');
        let candidate = trimmed.rsplit('/').next().unwrap_or(trimmed);
        let digits = candidate
            .strip_prefix('Q')
            .ok_or_else(|| InvalidQid(value.to_string()))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidQid(value.to_string()));
        }
        Ok(Qid(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn number(&self) -> u64 {
        self.0[1..].parse().unwrap_or(u64::MAX)
    }

    pub fn entity_url(&self) -> String {
        format!("{}{}", WIKIDATA_ENTITY_URL, self.0)
    }
}

impl Ord for Qid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.number()
            .cmp(&other.number())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Qid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Qid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Qid {
    type Err = InvalidQid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Qid::parse(s)
    }
}

impl Serialize for Qid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Qid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Qid::parse(&raw).map_err(serde::de::Error::custom)
    }
}
