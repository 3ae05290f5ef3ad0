//! Text normalization helpers shared by the dedup, chunking and graph stages.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(\d{1,4})(?:-|$)").expect("valid year regex"))
}

/// Flattens article text into a single line: newlines and tabs become spaces,
/// whitespace runs collapse and escaped quotes are unescaped.
pub fn clean_text(text: &str) -> String {
    let unescaped = text.replace("\\\"", "\"");
    whitespace_re()
        .replace_all(unescaped.trim(), " ")
        .into_owned()
}

/// Identity key for artist names: lowercase unicode words joined by a single space.
///
/// Punctuation and casing differences ("AC/DC", "ac dc") collapse to the same key.
/// Returns an empty string when the name holds no words.
pub fn normalize_name(name: &str) -> String {
    name.unicode_words()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapses internal whitespace of a label and trims it.
pub fn clean_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the year from an ISO-8601 date or a bare year.
///
/// Accepts the Wikidata forms `1980-01-01T00:00:00Z`, `+1980-01-01T00:00:00Z`
/// and plain `1980`. Anything else yields `None`.
pub fn parse_inception_year(value: &str) -> Option<i32> {
    let value = value.trim();
    let caps = year_re().captures(value)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    if value.starts_with('-') {
        Some(-year)
    } else {
        Some(year)
    }
}

/// Derives a human readable title from a Wikipedia article URL.
///
/// `https://en.wikipedia.org/wiki/The_Beatles` gives `The Beatles`.
pub fn title_from_url(url: &str) -> Option<String> {
    let (_, raw) = url.trim_end_matches('/').rsplit_once("/wiki/")?;
    let raw = raw.split(['#', '?']).next().unwrap_or(raw);
    let decoded = urlencoding::decode(raw).ok()?;
    let title = clean_label(&decoded.replace('_', " "));
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}
