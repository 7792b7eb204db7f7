//! Text heuristics: normalization, keyword extraction, and title-embedded
//! date extraction.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z0-9]+\b").unwrap());

// Patterns for extracting a publication date embedded in a title.
// Only years 2020-2030 are accepted; anything else is noise.
static TITLE_DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Written: January 15, 2024
        Regex::new(r"(?i)\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),?\s+(\d{4})\b").unwrap(),
        // ISO dates: 2024-01-15
        Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap(),
        // Bare year: "... (2024)" or "in 2024"
        Regex::new(r"\b(20[2-3]\d)\b").unwrap(),
    ]
});

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// Earliest year accepted by title-date extraction.
const MIN_TITLE_YEAR: i32 = 2020;
/// Latest year accepted by title-date extraction.
const MAX_TITLE_YEAR: i32 = 2030;

/// Normalize text for comparison: lowercase, collapsed whitespace, trimmed.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    WHITESPACE.replace_all(&lowered, " ").trim().to_string()
}

/// Extract alphanumeric search terms longer than `min_length` characters,
/// de-duplicated with order preserved. Used to build fuzzy-title queries.
pub fn extract_terms(text: &str, min_length: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut terms = Vec::new();
    for m in WORD.find_iter(&text.to_lowercase()) {
        let word = m.as_str();
        if word.len() > min_length && seen.insert(word.to_string()) {
            terms.push(word.to_string());
        }
    }
    terms
}

/// Extract a snippet of at most `max_length` characters, preferring a
/// sentence or line boundary when one lands reasonably close to the limit.
pub fn extract_snippet(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_length).collect();
    let break_point = cut.rfind('.').max(cut.rfind('\n'));

    match break_point {
        Some(pos) if pos > max_length * 7 / 10 => cut[..=pos].trim().to_string(),
        _ => format!("{}...", cut),
    }
}

/// Attempt to extract a publication date embedded in a title.
///
/// Tries "Month D, YYYY" first, then ISO, then a bare-year fallback pinned
/// to January 1. Years outside 2020-2030 are rejected; extraction failure
/// is "unknown", never a guess.
pub fn extract_title_date(title: &str) -> Option<NaiveDate> {
    if let Some(cap) = TITLE_DATE_PATTERNS[0].captures(title) {
        let month = MONTHS
            .iter()
            .position(|m| m.eq_ignore_ascii_case(&cap[1]))
            .map(|i| i as u32 + 1)?;
        let day: u32 = cap[2].parse().ok()?;
        let year: i32 = cap[3].parse().ok()?;
        if let Some(date) = checked_date(year, month, day) {
            return Some(date);
        }
    }

    if let Some(cap) = TITLE_DATE_PATTERNS[1].captures(title) {
        let year: i32 = cap[1].parse().ok()?;
        let month: u32 = cap[2].parse().ok()?;
        let day: u32 = cap[3].parse().ok()?;
        if let Some(date) = checked_date(year, month, day) {
            return Some(date);
        }
    }

    if let Some(cap) = TITLE_DATE_PATTERNS[2].captures(title) {
        let year: i32 = cap[1].parse().ok()?;
        if let Some(date) = checked_date(year, 1, 1) {
            return Some(date);
        }
    }

    None
}

fn checked_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(MIN_TITLE_YEAR..=MAX_TITLE_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Truncate text to `max_length` characters, appending an ellipsis when cut.
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_length.saturating_sub(3)).collect();
    format!("{}...", cut)
}
