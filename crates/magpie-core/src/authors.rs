//! Author name parsing and normalization.
//!
//! Sources report authors in many shapes: "Smith, J., Jones, A.",
//! "John Smith, Alice Jones", "J. Smith and A. Jones". Everything collapses
//! to a canonical "Last, F." (or "Last, F. M.") form so name-format variants
//! map to one performance record.

/// Parse an author string into individual normalized author names.
///
/// Returns names in "Last, F." form; single tokens (e.g. an organization
/// name) pass through unchanged. Order is preserved, duplicates removed.
pub fn parse_author_string(author_string: &str) -> Vec<String> {
    if author_string.trim().is_empty() {
        return Vec::new();
    }

    let unified = author_string
        .replace(" and ", ", ")
        .replace(" & ", ", ")
        .replace(';', ",");

    let parts: Vec<&str> = unified
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut authors = Vec::new();
    let mut i = 0;
    while i < parts.len() {
        let part = parts[i];

        if i + 1 < parts.len() && is_likely_initials(parts[i + 1]) {
            // "Smith, J." split across two comma-separated parts
            authors.push(normalize_name(part, parts[i + 1]));
            i += 2;
        } else if is_likely_initials(part) {
            // Standalone initials, malformed input
            i += 1;
        } else {
            if let Some(parsed) = parse_single_name(part) {
                authors.push(parsed);
            }
            i += 1;
        }
    }

    let mut seen = std::collections::HashSet::new();
    authors.retain(|a| seen.insert(a.clone()));
    authors
}

/// The primary (first) author of an author string, normalized.
pub fn primary_author(author_string: &str) -> Option<String> {
    parse_author_string(author_string).into_iter().next()
}

/// Normalize a single author name for consistent storage and lookup.
pub fn normalize_author_name(author_name: &str) -> String {
    primary_author(author_name).unwrap_or_else(|| author_name.trim().to_string())
}

/// Whether a string looks like initials: at most 4 uppercase letters once
/// periods and spaces are removed.
fn is_likely_initials(s: &str) -> bool {
    let cleaned: String = s.chars().filter(|c| *c != '.' && *c != ' ').collect();
    !cleaned.is_empty()
        && cleaned.len() <= 4
        && cleaned.chars().all(|c| c.is_alphabetic() && c.is_uppercase())
}

/// Parse "John Smith" or "J. Smith" into "Smith, J.".
fn parse_single_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let parts: Vec<&str> = name.split_whitespace().collect();

    if parts.len() == 1 {
        // Single token: an organization or a bare surname
        return Some(parts[0].to_string());
    }

    let last = parts[parts.len() - 1];
    if last.chars().next().is_some_and(|c| c.is_uppercase()) {
        let initials = extract_initials(&parts[..parts.len() - 1].join(" "));
        return Some(normalize_name(last, &initials));
    }

    Some(name.to_string())
}

/// Extract initials from first name(s): "John Michael" -> "J. M.".
fn extract_initials(first_name: &str) -> String {
    first_name
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .filter(|c| c.is_alphabetic())
        .map(|c| format!("{}.", c.to_uppercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join a last name and initials into the canonical form.
fn normalize_name(last_name: &str, initials: &str) -> String {
    let last_name = last_name.trim();
    let cleaned: Vec<String> = initials
        .chars()
        .filter(|c| *c != '.' && *c != ' ')
        .map(|c| format!("{}.", c))
        .collect();

    if cleaned.is_empty() {
        last_name.to_string()
    } else {
        format!("{}, {}", last_name, cleaned.join(" "))
    }
}
