//! Text helpers shared by the classifier, the assembler and the config loader.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})(?:\b|T)").unwrap());
static LONG_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][a-z]{2,8})\.?\s+(\d{1,2}),?\s+(\d{4})\b").unwrap());

/// Heading comparison key: case-folded, `#` markers and trailing punctuation
/// removed, typographic apostrophes folded, whitespace collapsed.
pub fn normalize_heading(line: &str) -> String {
    let folded = line.replace(['\u{2019}', '\u{2018}'], "'").to_lowercase();
    let stripped = folded
        .trim()
        .trim_start_matches('#')
        .trim_end_matches(|c: char| c.is_ascii_punctuation() && c != ')' && c != '\'');
    collapse_whitespace(stripped)
}

/// Label comparison key: only alphanumerics survive, lower-cased, single spaces.
pub fn normalize_label(line: &str) -> String {
    let kept: String = line
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    collapse_whitespace(&kept)
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `2025-10-16-OOM Quota_enforcer` -> `2025-10-16-oom-quota-enforcer`
pub fn slugify(stem: &str) -> String {
    let mut slug = String::with_capacity(stem.len());
    for c in stem.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Leading `YYYY-MM-DD` of a file stem, if it is a real calendar date.
pub fn date_prefix(stem: &str) -> Option<NaiveDate> {
    let prefix = stem.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// First ISO or `Month D, YYYY` date mentioned anywhere in `text`.
pub fn find_date(text: &str) -> Option<NaiveDate> {
    if let Some(date) = ISO_DATE_RE
        .captures_iter(text)
        .find_map(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok())
    {
        return Some(date);
    }
    LONG_DATE_RE.captures_iter(text).find_map(|c| {
        let candidate = format!("{} {} {}", &c[1], &c[2], &c[3]);
        NaiveDate::parse_from_str(&candidate, "%B %d %Y")
            .or_else(|_| NaiveDate::parse_from_str(&candidate, "%b %d %Y"))
            .ok()
    })
}

/// Human title from a file stem: `2025-10-16-oom-quota-enforcer` -> `Oom Quota Enforcer`.
pub fn title_from_stem(stem: &str) -> String {
    let rest = match date_prefix(stem) {
        Some(_) => stem[10..].trim_start_matches(['-', '_', ' ']),
        None => stem,
    };
    let words: Vec<String> = rest
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();
    if words.is_empty() {
        stem.to_string()
    } else {
        words.join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
