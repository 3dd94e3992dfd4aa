//! Similarity matcher.
//!
//! Scores two file names or titles for likely identity on a 0-100 scale.
//! `fast_similarity` works on normalized names and understands episode
//! markers; `slow_similarity` works on raw names and only weighs titles
//! and years. Only equal raw file names short-circuit to 100; equal titles
//! still go through the year adjustment.

use super::analyzer::{collapse_whitespace, extract_series_info, word_list_regex};
use crate::utils::fs::VIDEO_EXTENSIONS;
use once_cell::sync::Lazy;
use regex::Regex;

/// Technical tokens removed from raw names before a slow comparison.
pub const SLOW_TECHNICAL_TERMS: &[&str] = &[
    "2160p", "1080p", "720p", "480p", "4k", "bluray", "webrip", "web", "dl", "hdtv", "dvdrip",
    "x264", "x265", "hevc", "aac",
];

static SLOW_TECH_RE: Lazy<Regex> = Lazy::new(|| word_list_regex(SLOW_TECHNICAL_TERMS));

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

/// Order-independent similarity of two strings (0.0 - 1.0).
///
/// Both sides are lowercased, split on non-alphanumerics, sorted and
/// rejoined before a normalized Levenshtein comparison. Identical token
/// multisets score 1.0; two empty sides score 0.0.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let a = sorted_tokens(a);
    let b = sorted_tokens(b);
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

fn sorted_tokens(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Case-insensitive equality of two file names.
pub fn is_exact_match(a: &str, b: &str) -> bool {
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Series-aware similarity of two normalized names (0-100).
pub fn fast_similarity(norm_a: &str, norm_b: &str) -> f64 {
    let a = extract_series_info(norm_a);
    let b = extract_series_info(norm_b);

    let base = if !a.title.is_empty() && !b.title.is_empty() {
        token_sort_ratio(&a.title, &b.title)
    } else {
        token_sort_ratio(norm_a, norm_b)
    } * 100.0;

    if let (Some(season), Some(episode)) = (a.season, a.episode) {
        return match (b.season, b.episode) {
            (Some(s), Some(e)) if s == season && e == episode => (base + 30.0).min(100.0),
            (Some(s), Some(_)) if s == season => (base - 20.0).max(0.0),
            (Some(_), Some(_)) => (base - 30.0).max(0.0),
            _ => base,
        };
    }

    match (a.year, b.year) {
        (Some(ya), Some(yb)) if ya == yb => (base + 10.0).min(100.0),
        (Some(ya), Some(yb)) if (ya as i32 - yb as i32).abs() > 2 => (base - 10.0).max(0.0),
        _ => base,
    }
}

/// Title-and-year similarity of two raw file names (0-100).
pub fn slow_similarity(raw_a: &str, raw_b: &str) -> f64 {
    if is_exact_match(raw_a, raw_b) {
        return 100.0;
    }

    let (title_a, year_a) = strip_for_slow(raw_a);
    let (title_b, year_b) = strip_for_slow(raw_b);

    let mut score = token_sort_ratio(&title_a, &title_b) * 100.0;
    if let (Some(ya), Some(yb)) = (year_a, year_b) {
        let diff = (ya as i32 - yb as i32).abs();
        score += match diff {
            0 => 15.0,
            1 => 5.0,
            _ => -15.0,
        };
    }
    score.clamp(0.0, 100.0)
}

/// Title of a raw name with technical tokens and the year removed.
fn strip_for_slow(raw: &str) -> (String, Option<u16>) {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let stem = match name.rsplit_once('.') {
        Some((stem, ext)) if VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()) => stem,
        _ => name,
    };
    let lower: String = stem
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let year = YEAR_RE
        .captures(&lower)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let without_year = YEAR_RE.replace_all(&lower, " ");
    let title = SLOW_TECH_RE.replace_all(&without_year, " ");
    (collapse_whitespace(&title), year)
}
