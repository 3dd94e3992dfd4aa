//! Filename analyzer.
//!
//! Turns raw release-style file names into forms that can be compared:
//! - a normalized name (lowercase, separators as spaces)
//! - a clean title (release noise and stereoscopic tags removed)
//! - structured series info (title, season, episode, year)

use crate::utils::fs::VIDEO_EXTENSIONS;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Technical terms removed from a series title after normalization.
///
/// Multi-word terms are written the way `normalize` leaves them.
pub const SERIES_TECHNICAL_TERMS: &[&str] = &[
    "2160p", "1080p", "720p", "480p", "4k", "uhd", "bluray", "brrip", "bdrip", "webrip", "web dl",
    "webdl", "hdtv", "dvdrip", "x264", "x265", "h264", "h265", "hevc", "aac", "ac3", "dts",
    "multi", "french", "truefrench", "vostfr", "proper", "repack", "complete", "internal",
];

/// Quality, source and codec tokens marking the end of the title.
const RELEASE_BOUNDARY_TERMS: &[&str] = &[
    "2160p", "1080p", "1080i", "720p", "576p", "480p", "4k", "uhd", "hdr", "bluray", "blu ray",
    "brrip", "bdrip", "webrip", "web dl", "webdl", "hdtv", "dvdrip", "dvd", "remux", "x264",
    "x265", "h264", "h265", "hevc", "xvid", "divx",
];

/// Language, edition and web tags that are also ordinary title words.
///
/// They only end the title when nothing but such tags follows them.
const RELEASE_TAG_TERMS: &[&str] = &[
    "multi", "french", "truefrench", "vostfr", "proper", "repack", "extended", "unrated",
    "remastered", "complete", "web",
];

/// Pattern for S01E01 style markers on normalized names.
static SXXEXX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bs(\d{1,2})\s*e(\d{1,2})").unwrap());

/// Pattern for 1x01 style markers on normalized names.
static NXNN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})x(\d{1,2})\b").unwrap());

/// Pattern for standalone year extraction.
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

/// Pattern for stereoscopic and frame-layout tags.
static STEREO_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:3d|h[\s._-]?sbs|half[\s._-]?sbs|full[\s._-]?sbs|sbs|h[\s._-]?ou|half[\s._-]?ou|top[\s._-]?(?:and[\s._-]?)?bottom|tab|over[\s._-]?under)\b",
    )
    .unwrap()
});

/// Pattern for the technical terms of a series title.
static SERIES_TECH_RE: Lazy<Regex> = Lazy::new(|| word_list_regex(SERIES_TECHNICAL_TERMS));

/// Pattern for the first token that ends a release title.
static RELEASE_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| {
    let terms: Vec<String> = RELEASE_BOUNDARY_TERMS.iter().map(|t| regex::escape(t)).collect();
    Regex::new(&format!(
        r"\b(?:(?:19|20)\d{{2}}|s\d{{1,2}}\s*e\d{{1,2}}|\d{{1,2}}x\d{{1,2}}|{})\b",
        terms.join("|")
    ))
    .unwrap()
});

/// Pattern for bracketed release-group or site tags.
static BRACKETED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]|\{[^}]*\}").unwrap());

/// Pattern for the words of a spaced release name.
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());

/// Pattern for multiple spaces cleanup.
static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Build a case-sensitive, word-bounded alternation over a list of terms.
pub(crate) fn word_list_regex(terms: &[&str]) -> Regex {
    let escaped: Vec<String> = terms.iter().map(|t| regex::escape(t)).collect();
    Regex::new(&format!(r"\b(?:{})\b", escaped.join("|"))).unwrap()
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    MULTI_SPACE_RE.replace_all(s, " ").trim().to_string()
}

/// Structured information parsed from a file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// Title with markers and technical terms removed.
    pub title: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub year: Option<u16>,
}

impl SeriesInfo {
    /// Whether both a season and an episode were found.
    pub fn has_episode(&self) -> bool {
        self.season.is_some() && self.episode.is_some()
    }
}

/// Source of candidate titles for raw file names.
pub trait TitleGuesser {
    /// Best-effort title for a file name; `None` when nothing usable is found.
    fn guess_title(&self, name: &str) -> Option<String>;
}

/// Default guesser for scene-style release names.
///
/// Cuts the name at the first year, episode marker or quality token and
/// drops bracketed tags. Language and edition tags end the title only as
/// a run right before a quality token or at the end of the name
/// ("Heat.FRENCH.1080p", "Heat.FRENCH.PROPER").
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseNameGuesser;

impl TitleGuesser for ReleaseNameGuesser {
    fn guess_title(&self, name: &str) -> Option<String> {
        let stem = strip_video_extension(file_name_part(name));
        let without_tags = BRACKETED_RE.replace_all(stem, " ");
        let spaced: String = without_tags
            .chars()
            .map(|c| if c == '.' || c == '_' { ' ' } else { c })
            .collect();
        let lower = spaced.to_lowercase();

        // A leading year belongs to the title ("2001 A Space Odyssey").
        let boundary = RELEASE_BOUNDARY_RE.find_iter(&lower).find(|m| m.start() > 0);
        let cut = match boundary {
            Some(m) if RELEASE_BOUNDARY_TERMS.contains(&m.as_str()) => {
                trailing_tags_start(&lower[..m.start()]).unwrap_or(m.start())
            }
            // Tag words before a year or episode marker are title words.
            Some(m) => m.start(),
            None => trailing_tags_start(&lower).unwrap_or(lower.len()),
        };

        let title = lower[..cut]
            .trim_end_matches(|c: char| c.is_whitespace() || "-([".contains(c))
            .replace(" - ", " ");
        let title = collapse_whitespace(&title.replace('-', " "));

        if title.is_empty() {
            None
        } else {
            Some(title)
        }
    }
}

/// Start of the trailing run of release tags, never the first word.
fn trailing_tags_start(lower: &str) -> Option<usize> {
    let words: Vec<_> = WORD_RE.find_iter(lower).collect();
    let mut start = None;
    for word in words.iter().skip(1).rev() {
        if !RELEASE_TAG_TERMS.contains(&word.as_str()) {
            break;
        }
        start = Some(word.start());
    }
    start
}

/// Last path component of a name that may carry directories.
fn file_name_part(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Drop a trailing video extension; other dotted suffixes are kept.
fn strip_video_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()) =>
        {
            stem
        }
        _ => name,
    }
}

/// Normalize a file name: lowercase the stem, `.`, `_` and `-` become spaces.
///
/// Idempotent: the output has no separators or extension left to strip.
pub fn normalize(name: &str) -> String {
    strip_video_extension(file_name_part(name))
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '.' | '_' | '-' => ' ',
            other => other,
        })
        .collect()
}

/// Clean title of a file name using the default release-name guesser.
pub fn extract_clean_title(name: &str) -> String {
    extract_clean_title_with(&ReleaseNameGuesser, name)
}

/// Clean title of a file name using a specific guesser.
///
/// Falls back to `normalize(name)` when the guesser finds nothing.
pub fn extract_clean_title_with(guesser: &dyn TitleGuesser, name: &str) -> String {
    let guessed = guesser
        .guess_title(name)
        .map(|title| STEREO_TAG_RE.replace_all(&title, " ").to_lowercase())
        .map(|title| collapse_whitespace(&title))
        .filter(|title| !title.is_empty());

    match guessed {
        Some(title) => title,
        None => normalize(name),
    }
}

/// Extract title, season, episode and year from a file name.
pub fn extract_series_info(name: &str) -> SeriesInfo {
    let normalized = normalize(name);
    let mut info = SeriesInfo::default();
    let mut cut = normalized.len();

    let episode_marker = SXXEXX_RE
        .captures(&normalized)
        .or_else(|| NXNN_RE.captures(&normalized));
    if let Some(caps) = episode_marker {
        info.season = caps.get(1).and_then(|m| m.as_str().parse().ok());
        info.episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
        if let Some(m) = caps.get(0) {
            cut = cut.min(m.start());
        }
    }

    // A year at the very start is part of the title ("1917", "2012").
    let year_match = YEAR_RE.find_iter(&normalized).find(|m| m.start() > 0);
    if let Some(m) = year_match {
        info.year = m.as_str().parse().ok();
        cut = cut.min(m.start());
    }

    let title = SERIES_TECH_RE.replace_all(&normalized[..cut], " ");
    info.title = collapse_whitespace(&title);
    info
}
