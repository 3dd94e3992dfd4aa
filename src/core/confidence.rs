//! Confidence scoring of metadata candidates against a parsed file name.
//!
//! Movie score = 50% title, 25% year, 25% duration. Series are scored on
//! the title alone. All scores are 0-100, rounded to two decimals.

use super::similarity::token_sort_ratio;
use serde::{Deserialize, Serialize};

const TITLE_WEIGHT: f64 = 0.5;
const YEAR_WEIGHT: f64 = 0.25;
const DURATION_WEIGHT: f64 = 0.25;

/// Duration deviation scored 100.
const DURATION_TOLERANCE: f64 = 0.10;
/// Deviation scored 50; every further 10% halves the score again.
const DURATION_HALF_POINT: f64 = 0.20;

/// Order-independent title similarity (0-100).
pub fn title_similarity(a: &str, b: &str) -> f64 {
    token_sort_ratio(a, b) * 100.0
}

/// Year agreement (0-100); 0 when either year is unknown.
pub fn year_score(query: Option<u16>, candidate: Option<u16>) -> f64 {
    let (Some(q), Some(c)) = (query, candidate) else {
        return 0.0;
    };
    let diff = (q as i32 - c as i32).abs();
    if diff <= 1 {
        100.0
    } else {
        (100.0 - 25.0 * (diff - 1) as f64).max(0.0)
    }
}

/// Duration agreement (0-100); 0 when either duration is unknown.
///
/// The deviation is relative to the query duration. Up to 10% scores 100,
/// the score then falls linearly to 50 at 20% and halves with every
/// further 10%.
pub fn duration_score(query: Option<f64>, candidate: Option<f64>) -> f64 {
    let (Some(q), Some(c)) = (query, candidate) else {
        return 0.0;
    };
    if q <= 0.0 || c <= 0.0 {
        return 0.0;
    }

    let deviation = (q - c).abs() / q;
    if deviation <= DURATION_TOLERANCE {
        100.0
    } else if deviation <= DURATION_HALF_POINT {
        let band = DURATION_HALF_POINT - DURATION_TOLERANCE;
        100.0 - 50.0 * (deviation - DURATION_TOLERANCE) / band
    } else {
        50.0 * 0.5f64.powf((deviation - DURATION_HALF_POINT) / 0.10)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted score of a movie candidate.
pub fn calculate_movie_score(
    query_title: &str,
    query_year: Option<u16>,
    query_duration: Option<f64>,
    candidate_title: &str,
    candidate_year: Option<u16>,
    candidate_duration: Option<f64>,
) -> f64 {
    let score = TITLE_WEIGHT * title_similarity(query_title, candidate_title)
        + YEAR_WEIGHT * year_score(query_year, candidate_year)
        + DURATION_WEIGHT * duration_score(query_duration, candidate_duration);
    round2(score.clamp(0.0, 100.0))
}

/// Score of a series candidate: title similarity only.
pub fn calculate_series_score(query_title: &str, candidate_title: &str) -> f64 {
    round2(title_similarity(query_title, candidate_title))
}

/// What is known about the file being identified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreQuery {
    pub title: String,
    pub year: Option<u16>,
    pub duration_minutes: Option<f64>,
    pub is_series: bool,
}

/// A metadata search result to be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
    pub duration_minutes: Option<f64>,
}

/// A candidate with its confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: CandidateInfo,
    pub score: f64,
}

/// Score every candidate and sort best first.
///
/// The better of the localized and original title is used. Equal scores
/// keep their input order.
pub fn score_results(query: &ScoreQuery, candidates: Vec<CandidateInfo>) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let titles = std::iter::once(candidate.title.as_str())
                .chain(candidate.original_title.as_deref());
            let score = titles
                .map(|title| {
                    if query.is_series {
                        calculate_series_score(&query.title, title)
                    } else {
                        calculate_movie_score(
                            &query.title,
                            query.year,
                            query.duration_minutes,
                            title,
                            candidate.year,
                            candidate.duration_minutes,
                        )
                    }
                })
                .fold(0.0, f64::max);
            ScoredCandidate { candidate, score }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}
