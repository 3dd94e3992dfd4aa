//! Re-checking confirmed associations against their file names.
//!
//! An entity that was identified once can drift: the file gets replaced,
//! or the match was wrong to begin with. The checker re-parses each file
//! name and deducts confidence for every disagreement.

use super::analyzer::extract_series_info;
use super::confidence::title_similarity;
use crate::models::association::{EntityKey, EntityKind, SuspiciousAssociation};
use crate::models::library::{MovieRecord, SeriesRecord};
use crate::services::AssociationSource;
use crate::utils::fs::file_name_string;
use std::collections::HashSet;
use std::path::Path;

/// Results scoring below this are reported.
pub const SUSPICIOUS_THRESHOLD: f64 = 60.0;

/// One entity to re-check.
struct Subject<'r> {
    key: EntityKey,
    titles: Vec<&'r str>,
    year: Option<u16>,
    file: &'r Path,
    durations: Option<(f64, f64)>,
}

impl<'r> Subject<'r> {
    fn movie(movie: &'r MovieRecord) -> Option<Self> {
        Some(Self {
            key: (EntityKind::Movie, movie.id),
            titles: std::iter::once(movie.title.as_str())
                .chain(movie.original_title.as_deref())
                .collect(),
            year: movie.year,
            file: movie.file_path.as_deref()?,
            durations: movie.runtime_minutes.zip(movie.file_duration_minutes),
        })
    }

    fn series(series: &'r SeriesRecord) -> Option<Self> {
        Some(Self {
            key: (EntityKind::Series, series.id),
            titles: std::iter::once(series.title.as_str())
                .chain(series.original_title.as_deref())
                .collect(),
            year: series.year,
            file: series.sample_file.as_deref()?,
            durations: None,
        })
    }
}

/// Finds identified entities whose file names no longer support them.
pub struct AssociationChecker<'a> {
    source: &'a dyn AssociationSource,
}

impl<'a> AssociationChecker<'a> {
    pub fn new(source: &'a dyn AssociationSource) -> Self {
        Self { source }
    }

    /// Check every identified entity that has a file.
    ///
    /// Confirmed entities are skipped before `limit` is applied.
    /// `on_progress` receives `(checked, total)` after each entity.
    /// Results are sorted most suspicious first.
    pub fn scan_suspicious(
        &self,
        mut on_progress: Option<&mut dyn FnMut(usize, usize)>,
        limit: Option<usize>,
    ) -> Vec<SuspiciousAssociation> {
        let confirmed: HashSet<EntityKey> = self.source.confirmed();
        let movies = self.source.identified_movies();
        let series = self.source.identified_series();

        let subjects: Vec<Subject> = movies
            .iter()
            .filter_map(Subject::movie)
            .chain(series.iter().filter_map(Subject::series))
            .filter(|s| !confirmed.contains(&s.key))
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        let total = subjects.len();
        tracing::info!(
            "Checking {} associations ({} confirmed skipped)",
            total,
            confirmed.len()
        );

        let mut suspicious = Vec::new();
        for (i, subject) in subjects.iter().enumerate() {
            let result = check(subject);
            if result.confidence_score < SUSPICIOUS_THRESHOLD {
                tracing::debug!(
                    "Suspicious {:?} {}: {:.0} ({})",
                    result.entity_type,
                    result.entity_id,
                    result.confidence_score,
                    result.reasons.join("; ")
                );
                suspicious.push(result);
            }
            if let Some(callback) = on_progress.as_deref_mut() {
                callback(i + 1, total);
            }
        }

        suspicious.sort_by(|a, b| {
            a.confidence_score
                .partial_cmp(&b.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        suspicious
    }
}

/// Score one entity against its file name.
fn check(subject: &Subject) -> SuspiciousAssociation {
    let parsed = extract_series_info(&file_name_string(subject.file));

    let (title_stored, similarity) = subject
        .titles
        .iter()
        .map(|t| (*t, title_similarity(&parsed.title, t)))
        .fold(("", -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    let mut score: f64 = 100.0;
    let mut reasons = Vec::new();

    if similarity < 60.0 {
        score -= 45.0;
        reasons.push(format!("Title very different ({:.0}% similar)", similarity));
    } else if similarity < 80.0 {
        score -= 15.0;
        reasons.push(format!("Title somewhat different ({:.0}% similar)", similarity));
    }

    if let (Some(stored), Some(found)) = (subject.year, parsed.year) {
        let gap = (stored as i32 - found as i32).abs();
        if gap >= 3 {
            score -= 25.0;
            reasons.push(format!("Year differs by {} ({} vs {})", gap, stored, found));
        }
    }

    if let Some((runtime, file_duration)) = subject.durations {
        if runtime > 0.0 {
            let gap = (runtime - file_duration).abs() / runtime;
            if gap >= 0.30 {
                score -= 45.0;
                reasons.push(format!("Duration differs by {:.0}%", gap * 100.0));
            } else if gap >= 0.15 {
                score -= 15.0;
                reasons.push(format!("Duration differs by {:.0}%", gap * 100.0));
            }
        }
    }

    SuspiciousAssociation {
        entity_type: subject.key.0,
        entity_id: subject.key.1,
        title_stored: title_stored.to_string(),
        title_parsed: parsed.title,
        year_stored: subject.year,
        year_parsed: parsed.year,
        confidence_score: score.max(0.0),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn movie(id: i64, title: &str, year: u16, file: &str) -> MovieRecord {
        MovieRecord {
            id,
            title: title.to_string(),
            original_title: None,
            year: Some(year),
            file_path: Some(PathBuf::from(file)),
            runtime_minutes: None,
            file_duration_minutes: None,
            genre: None,
        }
    }

    #[test]
    fn test_matching_movie_is_clean() {
        let m = movie(1, "The Matrix", 1999, "/s/The.Matrix.1999.1080p.mkv");
        let result = check(&Subject::movie(&m).unwrap());
        assert_eq!(result.confidence_score, 100.0);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_wrong_movie_is_flagged() {
        let mut m = movie(2, "Alien", 1979, "/s/Heat.1995.mkv");
        m.runtime_minutes = Some(117.0);
        m.file_duration_minutes = Some(170.0);
        let result = check(&Subject::movie(&m).unwrap());
        // title -45, year -25, duration -45
        assert_eq!(result.confidence_score, 0.0);
        assert_eq!(result.reasons.len(), 3);
        assert!(result.reasons[0].starts_with("Title"));
    }

    #[test]
    fn test_original_title_is_used() {
        let mut m = movie(3, "Hate", 1995, "/s/La.Haine.1995.mkv");
        m.original_title = Some("La Haine".to_string());
        let result = check(&Subject::movie(&m).unwrap());
        assert_eq!(result.confidence_score, 100.0);
        assert_eq!(result.title_stored, "La Haine");
    }

    #[test]
    fn test_somewhat_different_title_costs_15() {
        let m = movie(5, "The Departed", 2006, "/s/Departed.2006.mkv");
        let result = check(&Subject::movie(&m).unwrap());
        assert_eq!(result.confidence_score, 85.0);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.reasons[0].starts_with("Title somewhat different"));
    }

    #[test]
    fn test_moderate_duration_gap_costs_15() {
        let mut m = movie(6, "Heat", 1995, "/s/Heat.1995.mkv");
        m.runtime_minutes = Some(100.0);
        m.file_duration_minutes = Some(120.0);
        let result = check(&Subject::movie(&m).unwrap());
        assert_eq!(result.confidence_score, 85.0);
        assert_eq!(result.reasons, vec!["Duration differs by 20%".to_string()]);
    }

    #[test]
    fn test_year_gap_costs_25() {
        let m = movie(7, "Heat", 1995, "/s/Heat.1999.mkv");
        let result = check(&Subject::movie(&m).unwrap());
        assert_eq!(result.confidence_score, 75.0);
        assert_eq!(result.reasons.len(), 1);
    }

    #[test]
    fn test_moderate_deductions_add_up() {
        let mut m = movie(8, "The Departed", 2006, "/s/Departed.2006.mkv");
        m.runtime_minutes = Some(151.0);
        m.file_duration_minutes = Some(120.0);
        let result = check(&Subject::movie(&m).unwrap());
        assert_eq!(result.confidence_score, 70.0);
        assert_eq!(result.reasons.len(), 2);
        assert!(result.reasons[0].starts_with("Title somewhat different"));
        assert!(result.reasons[1].starts_with("Duration differs by"));
    }

    #[test]
    fn test_entity_without_file_is_ignored() {
        let mut m = movie(4, "Heat", 1995, "/s/Heat.mkv");
        m.file_path = None;
        assert!(Subject::movie(&m).is_none());
    }
}
