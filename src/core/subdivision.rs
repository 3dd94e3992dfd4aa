//! Alphabetic subdivision of oversized directories.
//!
//! Entries are ordered by a two-character key and cut into contiguous
//! chunks of at most `max_per_dir`. Each chunk becomes a subdirectory
//! named after its first and last key, e.g. `AA-CH`.

use super::analyzer::normalize;
use crate::models::cleanup::SubdivisionPlan;
use crate::utils::fs::file_name_string;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Leading articles ignored when sorting.
const ARTICLES: &[&str] = &["the", "a", "an", "le", "la", "les", "un", "une"];

/// Articles elided into the first word ("L'Avventura").
const ELIDED_ARTICLES: &[&str] = &["l'", "l\u{2019}"];

/// Key of a name without any letter or digit.
const SYMBOL_KEY: &str = "##";

/// Two-character sort key of an entry name.
///
/// Accents are folded and the leading article is dropped, only letters
/// and digits are kept and the result is upper-cased, then truncated or
/// padded with `A` to two characters. `"The Matrix.mkv"` gives `"MA"`,
/// `"Les Misérables.mkv"` gives `"MI"`, `"X.mkv"` gives `"XA"`.
pub fn sort_key(name: &str) -> String {
    let folded: String = normalize(name).chars().map(fold_accent).collect();
    let mut words: Vec<&str> = folded.split_whitespace().collect();
    if words.len() > 1 && ARTICLES.contains(&words[0]) {
        words.remove(0);
    } else if let Some(first) = words.first().copied() {
        let elided = ELIDED_ARTICLES
            .iter()
            .find_map(|article| first.strip_prefix(*article))
            .filter(|rest| !rest.is_empty());
        if let Some(rest) = elided {
            words[0] = rest;
        }
    }

    let alnum: String = words
        .concat()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect();

    match alnum.chars().count() {
        0 => SYMBOL_KEY.to_string(),
        1 => format!("{}A", alnum),
        _ => alnum,
    }
}

/// Base letter of a lowercase accented Latin letter.
fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'æ' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'œ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Plan the split of `parent_dir` holding `entries`.
///
/// Every entry appears exactly once in `items_to_move`, and no range
/// holds more than `max_per_dir` entries. Ranges whose labels collide
/// (many entries sharing a key) get a numeric suffix.
pub fn plan_subdivision(
    parent_dir: &Path,
    entries: &[PathBuf],
    max_per_dir: usize,
) -> SubdivisionPlan {
    let max_per_dir = max_per_dir.max(1);

    let mut keyed: Vec<(String, String, &PathBuf)> = entries
        .iter()
        .map(|path| {
            let name = file_name_string(path);
            (sort_key(&name), name.to_lowercase(), path)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut ranges = Vec::new();
    let mut items_to_move = Vec::with_capacity(keyed.len());
    let mut label_uses: HashMap<String, usize> = HashMap::new();

    for chunk in keyed.chunks(max_per_dir) {
        let first = chunk[0].0.clone();
        let last = chunk[chunk.len() - 1].0.clone();

        let base_label = format!("{}-{}", first, last);
        let uses = label_uses.entry(base_label.clone()).or_insert(0);
        *uses += 1;
        let label = if *uses == 1 {
            base_label
        } else {
            format!("{} ({})", base_label, uses)
        };

        let range_dir = parent_dir.join(&label);
        for (_, _, source) in chunk {
            let dest = range_dir.join(file_name_string(source));
            items_to_move.push(((*source).clone(), dest));
        }
        ranges.push((first, last));
    }

    SubdivisionPlan {
        parent_dir: parent_dir.to_path_buf(),
        current_count: entries.len(),
        max_allowed: max_per_dir,
        ranges,
        items_to_move,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn names(n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| {
                let first = (b'A' + (i % 26) as u8) as char;
                let second = (b'a' + (i / 26) as u8) as char;
                PathBuf::from(format!("/v/Movies/Drama/{}{} Movie {}.mkv", first, second, i))
            })
            .collect()
    }

    #[test]
    fn test_sort_key() {
        assert_eq!(sort_key("The Matrix.mkv"), "MA");
        assert_eq!(sort_key("an.american.werewolf.mkv"), "AM");
        assert_eq!(sort_key("X.mkv"), "XA");
        assert_eq!(sort_key("12 Monkeys.mkv"), "12");
        assert_eq!(sort_key("!!!.mkv"), "##");
        // A lone article is the title.
        assert_eq!(sort_key("A.mkv"), "AA");
    }

    #[test]
    fn test_sort_key_french_titles() {
        assert_eq!(sort_key("Le.Fabuleux.Destin.mkv"), "FA");
        assert_eq!(sort_key("Les Misérables.mkv"), "MI");
        assert_eq!(sort_key("Une.Femme.mkv"), "FE");
        assert_eq!(sort_key("L'Avventura.mkv"), "AV");
        assert_eq!(sort_key("Élite.S01E01.mkv"), "EL");
        assert_eq!(sort_key("La.mkv"), "LA");
        assert_eq!(sort_key("L'.mkv"), "LA");
    }

    #[test]
    fn test_plan_120_by_50() {
        let entries = names(120);
        let plan = plan_subdivision(Path::new("/v/Movies/Drama"), &entries, 50);

        assert_eq!(plan.current_count, 120);
        assert_eq!(plan.ranges.len(), 3);

        let mut sizes: HashMap<PathBuf, usize> = HashMap::new();
        for (_, dest) in &plan.items_to_move {
            *sizes.entry(dest.parent().unwrap().to_path_buf()).or_insert(0) += 1;
        }
        let mut counts: Vec<usize> = sizes.values().copied().collect();
        counts.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(counts, vec![50, 50, 20]);
    }

    #[test]
    fn test_plan_covers_every_entry_once() {
        for (n, k) in [(1, 1), (7, 3), (51, 50), (100, 10), (13, 100)] {
            let entries = names(n);
            let plan = plan_subdivision(Path::new("/v/Movies/Drama"), &entries, k);

            let sources: HashSet<&PathBuf> = plan.items_to_move.iter().map(|(s, _)| s).collect();
            assert_eq!(plan.items_to_move.len(), n);
            assert_eq!(sources.len(), n);
            for (source, dest) in &plan.items_to_move {
                assert_eq!(source.file_name(), dest.file_name());
                assert_eq!(dest.parent().unwrap().parent().unwrap(), Path::new("/v/Movies/Drama"));
            }
        }
    }

    #[test]
    fn test_colliding_labels_are_disambiguated() {
        let entries: Vec<PathBuf> = (0..5)
            .map(|i| PathBuf::from(format!("/v/Series/Star Trek {}.mkv", i)))
            .collect();
        let plan = plan_subdivision(Path::new("/v/Series"), &entries, 2);

        let dirs: HashSet<PathBuf> = plan
            .items_to_move
            .iter()
            .map(|(_, d)| d.parent().unwrap().to_path_buf())
            .collect();
        assert_eq!(dirs.len(), 3);
        assert!(dirs.contains(Path::new("/v/Series/ST-ST")));
        assert!(dirs.contains(Path::new("/v/Series/ST-ST (2)")));
    }
}
