//! File system utilities.
//!
//! The view tree is made of symlinks pointing into the physical storage
//! tree, so every walk here is done with `follow_links(false)` and the
//! symlink itself is inspected rather than its target.

use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported video file extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    // Common formats
    "mkv", "mp4", "avi", "mov", "wmv", // Additional formats
    "m4v", "ts", "m2ts", "flv", "webm", // Less common but supported
    "mpg", "mpeg", "vob", "ogv", "ogm", "divx", "xvid", "3gp", "3g2", "mts", "rm", "rmvb", "asf",
    "f4v",
];

/// Check if a path exists and is a directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(crate::Error::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Get file extension in lowercase.
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Check if a file is a video file based on extension.
pub fn is_video_file(path: &Path) -> bool {
    get_extension(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// File name of a path as an owned string (empty when there is none).
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Check whether a path is itself a symlink (without following it).
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Read the raw target stored in a symlink.
///
/// Relative targets are joined onto the link's parent directory. An
/// unreadable link yields `None`.
pub fn read_link_target(link: &Path) -> Option<PathBuf> {
    let target = fs::read_link(link).ok()?;
    if target.is_absolute() {
        Some(target)
    } else {
        Some(
            link.parent()
                .map(|p| p.join(&target))
                .unwrap_or(target),
        )
    }
}

/// Resolve a symlink to the existing file it points at.
///
/// Returns `None` when resolution fails or the resolved path is gone.
pub fn resolve_symlink(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).ok().filter(|p| p.exists())
}

/// A symlink is broken iff resolving it fails or the target is missing.
pub fn is_broken_symlink(path: &Path) -> bool {
    is_symlink(path) && resolve_symlink(path).is_none()
}

/// Lazily walk every symlink below `root`.
///
/// Entries that vanish or cannot be read mid-walk are skipped.
pub fn walk_symlinks(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path_is_symlink())
        .map(|e| e.into_path())
}

/// Lazily walk every regular video file below `root`, skipping symlinks.
pub fn walk_video_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && !e.path_is_symlink())
        .map(|e| e.into_path())
        .filter(|p| is_video_file(p))
}

/// Lazily walk the broken symlinks below `root` in path order.
///
/// Each directory is read in name order, so the sequence matches a sort
/// of the full paths without collecting the walk first.
pub fn walk_broken_symlinks(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path_is_symlink())
        .map(|e| e.into_path())
        .filter(|p| resolve_symlink(p).is_none())
}

/// List broken symlinks below a directory, sorted by path.
pub fn list_broken_symlinks_under(dir: &Path) -> Vec<PathBuf> {
    walk_broken_symlinks(dir).collect()
}

/// List the regular video files directly inside `dir` (non-recursive).
pub fn list_video_files_in(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| is_video_file(p))
        .collect();
    files.sort();
    files
}

/// Create a symlink at `link` pointing to `target`.
pub fn create_symlink(target: &Path, link: &Path) -> bool {
    match symlink(target, link) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                "Failed to create symlink {} -> {}: {}",
                link.display(),
                target.display(),
                e
            );
            false
        }
    }
}

/// Move a symlink to `dest` without breaking it.
///
/// Absolute links are renamed. A relative link would point elsewhere from
/// its new directory, so it is recreated with its target made absolute.
pub fn relocate_symlink(source: &Path, dest: &Path) -> std::io::Result<()> {
    let raw = fs::read_link(source)?;
    if raw.is_absolute() {
        return fs::rename(source, dest);
    }

    let target = read_link_target(source).unwrap_or(raw);
    symlink(&target, dest)?;
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Check whether a directory can be created and written to.
pub fn is_writable_dir(dir: &Path) -> bool {
    if fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".media_curator_write_probe");
    match fs::write(&probe, b"") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(&PathBuf::from("movie.mkv")));
        assert!(is_video_file(&PathBuf::from("movie.MP4")));
        assert!(is_video_file(&PathBuf::from("episode.m2ts")));
        assert!(!is_video_file(&PathBuf::from("movie.txt")));
        assert!(!is_video_file(&PathBuf::from("movie.nfo")));
        assert!(!is_video_file(&PathBuf::from("movie")));
    }

    #[test]
    fn test_file_name_string() {
        assert_eq!(file_name_string(Path::new("/a/b/Movie.mkv")), "Movie.mkv");
        assert_eq!(file_name_string(Path::new("/")), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_detection() {
        let temp = tempfile::TempDir::new().unwrap();
        let target = temp.path().join("real.mkv");
        fs::write(&target, "x").unwrap();

        let good = temp.path().join("good.mkv");
        let bad = temp.path().join("bad.mkv");
        assert!(create_symlink(&target, &good));
        assert!(create_symlink(&temp.path().join("missing.mkv"), &bad));

        assert!(!is_broken_symlink(&good));
        assert!(is_broken_symlink(&bad));
        assert!(!is_broken_symlink(&target));
        assert_eq!(list_broken_symlinks_under(temp.path()), vec![bad.clone()]);
        assert_eq!(
            read_link_target(&bad),
            Some(temp.path().join("missing.mkv"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlinks_walk_in_path_order() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("missing.mkv");
        let mut expected = Vec::new();
        for rel in ["b/z.mkv", "a/y.mkv", "a/b/x.mkv", "c.mkv"] {
            let link = temp.path().join(rel);
            fs::create_dir_all(link.parent().unwrap()).unwrap();
            assert!(create_symlink(&missing, &link));
            expected.push(link);
        }
        expected.sort();

        let walked: Vec<PathBuf> = walk_broken_symlinks(temp.path()).collect();
        assert_eq!(walked, expected);

        let first: Vec<PathBuf> = walk_broken_symlinks(temp.path()).take(1).collect();
        assert_eq!(first, vec![temp.path().join("a/b/x.mkv")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_video_files_skips_symlinks() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("a.mkv"), "x").unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();
        create_symlink(&temp.path().join("a.mkv"), &temp.path().join("b.mkv"));

        let files = list_video_files_in(temp.path());
        assert_eq!(files, vec![temp.path().join("a.mkv")]);
    }
}
