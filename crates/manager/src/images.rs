//! Image set module for discovering slideshow images in a directory.
//!
//! Scans a single directory (non-recursively) for still images, filters them by a
//! search term, sorts them, and tracks which of them the user has hidden.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Image file extensions picked up by the scanner (case-insensitive matching).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Errors raised while enumerating the image directory.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The directory itself could not be resolved (missing, permission denied).
    #[error("Failed to open image directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Enumeration of the directory failed.
    #[error("Failed to list image directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A snapshot of one image file taken at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Absolute path to the image.
    pub path: PathBuf,
    /// File size in bytes at scan time.
    pub size_bytes: u64,
    /// Last modified time at scan time.
    pub modified_time: SystemTime,
}

impl ImageEntry {
    /// The identity of the entry, as stored in the hidden set.
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// File name component, lossily converted for display and matching.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Ordering applied to the scanned entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// File name, ascending.
    #[default]
    Name,
    /// Modification time, newest first.
    Modified,
    /// File size, largest first.
    Size,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Modified => "modified",
            SortKey::Size => "size",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "modified" | "date" | "date modified" => Ok(SortKey::Modified),
            "size" | "file size" => Ok(SortKey::Size),
            other => Err(format!(
                "unknown sort key '{}' (expected name, modified or size)",
                other
            )),
        }
    }
}

/// Counts shown alongside the image list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageSetStats {
    /// Entries matching the current search.
    pub total: usize,
    /// Entries matching the current search that are not hidden.
    pub visible: usize,
    /// Size of the hidden set, including paths that no longer exist.
    pub hidden: usize,
    /// Combined size of all matching entries.
    pub total_bytes: u64,
}

/// Checks if a file has an image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Checks if a file name contains the search term (case-insensitive).
///
/// An empty term matches everything.
pub fn matches_search(file_name: &str, search_term: &str) -> bool {
    search_term.is_empty() || file_name.to_lowercase().contains(&search_term.to_lowercase())
}

/// Scans `directory` for images whose name contains `search_term`.
///
/// Entries are returned in filesystem enumeration order. Individual entries
/// that cannot be read are skipped; failure to open the directory itself is
/// an error.
pub fn scan_images(directory: &Path, search_term: &str) -> Result<Vec<ImageEntry>, ScanError> {
    let root = directory
        .canonicalize()
        .map_err(|source| ScanError::Unreadable {
            path: directory.to_path_buf(),
            source,
        })?;

    let mut entries = Vec::new();

    let walker = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // Depth 0 is the directory itself
            Err(e) if e.depth() == 0 => return Err(ScanError::Walk(e)),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_image_file(entry.path()) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !matches_search(&file_name, search_term) {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => entries.push(ImageEntry {
                path: entry.path().to_path_buf(),
                size_bytes: metadata.len(),
                modified_time: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            }),
            Err(e) => warn!(path = %entry.path().display(), error = %e, "skipping image without metadata"),
        }
    }

    debug!(directory = %root.display(), count = entries.len(), "scanned images");
    Ok(entries)
}

/// Sorts entries in place.
///
/// The sort is stable, so ties under `Modified` and `Size` keep enumeration
/// order. That order is whatever the filesystem yields and is not guaranteed
/// to be the same across platforms.
pub fn sort_entries(entries: &mut [ImageEntry], key: SortKey) {
    match key {
        SortKey::Name => entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name())),
        SortKey::Modified => entries.sort_by(|a, b| b.modified_time.cmp(&a.modified_time)),
        SortKey::Size => entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
    }
}

/// Ordered, filtered view over a directory of images plus the hidden set.
///
/// Entries are rebuilt wholesale by [`ImageSet::reload`]; the hidden set lives
/// as long as the set itself and may name files that are gone.
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    entries: Vec<ImageEntry>,
    hidden: BTreeSet<String>,
}

impl ImageSet {
    /// Create an empty set with a previously persisted hidden set.
    pub fn new(hidden: BTreeSet<String>) -> Self {
        Self {
            entries: Vec::new(),
            hidden,
        }
    }

    /// Rescan `directory`, filter by `search_term` and sort by `sort_key`.
    ///
    /// On failure the entries are cleared, so the visible set degrades to empty,
    /// and the error is handed back for reporting.
    pub fn reload(
        &mut self,
        directory: &Path,
        search_term: &str,
        sort_key: SortKey,
    ) -> Result<(), ScanError> {
        match scan_images(directory, search_term) {
            Ok(mut entries) => {
                sort_entries(&mut entries, sort_key);
                self.entries = entries;
                Ok(())
            }
            Err(e) => {
                self.entries.clear();
                Err(e)
            }
        }
    }

    /// All entries matching the last search, hidden ones included.
    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn hidden(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn is_hidden(&self, path: &str) -> bool {
        self.hidden.contains(path)
    }

    /// Flip the hidden membership of `path`.
    ///
    /// Succeeds whether or not the file exists. Returns true if the path is
    /// hidden afterwards.
    pub fn toggle_hidden(&mut self, path: &str) -> bool {
        if self.hidden.remove(path) {
            false
        } else {
            self.hidden.insert(path.to_string());
            true
        }
    }

    /// Entries not in the hidden set, in sorted order.
    pub fn visible_entries(&self) -> Vec<ImageEntry> {
        self.entries
            .iter()
            .filter(|entry| !self.hidden.contains(&entry.key()))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> ImageSetStats {
        ImageSetStats {
            total: self.entries.len(),
            visible: self
                .entries
                .iter()
                .filter(|entry| !self.hidden.contains(&entry.key()))
                .count(),
            hidden: self.hidden.len(),
            total_bytes: self.entries.iter().map(|entry| entry.size_bytes).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![0u8; len]).unwrap();
        path
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn names(entries: &[ImageEntry]) -> Vec<String> {
        entries.iter().map(|e| e.file_name()).collect()
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("/photos/a.jpg")));
        assert!(is_image_file(Path::new("/photos/a.JPG"))); // case-insensitive
        assert!(is_image_file(Path::new("/photos/a.Png")));
        assert!(!is_image_file(Path::new("/photos/a.gif")));
        assert!(!is_image_file(Path::new("/photos/a.mp4")));
        assert!(!is_image_file(Path::new("/photos/jpg"))); // no extension
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("name".parse::<SortKey>().unwrap(), SortKey::Name);
        assert_eq!("date modified".parse::<SortKey>().unwrap(), SortKey::Modified);
        assert_eq!("Size".parse::<SortKey>().unwrap(), SortKey::Size);
        assert!("colour".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_scan_is_non_recursive_and_filters_extensions() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.jpg", 10);
        write_file(dir.path(), "b.PNG", 10);
        write_file(dir.path(), "notes.txt", 10);
        fs::create_dir(dir.path().join("nested")).unwrap();
        write_file(&dir.path().join("nested"), "c.jpg", 10);

        let mut entries = scan_images(dir.path(), "").unwrap();
        sort_entries(&mut entries, SortKey::Name);

        assert_eq!(names(&entries), vec!["a.jpg", "b.PNG"]);
        assert!(entries.iter().all(|e| e.path.is_absolute()));
    }

    #[test]
    fn test_scan_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");

        let result = scan_images(&missing, "");
        assert!(matches!(result, Err(ScanError::Unreadable { .. })));
    }

    #[test]
    fn test_reload_failure_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.jpg", 10);
        write_file(dir.path(), "b.jpg", 10);

        let mut set = ImageSet::default();
        set.reload(dir.path(), "", SortKey::Name).unwrap();
        assert_eq!(set.visible_entries().len(), 2);

        let missing = dir.path().join("gone");
        assert!(set.reload(&missing, "", SortKey::Name).is_err());
        assert!(set.entries().is_empty());
        assert!(set.visible_entries().is_empty());
    }

    #[test]
    fn test_sort_by_size_largest_first() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "small.jpg", 10);
        write_file(dir.path(), "large.jpg", 300);
        write_file(dir.path(), "medium.png", 100);

        let mut set = ImageSet::default();
        set.reload(dir.path(), "", SortKey::Size).unwrap();

        assert_eq!(names(set.entries()), vec!["large.jpg", "medium.png", "small.jpg"]);
    }

    #[test]
    fn test_sort_by_modified_newest_first() {
        let dir = TempDir::new().unwrap();
        let old = write_file(dir.path(), "old.jpg", 10);
        let new = write_file(dir.path(), "new.jpg", 10);
        let mid = write_file(dir.path(), "mid.jpg", 10);
        set_mtime(&old, 1_000);
        set_mtime(&mid, 2_000);
        set_mtime(&new, 3_000);

        let mut set = ImageSet::default();
        set.reload(dir.path(), "", SortKey::Modified).unwrap();

        assert_eq!(names(set.entries()), vec!["new.jpg", "mid.jpg", "old.jpg"]);
    }

    #[test]
    fn test_hidden_entries_are_excluded_from_visible() {
        let dir = TempDir::new().unwrap();
        let a = write_file(dir.path(), "a.jpg", 10);
        write_file(dir.path(), "b.jpg", 20);

        let mut set = ImageSet::default();
        set.reload(dir.path(), "", SortKey::Name).unwrap();

        let key = set.entries()[0].key();
        assert_eq!(key, a.canonicalize().unwrap().to_string_lossy());
        assert!(set.toggle_hidden(&key));

        assert_eq!(names(&set.visible_entries()), vec!["b.jpg"]);
        let stats = set.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.visible, 1);
        assert_eq!(stats.hidden, 1);
        assert_eq!(stats.total_bytes, 30);
    }

    #[test]
    fn test_hidden_path_outlives_its_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.jpg", 10);
        let b = write_file(dir.path(), "b.jpg", 10);

        let mut set = ImageSet::default();
        set.reload(dir.path(), "", SortKey::Name).unwrap();
        let b_key = set.entries()[1].key();
        set.toggle_hidden(&b_key);

        fs::remove_file(&b).unwrap();
        set.reload(dir.path(), "", SortKey::Name).unwrap();

        // The file is gone from the entries but stays in the hidden set
        assert_eq!(names(&set.visible_entries()), vec!["a.jpg"]);
        assert!(set.is_hidden(&b_key));
        assert_eq!(set.stats().hidden, 1);
    }

    #[test]
    fn test_toggle_hidden_on_unknown_path() {
        let mut set = ImageSet::default();
        assert!(set.toggle_hidden("/nowhere/ghost.png"));
        assert!(set.is_hidden("/nowhere/ghost.png"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // The search filter keeps exactly the unfiltered entries whose name
        // contains the term, ignoring case
        #[test]
        fn prop_search_is_case_insensitive_substring_filter(
            stems in proptest::collection::btree_set("[a-zA-Z]{1,8}", 1..8),
            term in "[a-zA-Z]{0,3}",
        ) {
            let dir = TempDir::new().unwrap();
            for stem in &stems {
                write_file(dir.path(), &format!("{}.jpg", stem), 4);
            }

            let mut all = ImageSet::default();
            all.reload(dir.path(), "", SortKey::Name).unwrap();
            let mut filtered = ImageSet::default();
            filtered.reload(dir.path(), &term, SortKey::Name).unwrap();

            let expected: Vec<String> = all
                .visible_entries()
                .iter()
                .map(|e| e.file_name())
                .filter(|name| name.to_lowercase().contains(&term.to_lowercase()))
                .collect();

            prop_assert_eq!(names(&filtered.visible_entries()), expected);
        }

        // Toggling the same path twice restores the previous membership
        #[test]
        fn prop_toggle_hidden_is_an_involution(
            initial in proptest::collection::btree_set("/[a-z]{1,6}\\.jpg", 0..6),
            path in "/[a-z]{1,6}\\.jpg",
        ) {
            let mut set = ImageSet::new(initial.clone());
            let before = set.is_hidden(&path);

            set.toggle_hidden(&path);
            prop_assert_ne!(set.is_hidden(&path), before);
            set.toggle_hidden(&path);

            prop_assert_eq!(set.is_hidden(&path), before);
            prop_assert_eq!(set.hidden(), &initial);
        }
    }
}
