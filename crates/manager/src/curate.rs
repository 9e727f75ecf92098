//! Curation module for adding, renaming and removing images in the working directory.
//!
//! These operations do not touch the hidden set: a renamed or removed image keeps
//! its old hidden entry until the user toggles it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised by curation operations
#[derive(Debug, Error)]
pub enum CurateError {
    #[error("Invalid file name '{0}'")]
    InvalidName(String),

    #[error("A file named '{}' already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of [`add_images`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddSummary {
    /// Destinations written
    pub copied: Vec<PathBuf>,
    /// Sources not copied, because the name was taken or the copy failed
    pub skipped: Vec<PathBuf>,
}

/// Copy `sources` into `dir`, each under its own file name
///
/// Existing files in `dir` are never overwritten.
pub fn add_images(dir: &Path, sources: &[PathBuf]) -> AddSummary {
    let mut summary = AddSummary::default();

    for source in sources {
        let Some(name) = source.file_name() else {
            warn!(source = %source.display(), "source has no file name; skipping");
            summary.skipped.push(source.clone());
            continue;
        };
        let destination = dir.join(name);

        if destination.exists() {
            summary.skipped.push(source.clone());
            continue;
        }

        match fs::copy(source, &destination) {
            Ok(_) => summary.copied.push(destination),
            Err(e) => {
                warn!(source = %source.display(), error = %e, "failed to copy image");
                summary.skipped.push(source.clone());
            }
        }
    }

    info!(
        copied = summary.copied.len(),
        skipped = summary.skipped.len(),
        "added images"
    );
    summary
}

/// Rename `path` to `new_name` in the same directory
///
/// A name without an extension keeps the original one.
///
/// # Returns
/// The new path
///
/// # Errors
/// - [`CurateError::InvalidName`] for an empty name, a name with a path
///   separator, or the current name
/// - [`CurateError::AlreadyExists`] if the target exists
pub fn rename_image(path: &Path, new_name: &str) -> Result<PathBuf, CurateError> {
    let trimmed = new_name.trim();
    if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(CurateError::InvalidName(new_name.to_string()));
    }

    let mut file_name = trimmed.to_string();
    if Path::new(trimmed).extension().is_none() {
        if let Some(ext) = path.extension() {
            file_name = format!("{}.{}", trimmed, ext.to_string_lossy());
        }
    }

    let current = path.file_name().map(|n| n.to_string_lossy().into_owned());
    if current.as_deref() == Some(file_name.as_str()) {
        return Err(CurateError::InvalidName(new_name.to_string()));
    }

    let target = path.with_file_name(&file_name);
    if target.exists() {
        return Err(CurateError::AlreadyExists(target));
    }

    fs::rename(path, &target)?;
    info!(from = %path.display(), to = %target.display(), "renamed image");
    Ok(target)
}

/// Permanently delete `path`
pub fn remove_image(path: &Path) -> Result<(), CurateError> {
    fs::remove_file(path)?;
    info!(path = %path.display(), "removed image");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_copies_and_skips_existing() {
        let outside = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        let a = outside.path().join("a.jpg");
        let b = outside.path().join("b.png");
        fs::write(&a, "new a").unwrap();
        fs::write(&b, "new b").unwrap();
        fs::write(dir.path().join("b.png"), "original b").unwrap();

        let summary = add_images(dir.path(), &[a.clone(), b.clone()]);

        assert_eq!(summary.copied, vec![dir.path().join("a.jpg")]);
        assert_eq!(summary.skipped, vec![b]);
        assert_eq!(fs::read_to_string(dir.path().join("b.png")).unwrap(), "original b");
        assert_eq!(fs::read_to_string(dir.path().join("a.jpg")).unwrap(), "new a");
    }

    #[test]
    fn test_add_missing_source_is_skipped() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("elsewhere").join("x.jpg");

        let summary = add_images(dir.path(), &[missing.clone()]);

        assert!(summary.copied.is_empty());
        assert_eq!(summary.skipped, vec![missing]);
    }

    #[test]
    fn test_rename_keeps_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_0001.jpg");
        fs::write(&path, "x").unwrap();

        let renamed = rename_image(&path, "beach").unwrap();

        assert_eq!(renamed, dir.path().join("beach.jpg"));
        assert!(renamed.exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_rename_with_explicit_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, "x").unwrap();

        let renamed = rename_image(&path, "b.png").unwrap();
        assert_eq!(renamed, dir.path().join("b.png"));
    }

    #[test]
    fn test_rename_refuses_existing_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, "a").unwrap();
        fs::write(dir.path().join("b.jpg"), "b").unwrap();

        let result = rename_image(&path, "b");

        assert!(matches!(result, Err(CurateError::AlreadyExists(_))));
        assert_eq!(fs::read_to_string(dir.path().join("b.jpg")).unwrap(), "b");
        assert!(path.exists());
    }

    #[test]
    fn test_rename_rejects_bad_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, "a").unwrap();

        for name in ["", "   ", "a", "a.jpg", "sub/b"] {
            assert!(
                matches!(rename_image(&path, name), Err(CurateError::InvalidName(_))),
                "name {:?} should be rejected",
                name
            );
        }
        assert!(path.exists());
    }

    #[test]
    fn test_remove_deletes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, "a").unwrap();

        remove_image(&path).unwrap();
        assert!(!path.exists());
        assert!(matches!(remove_image(&path), Err(CurateError::Io(_))));
    }
}
