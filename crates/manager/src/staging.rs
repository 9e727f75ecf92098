//! Staging module for presenting an image selection as an encoder input sequence.
//!
//! The encoder's image-sequence reader wants one directory of files named by a
//! contiguous, zero-padded counter with a single extension. Staging builds that
//! directory out of links to the selected images, and disposal removes it again.

use crate::images::ImageEntry;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the staging directory inside the working directory.
pub const STAGING_DIR_NAME: &str = ".slideshow_temp";

/// Digits in a staged file name.
pub const SEQUENCE_WIDTH: usize = 4;

/// Largest sequence that fits in `SEQUENCE_WIDTH` digits.
pub const MAX_SEQUENCE_LEN: usize = 9999;

/// Extension given to every staged file, whatever the source format.
pub const STAGED_EXTENSION: &str = "png";

/// Errors raised while building the staged sequence.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("No images to stage")]
    Empty,

    #[error("Too many images to stage: {count} (maximum {max})")]
    TooMany { count: usize, max: usize },

    #[error("Failed to prepare staging directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to stage image {index} ({image}): {source}")]
    Link {
        index: usize,
        image: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One staged file and the image it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedLink {
    /// 1-based position in the sequence.
    pub index: usize,
    /// Path of the staged reference inside the staging directory.
    pub link: PathBuf,
    /// Canonical path of the source image.
    pub target: PathBuf,
}

/// A staged, contiguously numbered input sequence.
///
/// Owns its directory: dropping the sequence removes the directory if
/// [`StagedSequence::dispose`] was not called first.
#[derive(Debug)]
pub struct StagedSequence {
    root: PathBuf,
    links: Vec<StagedLink>,
    disposed: bool,
}

impl StagedSequence {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn links(&self) -> &[StagedLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// printf-style pattern the encoder uses to read the sequence.
    pub fn input_pattern(&self) -> PathBuf {
        sequence_pattern(&self.root)
    }

    /// Remove all staged links and the directory itself.
    ///
    /// A directory that is already gone is not an error.
    pub fn dispose(mut self) -> io::Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> io::Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        remove_staging_dir(&self.root)
    }
}

impl Drop for StagedSequence {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!(root = %self.root.display(), error = %e, "failed to remove staging directory");
        }
    }
}

/// File name of the staged entry at `index` (1-based).
pub fn sequence_file_name(index: usize) -> String {
    format!("{:0width$}.{}", index, STAGED_EXTENSION, width = SEQUENCE_WIDTH)
}

/// printf-style pattern matching every staged file under `root`, e.g. `root/%04d.png`.
pub fn sequence_pattern(root: &Path) -> PathBuf {
    root.join(format!("%0{}d.{}", SEQUENCE_WIDTH, STAGED_EXTENSION))
}

/// Path of the staging directory for a working directory.
pub fn staging_root(working_dir: &Path) -> PathBuf {
    working_dir.join(STAGING_DIR_NAME)
}

/// Stage `images`, in order, under `working_dir`.
///
/// A staging directory left behind by an earlier run is cleared first. If any
/// image fails to stage, everything staged so far is removed before the error
/// is returned.
pub fn stage(working_dir: &Path, images: &[ImageEntry]) -> Result<StagedSequence, StagingError> {
    if images.is_empty() {
        return Err(StagingError::Empty);
    }
    if images.len() > MAX_SEQUENCE_LEN {
        return Err(StagingError::TooMany {
            count: images.len(),
            max: MAX_SEQUENCE_LEN,
        });
    }

    let root = staging_root(working_dir);
    prepare_dir(&root).map_err(|source| StagingError::Directory {
        path: root.clone(),
        source,
    })?;

    let mut sequence = StagedSequence {
        root,
        links: Vec::with_capacity(images.len()),
        disposed: false,
    };

    for (position, image) in images.iter().enumerate() {
        let index = position + 1;
        let link = sequence.root.join(sequence_file_name(index));

        let staged = image
            .path
            .canonicalize()
            .and_then(|target| link_image(&target, &link).map(|()| target));

        match staged {
            Ok(target) => sequence.links.push(StagedLink {
                index,
                link,
                target,
            }),
            Err(source) => {
                // Roll back the partial sequence before reporting
                if let Err(e) = sequence.remove() {
                    warn!(root = %sequence.root.display(), error = %e, "failed to roll back staging directory");
                }
                return Err(StagingError::Link {
                    index,
                    image: image.path.clone(),
                    source,
                });
            }
        }
    }

    debug!(root = %sequence.root.display(), count = sequence.len(), "staged image sequence");
    Ok(sequence)
}

/// Create an empty staging directory, clearing out any stale one.
fn prepare_dir(root: &Path) -> io::Result<()> {
    remove_staging_dir(root)?;
    fs::create_dir_all(root)
}

fn remove_staging_dir(root: &Path) -> io::Result<()> {
    match fs::remove_dir_all(root) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn link_image(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn link_image(target: &Path, link: &Path) -> io::Result<()> {
    // Symlinks need extra privileges on Windows; hard links do not but stay on one volume
    fs::hard_link(target, link).or_else(|_| fs::copy(target, link).map(|_| ()))
}
