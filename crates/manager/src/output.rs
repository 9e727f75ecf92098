//! Output module for naming and finding finished slideshows.

use chrono::{DateTime, Local};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

/// Extension of every produced slideshow.
pub const VIDEO_EXTENSION: &str = "mp4";

/// Path for a slideshow named `name` in `output_dir`, adding `.mp4` if missing.
pub fn resolve_output_path(output_dir: &Path, name: &str) -> PathBuf {
    let suffix = format!(".{}", VIDEO_EXTENSION);
    if name.to_lowercase().ends_with(&suffix) {
        output_dir.join(name)
    } else {
        output_dir.join(format!("{}{}", name, suffix))
    }
}

/// Timestamped default name, e.g. `slideshow_20240131_184502.mp4`.
pub fn default_output_name(now: DateTime<Local>) -> String {
    format!("slideshow_{}.{}", now.format("%Y%m%d_%H%M%S"), VIDEO_EXTENSION)
}

/// A slideshow found in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_time: SystemTime,
}

/// Slideshows in `output_dir`, newest first.
///
/// A missing directory has no videos.
pub fn list_videos(output_dir: &Path) -> std::io::Result<Vec<VideoEntry>> {
    let read_dir = match fs::read_dir(output_dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut videos = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        let is_video = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(VIDEO_EXTENSION))
            .unwrap_or(false);
        if !is_video {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) if metadata.is_file() => videos.push(VideoEntry {
                path,
                size_bytes: metadata.len(),
                modified_time: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            }),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable video"),
        }
    }

    videos.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_appends_extension() {
        let dir = Path::new("/videos");
        assert_eq!(resolve_output_path(dir, "trip"), PathBuf::from("/videos/trip.mp4"));
        assert_eq!(resolve_output_path(dir, "trip.mp4"), PathBuf::from("/videos/trip.mp4"));
        assert_eq!(resolve_output_path(dir, "trip.MP4"), PathBuf::from("/videos/trip.MP4"));
        assert_eq!(
            resolve_output_path(dir, "trip.mov"),
            PathBuf::from("/videos/trip.mov.mp4")
        );
    }

    #[test]
    fn test_default_name_is_timestamped() {
        let now = Local.with_ymd_and_hms(2024, 1, 31, 18, 45, 2).unwrap();
        assert_eq!(default_output_name(now), "slideshow_20240131_184502.mp4");
    }

    #[test]
    fn test_list_videos_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let videos = list_videos(&dir.path().join("gone")).unwrap();
        assert!(videos.is_empty());
    }

    #[test]
    fn test_list_videos_newest_first_and_mp4_only() {
        let dir = TempDir::new().unwrap();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        for (name, offset) in [("old.mp4", 0u64), ("new.mp4", 200), ("mid.MP4", 100)] {
            let file = File::create(dir.path().join(name)).unwrap();
            file.set_modified(base + Duration::from_secs(offset)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("folder.mp4")).unwrap();

        let names: Vec<String> = list_videos(dir.path())
            .unwrap()
            .iter()
            .map(|v| v.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["new.mp4", "mid.MP4", "old.mp4"]);
    }
}
