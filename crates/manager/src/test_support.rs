//! Shell-script stand-ins for the encoder and video players, for tests.

use crate::images::ImageEntry;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Marker that makes the stand-in encoder fail as if decoding a broken image.
pub const CORRUPT_MARKER: &str = "CORRUPT";

/// Write an executable shell script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Stand-in for ffmpeg.
///
/// Reads the staged directory from the argument after `-i`, treats the last
/// argument as the output, and writes the staged file names into the output.
/// Any staged file containing [`CORRUPT_MARKER`] makes it exit 1 with a
/// decoder-style message on stderr.
pub fn fake_encoder(dir: &Path, delay_secs: f32) -> PathBuf {
    let body = format!(
        r#"input=""
prev=""
out=""
for arg in "$@"; do
  if [ "$prev" = "-i" ]; then input="$arg"; fi
  prev="$arg"
  out="$arg"
done
staged=$(dirname "$input")
sleep {delay}
if cat "$staged"/*.png | grep -q {marker}; then
  echo "[png @ 0x5581] Invalid PNG signature" >&2
  echo "Error while decoding stream #0:0: Invalid data found when processing input" >&2
  exit 1
fi
echo "encoding $input"
ls "$staged" > "$out""#,
        delay = delay_secs,
        marker = CORRUPT_MARKER,
    );
    write_script(dir, "fake-ffmpeg", &body)
}

/// Create `count` small image files and their entries, in name order.
pub fn make_images(dir: &Path, count: usize) -> Vec<ImageEntry> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("img_{:02}.jpg", i));
            fs::write(&path, format!("pixels {}", i)).unwrap();
            ImageEntry {
                path,
                size_bytes: 8,
                modified_time: SystemTime::UNIX_EPOCH,
            }
        })
        .collect()
}
