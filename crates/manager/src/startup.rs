//! Startup checks module for Slideshow Manager
//!
//! Probes the encoder before any build is attempted so a missing ffmpeg is
//! reported up front rather than on the first failed job. The probe is advisory:
//! callers log the error and carry on.

use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Encoder not available: {0}")]
    EncoderUnavailable(String),
}

/// Major version from an `ffmpeg -version` banner
///
/// Release builds print `ffmpeg version 6.1.1-3ubuntu5 ...`, tagged git builds
/// `ffmpeg version n7.0.2 ...`. Untagged snapshots (`N-113284-g...`) carry no
/// release number and yield `None`.
pub fn parse_ffmpeg_version(version_output: &str) -> Option<u32> {
    version_output.lines().find_map(|line| {
        let (_, rest) = line.split_once("ffmpeg version ")?;
        let token = rest.split_whitespace().next()?;
        let digits: String = token
            .strip_prefix('n')
            .unwrap_or(token)
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    })
}

/// Check that `binary -version` runs
///
/// # Returns
/// The encoder's major version when it can be parsed, for logging
///
/// # Errors
/// [`StartupError::EncoderUnavailable`] if the binary cannot be launched or
/// exits unsuccessfully
pub fn check_encoder_available(binary: &Path) -> Result<Option<u32>, StartupError> {
    let output = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            StartupError::EncoderUnavailable(format!(
                "{} -version failed; is FFmpeg installed and in PATH? Error: {}",
                binary.display(),
                e
            ))
        })?;

    if !output.status.success() {
        return Err(StartupError::EncoderUnavailable(format!(
            "{} -version exited with {}",
            binary.display(),
            output.status
        )));
    }

    Ok(parse_ffmpeg_version(&String::from_utf8_lossy(&output.stdout)))
}
