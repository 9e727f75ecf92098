//! FFmpeg encoder module for Slideshow Manager
//!
//! Provides functionality to build and execute the FFmpeg command that turns a
//! staged image sequence into an H.264 MP4 with fixed canvas settings.

use crate::job::JobResult;
use crate::staging::sequence_pattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

/// Encoder binary used when none is configured
pub const DEFAULT_ENCODER: &str = "ffmpeg";

/// Seconds each image stays on screen
pub const DEFAULT_FRAME_HOLD_SECONDS: f64 = 5.0;

/// Output frame rate
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Output canvas every image is scaled and padded into
pub const DEFAULT_CANVAS: Canvas = Canvas {
    width: 1920,
    height: 1080,
};

/// Fixed output codec
const VIDEO_CODEC: &str = "libx264";

/// Fixed 4:2:0 output pixel format
const PIXEL_FORMAT: &str = "yuv420p";

/// Output frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// Error type for encoding operations
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder process could not be started
    #[error("Failed to launch encoder {encoder}: {source}")]
    Launch {
        encoder: String,
        #[source]
        source: std::io::Error,
    },

    /// The encoder ran and exited unsuccessfully
    #[error("Encoder failed with exit code: {}", exit_label(.exit_code))]
    Failed {
        exit_code: Option<i32>,
        command: String,
        stdout: String,
        stderr: String,
    },

    /// The encoder reported success but the output cannot be read
    #[error("Encoder output {path} is unreadable: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<EncodeError> for JobResult {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::Failed {
                exit_code,
                command,
                stdout,
                stderr,
            } => JobResult::EncoderFailure {
                exit_code,
                command,
                stdout,
                stderr,
            },
            other => JobResult::SystemFailure {
                description: other.to_string(),
            },
        }
    }
}

/// Parameters for one slideshow encode
///
/// Derived from the pipeline configuration and a staged sequence; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSpec {
    /// Encoder binary to run
    pub encoder: PathBuf,
    /// Directory holding the staged `NNNN.png` sequence
    pub staged_root: PathBuf,
    /// Number of staged images
    pub image_count: usize,
    /// Destination file
    pub output_path: PathBuf,
    /// Seconds each image is held
    pub frame_hold_seconds: f64,
    /// Output frame rate
    pub frame_rate: u32,
    /// Output canvas
    pub canvas: Canvas,
}

impl EncodeSpec {
    /// Create encoding parameters with the default encoder and timing
    pub fn new(staged_root: PathBuf, image_count: usize, output_path: PathBuf) -> Self {
        Self {
            encoder: PathBuf::from(DEFAULT_ENCODER),
            staged_root,
            image_count,
            output_path,
            frame_hold_seconds: DEFAULT_FRAME_HOLD_SECONDS,
            frame_rate: DEFAULT_FRAME_RATE,
            canvas: DEFAULT_CANVAS,
        }
    }

    /// Estimated length of the video in seconds
    ///
    /// Computed from the image count, not measured from the container.
    pub fn duration_estimate(&self) -> f64 {
        self.image_count as f64 * self.frame_hold_seconds
    }

    /// Input rate: one frame per hold period, e.g. `1/5`
    pub fn input_frame_rate(&self) -> String {
        format!("1/{}", self.frame_hold_seconds)
    }
}

/// Result of a successful encode
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutput {
    pub output_path: PathBuf,
    pub size_bytes: u64,
    pub stdout: String,
    pub stderr: String,
}

/// Build the video filter chain for a canvas
///
/// Applied in order: pixel format normalization, aspect-preserving scale-down so
/// the image fits the canvas, then centered padding to exactly the canvas size.
pub fn build_filter_graph(canvas: Canvas) -> String {
    let (w, h) = (canvas.width, canvas.height);
    format!(
        "format={pix},\
         scale='min({w},iw*min({w}/iw\\,{h}/ih))':'min({h},ih*min({w}/iw\\,{h}/ih))':force_original_aspect_ratio=decrease,\
         pad={w}:{h}:({w}-iw)/2:({h}-ih)/2",
        pix = PIXEL_FORMAT,
        w = w,
        h = h,
    )
}

/// Build an FFmpeg command with all required encoding flags
///
/// Creates a Command configured with:
/// - Overwrite and error-only logging
/// - Image-sequence input at one frame per hold period
/// - The scale/pad filter chain
/// - H.264 at the fixed frame rate and pixel format
/// - The output path as the final argument
pub fn build_ffmpeg_command(spec: &EncodeSpec) -> Command {
    let mut cmd = Command::new(&spec.encoder);

    // Overwrite output, only log errors
    cmd.arg("-y");
    cmd.arg("-loglevel").arg("error");

    // Image-sequence input
    cmd.arg("-framerate").arg(spec.input_frame_rate());
    cmd.arg("-i").arg(sequence_pattern(&spec.staged_root));

    // Filter chain
    cmd.arg("-vf").arg(build_filter_graph(spec.canvas));

    // Codec, output rate, pixel format
    cmd.arg("-c:v").arg(VIDEO_CODEC);
    cmd.arg("-r").arg(spec.frame_rate.to_string());
    cmd.arg("-pix_fmt").arg(PIXEL_FORMAT);

    cmd.arg(&spec.output_path);

    cmd
}

/// Render a command as a single line for logs and failure reports
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Execute an FFmpeg encode
///
/// Runs the command to completion, capturing stdout and stderr in full.
///
/// # Errors
/// Returns an error if:
/// - The encoder fails to start
/// - The encoder exits with non-zero status or is killed by a signal
/// - The output file cannot be read after a successful exit
pub fn run_ffmpeg(spec: &EncodeSpec) -> Result<EncodeOutput, EncodeError> {
    let mut cmd = build_ffmpeg_command(spec);
    cmd.stdin(Stdio::null());
    let command = command_line(&cmd);
    debug!(command = %command, "running encoder");

    let output = cmd.output().map_err(|source| EncodeError::Launch {
        encoder: spec.encoder.display().to_string(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(EncodeError::Failed {
            exit_code: output.status.code(),
            command,
            stdout,
            stderr,
        });
    }

    let size_bytes = output_size(&spec.output_path)?;

    Ok(EncodeOutput {
        output_path: spec.output_path.clone(),
        size_bytes,
        stdout,
        stderr,
    })
}

/// Run an encode and fold the outcome into a [`JobResult`]
///
/// Never retries; a failed encode is final for the job.
pub fn run_encode(spec: &EncodeSpec) -> JobResult {
    match run_ffmpeg(spec) {
        Ok(output) => JobResult::Success {
            output_path: output.output_path,
            size_bytes: output.size_bytes,
            image_count: spec.image_count,
            duration_estimate: spec.duration_estimate(),
        },
        Err(e) => e.into(),
    }
}

/// Exit code for display; `None` means the process was killed by a signal
pub(crate) fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

fn output_size(path: &Path) -> Result<u64, EncodeError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| EncodeError::Output {
            path: path.to_path_buf(),
            source,
        })
}
