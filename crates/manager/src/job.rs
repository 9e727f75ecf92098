//! Job module for Slideshow Manager
//!
//! One job is a complete stage → encode → cleanup cycle that yields exactly one
//! [`JobResult`]. This module holds the result types and the synchronous job
//! body; threading and the one-at-a-time rule live in the supervisor.

use crate::encode::ffmpeg::exit_label;
use crate::encode::{run_encode, Canvas, EncodeSpec, DEFAULT_CANVAS, DEFAULT_ENCODER};
use crate::encode::{DEFAULT_FRAME_HOLD_SECONDS, DEFAULT_FRAME_RATE};
use crate::images::ImageEntry;
use crate::staging::{stage, StagedSequence};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome of one build, delivered to the caller as data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobResult {
    /// The video was written
    Success {
        output_path: PathBuf,
        size_bytes: u64,
        image_count: usize,
        /// Seconds, estimated from the image count
        duration_estimate: f64,
    },
    /// The encoder ran and exited unsuccessfully; streams are kept verbatim
    EncoderFailure {
        exit_code: Option<i32>,
        command: String,
        stdout: String,
        stderr: String,
    },
    /// The numbered input sequence could not be built; the encoder never ran
    StagingFailure { description: String },
    /// The encoder could not be launched, or the job failed outside the encoder
    SystemFailure { description: String },
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }

    /// Short human-readable outcome
    pub fn summary(&self) -> String {
        match self {
            JobResult::Success {
                output_path,
                size_bytes,
                image_count,
                duration_estimate,
            } => format!(
                "Slideshow created successfully!\n\n\
                 File: {}\n\
                 Size: {:.1} MB\n\
                 Images: {}\n\
                 Duration: ~{} seconds",
                output_path.display(),
                *size_bytes as f64 / (1024.0 * 1024.0),
                image_count,
                duration_estimate
            ),
            JobResult::EncoderFailure { exit_code, .. } => {
                format!("Encoder failed (return code {})", exit_label(exit_code))
            }
            JobResult::StagingFailure { description } => {
                format!("Failed to prepare images: {}", description)
            }
            JobResult::SystemFailure { description } => {
                format!("Failed to create slideshow: {}", description)
            }
        }
    }

    /// Full failure detail for post-mortem diagnosis
    ///
    /// Encoder output is reproduced without truncation.
    pub fn diagnostic(&self) -> String {
        match self {
            JobResult::EncoderFailure {
                exit_code,
                command,
                stdout,
                stderr,
            } => format!(
                "Encoder Error\n\n\
                 Return Code: {}\n\
                 Command: {}\n\n\
                 STDOUT:\n{}\n\n\
                 STDERR:\n{}",
                exit_label(exit_code),
                command,
                stdout,
                stderr
            ),
            other => other.summary(),
        }
    }

    /// Write the outcome to the log, failures with every detail
    pub fn log(&self, job_id: Uuid) {
        match self {
            JobResult::Success {
                output_path,
                size_bytes,
                image_count,
                ..
            } => info!(
                %job_id,
                output = %output_path.display(),
                size_bytes,
                image_count,
                "slideshow created"
            ),
            JobResult::EncoderFailure {
                exit_code,
                command,
                stdout,
                stderr,
            } => error!(
                %job_id,
                exit_code = %exit_label(exit_code),
                command = %command,
                stdout = %stdout,
                stderr = %stderr,
                "encoder failed"
            ),
            JobResult::StagingFailure { description } => {
                error!(%job_id, error = %description, "staging failed")
            }
            JobResult::SystemFailure { description } => {
                error!(%job_id, error = %description, "slideshow build failed")
            }
        }
    }
}

/// A finished job as delivered to the owning context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub output_path: PathBuf,
    pub result: JobResult,
}

/// Runtime settings shared by every job; not persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Directory that receives the staging directory
    pub working_dir: PathBuf,
    /// Encoder binary
    pub encoder: PathBuf,
    pub frame_hold_seconds: f64,
    pub frame_rate: u32,
    pub canvas: Canvas,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            encoder: PathBuf::from(DEFAULT_ENCODER),
            frame_hold_seconds: DEFAULT_FRAME_HOLD_SECONDS,
            frame_rate: DEFAULT_FRAME_RATE,
            canvas: DEFAULT_CANVAS,
        }
    }
}

impl PipelineConfig {
    pub fn new(working_dir: PathBuf, encoder: PathBuf) -> Self {
        Self {
            working_dir,
            encoder,
            ..Self::default()
        }
    }

    /// Encoding parameters for a staged sequence
    pub fn encode_spec(&self, staged: &StagedSequence, output_path: &Path) -> EncodeSpec {
        EncodeSpec {
            encoder: self.encoder.clone(),
            staged_root: staged.root().to_path_buf(),
            image_count: staged.len(),
            output_path: output_path.to_path_buf(),
            frame_hold_seconds: self.frame_hold_seconds,
            frame_rate: self.frame_rate,
            canvas: self.canvas,
        }
    }
}

/// Run one job to completion on the calling thread
///
/// Blocks on the encoder, so callers on an interactive thread must move this
/// elsewhere. The staged sequence is removed on every path out, including a
/// panic during the encode step.
pub fn run_job(config: &PipelineConfig, images: &[ImageEntry], output_path: &Path) -> JobResult {
    let staged = match stage(&config.working_dir, images) {
        Ok(staged) => staged,
        Err(e) => {
            return JobResult::StagingFailure {
                description: e.to_string(),
            }
        }
    };

    let spec = config.encode_spec(&staged, output_path);
    let result = run_encode(&spec);

    let root = staged.root().to_path_buf();
    if let Err(e) = staged.dispose() {
        // The encode outcome stands; a leftover directory is cleared by the next stage
        warn!(root = %root.display(), error = %e, "failed to remove staging directory");
    }

    result
}
