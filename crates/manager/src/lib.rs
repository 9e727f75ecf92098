//! Slideshow Manager
//!
//! Turns a directory of still images into an MP4 slideshow: scan and curate the
//! images, stage the visible ones as a numbered sequence, encode it with ffmpeg
//! on a background worker, and hand the finished video to an installed player.

pub mod curate;
pub mod encode;
pub mod images;
pub mod job;
pub mod logging;
pub mod output;
pub mod player;
pub mod session;
pub mod staging;
pub mod startup;
pub mod supervisor;

#[cfg(all(test, unix))]
mod test_support;

pub use slideshow_manager_config as config;
pub use slideshow_manager_config::Config;
pub use curate::{add_images, remove_image, rename_image, AddSummary, CurateError};
pub use encode::{build_ffmpeg_command, run_encode, EncodeError, EncodeSpec};
pub use images::{ImageEntry, ImageSet, ImageSetStats, ScanError, SortKey};
pub use job::{run_job, JobReport, JobResult, PipelineConfig};
pub use logging::{init_logging, LoggingError, DEFAULT_LOG_FILE};
pub use output::{default_output_name, list_videos, resolve_output_path, VideoEntry};
pub use player::{PlayerError, PlayerResolver, KNOWN_PLAYERS};
pub use session::{BuildTicket, Session, SessionError, SessionOptions, MIN_SLIDESHOW_IMAGES};
pub use staging::{stage, StagedSequence, StagingError};
pub use startup::{check_encoder_available, parse_ffmpeg_version, StartupError};
pub use supervisor::{JobSupervisor, SupervisorState};
