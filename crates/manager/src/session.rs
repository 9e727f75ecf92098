//! Session module for Slideshow Manager
//!
//! A session is the interactive side of the application: it owns the persisted
//! configuration, the image set, the job supervisor and the discovered players,
//! and it enforces the checks that must pass before a build is submitted.

use crate::curate::{self, AddSummary, CurateError};
use crate::images::{ImageEntry, ImageSet, ImageSetStats, ScanError, SortKey};
use crate::job::{JobReport, JobResult, PipelineConfig};
use crate::output::{default_output_name, list_videos, resolve_output_path};
use crate::player::{PlayerError, PlayerResolver, KNOWN_PLAYERS};
use crate::supervisor::JobSupervisor;
use chrono::Local;
use slideshow_manager_config::{default_output_directory, Config, ConfigError, AUTO_PLAYER};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Fewest visible images a slideshow is built from
pub const MIN_SLIDESHOW_IMAGES: usize = 2;

/// Error type for session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No visible images to create slideshow")]
    NoVisibleImages,

    #[error("Need at least {min} visible images to create a slideshow (found {count})")]
    TooFewImages { count: usize, min: usize },

    #[error("File '{}' already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("Slideshow creation already in progress")]
    AlreadyRunning,

    #[error("No slideshow videos found")]
    NoVideos,

    #[error("Invalid slideshow name '{0}'")]
    InvalidName(String),

    #[error("Unknown player '{0}'")]
    UnknownPlayer(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),

    #[error("Curation error: {0}")]
    Curate(#[from] CurateError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Where a session reads and writes its state
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Directory scanned for images
    pub image_dir: PathBuf,
    /// Persisted configuration file
    pub config_path: PathBuf,
    /// Settings for every build
    pub pipeline: PipelineConfig,
    /// Installed players; probed on `PATH` when not given
    pub players: Option<PlayerResolver>,
}

impl SessionOptions {
    /// Options for a session rooted at `image_dir`, with the configuration and
    /// staging directory inside it
    pub fn new(image_dir: PathBuf) -> Self {
        Self {
            config_path: image_dir.join(slideshow_manager_config::DEFAULT_CONFIG_FILE),
            pipeline: PipelineConfig {
                working_dir: image_dir.clone(),
                ..PipelineConfig::default()
            },
            image_dir,
            players: None,
        }
    }
}

/// An accepted build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTicket {
    pub output_path: PathBuf,
    pub image_count: usize,
}

/// Interactive state of one running application
pub struct Session {
    image_dir: PathBuf,
    config_path: PathBuf,
    /// What is written back to disk
    config: Config,
    /// Output directory in effect, environment overrides included
    output_directory: PathBuf,
    /// Player preference in effect, environment overrides included
    preferred_player: String,
    images: ImageSet,
    search_term: String,
    sort_key: SortKey,
    supervisor: JobSupervisor,
    players: PlayerResolver,
    last_slideshow: Option<PathBuf>,
    config_warning: Option<ConfigError>,
}

impl Session {
    /// Open a session
    ///
    /// An unreadable or corrupted configuration does not fail the open: the
    /// defaults are used and the problem is kept for [`Session::take_config_warning`].
    ///
    /// # Returns
    /// The session and the receiver on which finished builds are delivered
    pub fn open(options: SessionOptions) -> (Self, mpsc::UnboundedReceiver<JobReport>) {
        let (config, config_warning) = Config::load_or_recover(&options.config_path);
        if let Some(e) = &config_warning {
            warn!(path = %options.config_path.display(), error = %e, "using default configuration");
        }

        let mut effective = config.clone();
        effective.apply_env_overrides();

        let players = options.players.unwrap_or_else(PlayerResolver::discover);
        let (supervisor, reports) = JobSupervisor::with_channel(options.pipeline);

        let session = Self {
            image_dir: options.image_dir,
            config_path: options.config_path,
            images: ImageSet::new(config.hidden.clone()),
            output_directory: effective.output_directory,
            preferred_player: effective.preferred_player,
            config,
            search_term: String::new(),
            sort_key: SortKey::default(),
            supervisor,
            players,
            last_slideshow: None,
            config_warning,
        };
        (session, reports)
    }

    /// Problem found while loading the configuration, if any
    pub fn take_config_warning(&mut self) -> Option<ConfigError> {
        self.config_warning.take()
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn images(&self) -> &ImageSet {
        &self.images
    }

    pub fn visible_entries(&self) -> Vec<ImageEntry> {
        self.images.visible_entries()
    }

    pub fn stats(&self) -> ImageSetStats {
        self.images.stats()
    }

    pub fn supervisor(&self) -> &JobSupervisor {
        &self.supervisor
    }

    pub fn players(&self) -> &PlayerResolver {
        &self.players
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn preferred_player(&self) -> &str {
        &self.preferred_player
    }

    pub fn last_slideshow(&self) -> Option<&Path> {
        self.last_slideshow.as_deref()
    }

    pub fn set_search(&mut self, term: &str) {
        self.search_term = term.to_string();
    }

    pub fn set_sort(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    /// Rescan the image directory with the current search and sort
    ///
    /// On failure the image list is empty until the next successful reload.
    pub fn reload(&mut self) -> Result<(), ScanError> {
        let result = self
            .images
            .reload(&self.image_dir, &self.search_term, self.sort_key);
        match &result {
            Ok(()) => info!(count = self.images.entries().len(), "loaded images"),
            Err(e) => warn!(dir = %self.image_dir.display(), error = %e, "failed to load images"),
        }
        result
    }

    /// Key under which `path` is stored in the hidden set
    ///
    /// Matches the scanner's canonical form even after the file is deleted, as
    /// long as its directory still resolves.
    pub fn hidden_key(&self, path: &Path) -> String {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.image_dir.join(path)
        };
        let canonical = absolute.canonicalize().ok().or_else(|| {
            let parent = absolute.parent()?.canonicalize().ok()?;
            Some(parent.join(absolute.file_name()?))
        });
        canonical
            .unwrap_or(absolute)
            .to_string_lossy()
            .into_owned()
    }

    /// Flip whether `path` is hidden and save the configuration
    ///
    /// # Returns
    /// True if the path is hidden afterwards
    pub fn toggle_hidden(&mut self, path: &Path) -> Result<bool, SessionError> {
        let key = self.hidden_key(path);
        let hidden = self.images.toggle_hidden(&key);
        self.config.hidden = self.images.hidden().clone();
        self.config.save(&self.config_path)?;
        info!(path = %key, hidden, "toggled image visibility");
        Ok(hidden)
    }

    pub fn set_output_directory(&mut self, dir: PathBuf) {
        self.config.output_directory = dir.clone();
        self.output_directory = dir;
    }

    pub fn reset_output_directory(&mut self) {
        self.set_output_directory(default_output_directory());
    }

    /// Set the player preference to `"auto"` or a known player id
    pub fn set_preferred_player(&mut self, player: &str) -> Result<(), SessionError> {
        if player != AUTO_PLAYER && !KNOWN_PLAYERS.contains(&player) {
            return Err(SessionError::UnknownPlayer(player.to_string()));
        }
        self.config.preferred_player = player.to_string();
        self.preferred_player = player.to_string();
        Ok(())
    }

    pub fn save_settings(&self) -> Result<(), SessionError> {
        self.config.save(&self.config_path)?;
        info!(
            output_directory = %self.config.output_directory.display(),
            preferred_player = %self.config.preferred_player,
            "saved settings"
        );
        Ok(())
    }

    /// Submit a build of the visible images
    ///
    /// # Arguments
    /// * `name` - Output file name; `.mp4` is appended if missing, and a
    ///   timestamped name is used when `None`
    /// * `overwrite` - Replace an existing file of the same name
    ///
    /// # Errors
    /// Fails without starting anything if a build is running, fewer than
    /// [`MIN_SLIDESHOW_IMAGES`] images are visible, the name would leave the
    /// output directory, or the output exists and `overwrite` is false.
    pub fn create_slideshow(
        &mut self,
        name: Option<&str>,
        overwrite: bool,
    ) -> Result<BuildTicket, SessionError> {
        if self.supervisor.is_running() {
            return Err(SessionError::AlreadyRunning);
        }

        let visible = self.images.visible_entries();
        if visible.is_empty() {
            return Err(SessionError::NoVisibleImages);
        }
        if visible.len() < MIN_SLIDESHOW_IMAGES {
            return Err(SessionError::TooFewImages {
                count: visible.len(),
                min: MIN_SLIDESHOW_IMAGES,
            });
        }

        let name = match name {
            Some(name) if !name.trim().is_empty() => valid_output_name(name)?,
            _ => default_output_name(Local::now()),
        };
        let output_path = resolve_output_path(&self.output_directory, &name);
        if output_path.exists() && !overwrite {
            return Err(SessionError::OutputExists(output_path));
        }

        fs::create_dir_all(&self.output_directory)?;

        let image_count = visible.len();
        if !self.supervisor.submit(visible, output_path.clone()) {
            return Err(SessionError::AlreadyRunning);
        }

        Ok(BuildTicket {
            output_path,
            image_count,
        })
    }

    /// Record a finished build
    pub fn handle_report(&mut self, report: &JobReport) {
        if let JobResult::Success { output_path, .. } = &report.result {
            self.last_slideshow = Some(output_path.clone());
        }
    }

    /// Play `path` with the preferred player, falling back to the others
    ///
    /// # Returns
    /// The id of the player that was launched
    pub fn play(&self, path: &Path) -> Result<String, SessionError> {
        Ok(self.players.play(&self.preferred_player, path)?)
    }

    /// Play the slideshow built in this session, or else the newest one in the
    /// output directory
    pub fn play_last(&self) -> Result<String, SessionError> {
        let target = match self.last_slideshow.as_ref().filter(|p| p.exists()) {
            Some(path) => path.clone(),
            None => list_videos(&self.output_directory)?
                .into_iter()
                .next()
                .map(|video| video.path)
                .ok_or(SessionError::NoVideos)?,
        };
        self.play(&target)
    }

    pub fn add_images(&mut self, sources: &[PathBuf]) -> AddSummary {
        curate::add_images(&self.image_dir, sources)
    }

    pub fn rename_image(&mut self, path: &Path, new_name: &str) -> Result<PathBuf, SessionError> {
        Ok(curate::rename_image(&self.image_dir.join(path), new_name)?)
    }

    pub fn remove_image(&mut self, path: &Path) -> Result<(), SessionError> {
        Ok(curate::remove_image(&self.image_dir.join(path))?)
    }
}

/// A user-given output name, kept inside the output directory
fn valid_output_name(name: &str) -> Result<String, SessionError> {
    let trimmed = name.trim();
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed == "." || trimmed == ".." {
        return Err(SessionError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}
