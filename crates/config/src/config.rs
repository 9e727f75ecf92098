//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default file name of the persisted configuration, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".slideshow_config.json";

/// Player setting meaning "use the first discovered player"
pub const AUTO_PLAYER: &str = "auto";

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading or writing the config file
    Io(std::io::Error),
    /// JSON parsing error
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to access config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Configuration file is corrupted: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Remove a corrupted config file; one that is already gone is not an error
fn discard_corrupt_file(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Output directory used when none is configured: the current directory
pub fn default_output_directory() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_preferred_player() -> String {
    AUTO_PLAYER.to_string()
}

/// Persisted configuration
///
/// `hidden` may reference files that no longer exist; entries are never
/// pruned automatically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Absolute paths of images excluded from slideshows
    #[serde(default)]
    pub hidden: BTreeSet<String>,
    /// Directory where slideshow videos are written
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    /// `"auto"` or a known player id
    #[serde(default = "default_preferred_player")]
    pub preferred_player: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hidden: BTreeSet::new(),
            output_directory: default_output_directory(),
            preferred_player: default_preferred_player(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse_json(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Parse configuration from a JSON string
    pub fn parse_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults on any failure
    ///
    /// A corrupted file is deleted so the next save starts clean. Other read
    /// errors leave the file alone. In both cases the error is returned next
    /// to the defaults so the caller can report it.
    pub fn load_or_recover<P: AsRef<Path>>(path: P) -> (Self, Option<ConfigError>) {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(ConfigError::Parse(e)) => {
                // A file that cannot be deleted is overwritten on the next save
                if let Err(delete_err) = discard_corrupt_file(path) {
                    warn!(
                        path = %path.display(),
                        error = %delete_err,
                        "failed to delete corrupted config"
                    );
                }
                (Self::default(), Some(ConfigError::Parse(e)))
            }
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - SLIDESHOW_OUTPUT_DIR -> output_directory
    /// - SLIDESHOW_PLAYER -> preferred_player
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("SLIDESHOW_OUTPUT_DIR") {
            if !val.trim().is_empty() {
                self.output_directory = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("SLIDESHOW_PLAYER") {
            let val = val.trim();
            if !val.is_empty() {
                self.preferred_player = val.to_string();
            }
        }
    }

    /// Returns true if the player preference is "auto"
    pub fn wants_auto_player(&self) -> bool {
        self.preferred_player == AUTO_PLAYER
    }
}
