//! Player module for Slideshow Manager
//!
//! Finds which external video players are installed and launches one of them on
//! a finished slideshow, falling back through the installed players in order.

use slideshow_manager_config::AUTO_PLAYER;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Candidate players, most preferred first
pub const KNOWN_PLAYERS: &[&str] = &[
    "vlc",
    "mpv",
    "celluloid",
    "shotcut",
    "ffplay",
    "totem",
    "smplayer",
    "mplayer",
    "xine",
    "gxine",
];

/// One player that could not be started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchFailure {
    pub player: String,
    pub reason: String,
}

impl fmt::Display for LaunchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.player, self.reason)
    }
}

/// Errors raised when playing a file
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Video file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("No video players found. Please install VLC, MPV, or another video player.")]
    Unavailable,

    #[error("Could not launch any video player ({})", format_attempts(.attempts))]
    Exhausted { attempts: Vec<LaunchFailure> },
}

fn format_attempts(attempts: &[LaunchFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Look up `name` on `PATH`
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let search_path = std::env::var_os("PATH")?;
    find_executable_in(name, &search_path)
}

/// Look up `name` in a `PATH`-style list of directories
pub fn find_executable_in(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .flat_map(|dir| candidate_files(&dir, name))
        .find(|path| is_executable(path))
}

#[cfg(not(windows))]
fn candidate_files(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(windows)]
fn candidate_files(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(format!("{}.exe", name)), dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Probe `candidates` in order, keeping those found in `search_path`
pub fn discover_in(candidates: &[&str], search_path: &OsStr) -> Vec<String> {
    candidates
        .iter()
        .filter(|name| find_executable_in(name, search_path).is_some())
        .map(|name| name.to_string())
        .collect()
}

/// Order in which players are tried for a given preference
///
/// `"auto"` tries the discovered players as they are. Any other preference is
/// tried first, followed by the rest of `discovered` without repeats.
pub fn resolve(preference: &str, discovered: &[String]) -> Vec<String> {
    if preference == AUTO_PLAYER {
        return discovered.to_vec();
    }

    let mut order = Vec::with_capacity(discovered.len() + 1);
    order.push(preference.to_string());
    order.extend(
        discovered
            .iter()
            .filter(|player| player.as_str() != preference)
            .cloned(),
    );
    order
}

/// Installed players and the search path they were found in
#[derive(Debug, Clone, Default)]
pub struct PlayerResolver {
    discovered: Vec<String>,
    search_path: OsString,
}

impl PlayerResolver {
    /// Probe [`KNOWN_PLAYERS`] on the current `PATH`
    pub fn discover() -> Self {
        Self::discover_with(KNOWN_PLAYERS, std::env::var_os("PATH").unwrap_or_default())
    }

    /// Probe `candidates` on an explicit search path
    pub fn discover_with(candidates: &[&str], search_path: OsString) -> Self {
        let discovered = discover_in(candidates, &search_path);
        info!(players = ?discovered, "discovered video players");
        Self {
            discovered,
            search_path,
        }
    }

    pub fn discovered(&self) -> &[String] {
        &self.discovered
    }

    pub fn attempt_order(&self, preference: &str) -> Vec<String> {
        resolve(preference, &self.discovered)
    }

    /// Start `player` on `file` without waiting for it
    ///
    /// Success means the process started, not that playback worked.
    pub fn launch(&self, player: &str, file: &Path) -> Result<(), LaunchFailure> {
        let program = find_executable_in(player, &self.search_path).ok_or_else(|| LaunchFailure {
            player: player.to_string(),
            reason: "not found on PATH".to_string(),
        })?;

        Command::new(&program)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_child| ())
            .map_err(|e| LaunchFailure {
                player: player.to_string(),
                reason: e.to_string(),
            })
    }

    /// Play `file` with the first player in the attempt order that starts
    ///
    /// # Returns
    /// The id of the player that was launched
    ///
    /// # Errors
    /// - [`PlayerError::NotFound`] if `file` does not exist; nothing is attempted
    /// - [`PlayerError::Unavailable`] if no player was discovered; nothing is attempted
    /// - [`PlayerError::Exhausted`] if every attempt failed to launch
    pub fn play(&self, preference: &str, file: &Path) -> Result<String, PlayerError> {
        if !file.is_file() {
            return Err(PlayerError::NotFound(file.to_path_buf()));
        }
        if self.discovered.is_empty() {
            return Err(PlayerError::Unavailable);
        }

        let mut attempts = Vec::new();
        for player in self.attempt_order(preference) {
            match self.launch(&player, file) {
                Ok(()) => {
                    info!(player = %player, file = %file.display(), "launched video player");
                    return Ok(player);
                }
                Err(failure) => {
                    debug!(player = %failure.player, reason = %failure.reason, "player failed to launch");
                    attempts.push(failure);
                }
            }
        }

        warn!(attempts = attempts.len(), "no video player could be launched");
        Err(PlayerError::Exhausted { attempts })
    }
}
