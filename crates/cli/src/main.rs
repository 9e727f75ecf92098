//! CLI entry point for Slideshow Manager
//!
//! Parses command line arguments, opens a session on the image directory and
//! runs one command against it.

use chrono::{DateTime, Local};
use clap::{ArgAction, Parser, Subcommand};
use slideshow_manager::{
    check_encoder_available, init_logging, list_videos, JobResult, PipelineConfig, Session,
    SessionError, SessionOptions, SortKey, DEFAULT_LOG_FILE,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::SystemTime;
use tracing::{info, warn};

/// Slideshow Manager - Build MP4 slideshows from a folder of images
#[derive(Parser, Debug)]
#[command(name = "slideshow-manager")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the images
    #[arg(short, long, env = "SLIDESHOW_DIR", default_value = ".")]
    dir: PathBuf,

    /// Path to the settings file (defaults to .slideshow_config.json in --dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file (defaults to slideshow_manager.log in --dir)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// FFmpeg binary used for encoding
    #[arg(long, env = "SLIDESHOW_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List images with their visibility
    List {
        /// Only show images whose name contains this text
        #[arg(short, long, default_value = "")]
        search: String,
        /// Sort order: name, modified or size
        #[arg(long, default_value = "name")]
        sort: SortKey,
    },
    /// Hide a visible image or show a hidden one
    Toggle { path: PathBuf },
    /// Build a slideshow from the visible images
    Build {
        /// Output file name (.mp4 is added if missing)
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long, default_value = "name")]
        sort: SortKey,
        /// Replace an existing file of the same name
        #[arg(long)]
        overwrite: bool,
        /// Play the slideshow once it is built
        #[arg(long)]
        play: bool,
        /// Print the job report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show installed video players
    Players,
    /// Play a video, or the most recent slideshow
    Play { path: Option<PathBuf> },
    /// List slideshows in the output directory
    Videos,
    /// Show or change settings
    Settings {
        #[arg(long, conflicts_with = "reset_output_dir")]
        output_dir: Option<PathBuf>,
        /// Reset the output directory to the current directory
        #[arg(long)]
        reset_output_dir: bool,
        /// "auto" or a player id
        #[arg(long)]
        player: Option<String>,
    },
    /// Copy images into the image directory
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Rename an image
    Rename { path: PathBuf, new_name: String },
    /// Delete an image
    Remove { path: PathBuf },
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M").to_string()
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| args.dir.join(DEFAULT_LOG_FILE));
    if let Err(e) = init_logging(Some(&log_file), args.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, SessionError> {
    let mut options = SessionOptions::new(args.dir.clone());
    if let Some(config) = args.config {
        options.config_path = config;
    }
    options.pipeline = PipelineConfig::new(args.dir.clone(), args.ffmpeg.clone());

    let (mut session, mut reports) = Session::open(options);
    if let Some(e) = session.take_config_warning() {
        eprintln!("Warning: {}; using default settings", e);
    }

    match args.command {
        Commands::List { search, sort } => {
            session.set_search(&search);
            session.set_sort(sort);
            session.reload()?;

            for entry in session.images().entries() {
                let marker = if session.images().is_hidden(&entry.key()) {
                    "hidden "
                } else {
                    "       "
                };
                println!(
                    "{} {:<40} {:>8.1} KB  {}",
                    marker,
                    entry.file_name(),
                    entry.size_bytes as f64 / 1024.0,
                    format_time(entry.modified_time)
                );
            }

            let stats = session.stats();
            println!(
                "Total: {} | Visible: {} | Hidden: {} | Size: {:.1} MB",
                stats.total,
                stats.visible,
                stats.hidden,
                megabytes(stats.total_bytes)
            );
        }

        Commands::Toggle { path } => {
            let hidden = session.toggle_hidden(&path)?;
            println!(
                "{} is now {}",
                path.display(),
                if hidden { "hidden" } else { "visible" }
            );
        }

        Commands::Build {
            name,
            search,
            sort,
            overwrite,
            play,
            json,
        } => {
            match check_encoder_available(&args.ffmpeg) {
                Ok(version) => info!(encoder = %args.ffmpeg.display(), ?version, "encoder available"),
                Err(e) => warn!(error = %e, "encoder probe failed; the build will likely fail"),
            }

            session.set_search(&search);
            session.set_sort(sort);
            session.reload()?;

            let ticket = session.create_slideshow(name.as_deref(), overwrite)?;
            println!(
                "Creating slideshow from {} images: {}",
                ticket.image_count,
                ticket.output_path.display()
            );

            let Some(report) = reports.recv().await else {
                eprintln!("Slideshow worker stopped without a result");
                return Ok(ExitCode::FAILURE);
            };
            session.handle_report(&report);

            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{}", text),
                    Err(e) => eprintln!("Failed to serialize report: {}", e),
                }
            }

            match &report.result {
                JobResult::Success { .. } => {
                    if !json {
                        println!("{}", report.result.summary());
                    }
                    if play {
                        let player = session.play_last()?;
                        println!("Playing with {}", player);
                    }
                }
                failure => {
                    if !json {
                        eprintln!("{}", failure.diagnostic());
                    }
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        Commands::Players => {
            let discovered = session.players().discovered();
            if discovered.is_empty() {
                println!("No video players found");
            }
            for player in discovered {
                println!("{}", player);
            }
            println!("Preferred: {}", session.preferred_player());
        }

        Commands::Play { path } => {
            let player = match path {
                Some(path) => session.play(&path)?,
                None => session.play_last()?,
            };
            println!("Playing with {}", player);
        }

        Commands::Videos => {
            let videos = list_videos(session.output_directory())?;
            if videos.is_empty() {
                println!("No slideshow videos in {}", session.output_directory().display());
            }
            for video in videos {
                println!(
                    "{:<40} {:>8.1} MB  {}",
                    file_label(&video.path),
                    megabytes(video.size_bytes),
                    format_time(video.modified_time)
                );
            }
        }

        Commands::Settings {
            output_dir,
            reset_output_dir,
            player,
        } => {
            let mut changed = false;
            if let Some(dir) = output_dir {
                session.set_output_directory(dir);
                changed = true;
            }
            if reset_output_dir {
                session.reset_output_directory();
                changed = true;
            }
            if let Some(player) = player {
                session.set_preferred_player(&player)?;
                changed = true;
            }
            if changed {
                session.save_settings()?;
                println!("Settings saved");
            }
            println!("Output directory: {}", session.output_directory().display());
            println!("Preferred player: {}", session.preferred_player());
        }

        Commands::Add { files } => {
            let summary = session.add_images(&files);
            println!(
                "Added {} image(s), skipped {}",
                summary.copied.len(),
                summary.skipped.len()
            );
            for skipped in &summary.skipped {
                println!("  skipped {}", skipped.display());
            }
        }

        Commands::Rename { path, new_name } => {
            let renamed = session.rename_image(&path, &new_name)?;
            println!("Renamed to {}", file_label(&renamed));
        }

        Commands::Remove { path } => {
            session.remove_image(&path)?;
            println!("Removed {}", path.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}
