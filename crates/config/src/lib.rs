//! Configuration module for Slideshow Manager
//!
//! Handles loading and saving the persisted JSON configuration (hidden images,
//! output directory, preferred player) and environment variable overrides.

pub mod config;

pub use config::*;
