//! Encoding modules for Slideshow Manager

pub mod ffmpeg;

pub use ffmpeg::{
    build_ffmpeg_command, build_filter_graph, command_line, run_encode, run_ffmpeg, Canvas,
    EncodeError, EncodeOutput, EncodeSpec, DEFAULT_CANVAS, DEFAULT_ENCODER,
    DEFAULT_FRAME_HOLD_SECONDS, DEFAULT_FRAME_RATE,
};
