pub mod backends;
pub mod config;
pub mod core;

pub use config::{Backend, Configuration};
pub use crate::core::{
    DecoderProvider, DynDecoderProvider, FrameStream, VideoMetadata, spawn_stream_from_channel,
};
pub use subtitle_extract_types::{FrameError, FrameResult, Rectangle, VideoFrame};
