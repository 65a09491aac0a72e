use std::pin::Pin;
use std::time::Duration;

use futures_core::Stream;
use futures_util::stream::unfold;
use tokio::sync::mpsc::{self, Sender};

use crate::config::Configuration;
pub use subtitle_extract_types::{FrameError, FrameResult, VideoFrame};

pub type FrameStream = Pin<Box<dyn Stream<Item = FrameResult<VideoFrame>> + Send>>;

pub type DynDecoderProvider = Box<dyn DecoderProvider>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoMetadata {
    pub duration: Option<Duration>,
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub total_frames: Option<u64>,
}

impl VideoMetadata {
    pub fn calculate_total_frames(&self) -> Option<u64> {
        if let Some(total) = self.total_frames {
            return Some(total);
        }

        if let (Some(duration), Some(fps)) = (self.duration, self.fps) {
            let total = (duration.as_secs_f64() * fps).round();
            if total.is_finite() && total >= 0.0 {
                return Some(total as u64);
            }
        }

        None
    }
}

/// A decoder bound to one input. `open` consumes it, so every stream gets its
/// own decode cursor.
pub trait DecoderProvider: Send + 'static {
    fn new(config: &Configuration) -> FrameResult<Self>
    where
        Self: Sized;

    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::default()
    }

    fn open(self: Box<Self>) -> FrameStream;
}

pub fn spawn_stream_from_channel(
    capacity: usize,
    task: impl FnOnce(Sender<FrameResult<VideoFrame>>) + Send + 'static,
) -> FrameStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::task::spawn_blocking(move || task(tx));
    let stream = unfold(rx, |mut receiver| async {
        receiver.recv().await.map(|item| (item, receiver))
    });
    Box::pin(stream)
}
