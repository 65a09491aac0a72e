use std::time::Duration;

use tokio::sync::mpsc::Sender;

use crate::config::Configuration;
use crate::core::{
    DecoderProvider, FrameResult, FrameStream, VideoFrame, VideoMetadata,
    spawn_stream_from_channel,
};
use subtitle_extract_types::RGB_CHANNELS;

/// Synthetic clip: a static gradient background that switches palette at
/// [`MockProvider::SCENE_CUT`], with a caption band that flickers during the
/// first twenty frames of every forty-frame block.
pub struct MockProvider {
    width: u32,
    height: u32,
    frame_count: u64,
    fps: f64,
    channel_capacity: usize,
    start_frame: u64,
    frame_limit: Option<u64>,
}

impl MockProvider {
    const DEFAULT_CHANNEL_CAPACITY: usize = 8;
    pub const SCENE_CUT: u64 = 60;
    pub const BAND_TOP: u32 = 300;
    pub const BAND_BOTTOM: u32 = 340;

    fn band_active(index: u64) -> bool {
        index % 40 < 20
    }

    fn render(&self, index: u64) -> FrameResult<VideoFrame> {
        let stride = self.width as usize * RGB_CHANNELS;
        let mut buffer = vec![0u8; stride * self.height as usize];
        let palette: [u8; 3] = if index < Self::SCENE_CUT {
            [40, 90, 160]
        } else {
            [200, 120, 30]
        };
        for (row, chunk) in buffer.chunks_mut(stride).enumerate() {
            let in_band = (Self::BAND_TOP as usize..Self::BAND_BOTTOM as usize).contains(&row);
            for (col, pixel) in chunk.chunks_mut(RGB_CHANNELS).enumerate() {
                if in_band {
                    let value = if Self::band_active(index) {
                        ((index * 53 + col as u64) % 256) as u8
                    } else {
                        235
                    };
                    pixel.fill(value);
                } else {
                    let shade = ((row + col) % 64) as u8;
                    pixel[0] = palette[0].saturating_add(shade);
                    pixel[1] = palette[1].saturating_add(shade);
                    pixel[2] = palette[2].saturating_add(shade);
                }
            }
        }
        let timestamp = Some(Duration::from_secs_f64(index as f64 / self.fps));
        VideoFrame::from_rgb_owned(self.width, self.height, stride, timestamp, buffer)
            .map(|frame| frame.with_frame_index(Some(index)))
    }

    fn emit_frames(&self, tx: Sender<FrameResult<VideoFrame>>) {
        let end = match self.frame_limit {
            Some(limit) => self.start_frame.saturating_add(limit).min(self.frame_count),
            None => self.frame_count,
        };
        for index in self.start_frame..end {
            if tx.is_closed() {
                break;
            }
            if tx.blocking_send(self.render(index)).is_err() {
                break;
            }
        }
    }
}

impl DecoderProvider for MockProvider {
    fn new(config: &Configuration) -> FrameResult<Self> {
        let capacity = config
            .channel_capacity
            .map(|n| n.get())
            .unwrap_or(Self::DEFAULT_CHANNEL_CAPACITY);
        Ok(Self {
            width: 640,
            height: 360,
            frame_count: 120,
            fps: 25.0,
            channel_capacity: capacity,
            start_frame: config.start_frame.unwrap_or(0),
            frame_limit: config.frame_limit,
        })
    }

    fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            duration: Some(Duration::from_secs_f64(self.frame_count as f64 / self.fps)),
            fps: Some(self.fps),
            width: Some(self.width),
            height: Some(self.height),
            total_frames: Some(self.frame_count),
        }
    }

    fn open(self: Box<Self>) -> FrameStream {
        let provider = *self;
        let capacity = provider.channel_capacity;
        spawn_stream_from_channel(capacity, move |tx| provider.emit_frames(tx))
    }
}
