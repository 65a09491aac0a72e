#![cfg(feature = "backend-ffmpeg")]

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg::util::error::{EAGAIN, EWOULDBLOCK};
use ffmpeg_next as ffmpeg;
use tokio::sync::mpsc::Sender;

use crate::config::Configuration;
use crate::core::{
    DecoderProvider, FrameError, FrameResult, FrameStream, VideoFrame, VideoMetadata,
    spawn_stream_from_channel,
};
use subtitle_extract_types::RGB_CHANNELS;

const BACKEND_NAME: &str = "ffmpeg";
const DEFAULT_CHANNEL_CAPACITY: usize = 8;
/// Microseconds, the unit `avformat_seek_file` expects without a stream index.
const AV_TIME_BASE: f64 = 1_000_000.0;

pub struct FfmpegProvider {
    input: PathBuf,
    channel_capacity: usize,
    start_frame: u64,
    frame_limit: Option<u64>,
    metadata: VideoMetadata,
}

impl DecoderProvider for FfmpegProvider {
    fn new(config: &Configuration) -> FrameResult<Self> {
        let path = config
            .input
            .clone()
            .ok_or_else(|| FrameError::configuration("FFmpeg backend requires an input path"))?;
        if !path.exists() {
            return Err(FrameError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input file {} does not exist", path.display()),
            )));
        }
        ffmpeg::init().map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
        let metadata = probe_metadata(&path)?;
        let capacity = config
            .channel_capacity
            .map(|n| n.get())
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        Ok(Self {
            input: path,
            channel_capacity: capacity,
            start_frame: config.start_frame.unwrap_or(0),
            frame_limit: config.frame_limit,
            metadata,
        })
    }

    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn open(self: Box<Self>) -> FrameStream {
        let provider = *self;
        let capacity = provider.channel_capacity;
        spawn_stream_from_channel(capacity, move |tx| {
            if let Err(err) = provider.decode_loop(&tx) {
                let _ = tx.blocking_send(Err(err));
            }
        })
    }
}

fn backend_err(err: impl ToString) -> FrameError {
    FrameError::backend_failure(BACKEND_NAME, err.to_string())
}

fn probe_metadata(path: &Path) -> FrameResult<VideoMetadata> {
    let ictx = ffmpeg::format::input(path).map_err(backend_err)?;
    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| backend_err("no video stream found"))?;
    let fps = stream_fps(&stream);
    let context =
        ffmpeg::codec::context::Context::from_parameters(stream.parameters()).map_err(backend_err)?;
    let decoder = context.decoder().video().map_err(backend_err)?;
    let duration = (ictx.duration() > 0)
        .then(|| Duration::from_secs_f64(ictx.duration() as f64 / AV_TIME_BASE));
    let total_frames = (stream.frames() > 0).then(|| stream.frames() as u64);
    Ok(VideoMetadata {
        duration,
        fps,
        width: Some(decoder.width()),
        height: Some(decoder.height()),
        total_frames,
    })
}

fn stream_fps(stream: &ffmpeg::format::stream::Stream<'_>) -> Option<f64> {
    [stream.avg_frame_rate(), stream.rate()]
        .into_iter()
        .filter(|rate| rate.denominator() != 0)
        .map(f64::from)
        .find(|fps| fps.is_finite() && *fps > 0.0)
}

/// Tracks where the decode cursor is relative to the requested window.
struct WindowCursor {
    start_frame: u64,
    remaining: Option<u64>,
    next_index: u64,
    fps: Option<f64>,
    time_base: f64,
    stream_start: i64,
}

impl WindowCursor {
    fn index_for(&mut self, pts: Option<i64>) -> u64 {
        let index = match (pts, self.fps) {
            (Some(pts), Some(fps)) => {
                let seconds = (pts - self.stream_start) as f64 * self.time_base;
                (seconds * fps).round().max(0.0) as u64
            }
            _ => self.next_index,
        };
        self.next_index = index + 1;
        index
    }

    fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

impl FfmpegProvider {
    fn decode_loop(&self, tx: &Sender<FrameResult<VideoFrame>>) -> FrameResult<()> {
        let mut ictx = ffmpeg::format::input(&self.input).map_err(backend_err)?;
        let (stream_index, time_base, stream_start, fps, mut decoder) = {
            let input_stream = ictx
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| backend_err("no video stream found"))?;
            let context =
                ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
                    .map_err(backend_err)?;
            let decoder = context.decoder().video().map_err(backend_err)?;
            let start = input_stream.start_time();
            (
                input_stream.index(),
                f64::from(input_stream.time_base()),
                // AV_NOPTS_VALUE
                if start == i64::MIN { 0 } else { start },
                stream_fps(&input_stream),
                decoder,
            )
        };

        let mut cursor = WindowCursor {
            start_frame: self.start_frame,
            remaining: self.frame_limit,
            next_index: 0,
            fps,
            time_base,
            stream_start,
        };

        if self.start_frame > 0 {
            let Some(fps) = fps else {
                return Err(backend_err("cannot seek: stream frame rate unknown"));
            };
            let target = (self.start_frame as f64 / fps * AV_TIME_BASE) as i64;
            ictx.seek(target, ..target).map_err(backend_err)?;
            decoder.flush();
            cursor.next_index = self.start_frame;
        }

        let mut scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::FAST_BILINEAR,
        )
        .map_err(backend_err)?;

        let mut decoded = ffmpeg::util::frame::Video::empty();
        let mut converted = ffmpeg::util::frame::Video::empty();

        let mut drain = |decoder: &mut ffmpeg::decoder::Video,
                         cursor: &mut WindowCursor|
         -> FrameResult<bool> {
            loop {
                match decoder.receive_frame(&mut decoded) {
                    Ok(()) => {
                        let index = cursor.index_for(decoded.timestamp().or(decoded.pts()));
                        if index < cursor.start_frame {
                            continue;
                        }
                        scaler.run(&decoded, &mut converted).map_err(backend_err)?;
                        let timestamp = decoded.pts().map(|pts| {
                            let seconds = (pts - stream_start) as f64 * time_base;
                            Duration::from_secs_f64(seconds.max(0.0))
                        });
                        let frame = frame_from_converted(&converted, timestamp)?
                            .with_frame_index(Some(index));
                        if tx.blocking_send(Ok(frame)).is_err() {
                            return Ok(false);
                        }
                        if let Some(remaining) = cursor.remaining.as_mut() {
                            *remaining = remaining.saturating_sub(1);
                        }
                        if cursor.exhausted() {
                            return Ok(false);
                        }
                    }
                    Err(err) => {
                        if is_retryable_error(&err) || matches!(err, ffmpeg::Error::Eof) {
                            return Ok(true);
                        }
                        return Err(backend_err(err));
                    }
                }
            }
        };

        if cursor.exhausted() {
            return Ok(());
        }

        for (stream, packet) in ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            if let Err(err) = decoder.send_packet(&packet) {
                if !is_retryable_error(&err) {
                    return Err(backend_err(err));
                }
            }
            if !drain(&mut decoder, &mut cursor)? {
                return Ok(());
            }
        }

        decoder.send_eof().map_err(backend_err)?;
        drain(&mut decoder, &mut cursor)?;
        Ok(())
    }
}

fn frame_from_converted(
    frame: &ffmpeg::util::frame::Video,
    timestamp: Option<Duration>,
) -> FrameResult<VideoFrame> {
    let plane = frame.data(0);
    let stride = frame.stride(0) as usize;
    let width = frame.width();
    let height = frame.height();
    let row_bytes = width as usize * RGB_CHANNELS;
    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let offset = row * stride;
        buffer.extend_from_slice(&plane[offset..offset + row_bytes]);
    }
    VideoFrame::from_rgb_owned(width, height, row_bytes, timestamp, buffer)
}

fn is_retryable_error(error: &ffmpeg::Error) -> bool {
    matches!(
        error,
        ffmpeg::Error::Other { errno }
            if *errno == EAGAIN || *errno == EWOULDBLOCK
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;

    #[test]
    fn missing_file_returns_error() {
        let config = Configuration {
            backend: Backend::Ffmpeg,
            input: Some(PathBuf::from("/tmp/nonexistent-file.mp4")),
            ..Default::default()
        };
        assert!(matches!(FfmpegProvider::new(&config), Err(FrameError::Io(_))));
    }

    #[test]
    fn missing_input_is_a_configuration_error() {
        let config = Configuration::default();
        assert!(matches!(
            FfmpegProvider::new(&config),
            Err(FrameError::Configuration { .. })
        ));
    }

    #[test]
    fn cursor_derives_indices_from_pts() {
        let mut cursor = WindowCursor {
            start_frame: 0,
            remaining: None,
            next_index: 0,
            fps: Some(25.0),
            time_base: 1.0 / 12_800.0,
            stream_start: 0,
        };
        assert_eq!(cursor.index_for(Some(512)), 1);
        assert_eq!(cursor.index_for(None), 2);
        assert_eq!(cursor.index_for(Some(512 * 10)), 10);
    }
}
