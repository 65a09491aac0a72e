//! Shared domain values for the subtitle-extract workspace.
//!
//! Decoder backends produce [`VideoFrame`]s, the extraction driver crops them
//! with a [`Rectangle`]. Keep this crate free of codec and platform
//! dependencies so every other crate can depend on it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub type FrameResult<T> = Result<T, FrameError>;

/// Bytes per pixel of the packed RGB24 layout every backend converts to.
pub const RGB_CHANNELS: usize = 3;

#[derive(Clone)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    stride: usize,
    frame_index: Option<u64>,
    timestamp: Option<Duration>,
    data: Arc<[u8]>,
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("timestamp", &self.timestamp)
            .field("bytes", &self.data.len())
            .field("frame_index", &self.frame_index)
            .finish()
    }
}

impl VideoFrame {
    pub fn from_rgb_owned(
        width: u32,
        height: u32,
        stride: usize,
        timestamp: Option<Duration>,
        data: Vec<u8>,
    ) -> FrameResult<Self> {
        let row_bytes = (width as usize)
            .checked_mul(RGB_CHANNELS)
            .ok_or_else(|| FrameError::InvalidFrame {
                reason: "calculated row length overflowed".into(),
            })?;
        if stride < row_bytes {
            return Err(FrameError::InvalidFrame {
                reason: format!("stride {stride} shorter than row length {row_bytes}"),
            });
        }
        let required = stride
            .checked_mul(height as usize)
            .ok_or_else(|| FrameError::InvalidFrame {
                reason: "calculated plane length overflowed".into(),
            })?;
        if data.len() < required {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "insufficient RGB bytes: got {} expected at least {}",
                    data.len(),
                    required
                ),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            timestamp,
            data: Arc::from(data.into_boxed_slice()),
            frame_index: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn frame_index(&self) -> Option<u64> {
        self.frame_index
    }

    pub fn with_frame_index(mut self, index: Option<u64>) -> Self {
        self.frame_index = index;
        self
    }

    /// Row `y` without stride padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * RGB_CHANNELS]
    }
}

/// Subtitle area in original-video pixel coordinates; `bottom` and `right`
/// are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "RawRectangle")]
pub struct Rectangle {
    top: u32,
    bottom: u32,
    left: u32,
    right: u32,
}

#[derive(Deserialize)]
struct RawRectangle {
    top: u32,
    bottom: u32,
    left: u32,
    right: u32,
}

impl TryFrom<RawRectangle> for Rectangle {
    type Error = FrameError;

    fn try_from(raw: RawRectangle) -> Result<Self, Self::Error> {
        Rectangle::new(raw.top, raw.bottom, raw.left, raw.right)
    }
}

impl Rectangle {
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> FrameResult<Self> {
        if top >= bottom || left >= right {
            return Err(FrameError::configuration(format!(
                "empty rectangle top={top} bottom={bottom} left={left} right={right}"
            )));
        }
        Ok(Self {
            top,
            bottom,
            left,
            right,
        })
    }

    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn bottom(&self) -> u32 {
        self.bottom
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn right(&self) -> u32 {
        self.right
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.bottom <= height && self.right <= width
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.top, self.bottom, self.left, self.right
        )
    }
}

impl FromStr for Rectangle {
    type Err = FrameError;

    /// Parses `top,bottom,left,right`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        let [top, bottom, left, right] = fields.as_slice() else {
            return Err(FrameError::configuration(format!(
                "expected top,bottom,left,right but got '{s}'"
            )));
        };
        let parse = |name: &str, value: &str| {
            value.parse::<u32>().map_err(|_| {
                FrameError::configuration(format!("invalid rectangle {name} '{value}'"))
            })
        };
        Rectangle::new(
            parse("top", top)?,
            parse("bottom", bottom)?,
            parse("left", left)?,
            parse("right", right)?,
        )
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("backend {backend} is not supported in this build")]
    Unsupported { backend: &'static str },

    #[error("{backend} backend failed: {message}")]
    BackendFailure {
        backend: &'static str,
        message: String,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    pub fn unsupported(backend: &'static str) -> Self {
        Self::Unsupported { backend }
    }

    pub fn backend_failure(backend: &'static str, message: impl Into<String>) -> Self {
        Self::BackendFailure {
            backend,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
