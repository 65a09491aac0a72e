use subtitle_extract_types::{FrameError, FrameResult, RGB_CHANNELS, Rectangle, VideoFrame};

/// Packed RGB pixels cut from a frame by the configured [`Rectangle`].
#[derive(Clone, PartialEq, Eq)]
pub struct SubRegion {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for SubRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubRegion")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl SubRegion {
    pub fn crop(frame: &VideoFrame, rect: &Rectangle) -> FrameResult<Self> {
        if !rect.fits_within(frame.width(), frame.height()) {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "region {rect} exceeds frame {}x{}",
                    frame.width(),
                    frame.height()
                ),
            });
        }
        let left = rect.left() as usize * RGB_CHANNELS;
        let right = rect.right() as usize * RGB_CHANNELS;
        let mut data = Vec::with_capacity((right - left) * rect.height() as usize);
        for y in rect.top()..rect.bottom() {
            data.extend_from_slice(&frame.row(y)[left..right]);
        }
        Ok(Self {
            width: rect.width(),
            height: rect.height(),
            data,
        })
    }

    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> FrameResult<Self> {
        let expected = width as usize * height as usize * RGB_CHANNELS;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "sub-region {width}x{height} needs {expected} bytes, got {}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Sum of absolute per-channel differences. Regions of different shape
    /// score as maximally different.
    pub fn diff_score(&self, other: &SubRegion) -> u64 {
        if self.width != other.width || self.height != other.height {
            return u64::MAX;
        }
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| u64::from(a.abs_diff(*b)))
            .sum()
    }
}
