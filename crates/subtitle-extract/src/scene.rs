//! Scene windows and the segmenters that produce them.

use futures_util::StreamExt;
use subtitle_extract_types::{FrameResult, RGB_CHANNELS, VideoFrame};

use crate::source::FrameSource;

/// Half-open frame range `[start_frame, end_frame)` between two content cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneWindow {
    pub start_frame: u64,
    pub end_frame: u64,
}

impl SceneWindow {
    pub fn new(start_frame: u64, end_frame: u64) -> Self {
        Self {
            start_frame,
            end_frame,
        }
    }

    pub fn len(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Produces the ordered scene windows of a video. Zero windows is a valid
/// answer and means there is nothing to extract.
#[allow(async_fn_in_trait)]
pub trait SceneSegmenter {
    async fn segment<S: FrameSource>(&self, source: &S) -> FrameResult<Vec<SceneWindow>>;
}

/// Windows known ahead of time.
#[derive(Debug, Clone, Default)]
pub struct StaticScenes {
    windows: Vec<SceneWindow>,
}

impl StaticScenes {
    pub fn new(windows: Vec<SceneWindow>) -> Self {
        Self { windows }
    }
}

impl SceneSegmenter for StaticScenes {
    async fn segment<S: FrameSource>(&self, _source: &S) -> FrameResult<Vec<SceneWindow>> {
        Ok(self.windows.clone())
    }
}

pub const DEFAULT_SCENE_THRESHOLD: f64 = 12.0;
pub const DEFAULT_MIN_SCENE_LEN: u64 = 15;

/// Downsampled frames are roughly this wide when scoring content change.
const TARGET_SAMPLE_WIDTH: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneDetectorConfig {
    /// Mean HSV delta (0..=255 scale) at which a cut is declared.
    pub threshold: f64,
    /// Minimum number of frames between two cuts.
    pub min_scene_len: u64,
    /// Report the whole video as one scene when no cut is found.
    pub start_in_scene: bool,
}

impl Default for SceneDetectorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SCENE_THRESHOLD,
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            start_in_scene: false,
        }
    }
}

/// Content-change segmenter: decodes the whole video once and cuts where the
/// mean hue/saturation/value difference between consecutive frames spikes.
#[derive(Debug, Clone, Default)]
pub struct ContentSceneDetector {
    config: SceneDetectorConfig,
}

impl ContentSceneDetector {
    pub fn new(config: SceneDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SceneDetectorConfig {
        &self.config
    }

    fn windows_from_cuts(&self, cuts: &[u64], total_frames: u64) -> Vec<SceneWindow> {
        if cuts.is_empty() {
            return if self.config.start_in_scene && total_frames > 0 {
                vec![SceneWindow::new(0, total_frames)]
            } else {
                Vec::new()
            };
        }
        std::iter::once(0)
            .chain(cuts.iter().copied())
            .zip(cuts.iter().copied().chain(std::iter::once(total_frames)))
            .map(|(start, end)| SceneWindow::new(start, end))
            .filter(|window| !window.is_empty())
            .collect()
    }
}

impl SceneSegmenter for ContentSceneDetector {
    async fn segment<S: FrameSource>(&self, source: &S) -> FrameResult<Vec<SceneWindow>> {
        let mut stream = source.open_at(0, None)?;
        let mut previous: Option<HsvSample> = None;
        let mut last_cut: Option<u64> = None;
        let mut cuts = Vec::new();
        let mut next_index = 0u64;
        let mut scan_complete = true;

        while let Some(frame) = stream.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("scene detection stopped at frame {next_index}: {err}");
                    scan_complete = false;
                    break;
                }
            };
            let index = frame.frame_index().unwrap_or(next_index);
            next_index = index + 1;
            let sample = HsvSample::from_frame(&frame);
            let since_cut = index.saturating_sub(*last_cut.get_or_insert(index));
            if let Some(prev) = previous.as_ref() {
                let score = sample.content_delta(prev);
                if score >= self.config.threshold && since_cut >= self.config.min_scene_len {
                    log::debug!("scene cut at frame {index} (score {score:.2})");
                    cuts.push(index);
                    last_cut = Some(index);
                }
            }
            previous = Some(sample);
        }

        // A cut-short scan keeps its cuts; the last scene runs to the reported end.
        let total_frames = if scan_complete {
            next_index
        } else {
            source
                .metadata()
                .calculate_total_frames()
                .map_or(next_index, |total| total.max(next_index))
        };
        let windows = self.windows_from_cuts(&cuts, total_frames);
        log::info!(
            "scene detection scanned {next_index} frames: {} cuts, {} scenes",
            cuts.len(),
            windows.len()
        );
        Ok(windows)
    }
}

/// Downsampled HSV planes in the 8-bit convention (hue halved to 0..180).
struct HsvSample {
    hue: Vec<u8>,
    saturation: Vec<u8>,
    value: Vec<u8>,
}

impl HsvSample {
    fn from_frame(frame: &VideoFrame) -> Self {
        let step = (frame.width() / TARGET_SAMPLE_WIDTH).max(1);
        let capacity = ((frame.width() / step + 1) * (frame.height() / step + 1)) as usize;
        let mut sample = Self {
            hue: Vec::with_capacity(capacity),
            saturation: Vec::with_capacity(capacity),
            value: Vec::with_capacity(capacity),
        };
        for y in (0..frame.height()).step_by(step as usize) {
            let row = frame.row(y);
            for pixel in row.chunks_exact(RGB_CHANNELS).step_by(step as usize) {
                let [h, s, v] = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
                sample.hue.push(h);
                sample.saturation.push(s);
                sample.value.push(v);
            }
        }
        sample
    }

    fn content_delta(&self, other: &HsvSample) -> f64 {
        if self.value.len() != other.value.len() || self.value.is_empty() {
            return f64::MAX;
        }
        let mean_delta = |a: &[u8], b: &[u8]| {
            let sum: u64 = a.iter().zip(b).map(|(x, y)| u64::from(x.abs_diff(*y))).sum();
            sum as f64 / a.len() as f64
        };
        (mean_delta(&self.hue, &other.hue)
            + mean_delta(&self.saturation, &other.saturation)
            + mean_delta(&self.value, &other.value))
            / 3.0
    }
}

fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return [0, 0, max];
    }
    let delta = f32::from(max - min);
    let saturation = (255.0 * delta / f32::from(max)).round() as u8;
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let mut degrees = if max == r {
        60.0 * (gf - bf) / delta
    } else if max == g {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if degrees < 0.0 {
        degrees += 360.0;
    }
    [((degrees / 2.0).round() as u16 % 180) as u8, saturation, max]
}
