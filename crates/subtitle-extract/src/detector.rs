//! Per-scene subtitle interval detection.
//!
//! The detector watches the cropped subtitle area for bursts of frame-to-frame
//! change. A jump above the threshold opens an interval; the area settling
//! back below the threshold closes it. Intervals no longer than the debounce
//! floor (a fifth of a second of frames) are dropped as noise.
//!
//! The representative image of an interval is the region seen on the last
//! changing frame, not the first stable one after it. Downstream OCR output
//! depends on this choice, although the stable frame is usually more legible.

use crate::region::SubRegion;
use crate::scene::SceneWindow;
use crate::timestamp::sanitize_fps;

/// Fraction of a second below which an interval counts as noise.
const DEBOUNCE_SECONDS: f64 = 0.2;

pub const DEFAULT_CHANGE_THRESHOLD: f64 = 25_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub change_threshold: f64,
    pub min_duration_frames: u64,
    pub fps: f64,
}

impl DetectorConfig {
    pub fn new(change_threshold: f64, fps: f64) -> Self {
        let fps = sanitize_fps(fps);
        Self {
            change_threshold,
            min_duration_frames: (fps * DEBOUNCE_SECONDS).floor() as u64,
            fps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Open { start_frame: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleInterval {
    pub start_frame: u64,
    pub end_frame: u64,
    pub image: SubRegion,
}

/// Detector state for a single scene window. Create one per scene.
#[derive(Debug)]
pub struct SubtitleDetector {
    config: DetectorConfig,
    state: DetectorState,
    previous: Option<SubRegion>,
}

impl SubtitleDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::Idle,
            previous: None,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Feeds the region of frame `frame_index`; returns an interval when the
    /// area has just settled after a long enough burst of change.
    pub fn handle_frame(&mut self, frame_index: u64, region: SubRegion) -> Option<SubtitleInterval> {
        let previous = self.previous.replace(region)?;
        let current = self.previous.as_ref()?;
        let changing = current.diff_score(&previous) as f64 > self.config.change_threshold;

        match (self.state, changing) {
            (DetectorState::Idle, true) => {
                self.state = DetectorState::Open {
                    start_frame: frame_index,
                };
                None
            }
            (DetectorState::Open { start_frame }, false) => {
                self.state = DetectorState::Idle;
                accept(
                    self.config.min_duration_frames,
                    start_frame,
                    frame_index.saturating_sub(1),
                    previous,
                )
            }
            _ => None,
        }
    }

    /// Resolves an interval still open when the scene ends at `scene_end`
    /// (exclusive).
    pub fn finish(self, scene_end: u64) -> Option<SubtitleInterval> {
        let DetectorState::Open { start_frame } = self.state else {
            return None;
        };
        accept(
            self.config.min_duration_frames,
            start_frame,
            scene_end.saturating_sub(1),
            self.previous?,
        )
    }
}

fn accept(
    min_duration_frames: u64,
    start_frame: u64,
    end_frame: u64,
    image: SubRegion,
) -> Option<SubtitleInterval> {
    if end_frame.saturating_sub(start_frame) > min_duration_frames {
        Some(SubtitleInterval {
            start_frame,
            end_frame,
            image,
        })
    } else {
        log::debug!(
            "dropping interval {start_frame}..={end_frame}: not longer than {min_duration_frames} frames"
        );
        None
    }
}

/// A fresh detector bound to one scene window. Regions are numbered from the
/// window start and the scan is done once the window end is reached.
#[derive(Debug)]
pub struct SceneScan {
    window: SceneWindow,
    next_frame: u64,
    detector: SubtitleDetector,
}

impl SceneScan {
    pub fn new(window: SceneWindow, config: DetectorConfig) -> Self {
        Self {
            window,
            next_frame: window.start_frame,
            detector: SubtitleDetector::new(config),
        }
    }

    pub fn next_frame(&self) -> u64 {
        self.next_frame
    }

    pub fn is_done(&self) -> bool {
        self.next_frame >= self.window.end_frame
    }

    /// Feeds the region of the next frame in the window.
    pub fn push(&mut self, region: SubRegion) -> Option<SubtitleInterval> {
        let frame_index = self.next_frame;
        self.next_frame += 1;
        self.detector.handle_frame(frame_index, region)
    }

    /// Flushes an interval still open at the window end, even when fewer
    /// frames than the window holds were pushed.
    pub fn finish(self) -> Option<SubtitleInterval> {
        self.detector.finish(self.window.end_frame)
    }
}

/// Runs a fresh detector over the regions of one scene. Frames past the
/// window end are ignored.
pub fn detect_intervals<I>(window: SceneWindow, regions: I, config: DetectorConfig) -> Vec<SubtitleInterval>
where
    I: IntoIterator<Item = SubRegion>,
{
    let mut scan = SceneScan::new(window, config);
    let mut intervals = Vec::new();
    for region in regions {
        if scan.is_done() {
            break;
        }
        intervals.extend(scan.push(region));
    }
    intervals.extend(scan.finish());
    intervals
}
