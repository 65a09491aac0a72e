//! Extraction of time-stamped subtitle images from video.
//!
//! A [`scene::SceneSegmenter`] splits the video into scene windows. For each
//! window an [`extractor::Extractor`] runs a fresh [`detector::SubtitleDetector`]
//! over the cropped subtitle area and writes one PNG per detected interval,
//! named `HH_MM_SS_mmm__HH_MM_SS_mmm.png`. [`srt`] turns such a folder back
//! into an SRT document given a [`srt::TextRecognizer`].

pub mod backend;
pub mod cli;
pub mod detector;
pub mod extractor;
pub mod output;
pub mod progress;
pub mod region;
pub mod scene;
pub mod settings;
pub mod source;
pub mod srt;
pub mod timestamp;

pub use detector::{DetectorConfig, SceneScan, SubtitleDetector, SubtitleInterval, detect_intervals};
pub use extractor::{ExtractError, ExtractionOutcome, ExtractionSummary, Extractor};
pub use region::SubRegion;
pub use scene::{ContentSceneDetector, SceneDetectorConfig, SceneSegmenter, SceneWindow, StaticScenes};
pub use source::{DecoderFrameSource, FrameSource};
pub use subtitle_extract_types::{FrameError, FrameResult, Rectangle, VideoFrame};
