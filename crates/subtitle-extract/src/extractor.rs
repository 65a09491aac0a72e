//! Scene-by-scene extraction of subtitle images from one video.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use indicatif::ProgressBar;
use subtitle_extract_decoder::Configuration;
use subtitle_extract_types::{FrameError, FrameResult, Rectangle};
use thiserror::Error;

use crate::detector::{DetectorConfig, SceneScan};
use crate::output::{ImageWriter, OutputError, output_dir_for, prepare_output_dir};
use crate::progress;
use crate::region::SubRegion;
use crate::scene::{SceneSegmenter, SceneWindow};
use crate::source::{DecoderFrameSource, FrameSource};
use crate::timestamp::DEFAULT_FPS;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no subtitle region selected")]
    NoRegion,

    #[error("subtitle region {region} does not fit the {width}x{height} video")]
    InvalidRegion {
        region: Rectangle,
        width: u32,
        height: u32,
    },

    #[error("cannot open video {}: {source}", path.display())]
    OpenVideo {
        path: PathBuf,
        #[source]
        source: FrameError,
    },

    #[error("scene detection failed: {0}")]
    Scenes(#[source] FrameError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl ExtractError {
    /// Errors caused by the request rather than by processing.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ExtractError::NoRegion | ExtractError::InvalidRegion { .. } | ExtractError::OpenVideo { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub output_dir: PathBuf,
    pub scenes: usize,
    pub images_saved: usize,
    /// Scenes cut short by a decode failure.
    pub truncated_scenes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Completed(ExtractionSummary),
    /// The segmenter found no scenes; the output directory was still prepared.
    NoScenes { output_dir: PathBuf },
}

impl ExtractionOutcome {
    pub fn output_dir(&self) -> &Path {
        match self {
            ExtractionOutcome::Completed(summary) => &summary.output_dir,
            ExtractionOutcome::NoScenes { output_dir } => output_dir,
        }
    }

    pub fn images_saved(&self) -> usize {
        match self {
            ExtractionOutcome::Completed(summary) => summary.images_saved,
            ExtractionOutcome::NoScenes { .. } => 0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SceneReport {
    images: usize,
    truncated: bool,
}

pub struct Extractor<S> {
    segmenter: S,
    change_threshold: f64,
    show_progress: bool,
}

impl<S: SceneSegmenter> Extractor<S> {
    pub fn new(segmenter: S, change_threshold: f64) -> Self {
        Self {
            segmenter,
            change_threshold,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Extracts from `video` through the decoder described by `decoder`.
    pub async fn run_with_decoder(
        &self,
        video: &Path,
        region: Option<Rectangle>,
        decoder: Configuration,
    ) -> Result<ExtractionOutcome, ExtractError> {
        self.run(video, region, |path| {
            DecoderFrameSource::open(Configuration {
                input: Some(path.to_path_buf()),
                ..decoder
            })
        })
        .await
    }

    /// Extracts from `video`, reading frames from the source built by `open`.
    ///
    /// The region is checked before the video is opened and the output
    /// directory is only touched once the video opened and the region fits.
    pub async fn run<F, O>(
        &self,
        video: &Path,
        region: Option<Rectangle>,
        open: O,
    ) -> Result<ExtractionOutcome, ExtractError>
    where
        F: FrameSource,
        O: FnOnce(&Path) -> FrameResult<F>,
    {
        let region = region.ok_or(ExtractError::NoRegion)?;
        let source = open(video).map_err(|source| ExtractError::OpenVideo {
            path: video.to_path_buf(),
            source,
        })?;
        let metadata = source.metadata();
        if let (Some(width), Some(height)) = (metadata.width, metadata.height) {
            if !region.fits_within(width, height) {
                return Err(ExtractError::InvalidRegion {
                    region,
                    width,
                    height,
                });
            }
        }

        let output_dir = output_dir_for(video);
        prepare_output_dir(&output_dir).await?;

        let fps = match metadata.fps {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            other => {
                log::warn!("video reports frame rate {other:?}; assuming {DEFAULT_FPS} fps");
                DEFAULT_FPS
            }
        };

        let spinner = self.progress_bar(progress::scan_spinner);
        let windows = self.segmenter.segment(&source).await;
        spinner.finish_and_clear();
        let windows = windows.map_err(ExtractError::Scenes)?;
        if windows.is_empty() {
            log::info!("no scenes detected in {}; nothing to extract", video.display());
            return Ok(ExtractionOutcome::NoScenes { output_dir });
        }

        let config = DetectorConfig::new(self.change_threshold, fps);
        let writer = ImageWriter::new(&output_dir, fps);
        let bar = self.progress_bar(|| progress::scene_bar(windows.len() as u64));
        let mut summary = ExtractionSummary {
            output_dir: output_dir.clone(),
            scenes: windows.len(),
            images_saved: 0,
            truncated_scenes: 0,
        };
        for window in &windows {
            let report = process_scene(&source, *window, &region, config, &writer).await?;
            summary.images_saved += report.images;
            summary.truncated_scenes += usize::from(report.truncated);
            bar.set_message(format!("{} images", summary.images_saved));
            bar.inc(1);
        }
        bar.finish_and_clear();

        log::info!(
            "saved {} images from {} scenes to {}",
            summary.images_saved,
            summary.scenes,
            output_dir.display()
        );
        Ok(ExtractionOutcome::Completed(summary))
    }

    fn progress_bar(&self, make: impl FnOnce() -> ProgressBar) -> ProgressBar {
        if self.show_progress {
            make()
        } else {
            ProgressBar::hidden()
        }
    }
}

/// Runs a fresh detector over one scene on its own decode cursor. Decode
/// failures end the scene early; whatever was detected up to then is kept.
async fn process_scene<F: FrameSource>(
    source: &F,
    window: SceneWindow,
    region: &Rectangle,
    config: DetectorConfig,
    writer: &ImageWriter,
) -> Result<SceneReport, OutputError> {
    let mut report = SceneReport::default();
    if window.is_empty() {
        return Ok(report);
    }
    let mut stream = match source.open_at(window.start_frame, Some(window.len())) {
        Ok(stream) => stream,
        Err(err) => {
            log::warn!(
                "skipping scene {}..{}: cannot position decoder: {err}",
                window.start_frame,
                window.end_frame
            );
            report.truncated = true;
            return Ok(report);
        }
    };

    let mut scan = SceneScan::new(window, config);
    while !scan.is_done() {
        let frame_index = scan.next_frame();
        let frame = match stream.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                log::warn!("scene {}..{} truncated at frame {frame_index}: {err}", window.start_frame, window.end_frame);
                report.truncated = true;
                break;
            }
            None => {
                log::debug!(
                    "stream ended at frame {frame_index} before scene end {}",
                    window.end_frame
                );
                break;
            }
        };
        let cropped = match SubRegion::crop(&frame, region) {
            Ok(cropped) => cropped,
            Err(err) => {
                log::warn!("scene {}..{} truncated at frame {frame_index}: {err}", window.start_frame, window.end_frame);
                report.truncated = true;
                break;
            }
        };
        if let Some(interval) = scan.push(cropped) {
            writer.write(&interval).await?;
            report.images += 1;
        }
    }

    if let Some(interval) = scan.finish() {
        writer.write(&interval).await?;
        report.images += 1;
    }
    Ok(report)
}
