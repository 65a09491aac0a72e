use std::path::{Path, PathBuf};

use subtitle_extract::output::output_dir_for;
use subtitle_extract::srt::{RecognizeError, TextRecognizer, assemble_srt, render_srt};
use subtitle_extract::{
    ContentSceneDetector, ExtractError, ExtractionOutcome, Extractor, Rectangle,
    SceneDetectorConfig,
};
use subtitle_extract_decoder::backends::mock::MockProvider;
use subtitle_extract_decoder::{Backend, Configuration};

const CHANGE_THRESHOLD: f64 = 25_000.0;

fn mock_decoder() -> Configuration {
    Configuration {
        backend: Backend::Mock,
        ..Configuration::default()
    }
}

fn caption_band() -> Option<Rectangle> {
    Some(Rectangle::new(MockProvider::BAND_TOP, MockProvider::BAND_BOTTOM, 0, 640).unwrap())
}

fn png_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with(".png"))
        .collect();
    names.sort();
    names
}

async fn extract(video: &Path, config: SceneDetectorConfig) -> Result<ExtractionOutcome, ExtractError> {
    Extractor::new(ContentSceneDetector::new(config), CHANGE_THRESHOLD)
        .run_with_decoder(video, caption_band(), mock_decoder())
        .await
}

#[tokio::test(flavor = "multi_thread")]
async fn mock_clip_yields_one_image_per_caption_burst() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");

    let outcome = extract(&video, SceneDetectorConfig::default()).await.unwrap();
    let ExtractionOutcome::Completed(summary) = outcome else {
        panic!("expected scenes in the mock clip");
    };
    assert_eq!(summary.scenes, 2);
    assert_eq!(summary.images_saved, 3);
    assert_eq!(summary.truncated_scenes, 0);
    assert_eq!(summary.output_dir, dir.path().join("clip_sub_images"));
    assert_eq!(
        png_names(&summary.output_dir),
        vec![
            "00_00_00_040__00_00_00_800.png",
            "00_00_01_600__00_00_02_359.png",
            "00_00_03_200__00_00_04_000.png",
        ]
    );

    let image = image::open(summary.output_dir.join("00_00_00_040__00_00_00_800.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(image.dimensions(), (640, 40));
}

#[tokio::test(flavor = "multi_thread")]
async fn rerunning_replaces_previous_images() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");
    let output = output_dir_for(&video);
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("00_09_00_000__00_09_01_000.png"), b"stale").unwrap();
    std::fs::write(output.join("clip.srt"), b"keep").unwrap();

    let first = extract(&video, SceneDetectorConfig::default()).await.unwrap();
    let first_names = png_names(&output);
    let second = extract(&video, SceneDetectorConfig::default()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first_names, png_names(&output));
    assert_eq!(first_names.len(), 3);
    assert!(output.join("clip.srt").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn no_cuts_means_nothing_to_extract() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");
    let config = SceneDetectorConfig {
        threshold: 250.0,
        ..SceneDetectorConfig::default()
    };

    let outcome = extract(&video, config).await.unwrap();
    assert_eq!(
        outcome,
        ExtractionOutcome::NoScenes {
            output_dir: output_dir_for(&video)
        }
    );
    assert!(output_dir_for(&video).is_dir());
    assert!(png_names(&output_dir_for(&video)).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn start_in_scene_treats_uncut_video_as_one_scene() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");
    let config = SceneDetectorConfig {
        threshold: 250.0,
        start_in_scene: true,
        ..SceneDetectorConfig::default()
    };

    let outcome = extract(&video, config).await.unwrap();
    assert_eq!(outcome.images_saved(), 3);
    assert_eq!(
        png_names(outcome.output_dir()),
        vec![
            "00_00_00_040__00_00_00_800.png",
            "00_00_01_600__00_00_02_399.png",
            "00_00_03_200__00_00_04_000.png",
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn region_outside_the_video_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");
    let region = Some(Rectangle::new(300, 400, 0, 640).unwrap());
    let err = Extractor::new(ContentSceneDetector::default(), CHANGE_THRESHOLD)
        .run_with_decoder(&video, region, mock_decoder())
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(err, ExtractError::InvalidRegion { height: 360, .. }));
    assert!(!output_dir_for(&video).exists());
}

/// Reads the text back from the image name so the SRT can be checked.
struct NameRecognizer;

impl TextRecognizer for NameRecognizer {
    fn name(&self) -> &'static str {
        "name"
    }

    fn recognize(&self, image: &Path) -> Result<String, RecognizeError> {
        let stem = image
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| RecognizeError::new("unnamed image"))?;
        Ok(format!("_ caption\n{stem}"))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn extracted_folder_assembles_into_srt() {
    let dir = tempfile::tempdir().unwrap();
    let video: PathBuf = dir.path().join("clip.mp4");
    let outcome = extract(&video, SceneDetectorConfig::default()).await.unwrap();

    let cues = assemble_srt(outcome.output_dir(), &NameRecognizer).unwrap();
    let srt = render_srt(&cues);
    assert!(srt.starts_with(
        "1\n00:00:00,040 --> 00:00:00,800\ncaption 00_00_00_040__00_00_00_800\n\n2\n"
    ));
    assert!(srt.contains("3\n00:00:03,200 --> 00:00:04,000\n"));
}
