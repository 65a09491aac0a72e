//! Turning a folder of subtitle images back into an SRT document.
//!
//! Image names carry the timing (see [`crate::timestamp`]); the text comes
//! from a [`TextRecognizer`] supplied by the caller.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs;

use crate::timestamp::{ARTIFACT_EXTENSION, decode, parse_artifact_name};

#[derive(Debug, Error)]
#[error("{message}")]
pub struct RecognizeError {
    message: String,
}

impl RecognizeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Maps a subtitle image to the text it shows.
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &Path) -> Result<String, RecognizeError>;
}

#[derive(Debug, Error)]
pub enum SrtError {
    #[error("cannot read image folder {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtCue {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// Joins the non-empty lines of raw OCR output with spaces and strips the
/// underscores and spaces recognizers tend to leave in front.
pub fn clean_text(raw: &str) -> String {
    let joined = raw
        .lines()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    joined
        .trim_start_matches(['_', ' '])
        .trim()
        .to_string()
}

/// Recognizes every image artifact in `dir` and returns the cues ordered by
/// start time. Images sharing a start time collapse into one cue; the one
/// with the later name wins. Unrecognized images and files with other names
/// are skipped.
pub fn assemble_srt(dir: &Path, recognizer: &dyn TextRecognizer) -> Result<Vec<SrtCue>, SrtError> {
    let read_error = |source| SrtError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if let Ok(name) = entry.file_name().into_string() {
            if name.ends_with(&format!(".{ARTIFACT_EXTENSION}")) && !name.starts_with('.') {
                names.push(name);
            }
        }
    }
    names.sort();
    log::info!("recognizing {} images with {}", names.len(), recognizer.name());

    let mut cues = BTreeMap::new();
    for name in names {
        let times = parse_artifact_name(&name)
            .and_then(|(start, end)| Ok((decode(&start)?, decode(&end)?)));
        let (start, end) = match times {
            Ok(times) => times,
            Err(err) => {
                log::debug!("skipping {name}: {err}");
                continue;
            }
        };
        let text = match recognizer.recognize(&dir.join(&name)) {
            Ok(raw) => clean_text(&raw),
            Err(err) => {
                log::warn!("recognition failed for {name}: {err}");
                continue;
            }
        };
        if text.is_empty() {
            log::debug!("no text recognized in {name}");
            continue;
        }
        cues.insert(start, SrtCue { start, end, text });
    }
    Ok(cues.into_values().collect())
}

pub fn render_srt(cues: &[SrtCue]) -> String {
    let mut output = String::new();
    for (idx, cue) in cues.iter().enumerate() {
        let _ = writeln!(&mut output, "{}", idx + 1);
        let _ = writeln!(
            &mut output,
            "{} --> {}",
            format_timestamp(cue.start),
            format_timestamp(cue.end)
        );
        let _ = writeln!(&mut output, "{}", cue.text);
        output.push('\n');
    }
    output
}

pub async fn write_srt(path: &Path, cues: &[SrtCue]) -> Result<(), SrtError> {
    fs::write(path, render_srt(cues))
        .await
        .map_err(|source| SrtError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    log::info!("wrote {} subtitle blocks to {}", cues.len(), path.display());
    Ok(())
}

fn format_timestamp(time: Duration) -> String {
    let millis = time
        .as_secs()
        .saturating_mul(1000)
        .saturating_add(u64::from(time.subsec_millis()));
    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let seconds = (millis % 60_000) / 1000;
    let remain_ms = millis % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{remain_ms:03}")
}
