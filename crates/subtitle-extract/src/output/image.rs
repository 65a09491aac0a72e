use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use tokio::task;

use super::dir::TEMP_SUFFIX;
use super::error::OutputError;
use crate::detector::SubtitleInterval;
use crate::timestamp::artifact_file_name;

/// Persists subtitle intervals as `<start>__<end>.png` images.
#[derive(Debug, Clone)]
pub struct ImageWriter {
    directory: PathBuf,
    fps: f64,
}

impl ImageWriter {
    pub fn new(directory: impl Into<PathBuf>, fps: f64) -> Self {
        Self {
            directory: directory.into(),
            fps,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Encodes the interval's representative region and writes it under its
    /// timestamp name. The file only appears once fully written.
    pub async fn write(&self, interval: &SubtitleInterval) -> Result<PathBuf, OutputError> {
        let image = &interval.image;
        let mut encoded = Vec::new();
        PngEncoder::new(&mut encoded).write_image(
            image.data(),
            image.width(),
            image.height(),
            ColorType::Rgb8,
        )?;

        let name = artifact_file_name(interval.start_frame, interval.end_frame, self.fps);
        let path = self.directory.join(&name);
        let temp = self.directory.join(format!(".{name}{TEMP_SUFFIX}"));
        let target = path.clone();
        task::spawn_blocking(move || {
            std::fs::write(&temp, encoded)?;
            std::fs::rename(&temp, &target)
        })
        .await
        .map_err(|err| OutputError::Io(std::io::Error::other(format!("join error: {err}"))))??;
        log::debug!("saved {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::SubRegion;

    #[tokio::test]
    async fn writes_png_named_by_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ImageWriter::new(dir.path(), 25.0);
        let pixels: Vec<u8> = (0..2 * 3 * 3).map(|v| v as u8 * 10).collect();
        let interval = SubtitleInterval {
            start_frame: 10,
            end_frame: 29,
            image: SubRegion::from_rgb(3, 2, pixels.clone()).unwrap(),
        };

        let path = writer.write(&interval).await.unwrap();
        assert_eq!(path, dir.path().join("00_00_00_400__00_00_01_159.png"));

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.into_raw(), pixels);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
