use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::error::OutputError;
use crate::timestamp::ARTIFACT_EXTENSION;

pub const OUTPUT_DIR_SUFFIX: &str = "_sub_images";
pub(super) const TEMP_SUFFIX: &str = ".tmp";

/// `<video path without extension>_sub_images`, next to the video.
pub fn output_dir_for(video: &Path) -> PathBuf {
    let mut path: OsString = video.with_extension("").into_os_string();
    path.push(OUTPUT_DIR_SUFFIX);
    PathBuf::from(path)
}

fn is_artifact(path: &Path) -> bool {
    let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
    let visible = path.extension().and_then(|ext| ext.to_str()) == Some(ARTIFACT_EXTENSION);
    let leftover = name.starts_with('.')
        && name
            .strip_suffix(TEMP_SUFFIX)
            .is_some_and(|rest| rest.ends_with(&format!(".{ARTIFACT_EXTENSION}")));
    visible || leftover
}

/// Creates `dir` if needed and removes every image artifact a previous run
/// left in it. Other files are kept. Returns the number of files removed.
pub async fn prepare_output_dir(dir: &Path) -> Result<usize, OutputError> {
    let directory_error = |source| OutputError::Directory {
        path: dir.to_path_buf(),
        source,
    };
    fs::create_dir_all(dir).await.map_err(directory_error)?;

    let mut removed = 0;
    let mut entries = fs::read_dir(dir).await.map_err(directory_error)?;
    while let Some(entry) = entries.next_entry().await.map_err(directory_error)? {
        let path = entry.path();
        if !is_artifact(&path) || !entry.file_type().await?.is_file() {
            continue;
        }
        fs::remove_file(&path).await?;
        removed += 1;
    }
    if removed > 0 {
        log::info!("removed {removed} stale images from {}", dir.display());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_replaces_extension() {
        assert_eq!(
            output_dir_for(Path::new("/videos/show.s01e02.mkv")),
            PathBuf::from("/videos/show.s01e02_sub_images")
        );
        assert_eq!(
            output_dir_for(Path::new("clip")),
            PathBuf::from("clip_sub_images")
        );
    }

    #[tokio::test]
    async fn prepare_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("clip_sub_images");
        assert_eq!(prepare_output_dir(&dir).await.unwrap(), 0);
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn prepare_removes_only_images() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path();
        for name in [
            "00_00_01_000__00_00_02_000.png",
            "stray.png",
            ".00_00_03_000__00_00_04_000.png.tmp",
            "notes.txt",
            "subtitles.srt",
        ] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.join("keep.png")).unwrap();

        assert_eq!(prepare_output_dir(dir).await.unwrap(), 3);
        let mut left: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(left, vec!["keep.png", "notes.txt", "subtitles.srt"]);
    }
}
