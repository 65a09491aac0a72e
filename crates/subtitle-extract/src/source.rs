use subtitle_extract_decoder::{Configuration, FrameResult, FrameStream, VideoMetadata};

/// Random-access frame streams over one video. Every call to
/// [`FrameSource::open_at`] returns an independent decode cursor.
pub trait FrameSource {
    fn metadata(&self) -> VideoMetadata;

    /// Streams frames `start_frame..start_frame + frame_limit`, or to the end
    /// of the video when `frame_limit` is `None`.
    fn open_at(&self, start_frame: u64, frame_limit: Option<u64>) -> FrameResult<FrameStream>;
}

/// [`FrameSource`] backed by a decoder [`Configuration`].
#[derive(Debug, Clone)]
pub struct DecoderFrameSource {
    config: Configuration,
    metadata: VideoMetadata,
}

impl DecoderFrameSource {
    /// Probes the configured input so open failures surface before any
    /// stream is requested.
    pub fn open(config: Configuration) -> FrameResult<Self> {
        let provider = config.create_provider()?;
        let metadata = provider.metadata();
        log::debug!(
            "opened {:?} with {} backend: {:?}",
            config.input,
            config.backend,
            metadata
        );
        Ok(Self { config, metadata })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }
}

impl FrameSource for DecoderFrameSource {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn open_at(&self, start_frame: u64, frame_limit: Option<u64>) -> FrameResult<FrameStream> {
        let provider = self.config.window(start_frame, frame_limit).create_provider()?;
        Ok(provider.open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use subtitle_extract_decoder::Backend;

    fn mock_source() -> DecoderFrameSource {
        DecoderFrameSource::open(Configuration {
            backend: Backend::Mock,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn metadata_is_probed_on_open() {
        let source = mock_source();
        assert_eq!(source.metadata().fps, Some(25.0));
        assert_eq!(source.metadata().total_frames, Some(120));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn each_cursor_starts_where_requested() {
        let source = mock_source();
        let mut late = source.open_at(90, Some(2)).unwrap();
        let mut early = source.open_at(5, None).unwrap();
        let first_late = late.next().await.unwrap().unwrap();
        let first_early = early.next().await.unwrap().unwrap();
        assert_eq!(first_late.frame_index(), Some(90));
        assert_eq!(first_early.frame_index(), Some(5));
        assert_eq!(late.count().await, 1);
    }

    #[test]
    fn unreadable_input_fails_to_open() {
        let result = DecoderFrameSource::open(Configuration {
            backend: Backend::Ffmpeg,
            input: Some("/nonexistent/clip.mp4".into()),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
