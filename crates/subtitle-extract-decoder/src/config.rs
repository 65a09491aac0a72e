use std::env;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

#[cfg(feature = "backend-ffmpeg")]
use std::sync::OnceLock;

use crate::core::{DecoderProvider, DynDecoderProvider, FrameError, FrameResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Mock,
    Ffmpeg,
}

impl FromStr for Backend {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Backend::Mock),
            "ffmpeg" => Ok(Backend::Ffmpeg),
            other => Err(FrameError::configuration(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Mock => "mock",
            Backend::Ffmpeg => "ffmpeg",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compiled_backends() -> Vec<Backend> {
    let mut backends = Vec::new();
    #[cfg(feature = "backend-ffmpeg")]
    {
        if ffmpeg_runtime_available() {
            backends.push(Backend::Ffmpeg);
        }
    }
    backends.push(Backend::Mock);
    backends
}

#[cfg(feature = "backend-ffmpeg")]
fn ffmpeg_runtime_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| match ffmpeg_next::init() {
        Ok(()) => true,
        Err(err) => {
            log::warn!("ffmpeg backend disabled: failed to initialize libraries ({err})");
            false
        }
    })
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub backend: Backend,
    pub input: Option<PathBuf>,
    pub channel_capacity: Option<NonZeroUsize>,
    /// First frame index the stream yields.
    pub start_frame: Option<u64>,
    /// Maximum number of frames the stream yields.
    pub frame_limit: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            backend: Backend::Ffmpeg,
            input: None,
            channel_capacity: None,
            start_frame: None,
            frame_limit: None,
        }
    }
}

impl Configuration {
    pub fn from_env() -> FrameResult<Self> {
        let mut config = Configuration::default();
        if let Ok(backend) = env::var("SUBEXTRACT_BACKEND") {
            config.backend = Backend::from_str(&backend)?;
        }
        if let Ok(path) = env::var("SUBEXTRACT_INPUT") {
            config.input = Some(PathBuf::from(path));
        }
        if let Ok(capacity) = env::var("SUBEXTRACT_CHANNEL_CAPACITY") {
            let parsed: usize = capacity.parse().map_err(|_| {
                FrameError::configuration(format!(
                    "failed to parse SUBEXTRACT_CHANNEL_CAPACITY='{capacity}' as a positive integer"
                ))
            })?;
            let Some(value) = NonZeroUsize::new(parsed) else {
                return Err(FrameError::configuration(
                    "SUBEXTRACT_CHANNEL_CAPACITY must be greater than zero",
                ));
            };
            config.channel_capacity = Some(value);
        }
        Ok(config)
    }

    pub fn available_backends() -> Vec<Backend> {
        compiled_backends()
    }

    /// Copy of this configuration positioned at `start_frame`, yielding at
    /// most `frame_limit` frames.
    pub fn window(&self, start_frame: u64, frame_limit: Option<u64>) -> Self {
        Self {
            start_frame: Some(start_frame),
            frame_limit,
            ..self.clone()
        }
    }

    pub fn create_provider(&self) -> FrameResult<DynDecoderProvider> {
        match self.backend {
            Backend::Mock => {
                let provider = crate::backends::mock::MockProvider::new(self)?;
                Ok(Box::new(provider))
            }
            Backend::Ffmpeg => {
                #[cfg(feature = "backend-ffmpeg")]
                {
                    let provider = crate::backends::ffmpeg::FfmpegProvider::new(self)?;
                    Ok(Box::new(provider))
                }
                #[cfg(not(feature = "backend-ffmpeg"))]
                {
                    Err(FrameError::unsupported("ffmpeg"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_round_trip_case_insensitively() {
        assert_eq!(Backend::from_str("FFmpeg").unwrap(), Backend::Ffmpeg);
        assert_eq!(Backend::from_str(" mock ").unwrap(), Backend::Mock);
        assert_eq!(Backend::Mock.to_string(), "mock");
        assert!(matches!(
            Backend::from_str("videotoolbox"),
            Err(FrameError::Configuration { .. })
        ));
    }

    #[test]
    fn mock_backend_is_always_available() {
        assert!(Configuration::available_backends().contains(&Backend::Mock));
    }

    #[test]
    fn window_keeps_input_and_backend() {
        let config = Configuration {
            backend: Backend::Mock,
            input: Some(PathBuf::from("movie.mp4")),
            ..Default::default()
        };
        let window = config.window(40, Some(10));
        assert_eq!(window.backend, Backend::Mock);
        assert_eq!(window.input, config.input);
        assert_eq!(window.start_frame, Some(40));
        assert_eq!(window.frame_limit, Some(10));
    }
}
