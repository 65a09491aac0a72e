use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

use subtitle_extract_decoder::{Backend, Configuration, FrameError, FrameResult};

use crate::settings::EffectiveSettings;

/// Decoder configuration from the environment, overridden by the resolved
/// settings. The chosen backend must be compiled in and usable.
pub fn decoder_configuration(settings: &EffectiveSettings) -> FrameResult<Configuration> {
    let mut config = Configuration::from_env()?;
    if let Some(name) = settings.backend.as_deref() {
        config.backend = Backend::from_str(name)?;
    }
    if let Some(capacity) = settings.decoder_channel_capacity {
        config.channel_capacity = NonZeroUsize::new(capacity);
    }

    let available = Configuration::available_backends();
    if !available.contains(&config.backend) {
        return Err(FrameError::unsupported(config.backend.as_str()));
    }
    log::debug!("using decoder backend '{}'", config.backend);
    Ok(config)
}

/// The input named on the command line, else the one from `SUBEXTRACT_INPUT`.
pub fn resolve_input(cli_input: Option<PathBuf>, decoder: &Configuration) -> Option<PathBuf> {
    cli_input.or_else(|| decoder.input.clone())
}

pub fn available_backend_names() -> Vec<&'static str> {
    Configuration::available_backends()
        .iter()
        .map(Backend::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneDetectorConfig;

    fn settings(backend: Option<&str>, capacity: Option<usize>) -> EffectiveSettings {
        EffectiveSettings {
            backend: backend.map(str::to_string),
            roi: None,
            scene: SceneDetectorConfig::default(),
            change_threshold: 1.0,
            decoder_channel_capacity: capacity,
            config_path: None,
        }
    }

    #[test]
    fn settings_override_backend_and_capacity() {
        let config = decoder_configuration(&settings(Some("mock"), Some(3))).unwrap();
        assert_eq!(config.backend, Backend::Mock);
        assert_eq!(config.channel_capacity, NonZeroUsize::new(3));
    }

    #[test]
    fn unknown_backend_is_a_configuration_error() {
        assert!(matches!(
            decoder_configuration(&settings(Some("quicktime"), None)),
            Err(FrameError::Configuration { .. })
        ));
    }

    #[test]
    fn command_line_input_wins_over_environment_input() {
        let decoder = Configuration {
            input: Some(PathBuf::from("/videos/from-env.mp4")),
            ..Configuration::default()
        };
        assert_eq!(
            resolve_input(Some(PathBuf::from("movie.mp4")), &decoder),
            Some(PathBuf::from("movie.mp4"))
        );
        assert_eq!(
            resolve_input(None, &decoder),
            Some(PathBuf::from("/videos/from-env.mp4"))
        );
        assert_eq!(resolve_input(None, &Configuration::default()), None);
    }

    #[test]
    fn mock_is_always_listed() {
        assert!(available_backend_names().contains(&"mock"));
    }
}
