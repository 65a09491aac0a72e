use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;
use subtitle_extract_types::Rectangle;

use crate::cli::{CliArgs, CliSources};
use crate::scene::SceneDetectorConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend: Option<String>,
    roi: Option<Rectangle>,
    scene_threshold: Option<f64>,
    min_scene_len: Option<u64>,
    start_in_scene: Option<bool>,
    change_threshold: Option<f64>,
    decoder_channel_capacity: Option<usize>,
}

#[derive(Debug)]
pub struct EffectiveSettings {
    pub backend: Option<String>,
    pub roi: Option<Rectangle>,
    pub scene: SceneDetectorConfig,
    pub change_threshold: f64,
    pub decoder_channel_capacity: Option<usize>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let config_override = cli.config.clone().map(expand_pathbuf);
    let (file, config_path) = load_config(config_override.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        return read_config(path);
    }

    let candidates = [project_config_path(), default_config_path()];
    for path in candidates.into_iter().flatten() {
        if path.exists() {
            return read_config(path);
        }
    }
    Ok((FileConfig::default(), None))
}

fn read_config(path: PathBuf) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    log::debug!("loaded config file {}", path.display());
    Ok((config, Some(path)))
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let FileConfig {
        backend: file_backend,
        roi: file_roi,
        scene_threshold: file_scene_threshold,
        min_scene_len: file_min_scene_len,
        start_in_scene: file_start_in_scene,
        change_threshold: file_change_threshold,
        decoder_channel_capacity: file_decoder_channel_capacity,
    } = file;

    let mut backend = normalize_string(cli.backend.clone());
    if backend.is_none() {
        backend = normalize_string(file_backend);
    }

    let roi = cli.roi.or(file_roi);

    let mut scene_threshold = cli.scene_threshold;
    if !sources.scene_threshold_from_cli {
        if let Some(value) = file_scene_threshold {
            scene_threshold = validate_threshold(value, "scene_threshold", config_path.as_ref())?;
        }
    }

    let mut min_scene_len = cli.min_scene_len;
    if !sources.min_scene_len_from_cli {
        if let Some(value) = file_min_scene_len {
            min_scene_len = value;
        }
    }

    let mut start_in_scene = cli.start_in_scene;
    if !sources.start_in_scene_from_cli {
        if let Some(value) = file_start_in_scene {
            start_in_scene = value;
        }
    }

    let mut change_threshold = cli.change_threshold;
    if !sources.change_threshold_from_cli {
        if let Some(value) = file_change_threshold {
            change_threshold =
                validate_threshold(value, "change_threshold", config_path.as_ref())?;
        }
    }

    let mut decoder_channel_capacity = cli.decoder_channel_capacity;
    if let Some(0) = decoder_channel_capacity {
        return Err(ConfigError::InvalidValue {
            path: None,
            field: "decoder_channel_capacity",
            value: "0".to_string(),
        });
    }
    if !sources.decoder_channel_capacity_from_cli {
        if let Some(value) = file_decoder_channel_capacity {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    path: config_path,
                    field: "decoder_channel_capacity",
                    value: value.to_string(),
                });
            }
            decoder_channel_capacity = Some(value);
        }
    }

    Ok(EffectiveSettings {
        backend,
        roi,
        scene: SceneDetectorConfig {
            threshold: scene_threshold,
            min_scene_len,
            start_in_scene,
        },
        change_threshold,
        decoder_channel_capacity,
        config_path,
    })
}

fn validate_threshold(
    value: f64,
    field: &'static str,
    path: Option<&PathBuf>,
) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            path: path.cloned(),
            field,
            value: value.to_string(),
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "subtitle-extract", "subtitle-extract")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir().ok().map(|dir| dir.join("config.toml"))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Expands a leading `~` to the home directory.
pub fn expand_pathbuf(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_home_path(s),
        None => path,
    }
}

fn expand_home_path(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(stripped) = value.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(stripped);
        }
    }
    PathBuf::from(value)
}
