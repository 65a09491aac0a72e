use std::ffi::OsString;
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use subtitle_extract_types::Rectangle;

use crate::detector::DEFAULT_CHANGE_THRESHOLD;
use crate::scene::{DEFAULT_MIN_SCENE_LEN, DEFAULT_SCENE_THRESHOLD};

/// Which options were given explicitly, so config file values only fill the
/// rest.
#[derive(Debug, Default)]
pub struct CliSources {
    pub scene_threshold_from_cli: bool,
    pub min_scene_len_from_cli: bool,
    pub start_in_scene_from_cli: bool,
    pub change_threshold_from_cli: bool,
    pub decoder_channel_capacity_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            scene_threshold_from_cli: value_from_cli(matches, "scene_threshold"),
            min_scene_len_from_cli: value_from_cli(matches, "min_scene_len"),
            start_in_scene_from_cli: value_from_cli(matches, "start_in_scene"),
            change_threshold_from_cli: value_from_cli(matches, "change_threshold"),
            decoder_channel_capacity_from_cli: value_from_cli(matches, "decoder_channel_capacity"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    match parse_cli_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    }
}

pub fn parse_cli_from<I, T>(args: I) -> Result<(CliArgs, CliSources), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = CliArgs::command().try_get_matches_from(args)?;
    let args = CliArgs::from_arg_matches(&matches)?;
    let sources = CliSources::from_matches(&matches);
    Ok((args, sources))
}

fn parse_region(value: &str) -> Result<Rectangle, String> {
    value.parse::<Rectangle>().map_err(|err| err.to_string())
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    match value.trim().parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => Ok(parsed),
        _ => Err(format!("'{value}' is not a non-negative number")),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "subtitle-extract",
    about = "Extract time-stamped subtitle images from a video",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Lock decoding to a specific backend implementation
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<String>,

    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Print the list of available decoding backends
    #[arg(long = "list-backends")]
    pub list_backends: bool,

    /// Subtitle area in video pixels
    #[arg(long = "roi", value_name = "TOP,BOTTOM,LEFT,RIGHT", value_parser = parse_region)]
    pub roi: Option<Rectangle>,

    /// Content change needed to start a new scene
    #[arg(
        long = "scene-threshold",
        id = "scene_threshold",
        default_value_t = DEFAULT_SCENE_THRESHOLD,
        value_parser = parse_threshold
    )]
    pub scene_threshold: f64,

    /// Minimum scene length in frames
    #[arg(
        long = "min-scene-len",
        id = "min_scene_len",
        default_value_t = DEFAULT_MIN_SCENE_LEN
    )]
    pub min_scene_len: u64,

    /// Treat the whole video as one scene when no cut is detected
    #[arg(long = "start-in-scene", id = "start_in_scene")]
    pub start_in_scene: bool,

    /// Summed pixel difference between consecutive subtitle areas that counts as change
    #[arg(
        long = "change-threshold",
        id = "change_threshold",
        default_value_t = DEFAULT_CHANGE_THRESHOLD,
        value_parser = parse_threshold
    )]
    pub change_threshold: f64,

    /// Decoder frame queue capacity before applying backpressure
    #[arg(
        long = "decoder-channel-capacity",
        id = "decoder_channel_capacity",
        value_parser = clap::value_parser!(usize)
    )]
    pub decoder_channel_capacity: Option<usize>,

    /// Input video path
    pub input: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_not_marked_as_explicit() {
        let (args, sources) = parse_cli_from(["subtitle-extract", "movie.mp4"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("movie.mp4")));
        assert_eq!(args.scene_threshold, DEFAULT_SCENE_THRESHOLD);
        assert_eq!(args.change_threshold, DEFAULT_CHANGE_THRESHOLD);
        assert!(!sources.scene_threshold_from_cli);
        assert!(!sources.change_threshold_from_cli);
        assert!(!sources.start_in_scene_from_cli);
    }

    #[test]
    fn explicit_values_are_tracked() {
        let (args, sources) = parse_cli_from([
            "subtitle-extract",
            "--roi",
            "600, 680, 0, 1280",
            "--change-threshold",
            "5000",
            "--start-in-scene",
            "movie.mp4",
        ])
        .unwrap();
        assert_eq!(args.roi, Some(Rectangle::new(600, 680, 0, 1280).unwrap()));
        assert_eq!(args.change_threshold, 5000.0);
        assert!(args.start_in_scene);
        assert!(sources.change_threshold_from_cli);
        assert!(sources.start_in_scene_from_cli);
        assert!(!sources.min_scene_len_from_cli);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(parse_cli_from(["subtitle-extract", "--roi", "10,5,0,100", "a.mp4"]).is_err());
        assert!(parse_cli_from(["subtitle-extract", "--roi", "1,2,3", "a.mp4"]).is_err());
        assert!(
            parse_cli_from(["subtitle-extract", "--change-threshold", "-3", "a.mp4"]).is_err()
        );
    }
}
