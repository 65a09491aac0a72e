//! Frame index <-> filename-safe timestamp conversion.
//!
//! Artifacts are named `HH_MM_SS_mmm__HH_MM_SS_mmm.png`: two timestamp groups
//! joined by a double underscore, each group holding hour, minute, second and
//! millisecond fields zero-padded to 2, 2, 2 and 3 digits. Underscores stand in
//! for the `:` and `,` of SRT timestamps, which are not valid in filenames on
//! every platform. Downstream tooling rebuilds `HH:MM:SS,mmm` from this layout,
//! so the format must not change.

use std::time::Duration;

use thiserror::Error;

/// Frame rate assumed when the container reports none (or a non-positive one).
pub const DEFAULT_FPS: f64 = 25.0;

pub const ARTIFACT_EXTENSION: &str = "png";
const GROUP_SEPARATOR: &str = "__";
const FIELD_SEPARATOR: char = '_';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed timestamp '{0}': expected HH_MM_SS_mmm")]
    Timestamp(String),
    #[error("malformed artifact name '{0}': expected HH_MM_SS_mmm__HH_MM_SS_mmm.png")]
    ArtifactName(String),
}

pub fn sanitize_fps(fps: f64) -> f64 {
    if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        DEFAULT_FPS
    }
}

/// Formats the presentation time of `frame_index` as `HH_MM_SS_mmm`.
///
/// Whole seconds and the fractional remainder are split before scaling, so
/// the millisecond field is the truncated fraction of `frame_index / fps`.
pub fn encode(frame_index: u64, fps: f64) -> String {
    let fps = sanitize_fps(fps);
    let seconds = frame_index as f64 / fps;
    let whole = seconds.trunc();
    let millis = ((seconds - whole) * 1000.0) as u64;
    format_fields(whole as u64, millis)
}

fn format_fields(total_secs: u64, millis: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}_{minutes:02}_{seconds:02}_{millis:03}")
}

fn split_fields(value: &str) -> Option<[&str; 4]> {
    let fields: Vec<&str> = value.split(FIELD_SEPARATOR).collect();
    let [hours, minutes, seconds, millis] = fields.as_slice() else {
        return None;
    };
    let widths_ok = hours.len() >= 2 && minutes.len() == 2 && seconds.len() == 2 && millis.len() == 3;
    let digits_ok = fields
        .iter()
        .all(|field| field.bytes().all(|b| b.is_ascii_digit()));
    (widths_ok && digits_ok).then_some([*hours, *minutes, *seconds, *millis])
}

/// Parses an `HH_MM_SS_mmm` group back into the elapsed time it encodes.
pub fn decode(value: &str) -> Result<Duration, CodecError> {
    let invalid = || CodecError::Timestamp(value.to_string());
    let [hours, minutes, seconds, millis] = split_fields(value).ok_or_else(invalid)?;
    let parse = |field: &str| field.parse::<u64>().map_err(|_| invalid());
    let (hours, minutes, seconds, millis) =
        (parse(hours)?, parse(minutes)?, parse(seconds)?, parse(millis)?);
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }
    Ok(Duration::from_millis(
        ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
    ))
}

/// Rewrites `HH_MM_SS_mmm` as the SRT form `HH:MM:SS,mmm`.
pub fn to_srt_timestamp(value: &str) -> Result<String, CodecError> {
    let [hours, minutes, seconds, millis] =
        split_fields(value).ok_or_else(|| CodecError::Timestamp(value.to_string()))?;
    Ok(format!("{hours}:{minutes}:{seconds},{millis}"))
}

pub fn artifact_file_name(start_frame: u64, end_frame: u64, fps: f64) -> String {
    format!(
        "{}{GROUP_SEPARATOR}{}.{ARTIFACT_EXTENSION}",
        encode(start_frame, fps),
        encode(end_frame, fps)
    )
}

/// Splits an artifact file name into its start and end timestamp groups.
pub fn parse_artifact_name(name: &str) -> Result<(String, String), CodecError> {
    let invalid = || CodecError::ArtifactName(name.to_string());
    let stem = name
        .strip_suffix(ARTIFACT_EXTENSION)
        .and_then(|rest| rest.strip_suffix('.'))
        .ok_or_else(invalid)?;
    let (start, end) = stem.split_once(GROUP_SEPARATOR).ok_or_else(invalid)?;
    if split_fields(start).is_none() || split_fields(end).is_none() {
        return Err(invalid());
    }
    Ok((start.to_string(), end.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_layout(value: &str) -> bool {
        let bytes = value.as_bytes();
        bytes.len() == 12
            && bytes.iter().enumerate().all(|(i, b)| match i {
                2 | 5 | 8 => *b == b'_',
                _ => b.is_ascii_digit(),
            })
    }

    #[test]
    fn encodes_fixed_width_fields() {
        assert_eq!(encode(0, 25.0), "00_00_00_000");
        assert_eq!(encode(10, 25.0), "00_00_00_400");
        assert_eq!(encode(25 * 3723, 25.0), "01_02_03_000");
    }

    #[test]
    fn fraction_is_truncated_after_splitting_whole_seconds() {
        // 29 / 25 = 1.16 s, whose fraction is stored as 0.15999...
        assert_eq!(encode(29, 25.0), "00_00_01_159");
        assert_eq!(encode(59, 25.0), "00_00_02_359");
        assert_eq!(encode(60, 25.0), "00_00_02_399");
        assert_eq!(encode(31, 25.0), "00_00_01_240");
        for frame in 0..2000u64 {
            let seconds = frame as f64 / 25.0;
            let expected_ms = ((seconds - seconds.trunc()) * 1000.0) as u64;
            let value = encode(frame, 25.0);
            assert_eq!(value[9..].parse::<u64>().unwrap(), expected_ms, "{value}");
            assert_eq!(
                decode(&value).unwrap().as_secs(),
                seconds.trunc() as u64,
                "{value}"
            );
        }
    }

    #[test]
    fn fractional_rates_truncate_to_milliseconds() {
        // 1001 frames at 30000/1001 fps is 33.4 seconds.
        assert_eq!(encode(1001, 30000.0 / 1001.0), "00_00_33_400");
        assert_eq!(encode(1, 30.0), "00_00_00_033");
    }

    #[test]
    fn invalid_rates_fall_back_to_default() {
        assert_eq!(encode(50, 0.0), "00_00_02_000");
        assert_eq!(encode(50, -12.0), "00_00_02_000");
        assert_eq!(encode(50, f64::NAN), "00_00_02_000");
    }

    #[test]
    fn encoding_is_fixed_layout_and_monotonic() {
        for fps in [1.0, 23.976, 25.0, 29.97, 60.0, 120.0] {
            let mut previous = String::new();
            for frame in (0..20_000u64).step_by(7) {
                let value = encode(frame, fps);
                assert!(matches_layout(&value), "{value} at {fps}");
                assert!(value >= previous, "{value} < {previous} at {fps}");
                previous = value;
            }
        }
    }

    #[test]
    fn decode_inverts_encode_to_the_millisecond() {
        assert_eq!(decode("01_02_03_456").unwrap(), Duration::from_millis(3_723_456));
        assert_eq!(decode(&encode(29, 25.0)).unwrap(), Duration::from_millis(1159));
        assert!(decode("01:02:03,456").is_err());
        assert!(decode("01_62_03_456").is_err());
        assert!(decode("01_02_03_45").is_err());
    }

    #[test]
    fn srt_timestamp_swaps_separators() {
        assert_eq!(to_srt_timestamp("00_01_02_345").unwrap(), "00:01:02,345");
        assert!(to_srt_timestamp("00_01_02").is_err());
    }

    #[test]
    fn artifact_names_use_double_underscore() {
        let name = artifact_file_name(10, 29, 25.0);
        assert_eq!(name, "00_00_00_400__00_00_01_159.png");
        assert_eq!(
            parse_artifact_name(&name).unwrap(),
            ("00_00_00_400".to_string(), "00_00_01_159".to_string())
        );
        assert!(parse_artifact_name("00_00_00_400.png").is_err());
        assert!(parse_artifact_name("00_00_00_400__00_00_01_160.jpg").is_err());
        assert!(parse_artifact_name("notes__todo.png").is_err());
    }
}
