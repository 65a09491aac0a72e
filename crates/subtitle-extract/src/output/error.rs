use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum OutputError {
    Io(std::io::Error),
    Encode(image::ImageError),
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Io(err) => write!(f, "I/O error: {err}"),
            OutputError::Encode(err) => write!(f, "encoding error: {err}"),
            OutputError::Directory { path, source } => {
                write!(f, "cannot prepare output directory {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(err) => Some(err),
            OutputError::Encode(err) => Some(err),
            OutputError::Directory { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for OutputError {
    fn from(value: std::io::Error) -> Self {
        OutputError::Io(value)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(value: image::ImageError) -> Self {
        OutputError::Encode(value)
    }
}
