mod dir;
mod error;
mod image;

pub use dir::{OUTPUT_DIR_SUFFIX, output_dir_for, prepare_output_dir};
pub use error::OutputError;
pub use image::ImageWriter;
