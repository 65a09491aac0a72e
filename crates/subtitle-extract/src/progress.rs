use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub fn scene_bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:<10} {bar:40.cyan/blue} {percent:>3}% {pos}/{len} scenes [{elapsed_precise}<{eta_precise}] {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

pub fn scan_spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:<10} {spinner:.cyan.bold} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

fn draw_target() -> ProgressDrawTarget {
    if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    }
}

/// Spinner shown while the scene segmenter scans the video.
pub fn scan_spinner() -> ProgressBar {
    let spinner = ProgressBar::with_draw_target(None, draw_target());
    spinner.set_style(scan_spinner_style());
    spinner.set_prefix("scenes");
    spinner.set_message("detecting scene cuts");
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    spinner
}

/// Bar advanced once per processed scene.
pub fn scene_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(total), draw_target());
    bar.set_style(scene_bar_style());
    bar.set_prefix("extract");
    bar
}
