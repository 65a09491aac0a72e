use std::process::ExitCode;

use subtitle_extract::backend::{available_backend_names, decoder_configuration, resolve_input};
use subtitle_extract::cli::parse_cli;
use subtitle_extract::settings::{expand_pathbuf, resolve_settings};
use subtitle_extract::{ContentSceneDetector, ExtractionOutcome, Extractor};

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIGURATION: u8 = 2;

fn print_available_backends() {
    let names = available_backend_names();
    if names.is_empty() {
        println!("available backends: (none compiled)");
    } else {
        println!("available backends: {}", names.join(", "));
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (cli, sources) = parse_cli();
    if cli.list_backends {
        print_available_backends();
        return ExitCode::SUCCESS;
    }

    let settings = match resolve_settings(&cli, &sources) {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };
    if let Some(path) = settings.config_path.as_ref() {
        log::info!("using config file {}", path.display());
    }

    let decoder = match decoder_configuration(&settings) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    let Some(input) = resolve_input(cli.input.clone(), &decoder).map(expand_pathbuf) else {
        eprintln!("usage: subtitle-extract [OPTIONS] --roi TOP,BOTTOM,LEFT,RIGHT <INPUT>");
        print_available_backends();
        return ExitCode::from(EXIT_CONFIGURATION);
    };

    let extractor = Extractor::new(
        ContentSceneDetector::new(settings.scene),
        settings.change_threshold,
    )
    .with_progress(true);

    match extractor.run_with_decoder(&input, settings.roi, decoder).await {
        Ok(ExtractionOutcome::Completed(summary)) => {
            if summary.truncated_scenes > 0 {
                log::warn!(
                    "{} of {} scenes were cut short by decode errors",
                    summary.truncated_scenes,
                    summary.scenes
                );
            }
            println!(
                "saved {} subtitle images from {} scenes to {}",
                summary.images_saved,
                summary.scenes,
                summary.output_dir.display()
            );
            ExitCode::SUCCESS
        }
        Ok(ExtractionOutcome::NoScenes { output_dir }) => {
            println!(
                "no scenes detected; nothing to extract ({} cleared)",
                output_dir.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            if err.is_configuration() {
                ExitCode::from(EXIT_CONFIGURATION)
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}
