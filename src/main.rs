// Entrypoint for the CLI application.
// - Parses flags and validates them before touching the map file.
// - Opens the map file once and hands it to the sync controller.
// - In watch mode, blocks until the notification stream closes.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use upmap::config::{Cli, FileConfig, Settings};
use upmap::ui::Reporter;
use upmap::{FileWatch, Mode, SyncController, UploadClient, WatchedFile};

fn main() -> ExitCode {
    let cli = Cli::parse();
    upmap::logging::init(cli.verbose);

    let config_path = cli.config.clone();
    let settings = match FileConfig::load(config_path.as_deref())
        .and_then(|file_config| Settings::resolve(cli, file_config))
    {
        Ok(settings) => settings,
        Err(err) => {
            Reporter::new(false).usage_error(&err);
            return ExitCode::FAILURE;
        }
    };

    let reporter = Reporter::new(settings.silent);
    match run(settings, reporter) {
        Ok(code) => code,
        Err(err) => {
            reporter.error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(settings: Settings, reporter: Reporter) -> Result<ExitCode> {
    let file = WatchedFile::open(&settings.file)
        .with_context(|| format!("failed to open {}", settings.file.display()))?;
    let client = UploadClient::new(settings.request_builder)?;
    let mut controller = SyncController::new(file, settings.target, client, reporter);

    match settings.mode {
        // The cycle has already reported its own failure.
        Mode::Immediate => match controller.run_immediate() {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(_) => Ok(ExitCode::FAILURE),
        },
        Mode::Watch => {
            let mut watch = FileWatch::register(&settings.file)?;
            controller.run_watch(&mut watch);
            Ok(ExitCode::SUCCESS)
        }
    }
}
