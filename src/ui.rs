// UI layer: operator-facing progress and error text. Progress is an
// `indicatif` spinner that `--silent` hides; errors are always printed to
// stderr with a styled prefix.

use std::fmt::Display;
use std::time::Duration;

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::SyncResult;

/// Console reporting for sync cycles and watch errors.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    silent: bool,
}

/// Spinner for a cycle in flight.
pub struct CycleProgress {
    spinner: ProgressBar,
}

impl Reporter {
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }

    pub fn start_cycle(&self) -> CycleProgress {
        if self.silent {
            return CycleProgress {
                spinner: ProgressBar::hidden(),
            };
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("updating...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        CycleProgress { spinner }
    }

    pub fn finish_cycle(&self, progress: CycleProgress, result: &SyncResult) {
        match result {
            Ok(()) => progress.spinner.finish_with_message("updated"),
            Err(err) => {
                progress.spinner.finish_and_clear();
                self.error(err);
            }
        }
    }

    pub fn error(&self, err: &dyn Display) {
        eprintln!("{} {}", "upmap: error:".red().bold(), err);
    }

    pub fn usage_error(&self, err: &dyn Display) {
        eprintln!("{} {}", "upmap: usage error:".red().bold(), err);
    }

    pub fn watch_error(&self, err: &dyn Display) {
        eprintln!("{} {}", "upmap: watch error:".yellow().bold(), err);
    }
}
