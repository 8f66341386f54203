// Sync controller: owns the map file, decides when a sync cycle runs and
// reports each outcome. Cycles never overlap; the next notification is only
// taken once the previous cycle has returned.

use tracing::{debug, info, warn};

use crate::api::{SyncTarget, Uploader};
use crate::error::{SyncError, SyncResult};
use crate::payload::WatchedFile;
use crate::ui::Reporter;
use crate::watch::{NotificationOutcome, NotificationSource};

/// How the controller decides to start cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Exactly one cycle, then stop.
    Immediate,
    /// One cycle per write notification until the source closes.
    Watch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Syncing,
    Terminated,
}

pub struct SyncController<U> {
    file: WatchedFile,
    target: SyncTarget,
    uploader: U,
    reporter: Reporter,
    state: ControllerState,
    cycles: u64,
}

impl<U: Uploader> SyncController<U> {
    pub fn new(file: WatchedFile, target: SyncTarget, uploader: U, reporter: Reporter) -> Self {
        Self {
            file,
            target,
            uploader,
            reporter,
            state: ControllerState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Read, build and send once. The result is reported before returning.
    pub fn sync_once(&mut self) -> SyncResult {
        self.state = ControllerState::Syncing;
        self.cycles += 1;
        let cycle = self.cycles;
        info!(cycle, path = %self.file.path().display(), "Starting sync cycle");

        let progress = self.reporter.start_cycle();
        let result = self
            .file
            .read()
            .map_err(SyncError::from)
            .and_then(|payload| self.uploader.upload(&self.target, payload));
        self.reporter.finish_cycle(progress, &result);

        match &result {
            Ok(()) => info!(cycle, "Map uploaded"),
            Err(err) => warn!(cycle, error = %err, "Sync cycle failed"),
        }
        self.state = ControllerState::Idle;
        result
    }

    /// Immediate mode: one cycle, then `Terminated`.
    pub fn run_immediate(&mut self) -> SyncResult {
        let result = self.sync_once();
        self.state = ControllerState::Terminated;
        result
    }

    /// Watch mode: blocks on `source` and runs one cycle per write until the
    /// source closes. Cycle failures and watcher errors are reported and the
    /// loop keeps going.
    pub fn run_watch(&mut self, source: &mut impl NotificationSource) {
        loop {
            self.state = ControllerState::Idle;
            match source.next_outcome() {
                NotificationOutcome::Write => {
                    // Already reported; wait for the next write.
                    let _ = self.sync_once();
                }
                NotificationOutcome::Other => debug!("Ignoring non-write notification"),
                NotificationOutcome::WatchFailure(err) => {
                    warn!(error = %err, "Watcher error");
                    self.reporter.watch_error(&err);
                }
                NotificationOutcome::Closed => {
                    info!(cycles = self.cycles, "Notification stream closed");
                    break;
                }
            }
        }
        self.state = ControllerState::Terminated;
    }
}
