// Change notifications for the map file. Wraps the `notify` crate so the
// sync loop only sees a `NotificationOutcome`: a content write, some other
// change, a transient watcher error, or the end of the notification stream.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info};

use crate::error::WatchError;

/// What the sync loop should do with the next notification.
#[derive(Debug)]
pub enum NotificationOutcome {
    /// File contents were written.
    Write,
    /// Any other change (metadata, access, rename...). Ignored.
    Other,
    /// The notification stream ended.
    Closed,
    /// The watcher reported an error; the stream is still open.
    WatchFailure(notify::Error),
}

/// Blocking source of notifications for a single path.
pub trait NotificationSource {
    /// Blocks until the next notification is available.
    fn next_outcome(&mut self) -> NotificationOutcome;
}

/// Maps a raw `notify` event onto write / other.
pub fn classify(event: &Event) -> NotificationOutcome {
    match event.kind {
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            NotificationOutcome::Write
        }
        _ => NotificationOutcome::Other,
    }
}

impl NotificationSource for Receiver<notify::Result<Event>> {
    fn next_outcome(&mut self) -> NotificationOutcome {
        match self.recv() {
            Ok(Ok(event)) => {
                let outcome = classify(&event);
                debug!(kind = ?event.kind, ?outcome, "Received notification");
                outcome
            }
            Ok(Err(err)) => NotificationOutcome::WatchFailure(err),
            Err(_) => NotificationOutcome::Closed,
        }
    }
}

/// OS-level watch on one file. Dropping it stops the watch.
pub struct FileWatch {
    // Held only to keep the registration alive.
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    path: PathBuf,
}

impl FileWatch {
    pub fn register(path: impl AsRef<Path>) -> Result<Self, WatchError> {
        let path = path.as_ref().to_path_buf();
        let (tx, events) = mpsc::channel();

        let mut watcher =
            RecommendedWatcher::new(tx, notify::Config::default()).map_err(WatchError::Create)?;
        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Register {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), "Watching map file");
        Ok(Self {
            _watcher: watcher,
            events,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationSource for FileWatch {
    fn next_outcome(&mut self) -> NotificationOutcome {
        self.events.next_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind};
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn content_writes_are_writes() {
        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)));
        assert!(matches!(classify(&event), NotificationOutcome::Write));

        let event = Event::new(EventKind::Modify(ModifyKind::Any));
        assert!(matches!(classify(&event), NotificationOutcome::Write));
    }

    #[test]
    fn metadata_and_access_are_other() {
        let perms = Event::new(EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions,
        )));
        assert!(matches!(classify(&perms), NotificationOutcome::Other));

        let access = Event::new(EventKind::Access(AccessKind::Any));
        assert!(matches!(classify(&access), NotificationOutcome::Other));

        let create = Event::new(EventKind::Create(CreateKind::File));
        assert!(matches!(classify(&create), NotificationOutcome::Other));
    }

    #[test]
    fn channel_reports_errors_then_closes() {
        let (tx, mut rx) = mpsc::channel::<notify::Result<Event>>();
        tx.send(Err(notify::Error::generic("inotify overflow"))).unwrap();
        tx.send(Ok(Event::new(EventKind::Modify(ModifyKind::Any))))
            .unwrap();
        drop(tx);

        assert!(matches!(
            rx.next_outcome(),
            NotificationOutcome::WatchFailure(_)
        ));
        assert!(matches!(rx.next_outcome(), NotificationOutcome::Write));
        assert!(matches!(rx.next_outcome(), NotificationOutcome::Closed));
    }

    #[test]
    fn registering_a_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileWatch::register(dir.path().join("missing.pmap"))
            .err()
            .unwrap();
        assert!(matches!(err, WatchError::Register { .. }));
    }

    #[test]
    fn appending_to_watched_file_yields_write() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let watch = FileWatch::register(tmp.path()).unwrap();

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(tmp.path())
            .unwrap();
        file.write_all(b"new tiles").unwrap();
        file.sync_all().unwrap();

        // Some backends emit access or metadata events around the write;
        // skip a bounded number of them, never block forever.
        let mut saw_write = false;
        for _ in 0..16 {
            match watch.events.recv_timeout(Duration::from_secs(5)) {
                Ok(Ok(event)) => {
                    if matches!(classify(&event), NotificationOutcome::Write) {
                        saw_write = true;
                        break;
                    }
                }
                Ok(Err(err)) => panic!("watcher error: {err}"),
                Err(err) => panic!("no write notification: {err}"),
            }
        }
        assert!(saw_write);
    }

    #[test]
    fn registers_existing_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let watch = FileWatch::register(tmp.path()).unwrap();
        assert_eq!(watch.path(), tmp.path());
    }
}
