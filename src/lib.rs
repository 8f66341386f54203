// Library root
// -----------
// `upmap` keeps a map on its game page in sync with a local file: every
// time the file is written (or once, with `--now`) its contents are
// uploaded to the hosting service under the caller's session cookie.
//
// Module responsibilities:
// - `payload`: the watched map file and reading it into memory.
// - `api`: building the multipart upload request and sending it.
// - `watch`: file change notifications, reduced to write / other / closed.
// - `sync`: the controller that runs one cycle per trigger.
// - `config`: command-line flags, config file, and validation.
// - `ui`: operator-facing progress and error text.
// - `logging`: tracing subscriber setup.
// - `error`: error types shared by all of the above.
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod payload;
pub mod sync;
pub mod ui;
pub mod watch;

pub use api::{SyncTarget, UploadClient, UploadRequestBuilder, Uploader};
pub use error::{ConfigError, EncodingError, SyncError, SyncResult, WatchError};
pub use payload::{Payload, WatchedFile};
pub use sync::{ControllerState, Mode, SyncController};
pub use watch::{FileWatch, NotificationOutcome, NotificationSource};
