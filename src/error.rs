// Error taxonomy shared by the library and the binary.
//
// `ConfigError` and `WatchError` are startup errors: the binary reports
// them and exits. `SyncError` is local to a single sync cycle and never
// stops the watch loop.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Outcome of one sync cycle: `Ok(())` on success, the failure reason otherwise.
pub type SyncResult = Result<(), SyncError>;

/// Missing or invalid startup parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file is required")]
    MissingFile,
    #[error("id is required")]
    MissingId,
    #[error("space is required")]
    MissingSpace,
    #[error("space must be a bare cookie value (no spaces, quotes, commas, semicolons or backslashes)")]
    InvalidSpace,
    #[error("invalid endpoint {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to read config {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of a single read-build-send cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The map file could not be read in full.
    #[error("{0}")]
    Io(#[from] io::Error),
    /// The multipart request could not be assembled.
    #[error("failed to build upload request: {0}")]
    Encoding(#[from] EncodingError),
    /// The remote endpoint could not be reached.
    #[error("{0}")]
    Network(#[source] reqwest::Error),
    /// The remote endpoint answered with something other than 200.
    #[error("unexpected status: {code}: {reason}")]
    Remote { code: u16, reason: String },
}

impl SyncError {
    /// HTTP status code for `Remote` failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SyncError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Why an upload request could not be built.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error(transparent)]
    Form(reqwest::Error),
    #[error("session cookie was not accepted for {url}")]
    SessionCookie { url: String },
}

/// The change-notification service could not be set up.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create watcher: {0}")]
    Create(#[source] notify::Error),
    #[error("failed to watch {}: {source}", .path.display())]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_message_carries_code_and_reason() {
        let err = SyncError::Remote {
            code: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "unexpected status: 404: Not Found");
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn usage_errors_match_flag_names() {
        assert_eq!(ConfigError::MissingFile.to_string(), "file is required");
        assert_eq!(ConfigError::MissingId.to_string(), "id is required");
        assert_eq!(ConfigError::MissingSpace.to_string(), "space is required");
    }

    #[test]
    fn io_errors_have_no_status() {
        let err = SyncError::from(io::Error::new(io::ErrorKind::Other, "disk gone"));
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "disk gone");
    }
}
