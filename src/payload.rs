// Map file access: one read-only handle opened at startup and rewound for
// every sync cycle.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

/// The map file contents captured at the start of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reads everything from the start of `handle`.
///
/// `expected_len` is the length the source reported before reading; getting
/// fewer bytes back (e.g. the file was truncated mid-read) is an error.
pub fn read_payload<R: Read + Seek>(handle: &mut R, expected_len: u64) -> io::Result<Payload> {
    handle.seek(SeekFrom::Start(0))?;

    let mut bytes = Vec::with_capacity(expected_len as usize);
    handle.read_to_end(&mut bytes)?;

    if (bytes.len() as u64) < expected_len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short read: got {} of {} bytes", bytes.len(), expected_len),
        ));
    }

    Ok(Payload::new(bytes))
}

/// The watched map file. Never written to.
#[derive(Debug)]
pub struct WatchedFile {
    path: PathBuf,
    file: File,
}

impl WatchedFile {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Captures the current contents of the file.
    pub fn read(&mut self) -> io::Result<Payload> {
        let expected_len = self.file.metadata()?.len();
        let payload = read_payload(&mut self.file, expected_len)?;
        debug!(path = %self.path.display(), bytes = payload.len(), "Read map file");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn reads_whole_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"\x00pmap\xffdata").unwrap();

        let mut watched = WatchedFile::open(tmp.path()).unwrap();
        let payload = watched.read().unwrap();

        assert_eq!(payload.as_bytes(), b"\x00pmap\xffdata");
    }

    #[test]
    fn rereads_latest_contents_through_same_handle() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"first").unwrap();

        let mut watched = WatchedFile::open(tmp.path()).unwrap();
        assert_eq!(watched.read().unwrap().as_bytes(), b"first");

        std::fs::write(tmp.path(), b"second, longer").unwrap();
        assert_eq!(watched.read().unwrap().as_bytes(), b"second, longer");

        std::fs::write(tmp.path(), b"3rd").unwrap();
        assert_eq!(watched.read().unwrap().as_bytes(), b"3rd");
    }

    #[test]
    fn empty_file_yields_empty_payload() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut watched = WatchedFile::open(tmp.path()).unwrap();
        assert!(watched.read().unwrap().is_empty());
    }

    #[test]
    fn short_read_is_an_error() {
        let mut cursor = Cursor::new(b"abc".to_vec());
        let err = read_payload(&mut cursor, 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn rewinds_before_reading() {
        let mut cursor = Cursor::new(b"abcdef".to_vec());
        cursor.set_position(4);
        let payload = read_payload(&mut cursor, 6).unwrap();
        assert_eq!(payload.as_bytes(), b"abcdef");
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = WatchedFile::open(dir.path().join("nope.pmap")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
