// src/output/sink.rs
use crate::error::{ErrorContext, Result};
use crate::output::index::file_name;
use crate::types::{OutputConfig, ScanError};
use log::{debug, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::mem;
use std::path::PathBuf;

struct OpenFile {
    path: PathBuf,
    file: File,
    created: bool,
    records: u64,
}

enum SinkState {
    Closed,
    Open(OpenFile),
}

/// Append-only NDJSON writer that moves on to `<base>-<index+1>.<ext>`
/// once the current file has grown past the size limit.
pub struct RotatingSink {
    dir: PathBuf,
    base_name: String,
    extension: String,
    size_limit: u64,
    current_index: u64,
    state: SinkState,
}

impl RotatingSink {
    pub fn open(
        dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        extension: impl Into<String>,
        start_index: u64,
        size_limit: u64,
    ) -> Result<Self> {
        let mut sink = Self {
            dir: dir.into(),
            base_name: base_name.into(),
            extension: extension.into(),
            size_limit,
            current_index: start_index.max(1),
            state: SinkState::Closed,
        };
        sink.state = SinkState::Open(sink.open_current()?);
        Ok(sink)
    }

    pub fn from_config(config: &OutputConfig, start_index: u64) -> Result<Self> {
        Self::open(
            config.dir.clone(),
            config.base_name.clone(),
            config.extension.clone(),
            start_index,
            config.size_limit,
        )
    }

    pub fn current_index(&self) -> u64 {
        self.current_index
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SinkState::Open(_))
    }

    /// Appends one record plus a newline, rotating first if the current file
    /// is already over the limit.
    pub fn write(&mut self, record: &[u8]) -> Result<()> {
        let size = match &self.state {
            SinkState::Open(open) => open
                .file
                .metadata()
                .with_context(|| format!("failed to stat {}", open.path.display()))?
                .len(),
            SinkState::Closed => return Err(closed_error()),
        };

        if size > self.size_limit {
            self.rotate()?;
        }

        let open = match &mut self.state {
            SinkState::Open(open) => open,
            SinkState::Closed => return Err(closed_error()),
        };

        let mut line = Vec::with_capacity(record.len() + 1);
        line.extend_from_slice(record);
        line.push(b'\n');
        open.file
            .write_all(&line)
            .with_context(|| format!("failed to write to {}", open.path.display()))?;
        open.records += 1;

        Ok(())
    }

    /// Flushes and releases the current file. Calling it twice is fine.
    pub fn close(&mut self) -> Result<()> {
        if let SinkState::Open(mut open) = mem::replace(&mut self.state, SinkState::Closed) {
            open.file
                .flush()
                .with_context(|| format!("failed to flush {}", open.path.display()))?;
            debug!("Closed {} after {} records", open.path.display(), open.records);
        }
        Ok(())
    }

    /// Closes and deletes the current file if this sink created it and
    /// nothing was written to it yet.
    pub fn discard_if_unused(&mut self) -> Result<bool> {
        let unused = matches!(
            &self.state,
            SinkState::Open(open) if open.created && open.records == 0
        );
        if !unused {
            return Ok(false);
        }

        if let SinkState::Open(open) = mem::replace(&mut self.state, SinkState::Closed) {
            let OpenFile { path, file, .. } = open;
            drop(file);
            fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
            info!("Removed unused output file {}", path.display());
        }
        Ok(true)
    }

    fn rotate(&mut self) -> Result<()> {
        let next_index = self.current_index.checked_add(1).ok_or_else(|| ScanError::Filesystem {
            context: format!("cannot rotate past index {}", self.current_index),
            source: io::Error::new(io::ErrorKind::InvalidInput, "output index overflow"),
        })?;
        self.close()?;
        self.current_index = next_index;
        let next = self.open_current()?;
        info!("Rotated output to {}", next.path.display());
        self.state = SinkState::Open(next);
        Ok(())
    }

    fn open_current(&self) -> Result<OpenFile> {
        let path = self
            .dir
            .join(file_name(&self.base_name, &self.extension, self.current_index));

        let (file, created) = match OpenOptions::new().append(true).create_new(true).open(&path) {
            Ok(file) => (file, true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!("Output file {} already exists, appending to it", path.display());
                let file = OpenOptions::new()
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                (file, false)
            }
            Err(e) => {
                return Err(ScanError::Filesystem {
                    context: format!("failed to create {}", path.display()),
                    source: e,
                })
            }
        };

        Ok(OpenFile { path, file, created, records: 0 })
    }
}

impl Drop for RotatingSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close output file: {}", e);
        }
    }
}

fn closed_error() -> ScanError {
    ScanError::Filesystem {
        context: "output sink is closed".to_string(),
        source: io::Error::new(io::ErrorKind::BrokenPipe, "no open output file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn test_open_creates_start_file() {
        let dir = tempdir().unwrap();
        let sink = RotatingSink::open(dir.path(), "whois", "json", 4, 100).unwrap();

        assert!(sink.is_open());
        assert_eq!(sink.current_index(), 4);
        assert!(dir.path().join("whois-4.json").exists());
    }

    #[test]
    fn test_records_are_newline_terminated() {
        let dir = tempdir().unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", 1, 1024).unwrap();
        sink.write(br#"{"a":1}"#).unwrap();
        sink.write(br#"{"b":2}"#).unwrap();
        sink.close().unwrap();

        assert_eq!(read(dir.path(), "whois-1.json"), "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn test_rotates_once_size_exceeds_limit() {
        let dir = tempdir().unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", 1, 10).unwrap();

        // 8 bytes + newline = 9, not over the limit yet
        sink.write(b"aaaaaaaa").unwrap();
        // file is 9 bytes, still appended; pushes it to 18
        sink.write(b"bbbbbbbb").unwrap();
        assert_eq!(sink.current_index(), 1);
        // 18 > 10 so this one lands in the next file
        sink.write(b"cccccccc").unwrap();
        assert_eq!(sink.current_index(), 2);
        sink.close().unwrap();

        assert_eq!(read(dir.path(), "whois-1.json"), "aaaaaaaa\nbbbbbbbb\n");
        assert_eq!(read(dir.path(), "whois-2.json"), "cccccccc\n");
    }

    #[test]
    fn test_size_exactly_at_limit_does_not_rotate() {
        let dir = tempdir().unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", 1, 4).unwrap();
        sink.write(b"abc").unwrap();
        sink.write(b"d").unwrap();

        assert_eq!(sink.current_index(), 1);
    }

    #[test]
    fn test_oversized_record_is_never_split() {
        let dir = tempdir().unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", 1, 5).unwrap();
        let big = vec![b'x'; 64];
        sink.write(&big).unwrap();
        sink.write(&big).unwrap();
        sink.close().unwrap();

        assert_eq!(read(dir.path(), "whois-1.json").len(), 65);
        assert_eq!(read(dir.path(), "whois-2.json").len(), 65);
    }

    #[test]
    fn test_rotation_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("whois-2.json"), "old\n").unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", 1, 0).unwrap();
        sink.write(b"one").unwrap();
        sink.write(b"two").unwrap();
        sink.close().unwrap();

        assert_eq!(read(dir.path(), "whois-2.json"), "old\ntwo\n");
    }

    #[test]
    fn test_discard_removes_fresh_empty_file() {
        let dir = tempdir().unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", 3, 100).unwrap();

        assert!(sink.discard_if_unused().unwrap());
        assert!(!sink.is_open());
        assert!(!dir.path().join("whois-3.json").exists());
    }

    #[test]
    fn test_discard_keeps_written_file() {
        let dir = tempdir().unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", 1, 100).unwrap();
        sink.write(b"{}").unwrap();

        assert!(!sink.discard_if_unused().unwrap());
        sink.close().unwrap();
        assert_eq!(read(dir.path(), "whois-1.json"), "{}\n");
    }

    #[test]
    fn test_discard_keeps_preexisting_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("whois-1.json"), "").unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", 1, 100).unwrap();

        assert!(!sink.discard_if_unused().unwrap());
        assert!(dir.path().join("whois-1.json").exists());
    }

    #[test]
    fn test_rotation_past_last_index_fails_cleanly() {
        let dir = tempdir().unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", u64::MAX, 0).unwrap();
        sink.write(b"one").unwrap();

        let err = sink.write(b"two").unwrap_err();
        assert!(matches!(err, ScanError::Filesystem { .. }));
        assert_eq!(sink.current_index(), u64::MAX);
        sink.close().unwrap();
        assert_eq!(read(dir.path(), &file_name("whois", "json", u64::MAX)), "one\n");
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let mut sink = RotatingSink::open(dir.path(), "whois", "json", 1, 100).unwrap();
        sink.close().unwrap();
        sink.close().unwrap();

        assert!(matches!(sink.write(b"{}"), Err(ScanError::Filesystem { .. })));
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let result = RotatingSink::open(dir.path().join("missing"), "whois", "json", 1, 100);

        assert!(matches!(result, Err(ScanError::Filesystem { .. })));
    }
}
