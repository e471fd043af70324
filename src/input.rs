// src/input.rs
use crate::error::{ErrorContext, Result};
use crate::types::ScanError;
use crate::utils::is_valid_domain;
use log::warn;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Lazy, single-pass reader over the domain list.
pub struct DomainSource {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    skip_blank_lines: bool,
    line_no: u64,
}

impl DomainSource {
    /// Opens the domain list. A zero-length file is rejected up front.
    pub fn open(path: impl AsRef<Path>, skip_blank_lines: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ScanError::NotFound(path)),
            Err(e) => {
                return Err(ScanError::Filesystem {
                    context: format!("failed to stat domain file {}", path.display()),
                    source: e,
                })
            }
        };
        if metadata.len() == 0 {
            return Err(ScanError::EmptyInput(path));
        }

        let file = File::open(&path)
            .with_context(|| format!("failed to open domain file {}", path.display()))?;

        Ok(Self {
            path,
            reader: BufReader::new(file),
            buf: Vec::new(),
            skip_blank_lines,
            line_no: 0,
        })
    }

    /// Number of lines consumed so far.
    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    /// Next trimmed line, or `None` once the file is exhausted.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD and the line
    /// is still returned.
    pub fn next_domain(&mut self) -> Result<Option<String>> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'\n', &mut self.buf).with_context(|| {
                format!("failed to read line {} of {}", self.line_no + 1, self.path.display())
            })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = String::from_utf8_lossy(&self.buf);
            if let Cow::Owned(_) = line {
                warn!(
                    "Line {} of {} is not valid UTF-8, invalid bytes replaced",
                    self.line_no,
                    self.path.display()
                );
            }

            let domain = line.trim();
            if domain.is_empty() {
                if self.skip_blank_lines {
                    continue;
                }
                warn!("Line {} of {} is blank", self.line_no, self.path.display());
            } else if !is_valid_domain(domain) {
                warn!("Line {} does not look like a domain name: {:?}", self.line_no, domain);
            }

            return Ok(Some(domain.to_string()));
        }
    }
}

impl Iterator for DomainSource {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_domain().transpose()
    }
}
