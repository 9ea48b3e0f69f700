//! Producers of raw event records.

use super::RawRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// The source itself could not be read. Fatal for the invocation using it.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open event log {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while reading the given line.
    #[error("failed to read event log at line {line}: {source}")]
    Read {
        line: u64,
        #[source]
        source: std::io::Error,
    },
}

/// A sequential producer of raw event records.
///
/// Sources are consumed once; to read a log again, open a new source.
#[async_trait]
pub trait EventSource: Send {
    /// Return the next record, or `None` once the source is exhausted.
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError>;
}

/// Reads a line-delimited event log from disk.
///
/// Blank and whitespace-only lines are skipped; line numbers in the
/// returned records still refer to the physical line in the file.
/// Bytes that are not valid UTF-8 are replaced with U+FFFD and handed on
/// like any other line, so the decoder rejects that record alone.
pub struct FileEventSource {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    line: u64,
}

impl FileEventSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await.map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;
        debug!(path = ?path, "Opened event log");
        Ok(Self {
            path,
            reader: BufReader::new(file),
            buf: Vec::new(),
            line: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSource for FileEventSource {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|source| SourceError::Read {
                    line: self.line + 1,
                    source,
                })?;
            if read == 0 {
                debug!(path = ?self.path, lines = self.line, "Event log exhausted");
                return Ok(None);
            }
            self.line += 1;

            let text = String::from_utf8_lossy(&self.buf);
            let text = text.trim_end_matches(['\n', '\r']);
            if text.trim().is_empty() {
                continue;
            }
            return Ok(Some(RawRecord::new(self.line, text)));
        }
    }
}

/// The single record carried by one inbound request.
pub struct SingleRecordSource {
    record: Option<String>,
}

impl SingleRecordSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            record: Some(text.into()),
        }
    }
}

#[async_trait]
impl EventSource for SingleRecordSource {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        Ok(self.record.take().map(|text| RawRecord::new(1, text)))
    }
}
