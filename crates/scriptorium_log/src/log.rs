//! The execution log and its durable sink.

use crate::entry::{LogEntry, LogRecord, Outcome};
use scriptorium_core::{RunId, StageId, Timestamp};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Log error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// IO error on the durable sink
    #[error("Log IO error: {reason}")]
    Io {
        /// Underlying error rendered as text
        reason: String,
    },

    /// A sink line could not be decoded
    #[error("Malformed log record at line {line}: {reason}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// Decode failure rendered as text
        reason: String,
    },
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

/// Append-only execution log for one run
///
/// Entries accumulate in memory in chronological order. With a sink
/// attached, a `StageStarted` record is written when a stage starts and a
/// `StageFinished` record when it finishes, each flushed immediately so
/// the on-disk log is complete up to the last appended record.
#[derive(Debug)]
pub struct ExecutionLog {
    run_id: RunId,
    entries: Vec<LogEntry>,
    sink: Option<Sink>,
}

impl ExecutionLog {
    /// Create an in-memory log for a run
    #[must_use]
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            entries: Vec::new(),
            sink: None,
        }
    }

    /// Create a log with a durable sink at `path`
    ///
    /// Records are appended; an existing file from an earlier run is
    /// extended, preserving overall chronological order.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink file cannot be opened.
    pub fn with_sink(run_id: RunId, path: impl Into<PathBuf>) -> Result<Self, LogError> {
        let sink = Sink::open(path.into())?;
        Ok(Self {
            run_id,
            entries: Vec::new(),
            sink: Some(sink),
        })
    }

    /// Run the log belongs to
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Record a stage entering `Running`; returns the recorded start time
    ///
    /// # Errors
    ///
    /// Returns an error if the sink append fails.
    pub fn stage_started(&mut self, stage_id: &StageId) -> Result<Timestamp, LogError> {
        let at = Timestamp::now();
        if let Some(sink) = &mut self.sink {
            sink.append(&LogRecord::StageStarted {
                run_id: self.run_id,
                stage_id: stage_id.clone(),
                at,
            })?;
        }
        Ok(at)
    }

    /// Record a stage reaching a terminal state
    ///
    /// # Errors
    ///
    /// Returns an error if the sink append fails.
    pub fn stage_finished(
        &mut self,
        stage_id: &StageId,
        started_at: Timestamp,
        outcome: Outcome,
    ) -> Result<&LogEntry, LogError> {
        let entry = LogEntry {
            run_id: self.run_id,
            stage_id: stage_id.clone(),
            started_at,
            finished_at: Timestamp::now(),
            outcome,
        };
        if let Some(sink) = &mut self.sink {
            sink.append(&LogRecord::StageFinished(entry.clone()))?;
        }
        self.entries.push(entry);
        Ok(self.entries.last().expect("entry just pushed"))
    }

    /// Completed entries in chronological order
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of completed entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no stage has finished yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the log, yielding its entries
    #[must_use]
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// Durable line-oriented sink: one JSON record per line, flushed per append
#[derive(Debug)]
struct Sink {
    file: File,
}

impl Sink {
    fn open(path: PathBuf) -> Result<Self, LogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { file })
    }

    fn append(&mut self, record: &LogRecord) -> Result<(), LogError> {
        let line = serde_json::to_string(record).map_err(|e| LogError::Io {
            reason: e.to_string(),
        })?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        Ok(())
    }
}

/// Read all records from a sink file, in append order
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line cannot be
/// decoded.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<LogRecord>, LogError> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: LogRecord =
            serde_json::from_str(&line).map_err(|e| LogError::Malformed {
                line: idx + 1,
                reason: e.to_string(),
            })?;
        records.push(record);
    }
    Ok(records)
}
