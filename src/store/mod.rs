use crate::entry::parser::LineFilter;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOG_FILENAME: &str = "active.log";
pub const WORKING_FILENAME: &str = "intermediate.log";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Fixed view of the log file taken at the start of a run.
///
/// `lines` holds only the filter-matching lines; `boundary` is the byte
/// length of the consumed prefix. Anything the producer appends past the
/// boundary belongs to the next run and must survive the rewrite untouched.
#[derive(Debug)]
pub struct Snapshot {
    pub lines: Vec<String>,
    boundary: u64,
}

impl Snapshot {
    pub fn boundary(&self) -> u64 {
        self.boundary
    }
}

/// Owns the durable log file and its rewrite protocol.
///
/// The producer treats the file as append-only; this store is the only
/// writer that ever truncates it. `commit` takes `&mut self`, so holding the
/// store exclusively keeps runs single-flight.
#[derive(Debug)]
pub struct LogStore {
    log_path: PathBuf,
    working_path: PathBuf,
    filter: LineFilter,
}

impl LogStore {
    pub fn new(dir: impl AsRef<Path>, filter: LineFilter) -> Self {
        let dir = dir.as_ref();
        Self {
            log_path: dir.join(LOG_FILENAME),
            working_path: dir.join(WORKING_FILENAME),
            filter,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Read the live file and keep the filter-matching lines.
    ///
    /// A missing file or zero matching lines is a no-op run, not an error.
    /// The boundary stops at the last complete line; a partial trailing line
    /// from a mid-append producer is left for the next run.
    pub fn snapshot(&self) -> Result<Option<Snapshot>, StoreError> {
        let content = match fs::read(&self.log_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let boundary = match content.iter().rposition(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None => return Ok(None),
        };

        let prefix = String::from_utf8_lossy(&content[..boundary]);
        let lines: Vec<String> = prefix
            .lines()
            .filter(|line| !line.is_empty() && self.filter.matches(line))
            .map(str::to_string)
            .collect();

        if lines.is_empty() {
            return Ok(None);
        }

        Ok(Some(Snapshot {
            lines,
            boundary: boundary as u64,
        }))
    }

    /// Cut the consumed prefix and reseed the file with the pending lines.
    ///
    /// The file is re-read so that lines appended after the snapshot boundary
    /// are carried over verbatim, after the pending lines (pending entries
    /// all come from the prefix, so this keeps chronological order). The new
    /// content is written to the working file and renamed over the live file;
    /// a failure before the rename leaves the live file untouched.
    pub fn commit(&mut self, snapshot: &Snapshot, pending_lines: &[String]) -> Result<(), StoreError> {
        let content = match fs::read(&self.log_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let split = (snapshot.boundary as usize).min(content.len());
        let tail = &content[split..];

        let mut working = fs::File::create(&self.working_path)?;
        for line in pending_lines {
            working.write_all(line.as_bytes())?;
            working.write_all(b"\n")?;
        }
        working.write_all(tail)?;
        working.sync_all()?;

        fs::rename(&self.working_path, &self.log_path)?;
        Ok(())
    }
}
