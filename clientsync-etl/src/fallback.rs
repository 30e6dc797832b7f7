//! Local append-only event log, one file per topic.
//!
//! Every publication attempt lands here, whether or not the bus accepted it,
//! so the file is always a superset of what was sent. Lines are single JSON
//! objects; the file has no header or trailer and is never truncated.

use crate::config::validate_topic;
use crate::error::{EtlError, EtlResult};
use clientsync_types::TransformedRecord;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Result of reading the tail of a topic log.
#[derive(Debug, Default)]
pub struct TailReport {
    /// Number of non-empty lines in the file.
    pub total: usize,
    /// Decoded entries among the last `limit` lines, oldest first.
    pub entries: Vec<TransformedRecord>,
    /// Lines in the window that could not be decoded.
    pub skipped: usize,
}

/// Handle to the fallback-log directory.
#[derive(Debug, Clone)]
pub struct FallbackLog {
    dir: PathBuf,
}

impl FallbackLog {
    /// Creates a handle; the directory is created on first append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding the topic logs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the log file for a topic.
    pub fn path_for(&self, topic: &str) -> PathBuf {
        self.dir.join(format!("{topic}.log"))
    }

    /// Appends one encoded record as a single line.
    pub async fn append(&self, topic: &str, line: &str) -> EtlResult<()> {
        validate_topic(topic)?;
        if line.contains('\n') {
            return Err(EtlError::Config(
                "fallback entries must be single-line".to_string(),
            ));
        }

        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(topic);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        file.write_all(&buf).await?;
        file.flush().await?;

        debug!(path = %path.display(), "appended fallback entry");
        Ok(())
    }

    /// Reads the last `limit` entries of a topic log.
    ///
    /// A missing file is an empty log. Undecodable lines are skipped with a
    /// warning.
    pub async fn tail(&self, topic: &str, limit: usize) -> EtlResult<TailReport> {
        validate_topic(topic)?;
        let path = self.path_for(topic);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TailReport::default());
            }
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<(usize, &str)> = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| (i + 1, l))
            .collect();

        let total = lines.len();
        let window = &lines[total.saturating_sub(limit)..];

        let mut report = TailReport {
            total,
            ..Default::default()
        };
        for (line_no, line) in window {
            match TransformedRecord::from_json_line(line) {
                Ok(record) => report.entries.push(record),
                Err(e) => {
                    let err = EtlError::MalformedMessage {
                        line: *line_no,
                        reason: e.to_string(),
                    };
                    warn!(path = %path.display(), "{err}, skipping");
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }
}
