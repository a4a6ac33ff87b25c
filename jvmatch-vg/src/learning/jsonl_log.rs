// Learning Log: JSON-lines sink
//
// One entry per line. Each append opens the file in append mode and issues a
// single write of the full line, so concurrent appenders interleave whole
// lines. A torn trailing line (crash mid-write) is skipped on read, and the
// next append starts on a fresh line instead of extending it.

use super::{LearningEntry, LearningSink};
use async_trait::async_trait;
use jvmatch_common::Result;
use std::path::{Path, PathBuf};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Append one serialized record plus newline to a JSON-lines file
///
/// If the file does not end in a newline (a torn previous write), the line is
/// prefixed with one so the new record never merges into the garbage. The
/// prefix and record go out in a single `write_all`.
pub(crate) async fn append_json_line(path: &Path, record: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .await?;

    let mut line = Vec::with_capacity(record.len() + 2);
    if file.metadata().await?.len() > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1)).await?;
        file.read_exact(&mut last).await?;
        if last[0] != b'\n' {
            warn!(path = %path.display(), "Unterminated trailing line, starting a new one");
            line.push(b'\n');
        }
    }
    line.extend_from_slice(record);
    line.push(b'\n');

    // O_APPEND: the write lands at end of file whatever the read position
    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}

/// Append-only JSON-lines learning log
#[derive(Debug, Clone)]
pub struct JsonlLearningLog {
    path: PathBuf,
}

impl JsonlLearningLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LearningSink for JsonlLearningLog {
    async fn append(&self, entry: &LearningEntry) -> Result<()> {
        let record = serde_json::to_vec(entry)?;
        append_json_line(&self.path, &record).await?;

        debug!(id = %entry.id, path = %self.path.display(), "Appended learning entry");
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<LearningEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LearningEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping unreadable learning log line"
                ),
            }
        }
        Ok(entries)
    }
}
