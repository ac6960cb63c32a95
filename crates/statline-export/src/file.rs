//! Rotating JSONL file sink.
//!
//! Appends one JSON object per line. When the active file would cross
//! the size cap, it is rotated: `path` → `path.1`, shifting existing
//! backups up and letting the oldest fall off at `max_backups`.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use statline_model::MetricRecord;

use crate::sink::{Sink, SinkError, SinkResult};

/// Sink that appends record batches to a size-rotated JSONL file.
pub struct FileSink {
    name: String,
    path: PathBuf,
    max_size_bytes: u64,
    max_backups: u32,
    state: Mutex<WriterState>,
}

struct WriterState {
    /// `None` once the sink has been closed.
    writer: Option<BufWriter<File>>,
    /// Bytes written to the active file so far.
    written: u64,
}

impl FileSink {
    /// Open (or create) the active file, creating parent directories as
    /// needed. An unwritable path is fatal at construction.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        max_size_bytes: u64,
        max_backups: u32,
    ) -> SinkResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(SinkError::Config(
                "file sink requires a path".to_string(),
            ));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            name: name.into(),
            path,
            max_size_bytes: max_size_bytes.max(1),
            max_backups,
            state: Mutex::new(WriterState {
                writer: Some(BufWriter::new(file)),
                written,
            }),
        })
    }

    /// Rotate the active file into the backup chain and start a new one.
    /// `path.max_backups` is overwritten by the shift, so the oldest
    /// backup falls off without a separate pruning step.
    fn rotate(&self, state: &mut WriterState) -> SinkResult<()> {
        if let Some(mut writer) = state.writer.take() {
            writer.flush()?;
        }

        if self.max_backups == 0 {
            fs::remove_file(&self.path)?;
        } else {
            for index in (1..self.max_backups).rev() {
                let from = backup_path(&self.path, index);
                if from.exists() {
                    fs::rename(&from, backup_path(&self.path, index + 1))?;
                }
            }
            fs::rename(&self.path, backup_path(&self.path, 1))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        state.writer = Some(BufWriter::new(file));
        state.written = 0;
        debug!(sink = %self.name, path = %self.path.display(), "rotated metrics file");
        Ok(())
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn export(&self, records: &[MetricRecord]) -> SinkResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        for record in records {
            let mut line = serde_json::to_vec(record)?;
            line.push(b'\n');

            if state.written > 0 && state.written + line.len() as u64 > self.max_size_bytes {
                self.rotate(&mut state)?;
            }

            let writer = state
                .writer
                .as_mut()
                .ok_or_else(|| SinkError::Transport("file sink is closed".to_string()))?;
            writer.write_all(&line)?;
            state.written += line.len() as u64;
        }

        // Flush per batch so readers always see whole cycles.
        if let Some(writer) = state.writer.as_mut() {
            writer.flush()?;
        }

        debug!(
            sink = %self.name,
            records = records.len(),
            "exported metrics to file"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// Flush and drop the writer. Safe to call more than once.
    async fn close(&self) -> SinkResult<()> {
        let mut state = self.state.lock().await;
        if let Some(mut writer) = state.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(format!(".{index}"));
    PathBuf::from(os)
}
