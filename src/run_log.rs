use log::{error, info};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::sampler::SessionRecord;

pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

/// Moves `path` aside to `<name>.old` once it reaches `MAX_LOG_SIZE`.
pub fn rotate_file(path: &Path) {
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.len() >= MAX_LOG_SIZE {
            let old = path.with_extension("old");
            if let Err(e) = std::fs::rename(path, &old) {
                error!("Failed to rotate {}: {}", path.display(), e);
            }
        }
    }
}

/// Receives each finished quest.
pub trait RunSink {
    fn record_run(&mut self, record: &SessionRecord) -> Result<()>;
}

/// Appends one JSON record per finished quest.
pub struct JsonRunLog {
    path: PathBuf,
}

impl JsonRunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back, oldest first.
    pub fn load(&self) -> Result<Vec<SessionRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}

impl RunSink for JsonRunLog {
    fn record_run(&mut self, record: &SessionRecord) -> Result<()> {
        rotate_file(&self.path);
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        info!(
            "Recorded quest {} ({} entries) to {}",
            record.quest_id,
            record.entry_count(),
            self.path.display()
        );
        Ok(())
    }
}
