use thiserror::Error;

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

/// Failures that abort a whole tick or a whole operation. Per-quantity read
/// failures never surface here; they become `None` fields on the snapshot.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
    #[error("no address configured for required field `{0}`")]
    Unmapped(&'static str),
    #[error("process `{0}` not found")]
    ProcessNotFound(String),
    #[error("not attached to a process")]
    Detached,
    #[error("replay finished after {0} snapshots")]
    ReplayFinished(usize),
}
