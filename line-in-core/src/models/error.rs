use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while enumerating, opening, or recording from a line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineInError {
    #[error("audio format not supported by any capture line: {0}")]
    UnsupportedFormat(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no device found for input: {0}")]
    DeviceNotFound(String),

    #[error("line unavailable: {0}")]
    LineUnavailable(String),

    #[error("failed to spawn recording worker: {0}")]
    WorkerSpawnFailed(String),

    #[error("a recording is already in progress")]
    RecordingInProgress,

    #[error("session is closed")]
    SessionClosed,

    #[error("recording worker {worker} did not stop within {waited:?}")]
    StopTimeout { worker: String, waited: Duration },

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Broad classification of a [`LineInError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested format or configuration can never work.
    Configuration,
    /// The named device does not exist.
    Resolution,
    /// The device exists but could not be reserved.
    Resource,
    /// The operation is not valid in the session's current state.
    State,
    /// Something failed while a recording was running.
    Runtime,
}

impl LineInError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat(_) | Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::DeviceNotFound(_) => ErrorKind::Resolution,
            Self::LineUnavailable(_) | Self::WorkerSpawnFailed(_) => ErrorKind::Resource,
            Self::RecordingInProgress | Self::SessionClosed | Self::StopTimeout { .. } => {
                ErrorKind::State
            }
            Self::CaptureFailed(_) | Self::StorageError(_) => ErrorKind::Runtime,
        }
    }
}

impl From<std::io::Error> for LineInError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}
