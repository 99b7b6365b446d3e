use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Divisor applied to a line's buffer size to get the callback chunk size.
pub const DEFAULT_CHUNK_DIVISOR: usize = 4;

/// How long `stop_recording` waits for the worker before giving up on it.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for a capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Upper bound on the wait for a worker to exit after it is interrupted
    /// (default: 10 seconds).
    pub stop_timeout: Duration,

    /// Callback chunks are `line buffer size / chunk_divisor` bytes (default: 4).
    pub chunk_divisor: usize,

    /// Bytes read per iteration when recording to a file, or None to use the
    /// same derivation as callback chunks.
    pub file_read_size: Option<usize>,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.stop_timeout.is_zero() {
            return Err("stop timeout must be positive".into());
        }
        if self.chunk_divisor == 0 {
            return Err("chunk divisor must be at least 1".into());
        }
        if self.file_read_size == Some(0) {
            return Err("file read size must be positive".into());
        }
        Ok(())
    }

    /// Chunk size for a line with the given buffer size, rounded down to whole
    /// frames and never smaller than one frame.
    pub fn chunk_size(&self, buffer_size: usize, frame_size: usize) -> usize {
        let frame_size = frame_size.max(1);
        let raw = buffer_size / self.chunk_divisor.max(1);
        (raw - raw % frame_size).max(frame_size)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            chunk_divisor: DEFAULT_CHUNK_DIVISOR,
            file_read_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.stop_timeout, Duration::from_secs(10));
        assert_eq!(config.chunk_divisor, 4);
        assert_eq!(config.file_read_size, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = SessionConfig {
            chunk_divisor: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            stop_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            file_read_size: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn chunk_size_is_a_quarter_of_the_buffer() {
        let config = SessionConfig::default();
        assert_eq!(config.chunk_size(4096, 4), 1024);
    }

    #[test]
    fn chunk_size_rounds_to_frames() {
        let config = SessionConfig::default();
        // 1000 / 4 = 250, rounded down to a multiple of 6
        assert_eq!(config.chunk_size(1000, 6), 246);
        // never below one frame
        assert_eq!(config.chunk_size(2, 4), 4);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"chunk_divisor": 8}"#).unwrap();
        assert_eq!(config.chunk_divisor, 8);
        assert_eq!(config.stop_timeout, DEFAULT_STOP_TIMEOUT);
    }
}
