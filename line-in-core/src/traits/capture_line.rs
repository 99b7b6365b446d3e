use crate::models::audio_models::AudioFormat;
use crate::models::error::LineInError;

/// A capture line that raw audio bytes can be read from.
///
/// Lines are shared between the thread controlling a session and the worker
/// reading from it, so every method takes `&self`. Lifecycle:
///
/// ```text
/// closed → open → running ⇄ stopped → closed
/// ```
pub trait CaptureLine: Send + Sync {
    /// Acquire system resources for `format`.
    ///
    /// `buffer_size` requests an internal buffer in bytes; `None` lets the
    /// line pick its default. Opening an already open line is a no-op.
    fn open(&self, format: &AudioFormat, buffer_size: Option<usize>) -> Result<(), LineInError>;

    /// Begin delivering captured audio to `read`.
    fn start(&self) -> Result<(), LineInError>;

    /// Pause capture. Blocked readers return with whatever is buffered.
    fn stop(&self);

    /// Release system resources. Blocked readers are woken up.
    fn close(&self);

    fn is_open(&self) -> bool;

    fn is_running(&self) -> bool;

    /// Internal buffer size in bytes (the default size while closed).
    fn buffer_size(&self) -> usize;

    /// Block until `buf` is full or the line stops.
    ///
    /// Returns the number of bytes copied. `Ok(0)` means end of stream: the
    /// line is not running and nothing is buffered.
    fn read(&self, buf: &mut [u8]) -> Result<usize, LineInError>;
}
