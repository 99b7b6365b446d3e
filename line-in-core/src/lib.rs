//! # line-in-core
//!
//! Platform-agnostic line-in capture library.
//!
//! Lists the capture devices an audio subsystem exposes, binds a
//! [`CaptureSession`] to one of them in a chosen [`AudioFormat`], and records
//! on a dedicated worker thread into a WAV/AU file or a chunk callback.
//! Platform backends (cpal) implement the [`AudioSubsystem`] and
//! [`CaptureLine`] traits.
//!
//! ## Architecture
//!
//! ```text
//! line-in-core (this crate)
//! ├── traits/       ← AudioSubsystem, CaptureLine
//! ├── models/       ← LineInError, SessionState, SessionConfig, AudioFormat, LineInfo, etc.
//! ├── processing/   ← RingBuffer, sample layout conversion, WAV/AU headers
//! ├── session/      ← CaptureSession (start/stop lifecycle, worker thread)
//! ├── storage/      ← ContainerWriter
//! ├── directory     ← list_devices, list_devices_supporting
//! └── mock          ← in-memory subsystem for tests
//! ```
//!
//! ## Usage
//! ```ignore
//! use line_in_core::{list_devices, AudioFormat, CaptureSession, FileFormat};
//!
//! let format = AudioFormat::pcm_signed(44100, 16, 2);
//! let devices = list_devices(&subsystem);
//! let name = devices.keys().next().unwrap();
//!
//! let session = CaptureSession::new(&subsystem, format, name)?;
//! session.start_recording_to_file(FileFormat::Wave, "out/take.wav")?;
//! // ...
//! session.stop_recording()?;
//! session.close();
//! ```

pub mod directory;
pub mod mock;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use directory::{device_key, list_devices, list_devices_supporting, KEY_SEPARATOR};
pub use models::audio_models::{
    AudioFormat, Encoding, FileFormat, FormatRange, LineInfo, LineKind, MixerInfo,
};
pub use models::config::{SessionConfig, DEFAULT_CHUNK_DIVISOR, DEFAULT_STOP_TIMEOUT};
pub use models::error::{ErrorKind, LineInError};
pub use models::state::SessionState;
pub use processing::ring_buffer::RingBuffer;
pub use session::capture::CaptureSession;
pub use storage::container_writer::ContainerWriter;
pub use traits::audio_subsystem::AudioSubsystem;
pub use traits::capture_line::CaptureLine;
