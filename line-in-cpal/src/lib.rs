//! # line-in-cpal
//!
//! cpal backend for line-in-core.
//!
//! Provides:
//! - `CpalSubsystem`: capture device enumeration through a cpal host
//! - `CpalLine`: blocking capture line over a cpal input stream
//!
//! ## Platform Requirements
//! - Linux: ALSA development headers (`libasound2-dev`)
//! - macOS and Windows: none beyond the system audio stack
//!
//! ## Usage
//! ```ignore
//! use line_in_core::{list_devices, AudioFormat, CaptureSession, FileFormat};
//! use line_in_cpal::CpalSubsystem;
//!
//! let subsystem = CpalSubsystem::new();
//! let format = AudioFormat::pcm_signed(48000, 16, 1);
//! let devices = list_devices(&subsystem);
//! let name = devices.keys().next().unwrap();
//!
//! let session = CaptureSession::new(&subsystem, format, name)?;
//! session.start_recording_to_file(FileFormat::Wave, "take.wav")?;
//! ```

pub mod cpal_line;
pub mod device_enumerator;

pub use cpal_line::CpalLine;
pub use device_enumerator::CpalSubsystem;
