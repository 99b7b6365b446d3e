//! In-memory audio subsystem for tests and demos without hardware.
//!
//! A [`MockLine`] replays bytes pushed into it with the blocking semantics of a
//! real capture line, and records every lifecycle call so tests can assert on
//! what a session did to the device.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::models::audio_models::{AudioFormat, FormatRange, LineInfo, MixerInfo};
use crate::models::error::LineInError;
use crate::traits::audio_subsystem::AudioSubsystem;
use crate::traits::capture_line::CaptureLine;

/// Default buffer size of a mock line in bytes.
pub const MOCK_BUFFER_SIZE: usize = 4096;

/// A lifecycle call made on a [`MockLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    Open { buffer_size: Option<usize> },
    Start,
    Stop,
    Close,
}

struct MockLineState {
    open: bool,
    running: bool,
    format: Option<AudioFormat>,
    buffer_size: usize,
    pending: VecDeque<u8>,
    open_error: Option<LineInError>,
    read_error: Option<LineInError>,
    start_held: bool,
    ops: Vec<LineOp>,
}

/// Scriptable capture line.
pub struct MockLine {
    state: Mutex<MockLineState>,
    data_ready: Condvar,
    default_buffer_size: usize,
}

impl MockLine {
    pub fn new(default_buffer_size: usize) -> Self {
        Self {
            state: Mutex::new(MockLineState {
                open: false,
                running: false,
                format: None,
                buffer_size: default_buffer_size,
                pending: VecDeque::new(),
                open_error: None,
                read_error: None,
                start_held: false,
                ops: Vec::new(),
            }),
            data_ready: Condvar::new(),
            default_buffer_size,
        }
    }

    /// Queue bytes for readers, as if the device had captured them.
    pub fn push(&self, bytes: &[u8]) {
        self.state.lock().pending.extend(bytes.iter().copied());
        self.data_ready.notify_all();
    }

    /// Make every subsequent `open` fail with `err`.
    pub fn fail_open_with(&self, err: LineInError) {
        self.state.lock().open_error = Some(err);
    }

    /// Make the next `read` fail with `err`.
    pub fn fail_next_read_with(&self, err: LineInError) {
        self.state.lock().read_error = Some(err);
        self.data_ready.notify_all();
    }

    /// Block every `start` call until [`release_start`](Self::release_start).
    pub fn hold_start(&self) {
        self.state.lock().start_held = true;
    }

    pub fn release_start(&self) {
        self.state.lock().start_held = false;
        self.data_ready.notify_all();
    }

    pub fn ops(&self) -> Vec<LineOp> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Bytes pushed but not yet read.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Format the line was last opened with.
    pub fn opened_format(&self) -> Option<AudioFormat> {
        self.state.lock().format
    }
}

impl CaptureLine for MockLine {
    fn open(&self, format: &AudioFormat, buffer_size: Option<usize>) -> Result<(), LineInError> {
        let mut s = self.state.lock();
        s.ops.push(LineOp::Open { buffer_size });
        if let Some(err) = s.open_error.clone() {
            return Err(err);
        }
        if s.open {
            return Ok(());
        }
        s.open = true;
        s.format = Some(*format);
        s.buffer_size = buffer_size.unwrap_or(self.default_buffer_size);
        Ok(())
    }

    fn start(&self) -> Result<(), LineInError> {
        let mut s = self.state.lock();
        while s.start_held {
            self.data_ready.wait(&mut s);
        }
        s.ops.push(LineOp::Start);
        if !s.open {
            return Err(LineInError::LineUnavailable("line is not open".into()));
        }
        s.running = true;
        drop(s);
        self.data_ready.notify_all();
        Ok(())
    }

    fn stop(&self) {
        let mut s = self.state.lock();
        s.ops.push(LineOp::Stop);
        s.running = false;
        drop(s);
        self.data_ready.notify_all();
    }

    fn close(&self) {
        let mut s = self.state.lock();
        s.ops.push(LineOp::Close);
        s.open = false;
        s.running = false;
        s.buffer_size = self.default_buffer_size;
        drop(s);
        self.data_ready.notify_all();
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    fn buffer_size(&self) -> usize {
        self.state.lock().buffer_size
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, LineInError> {
        let mut s = self.state.lock();
        loop {
            if let Some(err) = s.read_error.take() {
                return Err(err);
            }
            if !s.open {
                return Err(LineInError::CaptureFailed("line is not open".into()));
            }
            if !s.pending.is_empty() || !s.running {
                let n = buf.len().min(s.pending.len());
                for (slot, byte) in buf.iter_mut().zip(s.pending.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
            self.data_ready.wait(&mut s);
        }
    }
}

/// A device exposed by [`MockSubsystem`].
pub struct MockDevice {
    name: String,
    description: String,
    lines: Vec<LineInfo>,
    line: Arc<MockLine>,
    reserve_error: Option<LineInError>,
}

impl MockDevice {
    /// A device with a single capture line supporting `formats`.
    pub fn new(name: &str, formats: Vec<FormatRange>) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            lines: vec![LineInfo::capture(formats)],
            line: Arc::new(MockLine::new(MOCK_BUFFER_SIZE)),
            reserve_error: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Replace the declared target lines.
    pub fn with_lines(mut self, lines: Vec<LineInfo>) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.line = Arc::new(MockLine::new(buffer_size));
        self
    }

    /// Make `get_line` fail for this device, as if it were busy.
    pub fn deny_reservation(mut self, err: LineInError) -> Self {
        self.reserve_error = Some(err);
        self
    }

    pub fn line(&self) -> Arc<MockLine> {
        Arc::clone(&self.line)
    }

    fn supports(&self, format: &AudioFormat) -> bool {
        self.lines
            .iter()
            .any(|line| line.is_capture() && line.supports(format))
    }
}

/// Audio subsystem backed entirely by [`MockDevice`]s.
#[derive(Default)]
pub struct MockSubsystem {
    devices: Vec<MockDevice>,
}

impl MockSubsystem {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self { devices }
    }

    /// A subsystem with no devices at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The line of the first device named `name`.
    pub fn line(&self, name: &str) -> Option<Arc<MockLine>> {
        self.devices
            .iter()
            .find(|d| d.name == name)
            .map(MockDevice::line)
    }

    /// Every line operation recorded across all devices.
    pub fn total_ops(&self) -> usize {
        self.devices.iter().map(|d| d.line.ops().len()).sum()
    }

    fn device(&self, mixer: &MixerInfo) -> Option<&MockDevice> {
        self.devices
            .get(mixer.index)
            .filter(|device| device.name == mixer.name)
    }
}

impl AudioSubsystem for MockSubsystem {
    fn mixers(&self) -> Vec<MixerInfo> {
        self.devices
            .iter()
            .enumerate()
            .map(|(index, device)| MixerInfo {
                name: device.name.clone(),
                description: device.description.clone(),
                vendor: "mock".into(),
                index,
            })
            .collect()
    }

    fn target_line_info(&self, mixer: &MixerInfo) -> Vec<LineInfo> {
        self.device(mixer)
            .map(|device| device.lines.clone())
            .unwrap_or_default()
    }

    fn is_line_supported(&self, format: &AudioFormat) -> bool {
        self.devices.iter().any(|device| device.supports(format))
    }

    fn get_line(
        &self,
        mixer: &MixerInfo,
        format: &AudioFormat,
    ) -> Result<Arc<dyn CaptureLine>, LineInError> {
        let device = self
            .device(mixer)
            .ok_or_else(|| LineInError::DeviceNotFound(mixer.name.clone()))?;
        if let Some(err) = device.reserve_error.clone() {
            return Err(err);
        }
        if !device.supports(format) {
            return Err(LineInError::UnsupportedFormat(format!(
                "{} has no line for {format}",
                mixer.name
            )));
        }
        Ok(device.line() as Arc<dyn CaptureLine>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn format() -> AudioFormat {
        AudioFormat::pcm_signed(8000, 16, 1)
    }

    #[test]
    fn read_returns_pushed_bytes_once_started() {
        let line = MockLine::new(64);
        line.open(&format(), None).unwrap();
        line.start().unwrap();
        line.push(&[1, 2, 3]);

        let mut buf = [0u8; 8];
        assert_eq!(line.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    fn stop_unblocks_a_waiting_reader() {
        let line = Arc::new(MockLine::new(64));
        line.open(&format(), None).unwrap();
        line.start().unwrap();

        let reader = {
            let line = Arc::clone(&line);
            thread::spawn(move || {
                let mut buf = [0u8; 8];
                line.read(&mut buf)
            })
        };
        thread::sleep(Duration::from_millis(50));
        line.stop();

        assert_eq!(reader.join().unwrap().unwrap(), 0);
    }

    #[test]
    fn read_on_closed_line_fails() {
        let line = MockLine::new(64);
        let mut buf = [0u8; 4];
        assert!(matches!(line.read(&mut buf), Err(LineInError::CaptureFailed(_))));
    }

    #[test]
    fn records_lifecycle() {
        let line = MockLine::new(64);
        line.open(&format(), Some(16)).unwrap();
        assert_eq!(line.buffer_size(), 16);
        line.start().unwrap();
        line.stop();
        line.close();
        assert_eq!(line.buffer_size(), 64);
        assert_eq!(
            line.ops(),
            vec![
                LineOp::Open {
                    buffer_size: Some(16)
                },
                LineOp::Start,
                LineOp::Stop,
                LineOp::Close
            ]
        );
    }

    #[test]
    fn subsystem_rejects_unsupported_formats() {
        let subsystem =
            MockSubsystem::new(vec![MockDevice::new("Mic", vec![FormatRange::exact(&format())])]);
        let mixer = subsystem.mixers().remove(0);

        assert!(subsystem.is_line_supported(&format()));
        let stereo = AudioFormat::pcm_signed(8000, 16, 2);
        assert!(!subsystem.is_line_supported(&stereo));
        assert!(matches!(
            subsystem.get_line(&mixer, &stereo),
            Err(LineInError::UnsupportedFormat(_))
        ));
    }
}
