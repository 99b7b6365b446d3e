//! cpal-backed capture line.
//!
//! cpal streams push audio into a callback and cannot leave the thread that
//! built them, while [`CaptureLine`] is pull-based and shared across threads.
//! Each open line therefore owns a driver thread holding the stream; the
//! stream callback fills a byte ring buffer that `read` drains.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, BuildStreamError, Device, SampleFormat, SampleRate, StreamConfig};
use parking_lot::{Condvar, Mutex};

use line_in_core::processing::pcm::{self, SampleLayout};
use line_in_core::{AudioFormat, CaptureLine, LineInError, RingBuffer};

use crate::device_enumerator::sample_format_of;

/// Audio held by a line opened without an explicit buffer size.
pub const DEFAULT_BUFFER_DURATION: Duration = Duration::from_millis(500);

/// Default buffer size in bytes for `format`: [`DEFAULT_BUFFER_DURATION`] of
/// audio, in whole frames.
pub fn default_buffer_size(format: &AudioFormat) -> usize {
    let frame = format.frame_size().max(1);
    let bytes = format.bytes_per_second() as u128 * DEFAULT_BUFFER_DURATION.as_millis() / 1000;
    ((bytes as usize) / frame * frame).max(frame)
}

enum DriverCommand {
    Play(SyncSender<Result<(), LineInError>>),
    Pause,
    Close,
}

struct Driver {
    commands: Sender<DriverCommand>,
    handle: thread::JoinHandle<()>,
}

struct LineBuffer {
    ring: RingBuffer<u8>,
    open: bool,
    running: bool,
    buffer_size: usize,
    dropped: u64,
}

struct Shared {
    buffer: Mutex<LineBuffer>,
    data_ready: Condvar,
}

/// A capture line on one cpal input device.
pub struct CpalLine {
    device: Mutex<Device>,
    name: String,
    format: AudioFormat,
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl CpalLine {
    /// A closed line on `device`, reserved for `format`.
    pub fn new(device: Device, name: String, format: AudioFormat) -> Self {
        Self {
            device: Mutex::new(device),
            name,
            format,
            shared: Arc::new(Shared {
                buffer: Mutex::new(LineBuffer {
                    ring: RingBuffer::new(0),
                    open: false,
                    running: false,
                    buffer_size: default_buffer_size(&format),
                    dropped: 0,
                }),
                data_ready: Condvar::new(),
            }),
            driver: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CaptureLine for CpalLine {
    fn open(&self, format: &AudioFormat, buffer_size: Option<usize>) -> Result<(), LineInError> {
        let mut driver = self.driver.lock();
        if driver.is_some() {
            return Ok(());
        }

        let sample_format = sample_format_of(format).ok_or_else(|| {
            LineInError::UnsupportedFormat(format!("no cpal sample format for {}", format))
        })?;

        let frame = format.frame_size().max(1);
        let requested = buffer_size.unwrap_or_else(|| default_buffer_size(format));
        let requested = (requested / frame * frame).max(frame);
        // cpal hands over whole periods; never hold less than the default.
        let capacity = requested.max(default_buffer_size(format));

        {
            let mut buffer = self.shared.buffer.lock();
            buffer.ring = RingBuffer::new(capacity);
            buffer.open = true;
            buffer.running = false;
            buffer.buffer_size = requested;
            buffer.dropped = 0;
        }

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };
        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let device = self.device.lock().clone();
        let shared = Arc::clone(&self.shared);
        let name = self.name.clone();
        let format = *format;

        let spawned = thread::Builder::new()
            .name(format!("line-in-cpal-{}", self.name))
            .spawn(move || {
                run_driver(
                    device,
                    name,
                    config,
                    sample_format,
                    format,
                    shared,
                    command_rx,
                    ready_tx,
                )
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.mark_closed();
                return Err(LineInError::LineUnavailable(format!(
                    "failed to spawn stream driver: {}",
                    e
                )));
            }
        };

        let built = ready_rx.recv().unwrap_or_else(|_| {
            Err(LineInError::LineUnavailable(
                "stream driver exited before reporting".into(),
            ))
        });
        if let Err(e) = built {
            let _ = handle.join();
            self.mark_closed();
            return Err(e);
        }

        log::debug!("Opened {} as {} ({} byte buffer)", self.name, format, requested);
        *driver = Some(Driver { commands, handle });
        Ok(())
    }

    fn start(&self) -> Result<(), LineInError> {
        let driver = self.driver.lock();
        let Some(driver) = driver.as_ref() else {
            return Err(LineInError::LineUnavailable("line is not open".into()));
        };

        self.shared.buffer.lock().running = true;

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let played = driver
            .commands
            .send(DriverCommand::Play(reply_tx))
            .map_err(|_| LineInError::LineUnavailable("stream driver is gone".into()))
            .and_then(|()| {
                reply_rx.recv().unwrap_or_else(|_| {
                    Err(LineInError::LineUnavailable("stream driver is gone".into()))
                })
            });

        if played.is_err() {
            self.shared.buffer.lock().running = false;
            self.shared.data_ready.notify_all();
        }
        played
    }

    fn stop(&self) {
        self.shared.buffer.lock().running = false;
        self.shared.data_ready.notify_all();
        if let Some(driver) = self.driver.lock().as_ref() {
            let _ = driver.commands.send(DriverCommand::Pause);
        }
    }

    fn close(&self) {
        let driver = self.driver.lock().take();
        if let Some(driver) = driver {
            let _ = driver.commands.send(DriverCommand::Close);
            if driver.handle.join().is_err() {
                log::error!("Stream driver for {} panicked", self.name);
            }
            log::debug!("Closed {}", self.name);
        }
        self.mark_closed();
    }

    fn is_open(&self) -> bool {
        self.shared.buffer.lock().open
    }

    fn is_running(&self) -> bool {
        self.shared.buffer.lock().running
    }

    fn buffer_size(&self) -> usize {
        self.shared.buffer.lock().buffer_size
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, LineInError> {
        let mut buffer = self.shared.buffer.lock();
        loop {
            if !buffer.open {
                return Err(LineInError::CaptureFailed("line is not open".into()));
            }
            if buffer.dropped > 0 {
                log::warn!(
                    "{} overran its buffer, {} bytes dropped",
                    self.name,
                    buffer.dropped
                );
                buffer.dropped = 0;
            }
            let wanted = buf.len().min(buffer.ring.capacity());
            if buffer.ring.count() >= wanted || !buffer.running {
                return Ok(buffer.ring.read_into(buf));
            }
            self.shared.data_ready.wait(&mut buffer);
        }
    }
}

impl CpalLine {
    fn mark_closed(&self) {
        {
            let mut buffer = self.shared.buffer.lock();
            buffer.open = false;
            buffer.running = false;
            buffer.ring.reset();
            buffer.buffer_size = default_buffer_size(&self.format);
        }
        self.shared.data_ready.notify_all();
    }
}

impl Drop for CpalLine {
    fn drop(&mut self) {
        self.close();
    }
}

/// Body of the stream driver thread.
///
/// Builds the stream, reports the outcome on `ready`, then serves commands
/// until `Close` arrives or the line is dropped.
#[allow(clippy::too_many_arguments)]
fn run_driver(
    device: Device,
    name: String,
    config: StreamConfig,
    sample_format: SampleFormat,
    format: AudioFormat,
    shared: Arc<Shared>,
    commands: Receiver<DriverCommand>,
    ready: SyncSender<Result<(), LineInError>>,
) {
    // cpal delivers native byte order.
    let native = AudioFormat {
        big_endian: cfg!(target_endian = "big"),
        ..format
    };
    let target = SampleLayout::of(&format);
    let convert = pcm::needs_conversion(&native, target);
    let mut scratch: Vec<u8> = Vec::new();

    let data_shared = Arc::clone(&shared);
    let error_name = name.clone();
    let stream = device.build_input_stream_raw(
        &config,
        sample_format,
        move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
            let bytes = if convert {
                scratch.clear();
                scratch.extend_from_slice(data.bytes());
                pcm::convert_in_place(&mut scratch, &native, target);
                &scratch[..]
            } else {
                data.bytes()
            };

            let mut buffer = data_shared.buffer.lock();
            if !buffer.running {
                return;
            }
            let dropped = buffer.ring.write(bytes);
            buffer.dropped += dropped as u64;
            drop(buffer);
            data_shared.data_ready.notify_all();
        },
        move |err| log::error!("Audio stream error on {}: {}", error_name, err),
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(build_error(&name, &format, e)));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    for command in commands {
        match command {
            DriverCommand::Play(reply) => {
                let result = stream.play().map_err(|e| {
                    LineInError::LineUnavailable(format!("failed to start {}: {}", name, e))
                });
                let _ = reply.send(result);
            }
            DriverCommand::Pause => {
                if let Err(e) = stream.pause() {
                    log::warn!("Failed to pause {}: {}", name, e);
                }
            }
            DriverCommand::Close => break,
        }
    }

    drop(stream);
    shared.data_ready.notify_all();
}

fn build_error(name: &str, format: &AudioFormat, err: BuildStreamError) -> LineInError {
    match err {
        BuildStreamError::StreamConfigNotSupported | BuildStreamError::InvalidArgument => {
            LineInError::UnsupportedFormat(format!("{} cannot capture {}", name, format))
        }
        BuildStreamError::DeviceNotAvailable => {
            LineInError::LineUnavailable(format!("{} is not available", name))
        }
        other => LineInError::LineUnavailable(format!("failed to open {}: {}", name, other)),
    }
}
