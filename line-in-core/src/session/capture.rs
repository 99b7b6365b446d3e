use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::directory;
use crate::models::audio_models::{AudioFormat, FileFormat};
use crate::models::config::SessionConfig;
use crate::models::error::LineInError;
use crate::models::state::SessionState;
use crate::storage::container_writer::ContainerWriter;
use crate::traits::audio_subsystem::AudioSubsystem;
use crate::traits::capture_line::CaptureLine;

/// Numbers recording threads so successive workers are distinguishable in
/// thread dumps and logs.
static WORKER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One-shot flag a worker raises when it exits, waitable with a deadline.
#[derive(Default)]
struct ExitLatch {
    done: Mutex<bool>,
    cond: Condvar,
}

impl ExitLatch {
    fn signal(&self) {
        *self.done.lock() = true;
        self.cond.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.done.lock()
    }

    /// Returns whether the latch was raised within `timeout`.
    fn wait(&self, timeout: Duration) -> bool {
        let mut done = self.done.lock();
        if !*done {
            self.cond.wait_while_for(&mut done, |done| !*done, timeout);
        }
        *done
    }
}

/// Raises the latch when dropped, so a panicking worker still reports exit.
struct SignalOnExit(Arc<ExitLatch>);

impl Drop for SignalOnExit {
    fn drop(&mut self) {
        self.0.signal();
    }
}

struct Worker {
    name: String,
    interrupted: Arc<AtomicBool>,
    exit: Arc<ExitLatch>,
    handle: thread::JoinHandle<()>,
}

impl Worker {
    fn is_alive(&self) -> bool {
        !self.exit.is_set()
    }
}

struct Inner {
    worker: Option<Worker>,
    closed: bool,
}

/// A capture line bound to one device and one format, recording on a
/// dedicated worker thread.
///
/// State transitions:
/// ```text
/// idle → recording → idle
///   ↓        ↓
///     closed
/// ```
///
/// All methods take `&self`; the session can be shared behind an `Arc` so one
/// thread can stop a recording another started. Starting and stopping are
/// serialized by a single per-session lock.
pub struct CaptureSession {
    format: AudioFormat,
    device: String,
    config: SessionConfig,
    line: Arc<dyn CaptureLine>,
    inner: Mutex<Inner>,
}

impl CaptureSession {
    /// Bind a session to the device `device_name` (a key from
    /// [`list_devices`](crate::list_devices)) in `format`.
    ///
    /// No audio I/O happens yet: the line is reserved but not opened.
    pub fn new(
        subsystem: &dyn AudioSubsystem,
        format: AudioFormat,
        device_name: &str,
    ) -> Result<Self, LineInError> {
        Self::with_config(subsystem, format, device_name, SessionConfig::default())
    }

    pub fn with_config(
        subsystem: &dyn AudioSubsystem,
        format: AudioFormat,
        device_name: &str,
        config: SessionConfig,
    ) -> Result<Self, LineInError> {
        config.validate().map_err(LineInError::InvalidConfig)?;

        if !subsystem.is_line_supported(&format) {
            return Err(LineInError::UnsupportedFormat(format!(
                "{device_name} does not support the following audio format: {format}"
            )));
        }

        let mixer = directory::resolve_mixer(subsystem, device_name)?;
        let line = subsystem.get_line(&mixer, &format)?;

        log::debug!("Bound capture session to {:?} ({})", device_name, format);

        Ok(Self {
            format,
            device: device_name.to_string(),
            config,
            line,
            inner: Mutex::new(Inner {
                worker: None,
                closed: false,
            }),
        })
    }

    /// Check that `device_name` can really be opened in `format` by opening
    /// and closing its line.
    pub fn probe(
        subsystem: &dyn AudioSubsystem,
        format: AudioFormat,
        device_name: &str,
    ) -> Result<(), LineInError> {
        let session = Self::new(subsystem, format, device_name)?;
        session.line.open(&format, None)?;
        session.close();
        Ok(())
    }

    /// Record into a `file_format` container at `output_path`.
    ///
    /// Returns as soon as the worker is launched. Missing parent directories
    /// are created. If capture or writing fails the worker logs the error and
    /// exits, leaving the partial file on disk.
    pub fn start_recording_to_file(
        &self,
        file_format: FileFormat,
        output_path: impl Into<PathBuf>,
    ) -> Result<(), LineInError> {
        let output_path = output_path.into();
        let mut inner = self.inner.lock();
        self.ensure_idle(&mut inner)?;

        let line = Arc::clone(&self.line);
        let format = self.format;
        let config = self.config.clone();
        let path = output_path.clone();

        let worker = spawn_worker("line-in-file-recorder", move |interrupted| {
            if let Err(e) =
                record_to_file(line.as_ref(), format, &config, file_format, path.clone(), interrupted)
            {
                log::error!("Recording to {} failed: {}", path.display(), e);
                interrupted.store(true, Ordering::SeqCst);
            }
        })?;

        log::info!(
            "Recording {:?} to {} ({})",
            self.device,
            output_path.display(),
            worker.name
        );
        inner.worker = Some(worker);
        Ok(())
    }

    /// Record and hand every captured chunk to `callback`.
    ///
    /// Chunks are a quarter of the line's buffer (see
    /// [`SessionConfig::chunk_divisor`]) and each one is a fresh `Vec` the
    /// callback owns. The callback runs on the worker thread.
    pub fn start_recording_to_callback<F>(&self, callback: F) -> Result<(), LineInError>
    where
        F: FnMut(Vec<u8>) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        self.ensure_idle(&mut inner)?;

        let line = Arc::clone(&self.line);
        let format = self.format;
        let config = self.config.clone();

        let worker = spawn_worker("line-in-callback-recorder", move |interrupted| {
            if let Err(e) = record_to_callback(line.as_ref(), format, &config, callback, interrupted)
            {
                log::error!("Encountered an error while recording: {}", e);
                interrupted.store(true, Ordering::SeqCst);
            }
        })?;

        log::info!("Recording {:?} to callback ({})", self.device, worker.name);
        inner.worker = Some(worker);
        Ok(())
    }

    /// Stop the current recording, if any.
    ///
    /// Stops the line, interrupts the worker, waits up to
    /// [`SessionConfig::stop_timeout`] for it, then closes the line whether or
    /// not it exited. A worker that misses the deadline is detached and
    /// reported as [`LineInError::StopTimeout`]; the session is idle either way.
    pub fn stop_recording(&self) -> Result<(), LineInError> {
        let mut inner = self.inner.lock();
        self.stop_locked(&mut inner)
    }

    /// Stop any recording and release the line. Later calls do nothing.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }

        if let Err(e) = self.stop_locked(&mut inner) {
            log::error!("Encountered an error while stopping recording: {}", e);
        }
        if self.line.is_open() {
            self.line.close();
        }
        inner.closed = true;
        log::debug!("Closed capture session for {:?}", self.device);
    }

    pub fn state(&self) -> SessionState {
        let inner = self.inner.lock();
        if inner.closed {
            SessionState::Closed
        } else if inner.worker.as_ref().is_some_and(Worker::is_alive) {
            SessionState::Recording
        } else {
            SessionState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state().is_recording()
    }

    /// Thread name of the worker currently recording, if any.
    pub fn current_worker(&self) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .worker
            .as_ref()
            .filter(|w| w.is_alive())
            .map(|w| w.name.clone())
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Device key this session was bound with.
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // --- Internal helpers ---

    /// Reject starts while closed or recording; reap a worker that already
    /// exited on its own.
    fn ensure_idle(&self, inner: &mut Inner) -> Result<(), LineInError> {
        if inner.closed {
            return Err(LineInError::SessionClosed);
        }
        match inner.worker.as_ref().map(Worker::is_alive) {
            Some(true) => Err(LineInError::RecordingInProgress),
            Some(false) => self.stop_locked(inner),
            None => Ok(()),
        }
    }

    fn stop_locked(&self, inner: &mut Inner) -> Result<(), LineInError> {
        let Some(worker) = inner.worker.take() else {
            return Ok(());
        };

        if !worker.is_alive() {
            // Exited on its own; just reap it.
            join_worker(worker);
            if self.line.is_open() {
                self.line.close();
            }
            return Ok(());
        }

        // Interrupt first so a worker still starting the line sees it.
        worker.interrupted.store(true, Ordering::SeqCst);
        self.line.stop();

        let timeout = self.config.stop_timeout;
        let result = if worker.exit.wait(timeout) {
            log::info!("Stopped recording ({})", worker.name);
            join_worker(worker);
            Ok(())
        } else {
            log::warn!(
                "Recording worker {} did not stop within {:?}; detaching it",
                worker.name,
                timeout
            );
            Err(LineInError::StopTimeout {
                worker: worker.name,
                waited: timeout,
            })
        };

        self.line.close();
        result
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_worker<F>(kind: &str, body: F) -> Result<Worker, LineInError>
where
    F: FnOnce(&AtomicBool) + Send + 'static,
{
    let name = format!("{}-{}", kind, WORKER_COUNTER.fetch_add(1, Ordering::SeqCst));
    let interrupted = Arc::new(AtomicBool::new(false));
    let exit = Arc::new(ExitLatch::default());

    let handle = {
        let interrupted = Arc::clone(&interrupted);
        let exit = SignalOnExit(Arc::clone(&exit));
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _exit = exit;
                body(&interrupted);
            })
            .map_err(|e| LineInError::WorkerSpawnFailed(e.to_string()))?
    };

    Ok(Worker {
        name,
        interrupted,
        exit,
        handle,
    })
}

fn join_worker(worker: Worker) {
    if worker.handle.join().is_err() {
        log::error!("Recording worker {} panicked", worker.name);
    }
}

fn record_to_file(
    line: &dyn CaptureLine,
    format: AudioFormat,
    config: &SessionConfig,
    file_format: FileFormat,
    path: PathBuf,
    interrupted: &AtomicBool,
) -> Result<(), LineInError> {
    line.open(&format, None)?;
    start_line(line, interrupted)?;

    let mut writer = ContainerWriter::create(path, file_format, format)?;

    let read_size = config
        .file_read_size
        .unwrap_or_else(|| config.chunk_size(line.buffer_size(), format.frame_size()));
    let mut buffer = vec![0u8; read_size];

    let pumped = pump(line, &mut buffer, interrupted, |bytes| writer.write(bytes));
    // Finalize what was captured even if the stream failed.
    let finished = writer.finish();
    let bytes = pumped?;
    finished?;

    log::debug!("File recording finished after {} bytes", bytes);
    Ok(())
}

fn record_to_callback<F>(
    line: &dyn CaptureLine,
    format: AudioFormat,
    config: &SessionConfig,
    mut callback: F,
    interrupted: &AtomicBool,
) -> Result<(), LineInError>
where
    F: FnMut(Vec<u8>),
{
    let chunk_size = config.chunk_size(line.buffer_size(), format.frame_size());
    let mut buffer = vec![0u8; chunk_size];

    line.open(&format, Some(chunk_size))?;
    start_line(line, interrupted)?;

    // The read buffer is reused; every chunk handed out is a private copy.
    let bytes = pump(line, &mut buffer, interrupted, |bytes| {
        callback(bytes.to_vec());
        Ok(())
    })?;

    log::debug!("Callback recording finished after {} bytes", bytes);
    Ok(())
}

/// Start `line`, stopping it again if the recording was stopped meanwhile.
fn start_line(line: &dyn CaptureLine, interrupted: &AtomicBool) -> Result<(), LineInError> {
    line.start()?;
    if interrupted.load(Ordering::SeqCst) {
        line.stop();
    }
    Ok(())
}

/// Copy chunks from `line` into `sink` until interrupted or end of stream.
///
/// Read failures after an interrupt are shutdown noise, not errors.
fn pump<S>(
    line: &dyn CaptureLine,
    buffer: &mut [u8],
    interrupted: &AtomicBool,
    mut sink: S,
) -> Result<u64, LineInError>
where
    S: FnMut(&[u8]) -> Result<(), LineInError>,
{
    let mut total = 0u64;
    while !interrupted.load(Ordering::SeqCst) {
        let n = match line.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) if interrupted.load(Ordering::SeqCst) => break,
            Err(e) => return Err(e),
        };
        sink(&buffer[..n])?;
        total += n as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{LineOp, MockDevice, MockSubsystem};
    use crate::models::audio_models::FormatRange;
    use std::time::Instant;

    fn mono() -> AudioFormat {
        AudioFormat::pcm_signed(8000, 16, 1)
    }

    fn subsystem() -> MockSubsystem {
        MockSubsystem::new(vec![
            MockDevice::new("Mic", vec![FormatRange::exact(&mono())]).with_buffer_size(64)
        ])
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn latch_times_out_when_never_signalled() {
        let latch = ExitLatch::default();
        assert!(!latch.wait(Duration::from_millis(10)));
        latch.signal();
        assert!(latch.wait(Duration::from_millis(10)));
    }

    #[test]
    fn latch_is_raised_when_worker_panics() {
        let worker = spawn_worker("panicking", |_| panic!("boom")).unwrap();
        assert!(worker.exit.wait(Duration::from_secs(5)));
        assert!(worker.handle.join().is_err());
    }

    #[test]
    fn worker_names_are_unique() {
        let a = spawn_worker("test", |_| {}).unwrap();
        let b = spawn_worker("test", |_| {}).unwrap();
        assert_ne!(a.name, b.name);
        assert!(a.name.starts_with("test-"));
        a.handle.join().unwrap();
        b.handle.join().unwrap();
    }

    #[test]
    fn new_session_is_idle_and_line_is_not_opened() {
        let subsystem = subsystem();
        let session = CaptureSession::new(&subsystem, mono(), "Mic").unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.device(), "Mic");
        assert!(subsystem.line("Mic").unwrap().ops().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let subsystem = subsystem();
        let config = SessionConfig {
            chunk_divisor: 0,
            ..Default::default()
        };
        let result = CaptureSession::with_config(&subsystem, mono(), "Mic", config);
        assert!(matches!(result, Err(LineInError::InvalidConfig(_))));
    }

    #[test]
    fn callback_chunks_are_a_quarter_of_the_buffer() {
        let subsystem = subsystem();
        let line = subsystem.line("Mic").unwrap();
        let session = CaptureSession::new(&subsystem, mono(), "Mic").unwrap();

        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sizes);
        session
            .start_recording_to_callback(move |chunk| sink.lock().push(chunk.len()))
            .unwrap();
        line.push(&[0u8; 32]);

        wait_until(|| sizes.lock().len() == 2);
        session.stop_recording().unwrap();

        assert_eq!(*sizes.lock(), vec![16, 16]);
        assert_eq!(
            line.ops()[0],
            LineOp::Open {
                buffer_size: Some(16)
            }
        );
    }

    #[test]
    fn open_failure_ends_worker_without_callbacks() {
        let subsystem = subsystem();
        let line = subsystem.line("Mic").unwrap();
        line.fail_open_with(LineInError::LineUnavailable("busy".into()));
        let session = CaptureSession::new(&subsystem, mono(), "Mic").unwrap();

        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        session
            .start_recording_to_callback(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        wait_until(|| !session.is_recording());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // The dead worker is reaped and a new recording may start.
        session.start_recording_to_callback(|_| {}).unwrap();
        session.stop_recording().unwrap();
    }

    #[test]
    fn read_failure_mid_stream_stops_the_worker() {
        let subsystem = subsystem();
        let line = subsystem.line("Mic").unwrap();
        let session = CaptureSession::new(&subsystem, mono(), "Mic").unwrap();

        session.start_recording_to_callback(|_| {}).unwrap();
        wait_until(|| line.is_running());
        line.fail_next_read_with(LineInError::CaptureFailed("unplugged".into()));

        wait_until(|| !session.is_recording());
        assert_eq!(session.state(), SessionState::Idle);
        session.stop_recording().unwrap();
        assert!(!line.is_open());
    }

    #[test]
    fn stuck_worker_times_out_and_line_is_still_closed() {
        let subsystem = subsystem();
        let line = subsystem.line("Mic").unwrap();
        let config = SessionConfig {
            stop_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let session = CaptureSession::with_config(&subsystem, mono(), "Mic", config).unwrap();

        let release = Arc::new(AtomicBool::new(false));
        let gate = Arc::clone(&release);
        session
            .start_recording_to_callback(move |_| {
                while !gate.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(5));
                }
            })
            .unwrap();
        line.push(&[0u8; 16]);
        wait_until(|| line.pending() == 0);

        let err = session.stop_recording().unwrap_err();
        assert!(matches!(err, LineInError::StopTimeout { .. }));
        assert!(!line.is_open());
        assert_eq!(session.state(), SessionState::Idle);

        release.store(true, Ordering::SeqCst);
    }

    #[test]
    fn stop_during_line_start_leaves_the_line_stopped() {
        let subsystem = subsystem();
        let line = subsystem.line("Mic").unwrap();
        let session = CaptureSession::new(&subsystem, mono(), "Mic").unwrap();

        line.hold_start();
        session.start_recording_to_callback(|_| {}).unwrap();
        wait_until(|| line.ops().iter().any(|op| matches!(op, LineOp::Open { .. })));

        thread::scope(|s| {
            let stopper = s.spawn(|| session.stop_recording());
            // The worker only gets the line running after the stop went through.
            wait_until(|| line.ops().contains(&LineOp::Stop));
            line.release_start();
            assert_eq!(stopper.join().unwrap(), Ok(()));
        });

        let ops = line.ops();
        let started = ops.iter().position(|op| *op == LineOp::Start).unwrap();
        assert!(ops[started..].contains(&LineOp::Stop));
        assert_eq!(ops.last(), Some(&LineOp::Close));
        assert!(!line.is_running());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_after_close_is_rejected() {
        let subsystem = subsystem();
        let session = CaptureSession::new(&subsystem, mono(), "Mic").unwrap();
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(
            session.start_recording_to_callback(|_| {}),
            Err(LineInError::SessionClosed)
        );
    }

    #[test]
    fn probe_opens_and_closes_the_line() {
        let subsystem = subsystem();
        CaptureSession::probe(&subsystem, mono(), "Mic").unwrap();
        assert_eq!(
            subsystem.line("Mic").unwrap().ops(),
            vec![LineOp::Open { buffer_size: None }, LineOp::Close]
        );
    }
}
