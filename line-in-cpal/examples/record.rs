//! Record from a capture device into a WAV file.
//!
//! ```text
//! cargo run -p line-in-cpal --example record -- take.wav 5 "USB Audio"
//! ```
//!
//! Without a device name the first listed device is used.

use std::env;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use line_in_core::{list_devices, AudioFormat, CaptureSession, FileFormat, LineInError};
use line_in_cpal::CpalSubsystem;

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let output = PathBuf::from(args.next().unwrap_or_else(|| "take.wav".into()));
    let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(5);
    let device = args.next();

    if let Err(e) = record(output, Duration::from_secs(seconds), device) {
        eprintln!("recording failed: {}", e);
        process::exit(1);
    }
}

fn record(output: PathBuf, duration: Duration, device: Option<String>) -> Result<(), LineInError> {
    let subsystem = CpalSubsystem::new();
    let format = AudioFormat::pcm_signed(48000, 16, 1);

    let device = match device {
        Some(device) => device,
        None => list_devices(&subsystem)
            .into_keys()
            .next()
            .ok_or_else(|| LineInError::DeviceNotFound("no capture devices".into()))?,
    };

    let session = CaptureSession::new(&subsystem, format, &device)?;
    log::info!("Recording {:?} from {} for {:?}", output, device, duration);

    session.start_recording_to_file(FileFormat::Wave, output.clone())?;
    thread::sleep(duration);
    session.stop_recording()?;
    session.close();

    println!("{}", output.display());
    Ok(())
}
