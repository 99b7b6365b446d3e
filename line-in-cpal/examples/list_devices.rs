//! Print every capture device and its line descriptor as JSON.
//!
//! With `--probe RATE BITS CHANNELS`, only devices that actually open in
//! that signed PCM format are listed.
//!
//! ```text
//! cargo run -p line-in-cpal --example list_devices -- --probe 48000 16 1
//! ```

use std::env;
use std::process;

use line_in_core::{list_devices, list_devices_supporting, AudioFormat};
use line_in_cpal::CpalSubsystem;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let subsystem = CpalSubsystem::new();

    let devices = match args.first().map(String::as_str) {
        Some("--probe") => {
            let Some(format) = parse_format(&args[1..]) else {
                eprintln!("usage: list_devices [--probe RATE BITS CHANNELS]");
                process::exit(2);
            };
            log::info!("Probing devices for {}", format);
            list_devices_supporting(&subsystem, &format)
        }
        _ => list_devices(&subsystem),
    };

    match serde_json::to_string_pretty(&devices) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("failed to serialize devices: {}", e);
            process::exit(1);
        }
    }
}

fn parse_format(args: &[String]) -> Option<AudioFormat> {
    match args {
        [rate, bits, channels] => Some(AudioFormat::pcm_signed(
            rate.parse().ok()?,
            bits.parse().ok()?,
            channels.parse().ok()?,
        )),
        _ => None,
    }
}
