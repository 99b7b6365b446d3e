//! Capture device enumeration through cpal.
//!
//! Wraps a cpal host to list input devices with their supported stream
//! configurations, translated into line-in-core's format descriptors.

use std::collections::HashMap;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, HostId, SampleFormat, SupportedBufferSize, SupportedStreamConfigRange};

use line_in_core::{
    AudioFormat, AudioSubsystem, CaptureLine, Encoding, FormatRange, LineInError, LineInfo,
    LineKind, MixerInfo,
};

use crate::cpal_line::CpalLine;

const NATIVE_BIG_ENDIAN: bool = cfg!(target_endian = "big");

/// Audio subsystem backed by a cpal host (ALSA, CoreAudio, WASAPI, ...).
pub struct CpalSubsystem {
    host_id: HostId,
}

impl CpalSubsystem {
    /// Use the platform's default host.
    pub fn new() -> Self {
        Self {
            host_id: cpal::default_host().id(),
        }
    }

    /// Use a specific host, e.g. JACK instead of ALSA.
    pub fn with_host(host_id: HostId) -> Result<Self, LineInError> {
        cpal::host_from_id(host_id)
            .map_err(|e| LineInError::LineUnavailable(format!("host unavailable: {}", e)))?;
        Ok(Self { host_id })
    }

    pub fn host_id(&self) -> HostId {
        self.host_id
    }

    fn host(&self) -> Option<Host> {
        match cpal::host_from_id(self.host_id) {
            Ok(host) => Some(host),
            Err(e) => {
                log::warn!("Audio host {} unavailable: {}", self.host_id.name(), e);
                None
            }
        }
    }

    fn input_devices(&self) -> Vec<Device> {
        let Some(host) = self.host() else {
            return Vec::new();
        };
        match host.input_devices() {
            Ok(devices) => devices.collect(),
            Err(e) => {
                log::warn!("Failed to enumerate input devices: {}", e);
                Vec::new()
            }
        }
    }

    /// Re-resolve a mixer to its cpal device, checking the name still matches.
    fn device(&self, mixer: &MixerInfo) -> Option<Device> {
        self.input_devices()
            .into_iter()
            .nth(mixer.index)
            .filter(|device| device.name().ok().as_deref() == Some(mixer.name.as_str()))
    }
}

impl Default for CpalSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSubsystem for CpalSubsystem {
    fn mixers(&self) -> Vec<MixerInfo> {
        let names: Vec<String> = self
            .input_devices()
            .iter()
            .enumerate()
            .map(|(i, device)| device.name().unwrap_or_else(|_| format!("Input {}", i)))
            .collect();

        let mut totals: HashMap<&str, usize> = HashMap::new();
        for name in &names {
            *totals.entry(name.as_str()).or_default() += 1;
        }

        // Identically named devices get "#1", "#2", ... as description.
        let mut seen: HashMap<&str, usize> = HashMap::new();
        names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let ordinal = seen.entry(name.as_str()).or_default();
                *ordinal += 1;
                let description = if totals[name.as_str()] > 1 {
                    format!("#{}", ordinal)
                } else {
                    String::new()
                };
                MixerInfo {
                    name: name.clone(),
                    description,
                    vendor: self.host_id.name().to_string(),
                    index,
                }
            })
            .collect()
    }

    fn target_line_info(&self, mixer: &MixerInfo) -> Vec<LineInfo> {
        self.device(mixer)
            .and_then(|device| capture_line_info(&device))
            .into_iter()
            .collect()
    }

    fn is_line_supported(&self, format: &AudioFormat) -> bool {
        self.input_devices()
            .iter()
            .filter_map(capture_line_info)
            .any(|line| line.supports(format))
    }

    fn get_line(
        &self,
        mixer: &MixerInfo,
        format: &AudioFormat,
    ) -> Result<Arc<dyn CaptureLine>, LineInError> {
        let device = self
            .device(mixer)
            .ok_or_else(|| LineInError::DeviceNotFound(mixer.name.clone()))?;

        let supported = capture_line_info(&device).is_some_and(|line| line.supports(format));
        if !supported {
            return Err(LineInError::UnsupportedFormat(format!(
                "{} has no line for {}",
                mixer.name, format
            )));
        }

        Ok(Arc::new(CpalLine::new(device, mixer.name.clone(), *format)))
    }
}

/// Descriptor of a device's capture line, or None if it declares no usable
/// configuration.
fn capture_line_info(device: &Device) -> Option<LineInfo> {
    let configs: Vec<SupportedStreamConfigRange> = match device.supported_input_configs() {
        Ok(configs) => configs.collect(),
        Err(e) => {
            log::debug!("No input configs for {:?}: {}", device.name().ok(), e);
            return None;
        }
    };

    let mut formats = Vec::new();
    let mut min_buffer: Option<usize> = None;
    let mut max_buffer: Option<usize> = None;

    for config in &configs {
        let Some((encoding, bits)) = encoding_of(config.sample_format()) else {
            continue;
        };
        let range = FormatRange {
            encoding,
            sample_size_bits: bits,
            channels: config.channels(),
            big_endian: NATIVE_BIG_ENDIAN,
            min_sample_rate: config.min_sample_rate().0,
            max_sample_rate: config.max_sample_rate().0,
        };
        formats.push(range);
        // CpalLine swaps byte order itself, so the other endianness works too.
        if bits > 8 {
            formats.push(FormatRange {
                big_endian: !NATIVE_BIG_ENDIAN,
                ..range
            });
        }

        if let SupportedBufferSize::Range { min, max } = config.buffer_size() {
            let frame = config.channels() as usize * config.sample_format().sample_size();
            let (min, max) = (*min as usize * frame, *max as usize * frame);
            min_buffer = Some(min_buffer.map_or(min, |m| m.min(min)));
            max_buffer = Some(max_buffer.map_or(max, |m| m.max(max)));
        }
    }

    if formats.is_empty() {
        return None;
    }

    Some(LineInfo {
        kind: LineKind::Capture,
        formats,
        min_buffer_size: min_buffer,
        max_buffer_size: max_buffer,
    })
}

/// Encoding and sample size in bits of a cpal sample format.
pub fn encoding_of(sample_format: SampleFormat) -> Option<(Encoding, u16)> {
    let encoding = if sample_format.is_float() {
        Encoding::PcmFloat
    } else if sample_format.is_uint() {
        Encoding::PcmUnsigned
    } else if sample_format.is_int() {
        Encoding::PcmSigned
    } else {
        return None;
    };
    Some((encoding, (sample_format.sample_size() * 8) as u16))
}

/// The cpal sample format that produces `format`'s samples, ignoring byte order.
pub fn sample_format_of(format: &AudioFormat) -> Option<SampleFormat> {
    let sample_format = match (format.encoding, format.sample_size_bits) {
        (Encoding::PcmSigned, 8) => SampleFormat::I8,
        (Encoding::PcmSigned, 16) => SampleFormat::I16,
        (Encoding::PcmSigned, 32) => SampleFormat::I32,
        (Encoding::PcmSigned, 64) => SampleFormat::I64,
        (Encoding::PcmUnsigned, 8) => SampleFormat::U8,
        (Encoding::PcmUnsigned, 16) => SampleFormat::U16,
        (Encoding::PcmUnsigned, 32) => SampleFormat::U32,
        (Encoding::PcmUnsigned, 64) => SampleFormat::U64,
        (Encoding::PcmFloat, 32) => SampleFormat::F32,
        (Encoding::PcmFloat, 64) => SampleFormat::F64,
        _ => return None,
    };
    Some(sample_format)
}
