use std::fmt;

use serde::{Deserialize, Serialize};

/// Sample encoding of an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    PcmSigned,
    PcmUnsigned,
    PcmFloat,
}

/// Layout of the raw bytes a capture line produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub encoding: Encoding,
    pub sample_rate: u32,
    pub sample_size_bits: u16,
    pub channels: u16,
    pub big_endian: bool,
}

impl AudioFormat {
    /// Signed little-endian PCM, the most widely supported capture format.
    pub fn pcm_signed(sample_rate: u32, sample_size_bits: u16, channels: u16) -> Self {
        Self {
            encoding: Encoding::PcmSigned,
            sample_rate,
            sample_size_bits,
            channels,
            big_endian: false,
        }
    }

    /// Bytes per sample, rounded up to whole bytes.
    pub fn sample_size_bytes(&self) -> usize {
        (self.sample_size_bits as usize).div_ceil(8)
    }

    /// Bytes per frame (one sample for every channel).
    pub fn frame_size(&self) -> usize {
        self.sample_size_bytes() * self.channels as usize
    }

    pub fn bytes_per_second(&self) -> usize {
        self.frame_size() * self.sample_rate as usize
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = match self.encoding {
            Encoding::PcmSigned => "PCM_SIGNED",
            Encoding::PcmUnsigned => "PCM_UNSIGNED",
            Encoding::PcmFloat => "PCM_FLOAT",
        };
        let channels = match self.channels {
            1 => "mono".to_string(),
            2 => "stereo".to_string(),
            n => format!("{n} channels"),
        };
        let endian = if self.big_endian { "big-endian" } else { "little-endian" };
        write!(
            f,
            "{encoding} {} Hz, {} bit, {channels}, {} bytes/frame, {endian}",
            self.sample_rate,
            self.sample_size_bits,
            self.frame_size()
        )
    }
}

/// One declared capability of a line: every format with these fields and a
/// sample rate in `min_sample_rate..=max_sample_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRange {
    pub encoding: Encoding,
    pub sample_size_bits: u16,
    pub channels: u16,
    pub big_endian: bool,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
}

impl FormatRange {
    /// A range containing exactly `format`.
    pub fn exact(format: &AudioFormat) -> Self {
        Self {
            encoding: format.encoding,
            sample_size_bits: format.sample_size_bits,
            channels: format.channels,
            big_endian: format.big_endian,
            min_sample_rate: format.sample_rate,
            max_sample_rate: format.sample_rate,
        }
    }

    pub fn supports(&self, format: &AudioFormat) -> bool {
        // Endianness is irrelevant for single-byte samples.
        let endian_ok = format.sample_size_bits <= 8 || self.big_endian == format.big_endian;
        self.encoding == format.encoding
            && self.sample_size_bits == format.sample_size_bits
            && self.channels == format.channels
            && endian_ok
            && (self.min_sample_rate..=self.max_sample_rate).contains(&format.sample_rate)
    }
}

/// What kind of target line a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// A data line audio can be read from.
    Capture,
    /// A control port (e.g. a physical jack) with no readable data.
    Port,
}

/// Capability descriptor of a device's target line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInfo {
    pub kind: LineKind,
    pub formats: Vec<FormatRange>,
    pub min_buffer_size: Option<usize>,
    pub max_buffer_size: Option<usize>,
}

impl LineInfo {
    pub fn capture(formats: Vec<FormatRange>) -> Self {
        Self {
            kind: LineKind::Capture,
            formats,
            min_buffer_size: None,
            max_buffer_size: None,
        }
    }

    pub fn is_capture(&self) -> bool {
        self.kind == LineKind::Capture
    }

    /// Whether any declared format range covers `format`.
    pub fn supports(&self, format: &AudioFormat) -> bool {
        self.formats.iter().any(|range| range.supports(format))
    }
}

/// Platform description of an audio device (a "mixer").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MixerInfo {
    pub name: String,
    pub description: String,
    pub vendor: String,
    /// Backend-specific position used to find the device again.
    pub index: usize,
}

/// Container format for recordings written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// RIFF WAVE.
    Wave,
    /// Sun/NeXT AU.
    Au,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wave => "wav",
            Self::Au => "au",
        }
    }
}
