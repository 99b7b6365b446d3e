//! WAV file format utilities.
//!
//! Generates standard 44-byte RIFF WAV headers and computes the size fields
//! patched in once a recording of unknown length is finished.

use crate::models::audio_models::{AudioFormat, Encoding};
use crate::processing::pcm::SampleLayout;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Byte offset of the RIFF chunk size field.
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Byte offset of the data chunk size field.
pub const DATA_SIZE_OFFSET: u64 = 40;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

/// Sample layout WAV mandates for `format`: little-endian, 8-bit unsigned,
/// wider integer samples signed.
pub fn wav_layout(format: &AudioFormat) -> SampleLayout {
    SampleLayout {
        big_endian: false,
        signed: format.encoding == Encoding::PcmFloat || format.sample_size_bits > 8,
    }
}

/// Generate a 44-byte WAV RIFF header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (format chunk size)
/// [20-21]  format code (1 = PCM, 3 = IEEE float)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * block_align
/// [32-33]  block_align = channels * bytes per sample
/// [34-35]  bits per sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &AudioFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let format_code = match format.encoding {
        Encoding::PcmFloat => FORMAT_IEEE_FLOAT,
        Encoding::PcmSigned | Encoding::PcmUnsigned => FORMAT_PCM,
    };
    let block_align = format.frame_size() as u16;
    let byte_rate = format.sample_rate * block_align as u32;
    let chunk_size = 36u32.saturating_add(data_size);

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&format_code.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.sample_size_bits.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Length of the pad byte that keeps RIFF chunks word aligned: one after an
/// odd-sized data chunk, otherwise none.
pub fn pad_size(data_size: u64) -> u64 {
    data_size & 1
}

/// RIFF chunk size (file size - 8) for `data_size` sample bytes, counting the
/// pad byte.
pub fn riff_chunk_size(data_size: u64) -> u32 {
    clamp_u32((WAV_HEADER_SIZE as u64 - 8) + data_size + pad_size(data_size))
}

/// Size fields are 32-bit; longer recordings saturate instead of wrapping.
pub fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
