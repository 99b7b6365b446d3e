//! Sun/NeXT AU file format utilities.
//!
//! The AU header is big-endian and 24 bytes long. A data size of
//! `0xFFFF_FFFF` means "unknown" and is patched once the stream ends.

use crate::models::audio_models::{AudioFormat, Encoding};
use crate::models::error::LineInError;
use crate::processing::pcm::SampleLayout;

pub const AU_HEADER_SIZE: usize = 24;

/// Byte offset of the data size field.
pub const DATA_SIZE_OFFSET: u64 = 8;

pub const UNKNOWN_DATA_SIZE: u32 = u32::MAX;

const AU_MAGIC: &[u8; 4] = b".snd";

/// AU stores every integer encoding as signed big-endian.
pub fn au_layout() -> SampleLayout {
    SampleLayout {
        big_endian: true,
        signed: true,
    }
}

/// AU encoding code for `format`.
pub fn encoding_code(format: &AudioFormat) -> Result<u32, LineInError> {
    let code = match (format.encoding, format.sample_size_bits) {
        (Encoding::PcmFloat, 32) => 6,
        (Encoding::PcmFloat, 64) => 7,
        (Encoding::PcmSigned | Encoding::PcmUnsigned, 8) => 2,
        (Encoding::PcmSigned | Encoding::PcmUnsigned, 16) => 3,
        (Encoding::PcmSigned | Encoding::PcmUnsigned, 24) => 4,
        (Encoding::PcmSigned | Encoding::PcmUnsigned, 32) => 5,
        _ => {
            return Err(LineInError::UnsupportedFormat(format!(
                "AU cannot store {format}"
            )))
        }
    };
    Ok(code)
}

/// Generate a 24-byte AU header.
///
/// Layout (big-endian):
/// ```text
/// [0-3]    ".snd"
/// [4-7]    header size (24)
/// [8-11]   data size (0xFFFFFFFF = unknown)
/// [12-15]  encoding
/// [16-19]  sample_rate
/// [20-23]  channels
/// ```
pub fn generate_au_header(
    format: &AudioFormat,
    data_size: u32,
) -> Result<[u8; AU_HEADER_SIZE], LineInError> {
    let encoding = encoding_code(format)?;
    let mut header = [0u8; AU_HEADER_SIZE];

    header[0..4].copy_from_slice(AU_MAGIC);
    header[4..8].copy_from_slice(&(AU_HEADER_SIZE as u32).to_be_bytes());
    header[8..12].copy_from_slice(&data_size.to_be_bytes());
    header[12..16].copy_from_slice(&encoding.to_be_bytes());
    header[16..20].copy_from_slice(&format.sample_rate.to_be_bytes());
    header[20..24].copy_from_slice(&(format.channels as u32).to_be_bytes());

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(header: &[u8], at: usize) -> u32 {
        u32::from_be_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
    }

    #[test]
    fn header_fields() {
        let header =
            generate_au_header(&AudioFormat::pcm_signed(8000, 16, 1), UNKNOWN_DATA_SIZE).unwrap();
        assert_eq!(&header[0..4], b".snd");
        assert_eq!(u32_at(&header, 4), 24);
        assert_eq!(u32_at(&header, 8), u32::MAX);
        assert_eq!(u32_at(&header, 12), 3);
        assert_eq!(u32_at(&header, 16), 8000);
        assert_eq!(u32_at(&header, 20), 1);
    }

    #[test]
    fn rejects_odd_sample_sizes() {
        let err = generate_au_header(&AudioFormat::pcm_signed(8000, 12, 1), 0).unwrap_err();
        assert!(matches!(err, LineInError::UnsupportedFormat(_)));
    }
}
