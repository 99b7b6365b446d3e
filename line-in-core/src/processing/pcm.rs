//! Byte-level sample layout conversion.
//!
//! Capture lines hand out raw bytes in the session's [`AudioFormat`]; container
//! files mandate a fixed byte order and signedness. These helpers rewrite
//! samples in place without decoding them.

use crate::models::audio_models::{AudioFormat, Encoding};

/// Byte order and signedness a consumer expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLayout {
    pub big_endian: bool,
    pub signed: bool,
}

impl SampleLayout {
    pub fn of(format: &AudioFormat) -> Self {
        Self {
            big_endian: format.big_endian,
            signed: format.encoding != Encoding::PcmUnsigned,
        }
    }
}

/// Whether `convert_in_place` would change any byte.
pub fn needs_conversion(format: &AudioFormat, target: SampleLayout) -> bool {
    let bytes = format.sample_size_bytes();
    let swap = bytes > 1 && format.big_endian != target.big_endian;
    let flip = format.encoding != Encoding::PcmFloat
        && (format.encoding == Encoding::PcmSigned) != target.signed;
    swap || flip
}

/// Rewrite whole samples of `data` from `format`'s layout to `target`.
///
/// Trailing bytes that do not form a complete sample are left untouched.
pub fn convert_in_place(data: &mut [u8], format: &AudioFormat, target: SampleLayout) {
    let bytes = format.sample_size_bytes();
    if bytes == 0 {
        return;
    }
    let swap = bytes > 1 && format.big_endian != target.big_endian;
    let flip = format.encoding != Encoding::PcmFloat
        && (format.encoding == Encoding::PcmSigned) != target.signed;

    for sample in data.chunks_exact_mut(bytes) {
        // Sign flip toggles the most significant bit, located by source order.
        if flip {
            let msb = if format.big_endian { 0 } else { bytes - 1 };
            sample[msb] ^= 0x80;
        }
        if swap {
            sample.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_16_bit_samples() {
        let format = AudioFormat::pcm_signed(8000, 16, 1);
        let target = SampleLayout {
            big_endian: true,
            signed: true,
        };
        assert!(needs_conversion(&format, target));

        let mut data = vec![0x01, 0x02, 0x03, 0x04, 0xFF];
        convert_in_place(&mut data, &format, target);
        assert_eq!(data, vec![0x02, 0x01, 0x04, 0x03, 0xFF]);
    }

    #[test]
    fn flips_sign_of_8_bit_samples() {
        let format = AudioFormat::pcm_signed(8000, 8, 1);
        let target = SampleLayout {
            big_endian: false,
            signed: false,
        };
        let mut data = vec![0x00, 0x7F, 0x80];
        convert_in_place(&mut data, &format, target);
        assert_eq!(data, vec![0x80, 0xFF, 0x00]);
    }

    #[test]
    fn flips_unsigned_big_endian_to_signed_little_endian() {
        let format = AudioFormat {
            encoding: Encoding::PcmUnsigned,
            sample_rate: 8000,
            sample_size_bits: 16,
            channels: 1,
            big_endian: true,
        };
        let target = SampleLayout {
            big_endian: false,
            signed: true,
        };
        // 0x8000 unsigned (midpoint) -> 0x0000 signed
        let mut data = vec![0x80, 0x00];
        convert_in_place(&mut data, &format, target);
        assert_eq!(data, vec![0x00, 0x00]);
    }

    #[test]
    fn identity_when_layout_matches() {
        let format = AudioFormat::pcm_signed(8000, 16, 2);
        assert!(!needs_conversion(&format, SampleLayout::of(&format)));
    }

    #[test]
    fn float_samples_are_never_sign_flipped() {
        let format = AudioFormat {
            encoding: Encoding::PcmFloat,
            sample_rate: 8000,
            sample_size_bits: 32,
            channels: 1,
            big_endian: false,
        };
        let target = SampleLayout {
            big_endian: false,
            signed: false,
        };
        assert!(!needs_conversion(&format, target));
    }
}
