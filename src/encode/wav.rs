//! RIFF/WAVE writer.
//!
//! Output is a canonical 44-byte header followed by interleaved little-endian
//! samples. Byte-for-byte deterministic for a given buffer and bit depth.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::core::SampleBuffer;
use crate::encode::{BitDepth, EncodeError};

/// Size of the header written by [`encode`]
pub const HEADER_LEN: usize = 44;

/// Encode `buffer` as a WAV file
pub fn encode(buffer: &SampleBuffer, bit_depth: BitDepth) -> Result<Vec<u8>, EncodeError> {
    let channels = u16::try_from(buffer.number_of_channels()).map_err(|_| {
        EncodeError::InvalidParameters(format!(
            "{} channels do not fit a WAV header",
            buffer.number_of_channels()
        ))
    })?;
    let bytes_per_sample = bit_depth.bytes_per_sample();
    let block_align = channels.checked_mul(bytes_per_sample).ok_or_else(|| {
        EncodeError::InvalidParameters(format!("block align overflow for {channels} channels"))
    })?;
    let byte_rate = buffer
        .sample_rate()
        .checked_mul(block_align as u32)
        .ok_or_else(|| EncodeError::InvalidParameters("byte rate overflow".to_string()))?;

    let data_len = (buffer.length() as u64) * block_align as u64;
    let padded_len = data_len + (data_len & 1);
    if 36 + padded_len > u32::MAX as u64 {
        return Err(EncodeError::InvalidParameters(format!(
            "{data_len} bytes of audio exceed the 4 GiB WAV limit"
        )));
    }

    let mut out = Vec::new();
    out.try_reserve_exact(HEADER_LEN + padded_len as usize)
        .map_err(|e| EncodeError::Allocation(e.to_string()))?;

    let header = WavHeader {
        riff_size: 36 + padded_len as u32,
        format_code: bit_depth.format_code(),
        channels,
        sample_rate: buffer.sample_rate(),
        byte_rate,
        block_align,
        bits_per_sample: bit_depth.bits(),
        data_size: data_len as u32,
    };
    header.write(&mut out);

    let mut scratch = [0u8; 4];
    for frame in 0..buffer.length() {
        for channel in buffer.channels() {
            let sample = channel[frame];
            let bytes = match bit_depth {
                BitDepth::Int16 => {
                    LittleEndian::write_i16(&mut scratch, quantize(sample, 16) as i16);
                    &scratch[..2]
                }
                BitDepth::Int24 => {
                    LittleEndian::write_i24(&mut scratch, quantize(sample, 24));
                    &scratch[..3]
                }
                BitDepth::Float32 => {
                    LittleEndian::write_f32(&mut scratch, sample);
                    &scratch[..4]
                }
            };
            out.extend_from_slice(bytes);
        }
    }

    if data_len & 1 == 1 {
        out.push(0);
    }

    Ok(out)
}

/// Clamp to [-1, 1] and scale to a signed integer of `bits` bits
#[inline]
fn quantize(sample: f32, bits: u32) -> i32 {
    let max = ((1i64 << (bits - 1)) - 1) as f64;
    let clamped = if sample.is_nan() {
        0.0
    } else {
        (sample as f64).clamp(-1.0, 1.0)
    };
    (clamped * max).round() as i32
}

/// Fields of a canonical 44-byte WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub format_code: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Read back a header produced by [`encode`]. `None` if the layout is not canonical.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN
            || &bytes[0..4] != b"RIFF"
            || &bytes[8..12] != b"WAVE"
            || &bytes[12..16] != b"fmt "
            || LittleEndian::read_u32(&bytes[16..20]) != 16
            || &bytes[36..40] != b"data"
        {
            return None;
        }

        Some(Self {
            riff_size: LittleEndian::read_u32(&bytes[4..8]),
            format_code: LittleEndian::read_u16(&bytes[20..22]),
            channels: LittleEndian::read_u16(&bytes[22..24]),
            sample_rate: LittleEndian::read_u32(&bytes[24..28]),
            byte_rate: LittleEndian::read_u32(&bytes[28..32]),
            block_align: LittleEndian::read_u16(&bytes[32..34]),
            bits_per_sample: LittleEndian::read_u16(&bytes[34..36]),
            data_size: LittleEndian::read_u32(&bytes[40..44]),
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        // Writes into a Vec cannot fail
        out.extend_from_slice(b"RIFF");
        let _ = out.write_u32::<LittleEndian>(self.riff_size);
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        let _ = out.write_u32::<LittleEndian>(16);
        let _ = out.write_u16::<LittleEndian>(self.format_code);
        let _ = out.write_u16::<LittleEndian>(self.channels);
        let _ = out.write_u32::<LittleEndian>(self.sample_rate);
        let _ = out.write_u32::<LittleEndian>(self.byte_rate);
        let _ = out.write_u16::<LittleEndian>(self.block_align);
        let _ = out.write_u16::<LittleEndian>(self.bits_per_sample);
        out.extend_from_slice(b"data");
        let _ = out.write_u32::<LittleEndian>(self.data_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_exactness() {
        let buffer = SampleBuffer::silence(44_100, 2, 10).unwrap();
        let bytes = encode(&buffer, BitDepth::Int16).unwrap();
        let header = WavHeader::parse(&bytes).unwrap();

        assert_eq!(header.format_code, 1);
        assert_eq!(header.channels, 2);
        assert_eq!(header.sample_rate, 44_100);
        assert_eq!(header.byte_rate, 176_400);
        assert_eq!(header.block_align, 4);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.data_size, 40);
        assert_eq!(header.riff_size, 36 + 40);
        assert_eq!(bytes.len(), HEADER_LEN + 40);
    }

    #[test]
    fn test_16_bit_samples() {
        let buffer = SampleBuffer::new(8_000, vec![vec![1.0, -1.0, 0.5, 2.0, -3.0]]).unwrap();
        let bytes = encode(&buffer, BitDepth::Int16).unwrap();
        let samples: Vec<i16> = bytes[HEADER_LEN..HEADER_LEN + 10]
            .chunks_exact(2)
            .map(LittleEndian::read_i16)
            .collect();
        assert_eq!(samples, vec![32_767, -32_767, 16_384, 32_767, -32_767]);
    }

    #[test]
    fn test_24_bit() {
        let buffer = SampleBuffer::new(48_000, vec![vec![1.0, -0.5]]).unwrap();
        let bytes = encode(&buffer, BitDepth::Int24).unwrap();
        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.bits_per_sample, 24);
        assert_eq!(header.block_align, 3);
        assert_eq!(header.byte_rate, 144_000);
        assert_eq!(LittleEndian::read_i24(&bytes[44..47]), 8_388_607);
        assert_eq!(LittleEndian::read_i24(&bytes[47..50]), -4_194_304);
    }

    #[test]
    fn test_float_is_not_clamped() {
        let buffer = SampleBuffer::new(8_000, vec![vec![1.5, -0.25]]).unwrap();
        let bytes = encode(&buffer, BitDepth::Float32).unwrap();
        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.format_code, 3);
        assert_eq!(header.bits_per_sample, 32);
        assert_eq!(LittleEndian::read_f32(&bytes[44..48]), 1.5);
        assert_eq!(LittleEndian::read_f32(&bytes[48..52]), -0.25);
    }

    #[test]
    fn test_odd_data_is_padded() {
        let buffer = SampleBuffer::silence(8_000, 1, 3).unwrap();
        let bytes = encode(&buffer, BitDepth::Int24).unwrap();
        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.data_size, 9);
        assert_eq!(header.riff_size, 36 + 10);
        assert_eq!(bytes.len(), HEADER_LEN + 10);
        assert_eq!(bytes.last(), Some(&0));
    }

    #[test]
    fn test_interleaving_and_determinism() {
        let buffer = SampleBuffer::new(8_000, vec![vec![0.0, 1.0], vec![-1.0, 0.0]]).unwrap();
        let bytes = encode(&buffer, BitDepth::Int16).unwrap();
        let samples: Vec<i16> = bytes[HEADER_LEN..]
            .chunks_exact(2)
            .map(LittleEndian::read_i16)
            .collect();
        assert_eq!(samples, vec![0, -32_767, 32_767, 0]);
        assert_eq!(encode(&buffer, BitDepth::Int16).unwrap(), bytes);
    }

    #[test]
    fn test_empty_buffer_is_header_only() {
        let buffer = SampleBuffer::silence(22_050, 1, 0).unwrap();
        let bytes = encode(&buffer, BitDepth::Int16).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(WavHeader::parse(&bytes).unwrap().data_size, 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(WavHeader::parse(b"not a wav file at all, definitely not 44 bytes").is_none());
        assert!(WavHeader::parse(&[0u8; 10]).is_none());
    }
}
