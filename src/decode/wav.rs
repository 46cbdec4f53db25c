//! Built-in RIFF/WAVE reader.
//!
//! Handles integer PCM (8/16/24/32-bit) and IEEE float (32/64-bit), including
//! WAVE_FORMAT_EXTENSIBLE headers. Integer samples are scaled by
//! `2^(bits-1) - 1`, the exact inverse of the WAV encoder. Anything else is
//! reported as unsupported so the next backend can try.

use byteorder::{ByteOrder, LittleEndian};
use tracing::warn;

use crate::decode::decoder::{DecodeError, DecodeRequest, PlatformDecoder, RawPcm};

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Frames decoded between two cancellation checks
const FRAMES_PER_CHECK: usize = 1 << 16;

/// Sample encoding declared by the `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavSampleFormat {
    U8,
    I16,
    I24,
    I32,
    F32,
    F64,
}

impl WavSampleFormat {
    fn bytes_per_sample(self) -> usize {
        match self {
            WavSampleFormat::U8 => 1,
            WavSampleFormat::I16 => 2,
            WavSampleFormat::I24 => 3,
            WavSampleFormat::I32 | WavSampleFormat::F32 => 4,
            WavSampleFormat::F64 => 8,
        }
    }

    fn read(self, bytes: &[u8]) -> f32 {
        match self {
            WavSampleFormat::U8 => (bytes[0] as f32 - 128.0) / 127.0,
            WavSampleFormat::I16 => LittleEndian::read_i16(bytes) as f32 / i16::MAX as f32,
            WavSampleFormat::I24 => LittleEndian::read_i24(bytes) as f32 / 8_388_607.0,
            WavSampleFormat::I32 => {
                (LittleEndian::read_i32(bytes) as f64 / i32::MAX as f64) as f32
            }
            WavSampleFormat::F32 => LittleEndian::read_f32(bytes),
            WavSampleFormat::F64 => LittleEndian::read_f64(bytes) as f32,
        }
    }
}

/// Parsed `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_format: WavSampleFormat,
}

impl WavFormat {
    fn parse(body: &[u8]) -> Result<Self, DecodeError> {
        if body.len() < 16 {
            return Err(DecodeError::Corrupted("fmt chunk too short".to_string()));
        }

        let mut format_tag = LittleEndian::read_u16(&body[0..2]);
        let channels = LittleEndian::read_u16(&body[2..4]);
        let sample_rate = LittleEndian::read_u32(&body[4..8]);
        let bits = LittleEndian::read_u16(&body[14..16]);

        if format_tag == FORMAT_EXTENSIBLE {
            // The sub-format GUID starts with the plain format tag
            if body.len() < 26 {
                return Err(DecodeError::Corrupted(
                    "extensible fmt chunk too short".to_string(),
                ));
            }
            format_tag = LittleEndian::read_u16(&body[24..26]);
        }

        let sample_format = match (format_tag, bits) {
            (FORMAT_PCM, 8) => WavSampleFormat::U8,
            (FORMAT_PCM, 16) => WavSampleFormat::I16,
            (FORMAT_PCM, 24) => WavSampleFormat::I24,
            (FORMAT_PCM, 32) => WavSampleFormat::I32,
            (FORMAT_IEEE_FLOAT, 32) => WavSampleFormat::F32,
            (FORMAT_IEEE_FLOAT, 64) => WavSampleFormat::F64,
            (tag, bits) => {
                return Err(DecodeError::UnsupportedFormat(format!(
                    "WAV format tag {tag:#06x} with {bits} bits per sample"
                )))
            }
        };

        if channels == 0 || sample_rate == 0 {
            return Err(DecodeError::Corrupted(format!(
                "invalid fmt chunk: {channels} channels at {sample_rate} Hz"
            )));
        }

        Ok(Self {
            channels,
            sample_rate,
            sample_format,
        })
    }
}

/// Whether `bytes` start like a RIFF/WAVE file
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Decoder backend for uncompressed WAV
#[derive(Debug, Default, Clone, Copy)]
pub struct WavPcmBackend;

impl PlatformDecoder for WavPcmBackend {
    fn decode(&self, request: DecodeRequest<'_>) -> Result<RawPcm, DecodeError> {
        if !is_wav(request.bytes) {
            return Err(DecodeError::UnsupportedFormat(
                "not a RIFF/WAVE stream".to_string(),
            ));
        }

        let (format, data) = read_chunks(request.bytes)?;

        let channel_count = format.channels as usize;
        let sample_size = format.sample_format.bytes_per_sample();
        let frame_size = sample_size * channel_count;
        let frames = data.len() / frame_size;
        if data.len() % frame_size != 0 {
            warn!(
                trailing_bytes = data.len() % frame_size,
                "Ignoring partial trailing WAV frame"
            );
        }

        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for (index, frame) in data.chunks_exact(frame_size).enumerate() {
            if index % FRAMES_PER_CHECK == 0 {
                request.cancel.check()?;
            }
            for (channel, sample) in channels.iter_mut().zip(frame.chunks_exact(sample_size)) {
                channel.push(format.sample_format.read(sample));
            }
        }

        Ok(RawPcm {
            sample_rate: format.sample_rate,
            channels,
        })
    }
}

/// Walk the RIFF chunk list and return the format plus the sample data
fn read_chunks(bytes: &[u8]) -> Result<(WavFormat, &[u8]), DecodeError> {
    let mut format = None;
    let mut data = None;
    let mut offset = 12;

    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = LittleEndian::read_u32(&bytes[offset + 4..offset + 8]) as usize;
        let body_start = offset + 8;
        let declared_end = body_start.saturating_add(size);
        let body_end = declared_end.min(bytes.len());

        match id {
            b"fmt " => {
                if declared_end > bytes.len() {
                    return Err(DecodeError::Corrupted("truncated fmt chunk".to_string()));
                }
                format = Some(WavFormat::parse(&bytes[body_start..body_end])?);
            }
            b"data" => {
                if declared_end > bytes.len() {
                    // Streaming writers leave the size unpatched
                    warn!(
                        declared = size,
                        available = body_end - body_start,
                        "WAV data chunk shorter than declared"
                    );
                }
                data = Some(&bytes[body_start..body_end]);
            }
            _ => {}
        }

        if format.is_some() && data.is_some() {
            break;
        }
        // Chunks are word aligned
        offset = declared_end.saturating_add(size & 1);
    }

    let format = format.ok_or_else(|| DecodeError::Corrupted("missing fmt chunk".to_string()))?;
    let data = data.ok_or_else(|| DecodeError::Corrupted("missing data chunk".to_string()))?;
    Ok((format, data))
}
