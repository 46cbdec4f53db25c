//! MP3 export.
//!
//! PCM is fed to a [`FrameCodec`] in chunks of whole MPEG frames. Between two
//! chunks the cancellation token is checked and one progress event is sent.
//! LAME does the actual Layer III encoding; all FFI-adjacent `unsafe` stays
//! inside [`LameCodec`].

use tracing::debug;

use crate::core::constants::MP3_FRAME_SAMPLES;
use crate::core::progress::{report, ExportProgress, ProgressSender};
use crate::core::{CancellationToken, SampleBuffer};
use crate::encode::{EncodeError, Mp3Bitrate, Mp3Options};

/// Fraction reported once all PCM is consumed but before the caller delivers the result
const ENCODED_FRACTION: f32 = 0.99;

/// Compressed-frame encoder for planar 16-bit PCM.
///
/// `right` is `None` for mono streams. Implementations may buffer input and
/// return fewer (or more) bytes than one call's worth; `flush` drains the rest.
pub trait FrameCodec {
    fn encode_frame(&mut self, left: &[i16], right: Option<&[i16]>) -> Result<Vec<u8>, EncodeError>;

    fn flush(&mut self) -> Result<Vec<u8>, EncodeError>;
}

/// CBR LAME encoder
pub struct LameCodec {
    inner: mp3lame_encoder::Encoder,
    stereo: bool,
}

impl LameCodec {
    pub fn new(channels: u8, sample_rate: u32, bitrate: Mp3Bitrate) -> Result<Self, EncodeError> {
        if !(1..=2).contains(&channels) {
            return Err(EncodeError::InvalidParameters(format!(
                "MP3 supports 1 or 2 channels, got {channels}"
            )));
        }

        let mut builder = mp3lame_encoder::Builder::new()
            .ok_or_else(|| EncodeError::Allocation("LAME encoder context".to_string()))?;
        builder.set_num_channels(channels).map_err(invalid)?;
        builder.set_sample_rate(sample_rate).map_err(invalid)?;
        builder.set_brate(lame_bitrate(bitrate)?).map_err(invalid)?;
        builder
            .set_quality(mp3lame_encoder::Quality::Good)
            .map_err(invalid)?;
        let inner = builder.build().map_err(invalid)?;

        Ok(Self {
            inner,
            stereo: channels == 2,
        })
    }
}

impl FrameCodec for LameCodec {
    fn encode_frame(&mut self, left: &[i16], right: Option<&[i16]>) -> Result<Vec<u8>, EncodeError> {
        let mut out: Vec<u8> = Vec::new();
        out.try_reserve_exact(mp3lame_encoder::max_required_buffer_size(left.len()))
            .map_err(|e| EncodeError::Allocation(e.to_string()))?;

        let written = match (self.stereo, right) {
            (true, Some(right)) => self.inner.encode(
                mp3lame_encoder::DualPcm { left, right },
                out.spare_capacity_mut(),
            ),
            (false, None) => self
                .inner
                .encode(mp3lame_encoder::MonoPcm(left), out.spare_capacity_mut()),
            _ => {
                return Err(EncodeError::InvalidParameters(
                    "channel layout does not match the encoder".to_string(),
                ))
            }
        }
        .map_err(codec)?;

        set_written(&mut out, written);
        Ok(out)
    }

    fn flush(&mut self) -> Result<Vec<u8>, EncodeError> {
        // LAME needs at most 7200 bytes to flush
        let mut out: Vec<u8> = Vec::with_capacity(7200);
        let written = self
            .inner
            .flush::<mp3lame_encoder::FlushNoGap>(out.spare_capacity_mut())
            .map_err(codec)?;
        set_written(&mut out, written);
        Ok(out)
    }
}

fn set_written(out: &mut Vec<u8>, written: usize) {
    let new_len = out.len() + written.min(out.capacity() - out.len());
    // SAFETY: LAME initialised the first `written` bytes of the spare capacity
    unsafe { out.set_len(new_len) };
}

fn lame_bitrate(bitrate: Mp3Bitrate) -> Result<mp3lame_encoder::Bitrate, EncodeError> {
    use mp3lame_encoder::Bitrate::*;
    Ok(match bitrate.kbps() {
        32 => Kbps32,
        40 => Kbps40,
        48 => Kbps48,
        64 => Kbps64,
        80 => Kbps80,
        96 => Kbps96,
        112 => Kbps112,
        128 => Kbps128,
        160 => Kbps160,
        192 => Kbps192,
        224 => Kbps224,
        256 => Kbps256,
        320 => Kbps320,
        other => {
            return Err(EncodeError::InvalidParameters(format!(
                "LAME does not support {other} kbps"
            )))
        }
    })
}

fn invalid(err: impl std::fmt::Debug) -> EncodeError {
    EncodeError::InvalidParameters(format!("LAME rejected configuration: {err:?}"))
}

fn codec(err: impl std::fmt::Debug) -> EncodeError {
    EncodeError::Codec(format!("LAME: {err:?}"))
}

/// Float sample to 16-bit PCM: clamped, negative side scaled by 32768
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32_768.0) as i16
    } else {
        (s * 32_767.0) as i16
    }
}

fn pcm(samples: &[f32]) -> Vec<i16> {
    samples.iter().copied().map(to_i16).collect()
}

/// Chunked MP3 encoding driver
pub struct Mp3Encoder;

impl Mp3Encoder {
    /// Encode with LAME. Mono buffers produce mono streams; anything wider uses
    /// the first two channels.
    pub fn encode(
        buffer: &SampleBuffer,
        options: &Mp3Options,
        cancel: &CancellationToken,
        progress: Option<&ProgressSender>,
    ) -> Result<Vec<u8>, EncodeError> {
        cancel.check()?;
        let channels = if buffer.number_of_channels() >= 2 { 2 } else { 1 };
        let mut codec = LameCodec::new(channels, buffer.sample_rate(), options.bitrate)?;
        Self::encode_with(&mut codec, buffer, options.frames_per_chunk, cancel, progress)
    }

    /// Drive any [`FrameCodec`] over `buffer`.
    ///
    /// On cancellation the partial output is dropped and no further progress
    /// is sent. The last event carries a fraction below 1.0; the caller sends
    /// the terminal event when it hands over the bytes.
    pub fn encode_with(
        codec: &mut dyn FrameCodec,
        buffer: &SampleBuffer,
        frames_per_chunk: usize,
        cancel: &CancellationToken,
        progress: Option<&ProgressSender>,
    ) -> Result<Vec<u8>, EncodeError> {
        let length = buffer.length();
        let left = buffer.channel(0);
        let right = (buffer.number_of_channels() >= 2).then(|| buffer.channel(1));

        let chunk_len = MP3_FRAME_SAMPLES * frames_per_chunk.max(1);
        let total_chunks = length.div_ceil(chunk_len);
        let mut out = Vec::new();

        debug!(
            length,
            stereo = right.is_some(),
            total_chunks,
            "Encoding MP3"
        );

        for (index, start) in (0..length).step_by(chunk_len).enumerate() {
            cancel.check()?;
            let end = (start + chunk_len).min(length);
            let left_pcm = pcm(&left[start..end]);
            let right_pcm = right.map(|r| pcm(&r[start..end]));
            out.extend(codec.encode_frame(&left_pcm, right_pcm.as_deref())?);

            let fraction = (end as f32 / length as f32) * ENCODED_FRACTION;
            report(
                progress,
                ExportProgress::new(
                    fraction.min(ENCODED_FRACTION),
                    format!("Encoding MP3 ({}/{})", index + 1, total_chunks),
                ),
            );
        }

        cancel.check()?;
        out.extend(codec.flush()?);
        cancel.check()?;
        report(progress, ExportProgress::new(ENCODED_FRACTION, "Finalizing MP3"));

        debug!(bytes = out.len(), "MP3 encoded");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::frame::{self, ChannelMode, Layer, MpegVersion};
    use crossbeam::channel;

    /// Records every call and returns one marker byte per sample pair
    #[derive(Default)]
    struct RecordingCodec {
        calls: Vec<(usize, bool)>,
        flushed: bool,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl FrameCodec for RecordingCodec {
        fn encode_frame(
            &mut self,
            left: &[i16],
            right: Option<&[i16]>,
        ) -> Result<Vec<u8>, EncodeError> {
            self.calls.push((left.len(), right.is_some()));
            if let Some((after, token)) = &self.cancel_after {
                if self.calls.len() == *after {
                    token.cancel();
                }
            }
            Ok(vec![0xAB; left.len() / MP3_FRAME_SAMPLES])
        }

        fn flush(&mut self) -> Result<Vec<u8>, EncodeError> {
            self.flushed = true;
            Ok(vec![0xCD])
        }
    }

    fn sine(rate: u32, channels: usize, length: usize) -> SampleBuffer {
        let data: Vec<f32> = (0..length)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / rate as f32).sin() * 0.5)
            .collect();
        SampleBuffer::new(rate, vec![data; channels]).unwrap()
    }

    #[test]
    fn test_to_i16() {
        assert_eq!(to_i16(1.0), 32_767);
        assert_eq!(to_i16(-1.0), -32_768);
        assert_eq!(to_i16(2.0), 32_767);
        assert_eq!(to_i16(-2.0), -32_768);
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_chunking_and_progress() {
        let buffer = sine(44_100, 2, MP3_FRAME_SAMPLES * 5 + 10);
        let mut codec = RecordingCodec::default();
        let (tx, rx) = channel::unbounded();

        let out = Mp3Encoder::encode_with(
            &mut codec,
            &buffer,
            2,
            &CancellationToken::new(),
            Some(&tx),
        )
        .unwrap();

        let chunk = MP3_FRAME_SAMPLES * 2;
        assert_eq!(
            codec.calls,
            vec![(chunk, true), (chunk, true), (MP3_FRAME_SAMPLES + 10, true)]
        );
        assert!(codec.flushed);
        assert_eq!(out.last(), Some(&0xCD));

        let events: Vec<ExportProgress> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(events.windows(2).all(|w| w[0].fraction <= w[1].fraction));
        assert!(events.iter().all(|e| !e.is_complete()));
    }

    #[test]
    fn test_chunks_carry_their_own_samples() {
        #[derive(Default)]
        struct Collecting {
            left: Vec<i16>,
            right: Vec<i16>,
        }

        impl FrameCodec for Collecting {
            fn encode_frame(
                &mut self,
                left: &[i16],
                right: Option<&[i16]>,
            ) -> Result<Vec<u8>, EncodeError> {
                self.left.extend_from_slice(left);
                self.right.extend_from_slice(right.unwrap_or_default());
                Ok(Vec::new())
            }

            fn flush(&mut self) -> Result<Vec<u8>, EncodeError> {
                Ok(Vec::new())
            }
        }

        let length = MP3_FRAME_SAMPLES * 3 + 7;
        let ramp: Vec<f32> = (0..length).map(|i| i as f32 / length as f32).collect();
        let negated: Vec<f32> = ramp.iter().map(|s| -s).collect();
        let buffer = SampleBuffer::new(44_100, vec![ramp.clone(), negated.clone()]).unwrap();

        let mut codec = Collecting::default();
        Mp3Encoder::encode_with(&mut codec, &buffer, 1, &CancellationToken::new(), None).unwrap();

        assert_eq!(codec.left, pcm(&ramp));
        assert_eq!(codec.right, pcm(&negated));
    }

    #[test]
    fn test_mono_has_no_right_channel() {
        let buffer = sine(22_050, 1, 100);
        let mut codec = RecordingCodec::default();
        Mp3Encoder::encode_with(&mut codec, &buffer, 32, &CancellationToken::new(), None).unwrap();
        assert_eq!(codec.calls, vec![(100, false)]);
    }

    #[test]
    fn test_cancellation_stops_within_one_chunk() {
        let buffer = sine(44_100, 1, MP3_FRAME_SAMPLES * 10);
        let token = CancellationToken::new();
        let mut codec = RecordingCodec {
            cancel_after: Some((2, token.clone())),
            ..Default::default()
        };
        let (tx, rx) = channel::unbounded();

        let result = Mp3Encoder::encode_with(&mut codec, &buffer, 1, &token, Some(&tx));
        assert!(matches!(result, Err(EncodeError::Cancelled)));
        assert_eq!(codec.calls.len(), 2);
        assert!(!codec.flushed);
        assert!(rx.try_iter().all(|e| !e.is_complete()));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let result = Mp3Encoder::encode(&sine(44_100, 1, 10), &Mp3Options::default(), &token, None);
        assert!(matches!(result, Err(EncodeError::Cancelled)));
    }

    #[test]
    fn test_lame_produces_layer3_frames() {
        let buffer = sine(44_100, 1, 44_100);
        let options = Mp3Options {
            bitrate: Mp3Bitrate::new(128).unwrap(),
            ..Default::default()
        };
        let bytes =
            Mp3Encoder::encode(&buffer, &options, &CancellationToken::new(), None).unwrap();

        let (_, header) = frame::frames(&bytes).next().unwrap();
        assert_eq!(header.version, MpegVersion::Mpeg1);
        assert_eq!(header.layer, Layer::Layer3);
        assert_eq!(header.sample_rate, 44_100);
        assert_eq!(header.bitrate_kbps, 128);
        assert_eq!(header.channel_mode, ChannelMode::Mono);
        // one second at 1152 samples per frame
        assert!(frame::count_frames(&bytes) >= 35);
    }

    #[test]
    fn test_lame_stereo() {
        let buffer = sine(48_000, 3, 4_800);
        let bytes =
            Mp3Encoder::encode(&buffer, &Mp3Options::default(), &CancellationToken::new(), None)
                .unwrap();
        let (_, header) = frame::frames(&bytes).next().unwrap();
        assert_eq!(header.channel_mode.channel_count(), 2);
        assert_eq!(header.bitrate_kbps, 192);
    }

    #[test]
    fn test_lame_rejects_channel_count() {
        assert!(matches!(
            LameCodec::new(3, 44_100, Mp3Bitrate::default()),
            Err(EncodeError::InvalidParameters(_))
        ));
    }
}
