//! Decoding via Symphonia.
//!
//! Probes the container, picks the first decodable track and decodes it
//! packet by packet into planar `f32` channels. Covers WAV, MP3, OGG/Vorbis,
//! FLAC, M4A/MP4 (AAC, ALAC) and MKV/WebM with a supported codec.

use std::io::{Cursor, ErrorKind};

use symphonia::core::audio::SampleBuffer as InterleavedScratch;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::core::progress::{self, ExportProgress};
use crate::decode::decoder::{DecodeError, DecodeRequest, PlatformDecoder, RawPcm};

/// Packets decoded between two progress events
const PACKETS_PER_PROGRESS: u64 = 64;

/// Decoder backend backed by Symphonia
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaBackend;

impl PlatformDecoder for SymphoniaBackend {
    fn decode(&self, request: DecodeRequest<'_>) -> Result<RawPcm, DecodeError> {
        let source = Cursor::new(request.bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = request.hint.extension.as_deref() {
            hint.with_extension(ext);
        }
        if let Some(mime) = request.hint.mime_type.as_deref() {
            hint.mime_type(mime);
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| DecodeError::UnsupportedFormat(format!("{e}")))?;
        let mut reader = probed.format;

        // First track with a known codec; video tracks are not exposed by Symphonia
        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::UnsupportedFormat(format!("Codec init failed: {e}")))?;

        let total_frames = codec_params.n_frames;
        let mut sample_rate = codec_params.sample_rate;
        let mut channels: Vec<Vec<f32>> = codec_params
            .channels
            .map(|c| vec![Vec::new(); c.count()])
            .unwrap_or_default();

        debug!(
            codec = ?codec_params.codec,
            sample_rate = ?sample_rate,
            channels = channels.len(),
            frames = ?total_frames,
            "Opened audio stream"
        );

        let mut decoded_frames: u64 = 0;
        let mut packets: u64 = 0;

        loop {
            request.cancel.check()?;

            let packet = match reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(DecodeError::Corrupted(format!("{e}"))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!(error = %msg, "Skipping corrupted audio packet");
                    continue;
                }
                Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => return Err(DecodeError::Corrupted(format!("{e}"))),
            };

            let spec = *decoded.spec();
            let frames = decoded.frames();
            if frames == 0 {
                continue;
            }

            let channel_count = spec.channels.count();
            if channels.is_empty() {
                channels = vec![Vec::new(); channel_count];
            }
            if channels.len() != channel_count {
                return Err(DecodeError::Corrupted(format!(
                    "channel count changed from {} to {channel_count} mid-stream",
                    channels.len()
                )));
            }
            sample_rate.get_or_insert(spec.rate);

            let mut scratch = InterleavedScratch::<f32>::new(frames as u64, spec);
            scratch.copy_interleaved_ref(decoded);
            for frame in scratch.samples().chunks_exact(channel_count) {
                for (channel, sample) in channels.iter_mut().zip(frame) {
                    channel.push(*sample);
                }
            }

            decoded_frames += frames as u64;
            packets += 1;
            if packets % PACKETS_PER_PROGRESS == 0 {
                if let Some(total) = total_frames.filter(|t| *t > 0) {
                    let fraction = (decoded_frames as f64 / total as f64).min(0.99) as f32;
                    progress::report(
                        request.progress,
                        ExportProgress::new(fraction, "Decoding audio..."),
                    );
                }
            }
        }

        let sample_rate = sample_rate
            .ok_or_else(|| DecodeError::Corrupted("stream declares no sample rate".to_string()))?;
        if channels.is_empty() {
            return Err(DecodeError::Corrupted(
                "stream contains no decodable audio".to_string(),
            ));
        }

        Ok(RawPcm {
            sample_rate,
            channels,
        })
    }
}
